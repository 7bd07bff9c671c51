mod config;
mod wiring;

use std::error::Error;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

use runtime::replay::ReplayCsvWriter;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = config::Config::from_env()?;
    let journal = open_replay_journal(&config.replay_output_path)?;
    let listener = TcpListener::bind(config.listen_addr).await?;

    axum::serve(listener, wiring::build_app(&config, Some(journal))).await?;
    Ok(())
}

/// Creates the replay artifact with its header and hands the open writer to
/// the app so completed runs append their journal rows to it.
fn open_replay_journal(path: &str) -> io::Result<ReplayCsvWriter<Box<dyn Write + Send>>> {
    let replay_path = Path::new(path);

    if let Some(parent) = replay_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent)?;
    }

    let replay_file = File::create(replay_path)?;
    let mut journal: ReplayCsvWriter<Box<dyn Write + Send>> =
        ReplayCsvWriter::new(Box::new(replay_file));
    journal.write_header()?;
    Ok(journal)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    use runtime::logging::{JournalRowKind, OperationJournalRow};
    use runtime::replay::REPLAY_CSV_HEADER;

    use super::open_replay_journal;

    #[test]
    fn open_replay_journal_creates_parent_dir_and_accepts_rows() {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let root = std::env::temp_dir().join(format!("loop-server-replay-{unique}"));
        let replay_path = root.join("nested").join("replay.csv");

        let mut journal = open_replay_journal(replay_path.to_str().unwrap())
            .expect("startup should initialize the replay journal");
        journal
            .append_journal_rows(&[OperationJournalRow {
                operation: 1,
                kind: JournalRowKind::OperationApplied,
                supply: 1_009.534,
                borrow: 609.699,
                borrow_amount: 75.699001,
                reinvest_amount: 9.534,
                repay_amount: 66.0,
                platform_fee: 0.165,
                profit: 0.000001,
                health: 1.2251,
                attempts: 1,
                detail: String::new(),
            }])
            .expect("open journal should accept rows");

        let actual = fs::read_to_string(&replay_path).expect("replay output file should exist");
        assert!(actual.starts_with(REPLAY_CSV_HEADER));
        assert_eq!(actual.lines().count(), 2);
        assert!(actual.contains(",applied,"));

        fs::remove_dir_all(&root).expect("temp replay directory should be removable");
    }
}
