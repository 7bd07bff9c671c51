use std::io::{self, Write};

use crate::logging::{OperationJournalRow, RunLogEvent, RunLogEventKind, RunLogWriter};

pub const REPLAY_CSV_HEADER: &str =
    "op,supply,borrow,borrow_amount,reinvest,repay,fee,profit,health,attempts,action,adjustments\n";

/// Renders operation journal rows into the replay CSV artifact.
pub struct ReplayCsvWriter<W: Write> {
    writer: W,
}

impl<W: Write> ReplayCsvWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(REPLAY_CSV_HEADER.as_bytes())
    }

    /// Writes the header, flushes, and only then logs the artifact event so
    /// the log never claims an artifact that is not on disk yet.
    pub fn write_header_and_log(
        &mut self,
        operation: u64,
        run_log_writer: &mut dyn RunLogWriter,
    ) -> io::Result<()> {
        self.write_header()?;
        self.writer.flush()?;
        run_log_writer.write(RunLogEvent::new(
            operation,
            RunLogEventKind::ReplayArtifactWritten,
            None,
        ));
        Ok(())
    }

    pub fn append_journal_rows(&mut self, rows: &[OperationJournalRow]) -> io::Result<()> {
        for row in rows {
            let adjustments = escape_csv_field(&row.detail);
            writeln!(
                self.writer,
                "{},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.6},{:.4},{},{},{adjustments}",
                row.operation,
                row.supply,
                row.borrow,
                row.borrow_amount,
                row.reinvest_amount,
                row.repay_amount,
                row.platform_fee,
                row.profit,
                row.health,
                row.attempts,
                row.kind.as_replay_action(),
            )?;
        }
        Ok(())
    }
}

fn escape_csv_field(value: &str) -> String {
    let needs_quotes = value
        .chars()
        .any(|ch| matches!(ch, ',' | '"' | '\n' | '\r'));
    if !needs_quotes {
        return value.to_string();
    }

    let escaped = value.replace('"', "\"\"");
    format!("\"{escaped}\"")
}
