use std::{
    collections::HashMap,
    io::{self, Write},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex,
    },
};

use runtime::engine::{OperationReport, RunSummary, DEFAULT_WALLET_SUPPLY_LIMIT};
use runtime::logging::OperationJournalRow;
use runtime::replay::ReplayCsvWriter;
use tokio::sync::broadcast;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StartRunError {
    RunIdOverflow,
}

/// Events streamed to websocket subscribers while a run executes.
#[derive(Clone, Debug, serde::Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum RunEvent {
    Connected {
        run_id: Option<u64>,
    },
    RunStarted {
        run_id: u64,
    },
    OperationApplied {
        run_id: u64,
        operation: u64,
        borrow_amount: f64,
        reinvest_amount: f64,
        repay_amount: f64,
        platform_fee: f64,
        profit: f64,
        health: f64,
        attempts: u32,
    },
    OperationSkipped {
        run_id: u64,
        operation: u64,
        attempts: u32,
        min_required_borrow: f64,
        max_safe_borrow: f64,
    },
    RunCompleted {
        run_id: u64,
        target_reached: bool,
        total_operations: u64,
        supply_final: f64,
    },
}

impl RunEvent {
    pub fn connected() -> Self {
        Self::Connected { run_id: None }
    }

    pub fn run_started(run_id: u64) -> Self {
        Self::RunStarted { run_id }
    }

    pub fn from_report(run_id: u64, report: &OperationReport) -> Self {
        if report.plan.feasible {
            Self::OperationApplied {
                run_id,
                operation: report.operation,
                borrow_amount: report.plan.borrow_amount,
                reinvest_amount: report.plan.reinvest_amount,
                repay_amount: report.plan.repay_amount,
                platform_fee: report.plan.platform_fee,
                profit: report.realized_profit,
                health: report.health_after,
                attempts: report.plan.attempts_used,
            }
        } else {
            Self::OperationSkipped {
                run_id,
                operation: report.operation,
                attempts: report.plan.attempts_used,
                min_required_borrow: report.plan.min_required_borrow,
                max_safe_borrow: report.plan.max_safe_borrow,
            }
        }
    }

    pub fn run_completed(run_id: u64, summary: &RunSummary) -> Self {
        Self::RunCompleted {
            run_id,
            target_reached: summary.target_reached,
            total_operations: summary.total_operations,
            supply_final: summary.supply_final,
        }
    }
}

/// Per-run settings the server wires in from its environment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunDefaults {
    pub wallet_supply_limit: f64,
    pub max_operations: u64,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            wallet_supply_limit: DEFAULT_WALLET_SUPPLY_LIMIT,
            max_operations: 200,
        }
    }
}

type SharedJournal = Arc<Mutex<ReplayCsvWriter<Box<dyn Write + Send>>>>;

#[derive(Clone)]
pub struct AppState {
    next_run_id: Arc<AtomicU64>,
    events_tx: broadcast::Sender<RunEvent>,
    defaults: RunDefaults,
    journal: Option<SharedJournal>,
    completed: Arc<Mutex<HashMap<u64, RunSummary>>>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_run_options(RunDefaults::default(), None)
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run_options(
        defaults: RunDefaults,
        journal: Option<ReplayCsvWriter<Box<dyn Write + Send>>>,
    ) -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            next_run_id: Arc::new(AtomicU64::new(0)),
            events_tx,
            defaults,
            journal: journal.map(|writer| Arc::new(Mutex::new(writer))),
            completed: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn defaults(&self) -> RunDefaults {
        self.defaults
    }

    /// Appends the rows of a completed run to the replay journal, if the
    /// server wired one in.
    pub fn append_journal_rows(&self, rows: &[OperationJournalRow]) -> io::Result<()> {
        let Some(journal) = &self.journal else {
            return Ok(());
        };
        let mut writer = journal
            .lock()
            .map_err(|_| io::Error::other("replay journal lock poisoned"))?;
        writer.append_journal_rows(rows)
    }

    pub fn record_summary(&self, run_id: u64, summary: RunSummary) {
        if let Ok(mut completed) = self.completed.lock() {
            completed.insert(run_id, summary);
        }
    }

    pub fn summary(&self, run_id: u64) -> Option<RunSummary> {
        self.completed.lock().ok()?.get(&run_id).cloned()
    }

    pub fn allocate_run_id(&self) -> Result<u64, StartRunError> {
        let previous = self
            .next_run_id
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                current.checked_add(1)
            })
            .map_err(|_| StartRunError::RunIdOverflow)?;

        Ok(previous + 1)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RunEvent> {
        self.events_tx.subscribe()
    }

    pub fn publish_event(
        &self,
        event: RunEvent,
    ) -> Result<usize, broadcast::error::SendError<RunEvent>> {
        self.events_tx.send(event)
    }

    #[cfg(test)]
    pub(crate) fn with_next_run_id_for_test(next_run_id: u64) -> Self {
        let state = Self::default();
        state.next_run_id.store(next_run_id, Ordering::Relaxed);
        state
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::{AppState, RunEvent};

    #[test]
    fn allocate_run_id_returns_overflow_error_at_u64_max() {
        let state = AppState::new();
        state.next_run_id.store(u64::MAX, Ordering::Relaxed);

        assert!(state.allocate_run_id().is_err());
    }

    #[test]
    fn run_ids_are_sequential_from_one() {
        let state = AppState::with_next_run_id_for_test(0);

        assert_eq!(state.allocate_run_id().unwrap(), 1);
        assert_eq!(state.allocate_run_id().unwrap(), 2);
    }

    #[test]
    fn append_without_a_journal_is_a_no_op() {
        let state = AppState::new();

        assert!(state.append_journal_rows(&[]).is_ok());
    }

    #[test]
    fn default_run_options_match_the_engine_defaults() {
        let defaults = super::RunDefaults::default();

        assert_eq!(defaults.wallet_supply_limit, 0.70);
        assert_eq!(defaults.max_operations, 200);
    }

    #[test]
    fn run_events_serialize_with_a_tagged_event_type() {
        let json = serde_json::to_value(RunEvent::run_started(7)).unwrap();

        assert_eq!(json["event_type"], "run_started");
        assert_eq!(json["run_id"], 7);
    }
}
