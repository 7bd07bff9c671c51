#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLogEventKind {
    OperationStarted,
    ExtraSupplyApplied,
    PlanComputed,
    StateApplied,
    OperationSkipped,
    ReplayArtifactWritten,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunLogEvent {
    pub operation: u64,
    pub kind: RunLogEventKind,
    pub reschedule_attempts: Option<u32>,
}

impl RunLogEvent {
    pub fn new(operation: u64, kind: RunLogEventKind, reschedule_attempts: Option<u32>) -> Self {
        Self {
            operation,
            kind,
            reschedule_attempts,
        }
    }
}

pub trait RunLogWriter {
    fn write(&mut self, event: RunLogEvent);
}

#[derive(Debug, Default)]
pub struct InMemoryRunLogWriter {
    events: Vec<RunLogEvent>,
}

impl InMemoryRunLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[RunLogEvent] {
        &self.events
    }
}

impl RunLogWriter for InMemoryRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        self.events.push(event);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalRowKind {
    OperationApplied,
    OperationSkipped,
}

impl JournalRowKind {
    pub fn as_replay_action(self) -> &'static str {
        match self {
            Self::OperationApplied => "applied",
            Self::OperationSkipped => "skipped",
        }
    }
}

/// One journal row per planned operation, rendered into the replay CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationJournalRow {
    pub operation: u64,
    pub kind: JournalRowKind,
    pub supply: f64,
    pub borrow: f64,
    pub borrow_amount: f64,
    pub reinvest_amount: f64,
    pub repay_amount: f64,
    pub platform_fee: f64,
    pub profit: f64,
    pub health: f64,
    pub attempts: u32,
    pub detail: String,
}
