#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStage {
    OperationStarted,
    ExtraSupplyApplied,
    PlanComputed,
    StateApplied,
    OperationSkipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEvent {
    pub operation: u64,
    pub stage: OperationStage,
}

impl RuntimeEvent {
    pub fn new(operation: u64, stage: OperationStage) -> Self {
        Self { operation, stage }
    }
}
