pub mod benchmark;
pub mod engine;
pub mod events;
pub mod logging;
pub mod metrics;
pub mod replay;

/// Planning throughput floor used by the criterion benches.
pub const TARGET_OPS_PER_SEC: u64 = 50_000;

pub fn module_ready() -> bool {
    true
}
