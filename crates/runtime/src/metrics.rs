#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptPercentiles {
    pub count: usize,
    pub p50_attempts: u32,
    pub p90_attempts: u32,
    pub p95_attempts: u32,
    pub p99_attempts: u32,
    pub max_attempts: u32,
}

/// Distribution of reschedule attempts across the operations of a run.
#[derive(Debug, Default, Clone)]
pub struct RescheduleMetrics {
    attempts: Vec<u32>,
}

impl RescheduleMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_attempts(&mut self, attempts: u32) {
        self.attempts.push(attempts);
    }

    pub fn total_attempts(&self) -> u64 {
        self.attempts.iter().map(|&attempts| u64::from(attempts)).sum()
    }

    pub fn percentiles(&self) -> Option<AttemptPercentiles> {
        if self.attempts.is_empty() {
            return None;
        }

        let mut sorted = self.attempts.clone();
        sorted.sort_unstable();
        let count = sorted.len();

        Some(AttemptPercentiles {
            count,
            p50_attempts: percentile_nearest_rank(&sorted, 50),
            p90_attempts: percentile_nearest_rank(&sorted, 90),
            p95_attempts: percentile_nearest_rank(&sorted, 95),
            p99_attempts: percentile_nearest_rank(&sorted, 99),
            max_attempts: sorted[count - 1],
        })
    }
}

fn percentile_nearest_rank(sorted: &[u32], percentile: usize) -> u32 {
    let count = sorted.len();
    let rank = (percentile * count).div_ceil(100);
    sorted[rank.saturating_sub(1)]
}
