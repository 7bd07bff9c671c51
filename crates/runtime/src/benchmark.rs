pub fn calculate_ops_per_sec(planned_operations: u64, elapsed_nanos: u128) -> u64 {
    if elapsed_nanos == 0 {
        return 0;
    }

    let scaled_operations = (planned_operations as u128).saturating_mul(1_000_000_000);
    let achieved = scaled_operations / elapsed_nanos;
    u64::try_from(achieved).unwrap_or(u64::MAX)
}

pub fn meets_target_ops_per_sec(achieved_ops_per_sec: u64, target_ops_per_sec: u64) -> bool {
    achieved_ops_per_sec >= target_ops_per_sec
}
