/// Fraction of gross profit redeposited while the run is heavily stagnated.
const STAGNATED_HIGH_FRACTION: f64 = 0.05;
/// Fraction while mildly stagnated (3 to 5 flat operations).
const STAGNATED_LOW_FRACTION: f64 = 0.10;
/// Fraction while still far from the supply target.
const AGGRESSIVE_FRACTION: f64 = 0.60;
/// Fraction at moderate distance from the target.
const MODERATE_FRACTION: f64 = 0.40;
/// Fraction close to the target.
const CONSERVATIVE_FRACTION: f64 = 0.20;

/// Picks the slice of an operation's gross profit to redeposit as supply.
///
/// Pure and total: finite non-negative inputs always yield a finite value in
/// `[0, gross_profit]`. Stagnation overrides the distance tiers so a stalled
/// run stops burying its profit back into the position.
pub fn reinvestment_amount(
    gross_profit: f64,
    distance_to_target: f64,
    supply_current: f64,
    operations_since_progress: u32,
) -> f64 {
    if gross_profit <= 0.0 {
        return 0.0;
    }

    let fraction = if operations_since_progress > 5 {
        STAGNATED_HIGH_FRACTION
    } else if operations_since_progress > 2 {
        STAGNATED_LOW_FRACTION
    } else if distance_to_target > supply_current * 0.5 {
        AGGRESSIVE_FRACTION
    } else if distance_to_target > supply_current * 0.2 {
        MODERATE_FRACTION
    } else {
        CONSERVATIVE_FRACTION
    };

    gross_profit * fraction
}
