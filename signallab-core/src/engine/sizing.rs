/// Order quantity for an entry at `entry` with protective stop `stop`.
///
/// The smaller of the risk-budget quantity and the affordable quantity,
/// rounded down to a multiple of `lot_size`. `None` when the result falls
/// below `min_lot` or the inputs are degenerate.
pub fn position_size(
    balance: f64,
    entry: f64,
    stop: f64,
    risk_percent: f64,
    commission_rate: f64,
    lot_size: u64,
    min_lot: u64,
) -> Option<u64> {
    let risk_per_unit = (entry - stop).abs();
    if !(balance > 0.0 && entry > 0.0 && risk_per_unit > 0.0) || lot_size == 0 {
        return None;
    }

    let by_risk = (balance * risk_percent / risk_per_unit).floor();
    let by_balance = (balance / (entry * (1.0 + commission_rate))).floor();
    let desired = by_risk.min(by_balance);
    if !desired.is_finite() || desired < 0.0 {
        return None;
    }

    let quantity = (desired as u64 / lot_size) * lot_size;
    (quantity >= min_lot && quantity > 0).then_some(quantity)
}
