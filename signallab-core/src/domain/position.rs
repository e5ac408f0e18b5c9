use serde::{Deserialize, Serialize};
use std::fmt;

use super::ids::PositionId;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "LONG"),
            Side::Short => write!(f, "SHORT"),
        }
    }
}

/// A single open position with fixed protective levels.
///
/// Built once at entry and consumed at close; the engine holds at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: PositionId,
    pub side: Side,
    pub entry_price: f64,
    pub quantity: u64,
    pub stop_price: f64,
    pub target_price: f64,
    pub entry_step: usize,
}

impl Position {
    /// Gross P&L if closed at `exit_price` (no commission).
    pub fn gross_pnl(&self, exit_price: f64) -> f64 {
        self.side.sign() * self.quantity as f64 * (exit_price - self.entry_price)
    }

    /// Whether `price` has crossed the protective stop.
    pub fn stop_breached(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price <= self.stop_price,
            Side::Short => price >= self.stop_price,
        }
    }

    /// Whether `price` has reached the profit target.
    pub fn target_reached(&self, price: f64) -> bool {
        match self.side {
            Side::Long => price >= self.target_price,
            Side::Short => price <= self.target_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn long() -> Position {
        Position {
            id: PositionId(1),
            side: Side::Long,
            entry_price: 100.0,
            quantity: 10,
            stop_price: 95.0,
            target_price: 110.0,
            entry_step: 0,
        }
    }

    #[test]
    fn long_pnl_and_levels() {
        let pos = long();
        assert_eq!(pos.gross_pnl(105.0), 50.0);
        assert!(pos.stop_breached(95.0));
        assert!(!pos.stop_breached(95.01));
        assert!(pos.target_reached(110.0));
    }

    #[test]
    fn short_pnl_and_levels() {
        let pos = Position {
            side: Side::Short,
            stop_price: 105.0,
            target_price: 90.0,
            ..long()
        };
        assert_eq!(pos.gross_pnl(95.0), 50.0);
        assert!(pos.stop_breached(105.5));
        assert!(pos.target_reached(89.0));
        assert!(!pos.target_reached(91.0));
    }
}
