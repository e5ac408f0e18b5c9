//! Engine configuration, per-run mutable state and the run result.

use serde::{Deserialize, Serialize};

use super::events::TradeEvent;
use crate::domain::{Position, PositionIdGen};

/// Account and filter settings shared by every run of an engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub initial_balance: f64,
    /// Charged on entry and on exit notional.
    pub commission_rate: f64,
    /// Quantities are rounded down to a multiple of this.
    pub lot_size: u64,
    /// Orders below this quantity are not placed.
    pub min_lot: u64,
    pub allow_short: bool,
    /// Entries need ADX strictly above this.
    pub adx_trend_threshold: f64,
    /// Short ATR above this multiple of its mean selects the HIGH regime.
    pub regime_volatility_threshold: f64,
    /// Keep a trade log and log trades at info level.
    pub record_events: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_balance: 50_000.0,
            commission_rate: 0.0004,
            lot_size: 10,
            min_lot: 10,
            allow_short: true,
            adx_trend_threshold: 20.0,
            regime_volatility_threshold: 1.25,
            record_events: false,
        }
    }
}

/// Closed-trade statistics, updated only when a position closes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PerformanceCounters {
    pub total_trades: usize,
    pub win_trades: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
}

impl PerformanceCounters {
    pub fn record(&mut self, net_profit: f64) {
        self.total_trades += 1;
        if net_profit > 0.0 {
            self.win_trades += 1;
            self.gross_profit += net_profit;
        } else {
            self.gross_loss += net_profit.abs();
        }
    }

    /// `None` when nothing was won or lost; infinite when nothing was lost.
    pub fn profit_factor(&self) -> Option<f64> {
        if self.gross_loss > 0.0 {
            Some(self.gross_profit / self.gross_loss)
        } else if self.gross_profit > 0.0 {
            Some(f64::INFINITY)
        } else {
            None
        }
    }
}

/// Mutable state of one run. Owned by a single engine, rebuilt per run.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub balance: f64,
    pub position: Option<Position>,
    pub counters: PerformanceCounters,
    pub ids: PositionIdGen,
    pub events: Vec<TradeEvent>,
    /// Last positive close seen, as `(step, bar_index, price)`.
    pub last_valid: Option<(usize, usize, f64)>,
}

impl EngineState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            position: None,
            counters: PerformanceCounters::default(),
            ids: PositionIdGen::default(),
            events: Vec::new(),
            last_valid: None,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationResult {
    pub initial_balance: f64,
    pub final_balance: f64,
    /// `None` when no trade produced a profit or a loss.
    pub profit_factor: Option<f64>,
    pub total_trades: usize,
    pub win_trades: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub trade_log: Option<Vec<TradeEvent>>,
}

impl SimulationResult {
    /// Fraction of closed trades with positive net profit.
    pub fn win_rate(&self) -> Option<f64> {
        (self.total_trades > 0).then(|| self.win_trades as f64 / self.total_trades as f64)
    }

    pub fn net_profit(&self) -> f64 {
        self.final_balance - self.initial_balance
    }

    /// Net profit relative to the initial balance.
    pub fn net_return(&self) -> f64 {
        if self.initial_balance > 0.0 {
            self.net_profit() / self.initial_balance
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_split_wins_and_losses() {
        let mut c = PerformanceCounters::default();
        c.record(120.0);
        c.record(-40.0);
        c.record(0.0);
        assert_eq!(c.total_trades, 3);
        assert_eq!(c.win_trades, 1);
        assert_eq!(c.gross_profit, 120.0);
        assert_eq!(c.gross_loss, 40.0);
        assert_eq!(c.profit_factor(), Some(3.0));
    }

    #[test]
    fn profit_factor_edges() {
        let mut c = PerformanceCounters::default();
        assert_eq!(c.profit_factor(), None);
        c.record(10.0);
        assert_eq!(c.profit_factor(), Some(f64::INFINITY));
    }

    #[test]
    fn fresh_state_is_flat() {
        let mut state = EngineState::new(5_000.0);
        assert!(state.is_flat());
        assert_eq!(state.balance, 5_000.0);
        state.position = Some(Position {
            id: state.ids.next_id(),
            side: crate::domain::Side::Long,
            entry_price: 10.0,
            quantity: 10,
            stop_price: 9.0,
            target_price: 12.0,
            entry_step: 0,
        });
        assert!(!state.is_flat());
    }

    #[test]
    fn result_ratios() {
        let result = SimulationResult {
            initial_balance: 1000.0,
            final_balance: 1100.0,
            profit_factor: Some(2.0),
            total_trades: 4,
            win_trades: 3,
            gross_profit: 200.0,
            gross_loss: 100.0,
            trade_log: None,
        };
        assert_eq!(result.win_rate(), Some(0.75));
        assert!((result.net_return() - 0.1).abs() < 1e-12);
    }
}
