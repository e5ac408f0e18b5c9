//! Backtest engine: walks the test partition bar by bar with at most one open
//! position, regime-dependent risk parameters and stop/target exits.
//!
//! Per step, in order:
//! 1. Skip if the close is not positive.
//! 2. In a position: exit at the stop price if breached, else at the target
//!    price if reached. An exit consumes the step.
//! 3. Flat: detect the regime, derive a signal from the prediction row, apply
//!    the ADX and trend-EMA filters, size the order and enter.
//!
//! An open position is force-closed at the last valid close.

pub mod backtest;
pub mod events;
pub mod regime;
pub mod sizing;
pub mod state;

pub use backtest::{BacktestEngine, EngineError, MarketView};
pub use events::{ExitReason, TradeEvent};
pub use regime::{detect_regime, BotParameters, Regime, RegimeTable};
pub use sizing::position_size;
pub use state::{EngineConfig, EngineState, PerformanceCounters, SimulationResult};
