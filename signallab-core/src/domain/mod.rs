//! Domain types for SignalLab

pub mod bar;
pub mod ids;
pub mod position;

pub use bar::{Bar, BarError, BarSeries};
pub use ids::{PositionId, PositionIdGen};
pub use position::{Position, Side};
