use serde::Serialize;
use std::fmt;

use super::regime::Regime;
use crate::domain::{PositionId, Side};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    EndOfSimulation,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::StopLoss => write!(f, "stop-loss"),
            ExitReason::TakeProfit => write!(f, "take-profit"),
            ExitReason::EndOfSimulation => write!(f, "end of simulation"),
        }
    }
}

/// One entry in the optional trade log.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TradeEvent {
    Open {
        id: PositionId,
        side: Side,
        step: usize,
        bar_index: usize,
        price: f64,
        quantity: u64,
        stop_price: f64,
        target_price: f64,
        regime: Regime,
        commission: f64,
        balance: f64,
    },
    Close {
        id: PositionId,
        side: Side,
        step: usize,
        bar_index: usize,
        price: f64,
        quantity: u64,
        reason: ExitReason,
        gross_pnl: f64,
        commission: f64,
        net_profit: f64,
        balance: f64,
    },
}

impl TradeEvent {
    pub fn id(&self) -> PositionId {
        match self {
            TradeEvent::Open { id, .. } | TradeEvent::Close { id, .. } => *id,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, TradeEvent::Open { .. })
    }
}

impl fmt::Display for TradeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeEvent::Open {
                id,
                side,
                step,
                price,
                quantity,
                stop_price,
                target_price,
                regime,
                ..
            } => write!(
                f,
                "OPEN {side} (pos {id}, step {step}, {regime}): {quantity} @ {price:.2} | TP: {target_price:.2} | SL: {stop_price:.2}"
            ),
            TradeEvent::Close {
                id,
                side,
                price,
                quantity,
                reason,
                net_profit,
                balance,
                ..
            } => write!(
                f,
                "CLOSE {side} (pos {id}, {reason}): {quantity} @ {price:.2} | net: {net_profit:.2} | balance: {balance:.2}"
            ),
        }
    }
}
