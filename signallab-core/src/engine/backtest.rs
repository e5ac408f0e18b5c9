//! The per-run state machine: FLAT -> IN_POSITION on a filtered signal,
//! IN_POSITION -> FLAT on stop, target or end of simulation.

use ndarray::{ArrayView2, ArrayView3};
use thiserror::Error;
use tracing::{debug, info};

use super::events::{ExitReason, TradeEvent};
use super::regime::{detect_regime, Regime, RegimeTable};
use super::sizing::position_size;
use super::state::{EngineConfig, EngineState, SimulationResult};
use crate::dataset::LabelPolicy;
use crate::domain::{BarSeries, Position, Side};
use crate::indicators::IndicatorSet;
use crate::predictor::{predict_in_batches, PredictError, Predictor};

/// Stop distances at or below this are treated as no stop.
pub const MIN_STOP_DISTANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("indicator set covers {indicators} bars, series has {bars}")]
    MisalignedIndicators { indicators: usize, bars: usize },

    #[error("prediction rows have width {actual}, label policy needs {expected}")]
    PredictionWidth { expected: usize, actual: usize },

    #[error(transparent)]
    Predict(#[from] PredictError),
}

/// Bars and indicators seen by a run. Simulation step `s` is bar
/// `test_start_index + s`.
#[derive(Debug, Clone, Copy)]
pub struct MarketView<'a> {
    pub bars: &'a BarSeries,
    pub indicators: &'a IndicatorSet,
    pub test_start_index: usize,
}

impl<'a> MarketView<'a> {
    pub fn new(
        bars: &'a BarSeries,
        indicators: &'a IndicatorSet,
        test_start_index: usize,
    ) -> Result<Self, EngineError> {
        if indicators.len() != bars.len() {
            return Err(EngineError::MisalignedIndicators {
                indicators: indicators.len(),
                bars: bars.len(),
            });
        }
        Ok(Self {
            bars,
            indicators,
            test_start_index,
        })
    }

    /// Bar index of `step`, or `None` past the end of the series.
    pub fn bar_index(&self, step: usize) -> Option<usize> {
        let index = self.test_start_index.checked_add(step)?;
        (index < self.bars.len()).then_some(index)
    }
}

/// Single-position backtest engine. Each instance owns all of its mutable
/// state, so independent instances can run in parallel.
pub struct BacktestEngine {
    config: EngineConfig,
    regimes: RegimeTable,
    policy: LabelPolicy,
    state: EngineState,
}

impl BacktestEngine {
    pub fn new(config: EngineConfig, regimes: RegimeTable, policy: LabelPolicy) -> Self {
        let state = EngineState::new(config.initial_balance);
        Self {
            config,
            regimes,
            policy,
            state,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn regimes(&self) -> &RegimeTable {
        &self.regimes
    }

    /// Predict `features` with `predictor`, then [`run`](Self::run).
    pub fn run_with_predictor(
        &mut self,
        market: &MarketView<'_>,
        features: ArrayView3<f64>,
        predictor: &dyn Predictor,
        batch_size: usize,
    ) -> Result<SimulationResult, EngineError> {
        let predictions = predict_in_batches(predictor, features, batch_size)?;
        self.run(market, predictions.view())
    }

    /// Simulate one pass over `predictions`, one row per step.
    ///
    /// State is reset first, so repeated calls are independent.
    pub fn run(
        &mut self,
        market: &MarketView<'_>,
        predictions: ArrayView2<f64>,
    ) -> Result<SimulationResult, EngineError> {
        let expected = self.policy.num_outputs();
        if predictions.ncols() != expected {
            return Err(EngineError::PredictionWidth {
                expected,
                actual: predictions.ncols(),
            });
        }

        self.state = EngineState::new(self.config.initial_balance);

        for (step, prediction) in predictions.rows().into_iter().enumerate() {
            let Some(bar_index) = market.bar_index(step) else {
                debug!(step, "series exhausted before predictions");
                break;
            };
            let price = market.bars.bars()[bar_index].close;
            if !(price > 0.0) {
                continue;
            }
            self.state.last_valid = Some((step, bar_index, price));

            if !self.state.is_flat() {
                self.check_exits(step, bar_index, price);
                continue;
            }

            let regime = detect_regime(
                market.indicators,
                bar_index,
                self.config.regime_volatility_threshold,
            );
            let threshold = self.regimes.params(regime).signal_threshold;
            let Some(side) = self.policy.signal(prediction, threshold) else {
                continue;
            };
            if self.filters_pass(market.indicators, bar_index, price, side) {
                self.enter(market.indicators, step, bar_index, price, side, regime);
            }
        }

        if let (Some(_), Some((step, bar_index, price))) =
            (self.state.position.as_ref(), self.state.last_valid)
        {
            self.close(step, bar_index, price, ExitReason::EndOfSimulation);
        }

        Ok(self.result())
    }

    fn filters_pass(&self, indicators: &IndicatorSet, bar_index: usize, price: f64, side: Side) -> bool {
        let trending = indicators
            .adx
            .value(bar_index)
            .is_some_and(|adx| adx > self.config.adx_trend_threshold);
        if !trending {
            return false;
        }
        let Some(ema) = indicators.ema_trend.value(bar_index) else {
            return false;
        };
        match side {
            Side::Long => price > ema,
            Side::Short => self.config.allow_short && price < ema,
        }
    }

    fn enter(
        &mut self,
        indicators: &IndicatorSet,
        step: usize,
        bar_index: usize,
        price: f64,
        side: Side,
        regime: Regime,
    ) {
        let params = *self.regimes.params(regime);
        let Some(atr) = indicators.atr_short.value(bar_index).filter(|a| *a > 0.0) else {
            return;
        };
        let stop_distance = atr * params.atr_stop_multiplier;
        if stop_distance <= MIN_STOP_DISTANCE {
            return;
        }
        let target_distance = stop_distance * params.risk_reward_ratio;
        let (stop_price, target_price) = match side {
            Side::Long => (price - stop_distance, price + target_distance),
            Side::Short => (price + stop_distance, price - target_distance),
        };

        let Some(quantity) = position_size(
            self.state.balance,
            price,
            stop_price,
            params.risk_percent,
            self.config.commission_rate,
            self.config.lot_size,
            self.config.min_lot,
        ) else {
            return;
        };

        let commission = quantity as f64 * price * self.config.commission_rate;
        self.state.balance -= commission;
        let position = Position {
            id: self.state.ids.next_id(),
            side,
            entry_price: price,
            quantity,
            stop_price,
            target_price,
            entry_step: step,
        };
        self.emit(TradeEvent::Open {
            id: position.id,
            side,
            step,
            bar_index,
            price,
            quantity,
            stop_price,
            target_price,
            regime,
            commission,
            balance: self.state.balance,
        });
        self.state.position = Some(position);
    }

    /// Stop first, then target.
    fn check_exits(&mut self, step: usize, bar_index: usize, price: f64) {
        let Some(position) = self.state.position.as_ref() else {
            return;
        };
        let exit = if position.stop_breached(price) {
            Some((position.stop_price, ExitReason::StopLoss))
        } else if position.target_reached(price) {
            Some((position.target_price, ExitReason::TakeProfit))
        } else {
            None
        };
        if let Some((exit_price, reason)) = exit {
            self.close(step, bar_index, exit_price, reason);
        }
    }

    fn close(&mut self, step: usize, bar_index: usize, price: f64, reason: ExitReason) {
        let Some(position) = self.state.position.take() else {
            return;
        };
        let gross_pnl = position.gross_pnl(price);
        let commission = position.quantity as f64 * price * self.config.commission_rate;
        let net_profit = gross_pnl - commission;
        self.state.balance += net_profit;
        self.state.counters.record(net_profit);
        self.emit(TradeEvent::Close {
            id: position.id,
            side: position.side,
            step,
            bar_index,
            price,
            quantity: position.quantity,
            reason,
            gross_pnl,
            commission,
            net_profit,
            balance: self.state.balance,
        });
    }

    fn emit(&mut self, event: TradeEvent) {
        if self.config.record_events {
            info!("{event}");
            self.state.events.push(event);
        } else {
            debug!("{event}");
        }
    }

    fn result(&self) -> SimulationResult {
        let counters = self.state.counters;
        SimulationResult {
            initial_balance: self.config.initial_balance,
            final_balance: self.state.balance,
            profit_factor: counters.profit_factor(),
            total_trades: counters.total_trades,
            win_trades: counters.win_trades,
            gross_profit: counters.gross_profit,
            gross_loss: counters.gross_loss,
            trade_log: self.config.record_events.then(|| self.state.events.clone()),
        }
    }
}
