//! Backtest engine scenarios on synthetic series with known outcomes.
//!
//! Fixture: close = 100 + i, high/low = close +- 0.5, open = close - 1.
//! True range is a constant 1.5, so the short ATR is 1.5, the regime stays
//! LOW, +DM dominates every bar (ADX = 100) and the trend EMA lags below
//! price. With LOW parameters (stop 2 ATR, reward 1.5) the stop sits 3.0
//! below entry and the target 4.5 above.

use chrono::NaiveDate;
use ndarray::Array2;
use signallab_core::dataset::LabelPolicy;
use signallab_core::domain::{Bar, BarSeries, PositionId, Side};
use signallab_core::engine::*;
use signallab_core::indicators::{IndicatorConfig, IndicatorSet};

const START: usize = 10;

fn indicator_config() -> IndicatorConfig {
    IndicatorConfig {
        rsi_period: 3,
        atr_short_period: 3,
        atr_long_period: 5,
        adx_period: 3,
        trend_period: 5,
        macd_fast: 2,
        macd_slow: 4,
        macd_signal: 2,
        bollinger_period: 4,
        bollinger_multiplier: 2.0,
        stoch_k_period: 3,
        stoch_d_period: 2,
        regime_filter_period: 3,
    }
}

fn bars_from_closes(closes: &[f64]) -> BarSeries {
    let start = NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            Bar::new(
                start + chrono::Duration::hours(i as i64),
                c - 1.0,
                c + 0.5,
                c - 0.5,
                c,
                10_000.0,
            )
        })
        .collect();
    BarSeries::new(bars).unwrap()
}

fn rising(n: usize) -> BarSeries {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
    bars_from_closes(&closes)
}

fn strong_long(steps: usize) -> Array2<f64> {
    Array2::from_shape_fn((steps, 3), |(_, c)| [0.9, 0.05, 0.05][c])
}

fn engine(config: EngineConfig) -> BacktestEngine {
    BacktestEngine::new(config, RegimeTable::default(), LabelPolicy::default())
}

fn logging_config() -> EngineConfig {
    EngineConfig {
        record_events: true,
        ..EngineConfig::default()
    }
}

fn close_to(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn rising_series_closes_first_long_at_take_profit() {
    let bars = rising(40);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();

    let result = engine(logging_config()).run(&market, strong_long(8).view()).unwrap();
    let log = result.trade_log.clone().unwrap();

    let TradeEvent::Open {
        id,
        side,
        step,
        price: entry,
        quantity,
        stop_price,
        target_price,
        regime,
        commission: entry_commission,
        ..
    } = log[0].clone()
    else {
        panic!("first event must be an open, got {:?}", log[0]);
    };
    assert_eq!(id, PositionId(1));
    assert_eq!(side, Side::Long);
    assert_eq!(step, 0);
    assert_eq!(regime, Regime::Low);
    assert_eq!(entry, 110.0);
    assert!(close_to(stop_price, 107.0));
    assert!(close_to(target_price, 114.5));
    // risk allows 833, balance affords 454 -> rounded to lots of 10
    assert_eq!(quantity, 450);

    let TradeEvent::Close {
        step: exit_step,
        price: exit,
        reason,
        commission: exit_commission,
        balance,
        ..
    } = log[1].clone()
    else {
        panic!("second event must be a close, got {:?}", log[1]);
    };
    assert_eq!(exit_step, 5);
    assert_eq!(reason, ExitReason::TakeProfit);
    assert!(close_to(exit, target_price));

    let q = quantity as f64;
    assert!(close_to(entry_commission, q * entry * 0.0004));
    assert!(close_to(exit_commission, q * target_price * 0.0004));
    let expected_net = q * (target_price - entry) - entry_commission - exit_commission;
    assert!(close_to(balance - 50_000.0, expected_net));
    assert!(result.win_trades >= 1);
}

#[test]
fn stop_loss_exits_at_stop_price() {
    let mut closes: Vec<f64> = (0..=START).map(|i| 100.0 + i as f64).collect();
    closes.push(104.0);
    let bars = bars_from_closes(&closes);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();

    let result = engine(logging_config()).run(&market, strong_long(2).view()).unwrap();
    let log = result.trade_log.unwrap();
    assert_eq!(log.len(), 2);
    match &log[1] {
        TradeEvent::Close {
            price,
            reason,
            net_profit,
            quantity,
            ..
        } => {
            assert_eq!(*reason, ExitReason::StopLoss);
            assert!(close_to(*price, 107.0));
            let q = *quantity as f64;
            assert!(close_to(*net_profit, q * (107.0 - 110.0) - q * 107.0 * 0.0004));
        }
        other => panic!("expected close, got {other:?}"),
    }
    assert_eq!(result.total_trades, 1);
    assert_eq!(result.win_trades, 0);
    assert_eq!(result.profit_factor, Some(0.0));
}

#[test]
fn open_position_is_force_closed_at_last_price() {
    let bars = rising(40);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();

    let result = engine(logging_config()).run(&market, strong_long(3).view()).unwrap();
    let log = result.trade_log.unwrap();
    match log.last() {
        Some(TradeEvent::Close {
            reason, price, step, ..
        }) => {
            assert_eq!(*reason, ExitReason::EndOfSimulation);
            assert_eq!(*step, 2);
            assert_eq!(*price, 112.0);
        }
        other => panic!("expected forced close, got {other:?}"),
    }
    assert_eq!(result.total_trades, 1);
    assert_eq!(result.profit_factor, Some(f64::INFINITY));
}

#[test]
fn undersized_order_leaves_balance_untouched() {
    let bars = rising(40);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();
    let config = EngineConfig {
        initial_balance: 500.0,
        ..logging_config()
    };

    let result = engine(config).run(&market, strong_long(20).view()).unwrap();
    assert_eq!(result.total_trades, 0);
    assert_eq!(result.final_balance, 500.0);
    assert_eq!(result.trade_log, Some(vec![]));
    assert_eq!(result.profit_factor, None);
}

#[test]
fn undefined_trend_strength_blocks_entries() {
    let bars = rising(40);
    // ADX(20) is undefined until bar 39, past every simulated step
    let config = IndicatorConfig {
        adx_period: 20,
        ..indicator_config()
    };
    let set = IndicatorSet::compute(&bars, &config);
    let market = MarketView::new(&bars, &set, START).unwrap();
    let result = engine(EngineConfig::default()).run(&market, strong_long(20).view()).unwrap();
    assert_eq!(result.total_trades, 0);
}

#[test]
fn short_signal_against_rising_trend_is_filtered() {
    let bars = rising(40);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();
    let shorts = Array2::from_shape_fn((20, 3), |(_, c)| [0.05, 0.9, 0.05][c]);
    let result = engine(EngineConfig::default()).run(&market, shorts.view()).unwrap();
    assert_eq!(result.total_trades, 0);
}

#[test]
fn signal_below_regime_threshold_is_ignored() {
    let bars = rising(40);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();
    // LOW regime threshold is 0.6
    let weak = Array2::from_shape_fn((20, 3), |(_, c)| [0.55, 0.25, 0.2][c]);
    let result = engine(EngineConfig::default()).run(&market, weak.view()).unwrap();
    assert_eq!(result.total_trades, 0);
}

#[test]
fn runs_are_deterministic_and_reset() {
    let bars = rising(60);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();
    let predictions = strong_long(45);

    let mut first = engine(logging_config());
    let a = first.run(&market, predictions.view()).unwrap();
    let b = first.run(&market, predictions.view()).unwrap();
    let c = engine(logging_config()).run(&market, predictions.view()).unwrap();

    assert_eq!(a, b);
    assert_eq!(a, c);
    let log = b.trade_log.unwrap();
    assert_eq!(log[0].id(), PositionId(1));
    assert!(a.total_trades > 1);
}

#[test]
fn parallel_engines_do_not_interfere() {
    let bars = rising(60);
    let set = IndicatorSet::compute(&bars, &indicator_config());
    let market = MarketView::new(&bars, &set, START).unwrap();
    let predictions = strong_long(45);
    let sequential = engine(EngineConfig::default())
        .run(&market, predictions.view())
        .unwrap();

    let results: Vec<SimulationResult> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    engine(EngineConfig::default())
                        .run(&market, predictions.view())
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    for r in results {
        assert_eq!(r, sequential);
    }
}

#[test]
fn misaligned_indicators_are_rejected() {
    let bars = rising(40);
    let shorter = rising(30);
    let set = IndicatorSet::compute(&shorter, &indicator_config());
    assert!(matches!(
        MarketView::new(&bars, &set, START),
        Err(EngineError::MisalignedIndicators { indicators: 30, bars: 40 })
    ));
}
