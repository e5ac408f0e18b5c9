//! Human-readable results and trade-log export.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use signallab_core::engine::{SimulationResult, TradeEvent};

/// Results block printed after a run.
pub fn summary_text(result: &SimulationResult, initial_balance: f64) -> String {
    let pnl = result.final_balance - initial_balance;
    let pnl_pct = if initial_balance > 0.0 {
        pnl / initial_balance * 100.0
    } else {
        0.0
    };
    let win_rate = match result.win_rate() {
        Some(rate) => format!("{:.1}%", rate * 100.0),
        None => "n/a".to_string(),
    };
    let profit_factor = match result.profit_factor {
        Some(pf) if pf.is_infinite() => "inf".to_string(),
        Some(pf) => format!("{pf:.2}"),
        None => "n/a".to_string(),
    };

    format!(
        "=== Simulation Results ===\n\
Initial balance: {initial_balance:.2}\n\
Final balance:   {:.2}\n\
Net P&L:         {pnl:+.2} ({pnl_pct:+.2}%)\n\
Trades:          {} ({} winners)\n\
Win rate:        {win_rate}\n\
Gross profit:    {:.2}\n\
Gross loss:      {:.2}\n\
Profit factor:   {profit_factor}\n",
        result.final_balance,
        result.total_trades,
        result.win_trades,
        result.gross_profit,
        result.gross_loss,
    )
}

/// One CSV row per trade event. Open-only and close-only columns are left
/// empty on the other kind.
#[derive(Debug, Serialize)]
struct TradeLogRecord {
    event: &'static str,
    position: u64,
    side: String,
    step: usize,
    bar_index: usize,
    price: f64,
    quantity: u64,
    stop_price: Option<f64>,
    target_price: Option<f64>,
    regime: Option<String>,
    reason: Option<String>,
    gross_pnl: Option<f64>,
    commission: f64,
    net_profit: Option<f64>,
    balance: f64,
}

impl From<&TradeEvent> for TradeLogRecord {
    fn from(event: &TradeEvent) -> Self {
        match event {
            TradeEvent::Open {
                id,
                side,
                step,
                bar_index,
                price,
                quantity,
                stop_price,
                target_price,
                regime,
                commission,
                balance,
            } => Self {
                event: "open",
                position: id.0,
                side: side.to_string(),
                step: *step,
                bar_index: *bar_index,
                price: *price,
                quantity: *quantity,
                stop_price: Some(*stop_price),
                target_price: Some(*target_price),
                regime: Some(regime.to_string()),
                reason: None,
                gross_pnl: None,
                commission: *commission,
                net_profit: None,
                balance: *balance,
            },
            TradeEvent::Close {
                id,
                side,
                step,
                bar_index,
                price,
                quantity,
                reason,
                gross_pnl,
                commission,
                net_profit,
                balance,
            } => Self {
                event: "close",
                position: id.0,
                side: side.to_string(),
                step: *step,
                bar_index: *bar_index,
                price: *price,
                quantity: *quantity,
                stop_price: None,
                target_price: None,
                regime: None,
                reason: Some(reason.to_string()),
                gross_pnl: Some(*gross_pnl),
                commission: *commission,
                net_profit: Some(*net_profit),
                balance: *balance,
            },
        }
    }
}

/// Write the trade log as CSV with a header row.
pub fn write_trade_log_csv(path: &Path, events: &[TradeEvent]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create trade log CSV {}", path.display()))?;
    let mut wtr = csv::Writer::from_writer(file);
    for event in events {
        wtr.serialize(TradeLogRecord::from(event))
            .context("Failed to write trade log row")?;
    }
    wtr.flush()
        .with_context(|| format!("Failed to flush trade log CSV {}", path.display()))?;
    Ok(())
}
