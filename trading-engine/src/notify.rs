use common::{BacktestReport, Recommendation, Result};
use tracing::info;

/// Outbound sink for trade alerts and backtest summaries.
///
/// Implementations receive plain records; rendering is their concern.
pub trait Notifier: Send + Sync {
    fn recommendation(&self, recommendation: &Recommendation) -> Result<()>;

    fn backtest_report(&self, report: &BacktestReport) -> Result<()>;
}

/// Forward every actionable recommendation to `notifier`. HOLD is never sent.
///
/// Returns how many were sent.
pub fn dispatch<'a, N, I>(notifier: &N, recommendations: I) -> Result<usize>
where
    N: Notifier + ?Sized,
    I: IntoIterator<Item = &'a Recommendation>,
{
    let mut sent = 0;
    for rec in recommendations.into_iter().filter(|r| r.is_actionable()) {
        notifier.recommendation(rec)?;
        sent += 1;
    }
    Ok(sent)
}

/// Writes notifications to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn recommendation(&self, rec: &Recommendation) -> Result<()> {
        info!(
            target: "notify",
            symbol = %rec.symbol,
            signal = %rec.signal,
            price = rec.reference_price,
            target_price = ?rec.target_price,
            stop_loss = ?rec.stop_loss,
            reason = %rec.reason,
            "trade alert"
        );
        Ok(())
    }

    fn backtest_report(&self, report: &BacktestReport) -> Result<()> {
        info!(
            target: "notify",
            symbol = %report.symbol,
            start = %report.start_date,
            end = %report.end_date,
            final_value = report.final_value,
            total_return_pct = report.total_return_pct,
            max_drawdown_pct = report.max_drawdown_pct,
            trades = report.number_of_trades,
            "backtest summary"
        );
        Ok(())
    }
}
