mod obs;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};

use trading_engine::{
    dispatch, generate_synthetic_bars, load_dir, load_file, ApplyOutcome, BacktestEngine,
    BacktestOutcome, BacktestReport, EngineConfig, JsonFileStore, Notifier, PriceBar, PriceSource,
    Scanner, SharedLedger, SizingPolicy, TracingNotifier, Valuation,
};

#[derive(Parser, Debug)]
#[command(name = "trading-engine")]
#[command(version = "0.1.0")]
#[command(about = "SMA crossover signals, paper-trading ledger and backtests", long_about = None)]
struct Cli {
    /// TOML config file. Missing sections use defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overridden by TRADING_LOG
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay historical bars through the signal rules
    Backtest(BacktestArgs),
    /// Evaluate the latest signal for every symbol in a data directory
    Scan(ScanArgs),
    /// Show the paper-trading ledger
    Portfolio(PortfolioArgs),
}

#[derive(Args, Debug)]
struct BacktestArgs {
    /// Data file path (CSV/JSON). Uses synthetic data if neither this nor --data-dir is set.
    #[arg(short = 'f', long, conflicts_with = "data_dir")]
    data_file: Option<PathBuf>,

    /// Backtest every CSV/JSON file in a directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Symbol label for --data-file or synthetic data
    #[arg(short, long, default_value = "SYNTH")]
    symbol: String,

    /// Initial capital (overrides config)
    #[arg(short, long)]
    capital: Option<f64>,

    /// Number of synthetic bars
    #[arg(short, long, default_value = "365")]
    days: usize,

    /// Initial price for synthetic data
    #[arg(long, default_value = "100.0")]
    initial_price: f64,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    /// Pretty print JSON output
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct ScanArgs {
    /// Directory of per-symbol CSV/JSON files
    #[arg(long)]
    data_dir: PathBuf,

    /// Apply actionable recommendations to the paper ledger at the latest close
    #[arg(long)]
    execute: bool,

    /// Ledger file (overrides config)
    #[arg(long)]
    ledger: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct PortfolioArgs {
    /// Ledger file (overrides config)
    #[arg(long)]
    ledger: Option<PathBuf>,

    /// Mark holdings at the latest closes found in this directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,

    #[arg(long)]
    pretty: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    obs::init_tracing(&cli.log_level, &cli.log_format).map_err(anyhow::Error::msg)?;

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Command::Backtest(args) => run_backtest(config, args),
        Command::Scan(args) => run_scan(config, args),
        Command::Portfolio(args) => run_portfolio(config, args),
    }
}

fn run_backtest(mut config: EngineConfig, args: BacktestArgs) -> Result<()> {
    if let Some(capital) = args.capital {
        config = config.with_capital(capital);
    }
    config.validate()?;

    let series: Vec<(String, Vec<PriceBar>)> = if let Some(dir) = &args.data_dir {
        let mut series = Vec::new();
        for (symbol, loaded) in load_dir(dir)? {
            match loaded {
                Ok(bars) => series.push((symbol, bars)),
                Err(e) => warn!(symbol = %symbol, error = %e, "skipping unreadable data file"),
            }
        }
        series
    } else if let Some(path) = &args.data_file {
        info!(path = %path.display(), "loading data");
        vec![(args.symbol.clone(), load_file(path)?)]
    } else {
        info!(days = args.days, initial_price = args.initial_price, "generating synthetic data");
        vec![(
            args.symbol.clone(),
            generate_synthetic_bars(args.days, args.initial_price),
        )]
    };
    if series.is_empty() {
        bail!("no price data to backtest");
    }

    let display = config.backtest.trade_log_display;
    let engine = BacktestEngine::new(config);
    let notifier = TracingNotifier;

    let mut reports = Vec::new();
    for (symbol, outcome) in engine.run_many(&series) {
        match outcome {
            Ok(BacktestOutcome::Completed(report)) => {
                notifier.backtest_report(&report)?;
                reports.push(report);
            }
            Ok(BacktestOutcome::InsufficientData { required, actual }) => {
                warn!(symbol = %symbol, required, actual, "insufficient data for backtest");
            }
            Err(e) => warn!(symbol = %symbol, error = %e, "backtest failed"),
        }
    }

    match args.output {
        OutputFormat::Json => print_json(&reports, args.pretty)?,
        OutputFormat::Text => {
            for report in &reports {
                print_backtest_report(report, display);
            }
        }
    }
    Ok(())
}

fn run_scan(mut config: EngineConfig, args: ScanArgs) -> Result<()> {
    if let Some(path) = &args.ledger {
        config = config.with_ledger_path(path);
    }
    config.validate()?;

    let scanner = Scanner::new(&config);
    let mut universe = Vec::new();
    let mut load_failures = Vec::new();
    for (symbol, loaded) in load_dir(&args.data_dir)? {
        match loaded {
            Ok(bars) => universe.push((symbol, bars)),
            Err(e) => load_failures.push((symbol, e)),
        }
    }

    let mut report = scanner.scan(&universe);
    for (symbol, e) in &load_failures {
        report.push_failure(symbol.as_str(), e);
    }

    let sent = dispatch(&TracingNotifier, &report.recommendations)?;
    info!(
        evaluated = report.snapshots.len(),
        failed = report.failures.len(),
        alerts = sent,
        "scan complete"
    );

    let mut executions = Vec::new();
    if args.execute {
        let ledger = open_ledger(&config)?;
        let actionable: Vec<_> = report.actionable().cloned().collect();
        executions = ledger.apply_batch(&actionable, &report.latest_prices())?;
    }

    match args.output {
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ScanOutput<'a> {
                scan: &'a trading_engine::ScanReport,
                executions: &'a [(String, ApplyOutcome)],
            }
            print_json(
                &ScanOutput {
                    scan: &report,
                    executions: &executions,
                },
                args.pretty,
            )?;
        }
        OutputFormat::Text => {
            println!();
            println!("  {:<10} {:>12} {:>9} {:>6} {:>12}", "SYMBOL", "CLOSE", "CHG %", "SIGNAL", "TARGET");
            println!("----------------------------------------------------------------");
            for s in &report.snapshots {
                println!(
                    "  {:<10} {:>12.2} {:>9} {:>6} {:>12}",
                    s.symbol,
                    s.close,
                    s.percent_change
                        .map(|c| format!("{:+.2}", c))
                        .unwrap_or_else(|| "-".to_string()),
                    s.signal,
                    s.target
                        .map(|t| format!("{:.2}", t))
                        .unwrap_or_else(|| "-".to_string()),
                );
            }
            for f in &report.failures {
                println!("  {:<10} could not evaluate: {}", f.symbol, f.error);
            }
            if !executions.is_empty() {
                println!();
                println!("  EXECUTIONS");
                println!("----------------------------------------------------------------");
                for (symbol, outcome) in &executions {
                    match outcome {
                        ApplyOutcome::Executed(t) => println!(
                            "  {:<10} {:?} {} @ {:.2} (cash after {:.2})",
                            symbol, t.side, t.quantity, t.price, t.cash_after
                        ),
                        ApplyOutcome::NoOp(reason) => {
                            println!("  {:<10} skipped: {:?}", symbol, reason)
                        }
                    }
                }
            }
            println!();
        }
    }
    Ok(())
}

fn run_portfolio(mut config: EngineConfig, args: PortfolioArgs) -> Result<()> {
    if let Some(path) = &args.ledger {
        config = config.with_ledger_path(path);
    }
    config.validate()?;

    let ledger = open_ledger(&config)?;
    let prices = match &args.data_dir {
        Some(dir) => latest_closes(dir)?,
        None => HashMap::new(),
    };
    let valuation = ledger.valuation(&prices);

    match args.output {
        OutputFormat::Json => print_json(&valuation, args.pretty)?,
        OutputFormat::Text => print_valuation(&valuation),
    }
    Ok(())
}

fn open_ledger(config: &EngineConfig) -> Result<SharedLedger> {
    let store = Arc::new(JsonFileStore::new(&config.ledger.path));
    SharedLedger::open(
        store,
        config.ledger.initial_cash,
        SizingPolicy::from(&config.sizing),
    )
    .with_context(|| format!("opening ledger {}", config.ledger.path.display()))
}

fn latest_closes(dir: &Path) -> Result<HashMap<String, f64>> {
    let mut prices = HashMap::new();
    for (symbol, loaded) in load_dir(dir)? {
        match loaded {
            Ok(bars) => {
                if let Some(bar) = bars.last() {
                    prices.insert(symbol, bar.close);
                }
            }
            Err(e) => warn!(symbol = %symbol, error = %e, "no price for symbol"),
        }
    }
    Ok(prices)
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", json);
    Ok(())
}

fn print_backtest_report(report: &BacktestReport, display: usize) {
    println!();
    println!("================================================================");
    println!("  BACKTEST REPORT - {} (SMA crossover)", report.symbol);
    println!("================================================================");
    println!();
    println!("  Period: {} to {}", report.start_date, report.end_date);
    println!("  Duration: {} bars", report.equity_curve.len());
    println!("  Execution Time: {}ms", report.execution_time_ms);
    println!();
    println!("----------------------------------------------------------------");
    println!("  CAPITAL");
    println!("----------------------------------------------------------------");
    println!("  Initial Capital:  ${:>12.2}", report.initial_capital);
    println!("  Final Value:      ${:>12.2}", report.final_value);
    println!("  Total Return:     {:>12.2}%", report.total_return_pct);
    println!();
    println!("----------------------------------------------------------------");
    println!("  RISK");
    println!("----------------------------------------------------------------");
    println!("  Drawdown (simplified, max-min):  {:>8.2}%", report.max_drawdown_pct);
    println!("  Drawdown (running peak):         {:>8.2}%", report.running_max_drawdown_pct);
    println!();
    println!("  Total Trades:     {:>12}", report.number_of_trades);
    println!("================================================================");

    let sample = report.trade_log_sample(display);
    if !sample.is_empty() {
        println!();
        if sample.len() < report.trade_log.len() {
            println!(
                "  TRADES (first and last {} of {})",
                display / 2,
                report.trade_log.len()
            );
        } else {
            println!("  TRADES");
        }
        println!("----------------------------------------------------------------");
        for trade in sample {
            let pnl = trade
                .realized_pnl
                .map(|p| format!(" | P&L: ${:+.2}", p))
                .unwrap_or_default();
            println!(
                "  {} {:?} {} @ ${:.2}{}",
                trade.as_of.format("%Y-%m-%d"),
                trade.side,
                trade.quantity,
                trade.price,
                pnl
            );
        }
        println!();
    }
}

fn print_valuation(valuation: &Valuation) {
    println!();
    println!("================================================================");
    println!("  PAPER PORTFOLIO");
    println!("================================================================");
    println!("  Cash:             ${:>12.2}", valuation.cash);
    println!("  Holdings:         ${:>12.2}", valuation.holdings_value);
    println!("  Total Value:      ${:>12.2}", valuation.total_value);
    println!("  Initial Cash:     ${:>12.2}", valuation.initial_cash);
    println!(
        "  Total P&L:        ${:>12.2} ({:+.2}%)",
        valuation.total_pnl, valuation.total_pnl_pct
    );
    println!("  Realized P&L:     ${:>12.2}", valuation.realized_pnl);

    if !valuation.holdings.is_empty() {
        println!("----------------------------------------------------------------");
        for h in &valuation.holdings {
            let marker = match h.price_source {
                PriceSource::Live => "",
                PriceSource::AverageCost => " (stale: no live price)",
            };
            println!(
                "  {:<10} {:>6} @ {:>10.2} -> {:>10.2} | P&L ${:+.2} ({:+.2}%){}",
                h.symbol,
                h.quantity,
                h.average_cost,
                h.mark_price,
                h.unrealized_pnl,
                h.unrealized_pnl_pct,
                marker
            );
        }
    }
    if valuation.stale {
        println!();
        println!("  Some holdings are valued at average cost.");
    }
    println!();
}
