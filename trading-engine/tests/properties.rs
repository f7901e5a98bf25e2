use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;

use trading_engine::indicators::calculate_rsi;
use trading_engine::{
    BacktestEngine, BacktestOutcome, EngineConfig, IndicatorTable, Ledger, PriceBar,
    Recommendation, SignalGenerator, SignalType, SizingPolicy,
};

fn bars(closes: &[f64]) -> Vec<PriceBar> {
    let start = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PriceBar::new(start + Duration::days(i as i64), c, c, c, c, 10_000.0))
        .collect()
}

fn signal_strategy() -> impl Strategy<Value = SignalType> {
    prop_oneof![
        Just(SignalType::Buy),
        Just(SignalType::Sell),
        Just(SignalType::Hold),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn rsi_stays_in_range(prices in prop::collection::vec(0.01f64..10_000.0, 2..150)) {
        for value in calculate_rsi(&prices, 14).into_iter().flatten() {
            prop_assert!((0.0..=100.0).contains(&value));
        }
    }

    #[test]
    fn indicators_are_deterministic(prices in prop::collection::vec(1.0f64..500.0, 1..120)) {
        let params = EngineConfig::default().indicators;
        let input = bars(&prices);
        let first = IndicatorTable::compute(&input, &params).unwrap();
        let second = IndicatorTable::compute(&input, &params).unwrap();
        prop_assert_eq!(first.rows(), second.rows());
    }

    #[test]
    fn buy_never_fires_on_consecutive_bars(prices in prop::collection::vec(50.0f64..150.0, 60..200)) {
        let config = EngineConfig::default();
        let table = IndicatorTable::compute(&bars(&prices), &config.indicators).unwrap();
        let generator = SignalGenerator::new(&config.signals);

        let signals: Vec<SignalType> = table
            .rows()
            .windows(2)
            .map(|w| generator.generate("P", &w[0], &w[1]).signal)
            .collect();
        for pair in signals.windows(2) {
            prop_assert!(!(pair[0] == SignalType::Buy && pair[1] == SignalType::Buy));
            prop_assert!(!(pair[0] == SignalType::Sell && pair[1] == SignalType::Sell));
        }
    }

    #[test]
    fn ledger_invariants_hold(
        ops in prop::collection::vec((0usize..4, signal_strategy(), 0.5f64..5_000.0), 1..60),
        capped in any::<bool>(),
    ) {
        let sizing = if capped {
            SizingPolicy::CappedFraction { cash_fraction: 0.1, max_trade_value: 10_000.0 }
        } else {
            SizingPolicy::AllCash
        };
        let mut ledger = Ledger::new(50_000.0, sizing);
        let as_of = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        for (symbol_idx, signal, price) in ops {
            let rec = Recommendation {
                symbol: format!("S{}", symbol_idx),
                signal,
                reference_price: price,
                target_price: None,
                stop_loss: None,
                reason: String::new(),
                as_of,
            };
            let before = ledger.clone();
            let outcome = ledger.apply(&rec, price);

            prop_assert!(ledger.cash() >= 0.0);
            prop_assert!(ledger.position_count() <= 4);
            if !outcome.is_executed() {
                prop_assert_eq!(&ledger, &before);
            }
        }

        let mut symbols: Vec<_> = ledger.positions().map(|p| p.symbol.clone()).collect();
        let count = symbols.len();
        symbols.dedup();
        prop_assert_eq!(symbols.len(), count);
    }

    #[test]
    fn rising_series_never_trades(
        steps in prop::collection::vec(0.01f64..5.0, 51..200),
        start in 1.0f64..1_000.0,
    ) {
        let mut price = start;
        let closes: Vec<f64> = steps
            .iter()
            .map(|s| {
                price += s;
                price
            })
            .collect();

        let engine = BacktestEngine::new(EngineConfig::default());
        match engine.run("UP", &bars(&closes)).unwrap() {
            BacktestOutcome::Completed(report) => {
                prop_assert_eq!(report.number_of_trades, 0);
                prop_assert_eq!(report.final_value, report.initial_capital);
            }
            other => prop_assert!(false, "unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn backtest_cash_and_drawdowns_are_consistent(prices in prop::collection::vec(20.0f64..200.0, 51..250)) {
        let engine = BacktestEngine::new(EngineConfig::default());
        if let BacktestOutcome::Completed(report) = engine.run("R", &bars(&prices)).unwrap() {
            for trade in &report.trade_log {
                prop_assert!(trade.cash_after >= 0.0);
            }
            prop_assert!(report.running_max_drawdown_pct <= report.max_drawdown_pct + 1e-9);
            prop_assert!(report.max_drawdown_pct >= 0.0 && report.max_drawdown_pct < 100.0);
            prop_assert_eq!(report.equity_curve.len(), prices.len() - 50);
        }
    }
}
