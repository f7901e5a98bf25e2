//! Paper-trading ledger: cash, at most one long position per symbol, and the executed
//! trade history. Mutated only through [`Ledger::apply`].

pub mod shared;
pub mod store;

pub use shared::SharedLedger;
pub use store::{JsonFileStore, LedgerStore, MemoryStore};

use std::collections::{BTreeMap, HashMap};

use common::{
    HoldingValuation, Position, PriceSource, Recommendation, Result, SignalType,
    SizingParameters, TradeRecord, TradeSide, TradingError, Valuation,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// How much cash a BUY may spend
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingPolicy {
    /// min(cash * cash_fraction, max_trade_value)
    CappedFraction {
        cash_fraction: f64,
        max_trade_value: f64,
    },
    /// All available cash
    AllCash,
}

impl SizingPolicy {
    pub fn budget(&self, cash: f64) -> f64 {
        match *self {
            SizingPolicy::CappedFraction {
                cash_fraction,
                max_trade_value,
            } => (cash * cash_fraction).min(max_trade_value),
            SizingPolicy::AllCash => cash,
        }
    }
}

impl From<&SizingParameters> for SizingPolicy {
    fn from(params: &SizingParameters) -> Self {
        SizingPolicy::CappedFraction {
            cash_fraction: params.cash_fraction,
            max_trade_value: params.max_trade_value,
        }
    }
}

/// Why an apply call left the ledger unchanged
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum NoOpReason {
    Hold,
    NonPositivePrice { price: f64 },
    MissingPrice,
    PositionAlreadyOpen,
    NoOpenPosition,
    InsufficientFunds { budget: f64, price: f64 },
}

/// Result of applying one recommendation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Executed(TradeRecord),
    NoOp(NoOpReason),
}

impl ApplyOutcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, ApplyOutcome::Executed(_))
    }

    pub fn trade(&self) -> Option<&TradeRecord> {
        match self {
            ApplyOutcome::Executed(trade) => Some(trade),
            ApplyOutcome::NoOp(_) => None,
        }
    }
}

/// Persisted position: the symbol is the map key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionState {
    pub quantity: u64,
    pub average_cost: f64,
}

/// Storage-agnostic ledger schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub cash: f64,
    pub positions: BTreeMap<String, PositionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_cash: Option<f64>,
    #[serde(default)]
    pub trade_history: Vec<TradeRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    initial_cash: f64,
    cash: f64,
    positions: BTreeMap<String, Position>,
    trade_history: Vec<TradeRecord>,
    sizing: SizingPolicy,
}

impl Ledger {
    pub fn new(initial_cash: f64, sizing: SizingPolicy) -> Self {
        Self {
            initial_cash,
            cash: initial_cash,
            positions: BTreeMap::new(),
            trade_history: Vec::new(),
            sizing,
        }
    }

    /// Rebuild a ledger from persisted state, rejecting snapshots that break invariants
    pub fn from_snapshot(snapshot: LedgerSnapshot, sizing: SizingPolicy) -> Result<Self> {
        if !snapshot.cash.is_finite() || snapshot.cash < 0.0 {
            return Err(TradingError::StoreError(format!(
                "invalid cash balance {}",
                snapshot.cash
            )));
        }

        let mut positions = BTreeMap::new();
        for (symbol, state) in snapshot.positions {
            if state.quantity == 0 || !(state.average_cost > 0.0) {
                return Err(TradingError::StoreError(format!(
                    "invalid position for {}: quantity {}, average cost {}",
                    symbol, state.quantity, state.average_cost
                )));
            }
            positions.insert(
                symbol.clone(),
                Position {
                    symbol,
                    quantity: state.quantity,
                    average_cost: state.average_cost,
                },
            );
        }

        Ok(Self {
            initial_cash: snapshot.initial_cash.unwrap_or(snapshot.cash),
            cash: snapshot.cash,
            positions,
            trade_history: snapshot.trade_history,
            sizing,
        })
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        LedgerSnapshot {
            cash: self.cash,
            positions: self
                .positions
                .iter()
                .map(|(symbol, p)| {
                    (
                        symbol.clone(),
                        PositionState {
                            quantity: p.quantity,
                            average_cost: p.average_cost,
                        },
                    )
                })
                .collect(),
            initial_cash: Some(self.initial_cash),
            trade_history: self.trade_history.clone(),
        }
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn sizing(&self) -> SizingPolicy {
        self.sizing
    }

    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn has_position(&self, symbol: &str) -> bool {
        self.positions.contains_key(symbol)
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trade_history
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trade_history.iter().filter_map(|t| t.realized_pnl).sum()
    }

    /// Apply a recommendation at `execution_price`.
    ///
    /// Constraint violations are reported as [`ApplyOutcome::NoOp`] and leave the ledger
    /// untouched, so a batch keeps going past them.
    pub fn apply(&mut self, recommendation: &Recommendation, execution_price: f64) -> ApplyOutcome {
        let symbol = recommendation.symbol.as_str();
        let outcome = match recommendation.signal {
            SignalType::Hold => ApplyOutcome::NoOp(NoOpReason::Hold),
            _ if !execution_price.is_finite() || execution_price <= 0.0 => {
                ApplyOutcome::NoOp(NoOpReason::NonPositivePrice {
                    price: execution_price,
                })
            }
            SignalType::Buy => self.buy(recommendation, execution_price),
            SignalType::Sell => self.sell(recommendation, execution_price),
        };

        match &outcome {
            ApplyOutcome::Executed(trade) => info!(
                symbol,
                side = ?trade.side,
                quantity = trade.quantity,
                price = trade.price,
                pnl = ?trade.realized_pnl,
                cash = self.cash,
                "paper trade executed"
            ),
            ApplyOutcome::NoOp(reason) => debug!(
                symbol,
                signal = %recommendation.signal,
                ?reason,
                "recommendation not executed"
            ),
        }
        outcome
    }

    fn buy(&mut self, recommendation: &Recommendation, price: f64) -> ApplyOutcome {
        let symbol = &recommendation.symbol;
        if self.positions.contains_key(symbol) {
            return ApplyOutcome::NoOp(NoOpReason::PositionAlreadyOpen);
        }

        let budget = self.sizing.budget(self.cash).min(self.cash);
        let mut quantity = (budget / price).floor() as u64;
        // floor(budget / price) * price can round a hair above the budget
        if quantity > 0 && quantity as f64 * price > self.cash {
            quantity -= 1;
        }
        if quantity == 0 {
            return ApplyOutcome::NoOp(NoOpReason::InsufficientFunds { budget, price });
        }

        let cost = quantity as f64 * price;
        self.cash -= cost;
        self.positions.insert(
            symbol.clone(),
            Position {
                symbol: symbol.clone(),
                quantity,
                average_cost: price,
            },
        );

        let trade = TradeRecord {
            as_of: recommendation.as_of,
            symbol: symbol.clone(),
            side: TradeSide::Buy,
            quantity,
            price,
            value: cost,
            realized_pnl: None,
            realized_pnl_pct: None,
            cash_after: self.cash,
            reason: recommendation.reason.clone(),
        };
        self.trade_history.push(trade.clone());
        ApplyOutcome::Executed(trade)
    }

    fn sell(&mut self, recommendation: &Recommendation, price: f64) -> ApplyOutcome {
        let Some(position) = self.positions.remove(&recommendation.symbol) else {
            return ApplyOutcome::NoOp(NoOpReason::NoOpenPosition);
        };

        let proceeds = position.quantity as f64 * price;
        let pnl = (price - position.average_cost) * position.quantity as f64;
        let cost_basis = position.cost_basis();
        self.cash += proceeds;

        let trade = TradeRecord {
            as_of: recommendation.as_of,
            symbol: position.symbol,
            side: TradeSide::Sell,
            quantity: position.quantity,
            price,
            value: proceeds,
            realized_pnl: Some(pnl),
            realized_pnl_pct: Some(if cost_basis > 0.0 {
                (pnl / cost_basis) * 100.0
            } else {
                0.0
            }),
            cash_after: self.cash,
            reason: recommendation.reason.clone(),
        };
        self.trade_history.push(trade.clone());
        ApplyOutcome::Executed(trade)
    }

    /// Mark-to-market valuation.
    ///
    /// Holdings without a usable price in `prices` are marked at their average cost and
    /// flagged via [`PriceSource::AverageCost`] and [`Valuation::stale`].
    pub fn valuation(&self, prices: &HashMap<String, f64>) -> Valuation {
        let holdings: Vec<HoldingValuation> = self
            .positions
            .values()
            .map(|pos| {
                let live = prices
                    .get(&pos.symbol)
                    .copied()
                    .filter(|p| p.is_finite() && *p > 0.0);
                let (mark_price, price_source) = match live {
                    Some(price) => (price, PriceSource::Live),
                    None => (pos.average_cost, PriceSource::AverageCost),
                };
                HoldingValuation {
                    symbol: pos.symbol.clone(),
                    quantity: pos.quantity,
                    average_cost: pos.average_cost,
                    mark_price,
                    price_source,
                    market_value: pos.market_value(mark_price),
                    unrealized_pnl: pos.unrealized_pnl(mark_price),
                    unrealized_pnl_pct: pos.unrealized_pnl_pct(mark_price),
                }
            })
            .collect();

        let holdings_value: f64 = holdings.iter().map(|h| h.market_value).sum();
        let total_value = self.cash + holdings_value;
        let total_pnl = total_value - self.initial_cash;

        Valuation {
            cash: self.cash,
            holdings_value,
            total_value,
            initial_cash: self.initial_cash,
            total_pnl,
            total_pnl_pct: if self.initial_cash > 0.0 {
                (total_pnl / self.initial_cash) * 100.0
            } else {
                0.0
            },
            realized_pnl: self.realized_pnl(),
            stale: holdings
                .iter()
                .any(|h| h.price_source == PriceSource::AverageCost),
            holdings,
        }
    }

    /// Cash plus the value of one symbol's position at `price`
    pub(crate) fn value_at(&self, symbol: &str, price: f64) -> f64 {
        self.cash
            + self
                .positions
                .get(symbol)
                .map(|p| p.market_value(price))
                .unwrap_or(0.0)
    }
}
