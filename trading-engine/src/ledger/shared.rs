use std::collections::HashMap;
use std::sync::Arc;

use common::{Recommendation, Result, Valuation};
use parking_lot::Mutex;
use tracing::{error, info};

use super::{ApplyOutcome, Ledger, LedgerSnapshot, LedgerStore, NoOpReason, SizingPolicy};

/// Thread-safe handle to a single ledger.
///
/// Every apply runs its read-modify-write under one lock, so concurrent callers never
/// interleave inside a trade. When a store is attached the ledger is saved after each
/// executed trade, before the lock is released.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
    store: Option<Arc<dyn LedgerStore>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
            store: None,
        }
    }

    /// Load from `store`, or start a fresh ledger with `initial_cash` if nothing is saved
    pub fn open(
        store: Arc<dyn LedgerStore>,
        initial_cash: f64,
        sizing: SizingPolicy,
    ) -> Result<Self> {
        let ledger = match store.load()? {
            Some(snapshot) => Ledger::from_snapshot(snapshot, sizing)?,
            None => {
                info!(initial_cash, "starting fresh ledger");
                Ledger::new(initial_cash, sizing)
            }
        };
        Ok(Self {
            inner: Arc::new(Mutex::new(ledger)),
            store: Some(store),
        })
    }

    /// Apply one recommendation and persist the result.
    ///
    /// If the save fails the in-memory ledger is rolled back, so memory and disk agree.
    pub fn apply(&self, recommendation: &Recommendation, execution_price: f64) -> Result<ApplyOutcome> {
        let mut ledger = self.inner.lock();
        let Some(store) = &self.store else {
            return Ok(ledger.apply(recommendation, execution_price));
        };

        let before = ledger.clone();
        let outcome = ledger.apply(recommendation, execution_price);
        if outcome.is_executed() {
            if let Err(e) = store.save(&ledger.snapshot()) {
                error!(symbol = %recommendation.symbol, error = %e, "failed to persist ledger, trade rolled back");
                *ledger = before;
                return Err(e);
            }
        }
        Ok(outcome)
    }

    /// Apply recommendations in order, each at its symbol's price in `prices`.
    ///
    /// A symbol with no price becomes [`NoOpReason::MissingPrice`] and the batch continues.
    pub fn apply_batch(
        &self,
        recommendations: &[Recommendation],
        prices: &HashMap<String, f64>,
    ) -> Result<Vec<(String, ApplyOutcome)>> {
        let mut outcomes = Vec::with_capacity(recommendations.len());
        for rec in recommendations {
            let outcome = match prices.get(&rec.symbol) {
                Some(&price) => self.apply(rec, price)?,
                None => ApplyOutcome::NoOp(NoOpReason::MissingPrice),
            };
            outcomes.push((rec.symbol.clone(), outcome));
        }
        Ok(outcomes)
    }

    pub fn valuation(&self, prices: &HashMap<String, f64>) -> Valuation {
        self.inner.lock().valuation(prices)
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        self.inner.lock().snapshot()
    }

    /// Run `f` against the ledger while holding the lock
    pub fn read<R>(&self, f: impl FnOnce(&Ledger) -> R) -> R {
        f(&self.inner.lock())
    }

    /// Persist the current state, if a store is attached
    pub fn save(&self) -> Result<()> {
        match &self.store {
            Some(store) => store.save(&self.inner.lock().snapshot()),
            None => Ok(()),
        }
    }
}
