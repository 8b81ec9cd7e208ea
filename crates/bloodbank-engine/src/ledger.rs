//! # Inventory Ledger
//!
//! Source of truth for stock levels: one non-negative unit count per
//! (bank, blood group).
//!
//! Every credit and debit on a key runs under that key's lock, so the
//! balance check and the write form one indivisible step with respect to
//! other operations in this process. The store's conditional delta guards
//! the same invariant across processes; if it refuses a write the ledger
//! re-reads the balance and reports the shortfall.
//!
//! Invariant: for every key, units debited never exceed units credited, so
//! the balance never goes below zero.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use bloodbank_core::{BankId, BloodBankError, BloodGroup, InventoryKey, Units, ValidationError};

use crate::lock::KeyedMutex;
use crate::store::InventoryStore;

/// Stock held by one bank for one blood group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    /// The bank holding the stock.
    pub bank_id: BankId,
    /// The blood group of the stock.
    pub blood_group: BloodGroup,
    /// Units currently available.
    pub units: u32,
    /// When the balance last changed.
    pub updated_at: DateTime<Utc>,
}

impl InventoryEntry {
    /// The composite key of this entry.
    pub fn key(&self) -> InventoryKey {
        InventoryKey::new(self.bank_id, self.blood_group)
    }
}

/// Optional constraints for an inventory query. Empty matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    /// Only entries held by this bank.
    pub bank_id: Option<BankId>,
    /// Only entries of this blood group.
    pub blood_group: Option<BloodGroup>,
}

impl InventoryFilter {
    /// Whether `entry` satisfies every set constraint.
    pub fn matches(&self, entry: &InventoryEntry) -> bool {
        self.bank_id.map_or(true, |bank| entry.bank_id == bank)
            && self.blood_group.map_or(true, |group| entry.blood_group == group)
    }
}

/// Result of [`InventoryLedger::query`].
///
/// Holds a snapshot ordered by (bank, blood group) and applies the filter
/// lazily as it is iterated. [`InventoryView::iter`] can be called any
/// number of times and yields the same sequence each time.
#[derive(Debug, Clone)]
pub struct InventoryView {
    entries: Vec<InventoryEntry>,
    filter: InventoryFilter,
}

impl InventoryView {
    fn new(mut entries: Vec<InventoryEntry>, filter: InventoryFilter) -> Self {
        entries.sort_by_key(InventoryEntry::key);
        Self { entries, filter }
    }

    /// Iterate the matching entries.
    pub fn iter(&self) -> Entries<'_> {
        Entries {
            inner: self.entries.iter(),
            filter: &self.filter,
        }
    }

    /// Sum of units across the matching entries.
    pub fn total_units(&self) -> u64 {
        self.iter().map(|e| u64::from(e.units)).sum()
    }

    /// Collect the matching entries.
    pub fn to_vec(&self) -> Vec<InventoryEntry> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a InventoryView {
    type Item = &'a InventoryEntry;
    type IntoIter = Entries<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy iterator over the entries of an [`InventoryView`].
#[derive(Debug, Clone)]
pub struct Entries<'a> {
    inner: std::slice::Iter<'a, InventoryEntry>,
    filter: &'a InventoryFilter,
}

impl<'a> Iterator for Entries<'a> {
    type Item = &'a InventoryEntry;

    fn next(&mut self) -> Option<Self::Item> {
        let filter = self.filter;
        self.inner.by_ref().find(|entry| filter.matches(entry))
    }
}

/// Atomic credit/debit over an injected [`InventoryStore`].
pub struct InventoryLedger {
    store: Arc<dyn InventoryStore>,
    locks: KeyedMutex<InventoryKey>,
}

impl std::fmt::Debug for InventoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InventoryLedger")
            .field("locked_keys", &self.locks.active_keys())
            .finish_non_exhaustive()
    }
}

impl InventoryLedger {
    /// Build a ledger over `store`.
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self {
            store,
            locks: KeyedMutex::new(),
        }
    }

    /// Add `units` to the entry for `key`, creating it at zero if absent.
    pub async fn credit(
        &self,
        key: InventoryKey,
        units: Units,
    ) -> Result<InventoryEntry, BloodBankError> {
        let _guard = self.locks.lock(&key).await;

        let balance = self.current_balance(key).await?;
        if balance.checked_add(units.get()).is_none() {
            return Err(ValidationError::InventoryOverflow {
                key,
                balance,
                credit: units.get(),
            }
            .into());
        }

        match self.store.apply_delta(key, i64::from(units.get())).await? {
            Some(entry) => {
                tracing::info!(%key, units = units.get(), balance = entry.units, "inventory credited");
                Ok(entry)
            }
            None => {
                let balance = self.current_balance(key).await?;
                Err(ValidationError::InventoryOverflow {
                    key,
                    balance,
                    credit: units.get(),
                }
                .into())
            }
        }
    }

    /// Remove `units` from the entry for `key`.
    ///
    /// Fails with [`BloodBankError::InsufficientInventory`] and leaves the
    /// balance untouched when fewer than `units` are available. A key that
    /// was never credited has zero available.
    pub async fn debit(
        &self,
        key: InventoryKey,
        units: Units,
    ) -> Result<InventoryEntry, BloodBankError> {
        let _guard = self.locks.lock(&key).await;

        let available = self.current_balance(key).await?;
        if available < units.get() {
            return Err(self.shortfall(key, units, available));
        }

        match self.store.apply_delta(key, -i64::from(units.get())).await? {
            Some(entry) => {
                tracing::info!(%key, units = units.get(), balance = entry.units, "inventory debited");
                Ok(entry)
            }
            None => {
                // Another process drained the entry between our read and write.
                let available = self.current_balance(key).await?;
                Err(self.shortfall(key, units, available))
            }
        }
    }

    /// Units currently available for `key` (zero if never credited).
    pub async fn balance(&self, key: InventoryKey) -> Result<u32, BloodBankError> {
        self.current_balance(key).await
    }

    /// Entries matching `filter`, ordered by (bank, blood group).
    pub async fn query(&self, filter: InventoryFilter) -> Result<InventoryView, BloodBankError> {
        let entries = self.store.list_entries().await?;
        Ok(InventoryView::new(entries, filter))
    }

    async fn current_balance(&self, key: InventoryKey) -> Result<u32, BloodBankError> {
        Ok(self
            .store
            .get_entry(key)
            .await?
            .map_or(0, |entry| entry.units))
    }

    fn shortfall(&self, key: InventoryKey, units: Units, available: u32) -> BloodBankError {
        metrics::counter!("bloodbank_inventory_debit_rejected_total").increment(1);
        tracing::debug!(%key, requested = units.get(), available, "debit rejected");
        BloodBankError::InsufficientInventory {
            key,
            requested: units.get(),
            available,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use proptest::prelude::*;

    fn ledger() -> InventoryLedger {
        InventoryLedger::new(Arc::new(MemoryStore::new()))
    }

    fn units(n: i64) -> Units {
        Units::new(n).unwrap()
    }

    #[tokio::test]
    async fn credit_creates_entry_lazily() {
        let ledger = ledger();
        let key = InventoryKey::new(BankId::new(), BloodGroup::APos);
        assert_eq!(ledger.balance(key).await.unwrap(), 0);

        let entry = ledger.credit(key, units(10)).await.unwrap();
        assert_eq!(entry.units, 10);
        assert_eq!(entry.key(), key);

        let entry = ledger.credit(key, units(5)).await.unwrap();
        assert_eq!(entry.units, 15);
    }

    #[tokio::test]
    async fn debit_decrements() {
        let ledger = ledger();
        let key = InventoryKey::new(BankId::new(), BloodGroup::APos);
        ledger.credit(key, units(10)).await.unwrap();
        let entry = ledger.debit(key, units(4)).await.unwrap();
        assert_eq!(entry.units, 6);
        assert_eq!(ledger.balance(key).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn debit_of_exact_balance_reaches_zero() {
        let ledger = ledger();
        let key = InventoryKey::new(BankId::new(), BloodGroup::BNeg);
        ledger.credit(key, units(3)).await.unwrap();
        assert_eq!(ledger.debit(key, units(3)).await.unwrap().units, 0);
    }

    #[tokio::test]
    async fn debit_beyond_balance_fails_without_change() {
        let ledger = ledger();
        let key = InventoryKey::new(BankId::new(), BloodGroup::ONeg);
        ledger.credit(key, units(1)).await.unwrap();

        let err = ledger.debit(key, units(2)).await.unwrap_err();
        match err {
            BloodBankError::InsufficientInventory {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 2);
                assert_eq!(available, 1);
            }
            other => panic!("expected InsufficientInventory, got {other:?}"),
        }
        assert_eq!(ledger.balance(key).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn debit_of_unknown_key_reports_zero_available() {
        let ledger = ledger();
        let key = InventoryKey::new(BankId::new(), BloodGroup::ONeg);
        let err = ledger.debit(key, units(2)).await.unwrap_err();
        assert!(matches!(
            err,
            BloodBankError::InsufficientInventory { available: 0, .. }
        ));
        assert!(ledger.query(InventoryFilter::default()).await.unwrap().to_vec().is_empty());
    }

    #[tokio::test]
    async fn credit_overflow_is_validation_error() {
        let ledger = ledger();
        let key = InventoryKey::new(BankId::new(), BloodGroup::OPos);
        ledger.credit(key, units(i64::from(u32::MAX))).await.unwrap();
        let err = ledger.credit(key, units(1)).await.unwrap_err();
        assert!(matches!(
            err,
            BloodBankError::Validation(ValidationError::InventoryOverflow { .. })
        ));
        assert_eq!(ledger.balance(key).await.unwrap(), u32::MAX);
    }

    #[tokio::test]
    async fn query_filters_lazily_and_is_restartable() {
        let ledger = ledger();
        let bank_a = BankId::new();
        let bank_b = BankId::new();
        ledger.credit(InventoryKey::new(bank_a, BloodGroup::OPos), units(3)).await.unwrap();
        ledger.credit(InventoryKey::new(bank_a, BloodGroup::APos), units(2)).await.unwrap();
        ledger.credit(InventoryKey::new(bank_b, BloodGroup::APos), units(7)).await.unwrap();

        let all = ledger.query(InventoryFilter::default()).await.unwrap();
        assert_eq!(all.iter().count(), 3);
        assert_eq!(all.total_units(), 12);

        let by_bank = ledger
            .query(InventoryFilter {
                bank_id: Some(bank_a),
                blood_group: None,
            })
            .await
            .unwrap();
        let groups: Vec<_> = by_bank.iter().map(|e| e.blood_group).collect();
        assert_eq!(groups, vec![BloodGroup::APos, BloodGroup::OPos]);
        // Second pass yields the same sequence.
        let again: Vec<_> = (&by_bank).into_iter().map(|e| e.blood_group).collect();
        assert_eq!(groups, again);

        let by_group = ledger
            .query(InventoryFilter {
                bank_id: None,
                blood_group: Some(BloodGroup::APos),
            })
            .await
            .unwrap();
        assert_eq!(by_group.total_units(), 9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_debits_never_oversell() {
        let ledger = Arc::new(ledger());
        let key = InventoryKey::new(BankId::new(), BloodGroup::AbNeg);
        ledger.credit(key, units(5)).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move { ledger.debit(key, units(1)).await }));
        }
        let mut succeeded = 0;
        for h in handles {
            if h.await.unwrap().is_ok() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 5);
        assert_eq!(ledger.balance(key).await.unwrap(), 0);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Credit(u16),
        Debit(u16),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u16..50).prop_map(Op::Credit),
            (1u16..50).prop_map(Op::Debit),
        ]
    }

    proptest! {
        #[test]
        fn balance_tracks_model_and_never_goes_negative(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
            rt.block_on(async {
                let ledger = ledger();
                let key = InventoryKey::new(BankId::new(), BloodGroup::APos);
                let mut model: i64 = 0;
                let mut credited: i64 = 0;
                let mut debited: i64 = 0;
                for op in ops {
                    match op {
                        Op::Credit(n) => {
                            ledger.credit(key, units(i64::from(n))).await.unwrap();
                            model += i64::from(n);
                            credited += i64::from(n);
                        }
                        Op::Debit(n) => {
                            let result = ledger.debit(key, units(i64::from(n))).await;
                            if model >= i64::from(n) {
                                prop_assert!(result.is_ok());
                                model -= i64::from(n);
                                debited += i64::from(n);
                            } else {
                                prop_assert!(result.is_err());
                            }
                        }
                    }
                    let balance = i64::from(ledger.balance(key).await.unwrap());
                    prop_assert_eq!(balance, model);
                    prop_assert!(debited <= credited);
                }
                Ok(())
            })?;
        }
    }
}
