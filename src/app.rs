//! Application controller.
//!
//! Owns the record store together with its storage and id capabilities.
//! Every mutation goes through here so it is always followed by a persist.

use crate::models::{EpsProfile, Snapshot, Stock, ValuationRecord};
use crate::storage::{IdGenerator, KeyValueStore};
use crate::store::{NewRecord, RecordStore, decode_snapshot, encode_snapshot};
use anyhow::{Context, Result};
use tracing::{info, warn};

/// Application state.
pub struct App {
    store: RecordStore,
    storage: Box<dyn KeyValueStore>,
    ids: Box<dyn IdGenerator>,
    storage_key: String,
}

impl App {
    /// Load the stored snapshot, starting empty when it is missing or corrupt.
    ///
    /// A corrupt entry is removed from storage.
    pub fn load(
        mut storage: Box<dyn KeyValueStore>,
        ids: Box<dyn IdGenerator>,
        storage_key: impl Into<String>,
    ) -> Result<Self> {
        let storage_key = storage_key.into();
        let store = match storage.get(&storage_key)? {
            None => RecordStore::new(),
            Some(raw) => match decode_snapshot(&raw) {
                Ok(snapshot) => RecordStore::from_snapshot(snapshot),
                Err(e) => {
                    warn!(key = %storage_key, error = %e, "discarding unreadable stored data");
                    storage.remove(&storage_key)?;
                    RecordStore::new()
                }
            },
        };

        Ok(Self {
            store,
            storage,
            ids,
            storage_key,
        })
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    fn persist(&mut self) -> Result<()> {
        let json = encode_snapshot(&self.store.snapshot()).context("Failed to serialize state")?;
        self.storage
            .set(&self.storage_key, &json)
            .context("Failed to save state")
    }

    /// Register a stock.
    pub fn add_stock(&mut self, ticker: &str, name: &str) -> Result<Stock> {
        let stock = self.store.add_stock(ticker, name)?;
        self.persist()?;
        info!(ticker = %stock.ticker, "registered stock");
        Ok(stock)
    }

    /// Add a record under a freshly generated id.
    pub fn add_record(&mut self, input: NewRecord) -> Result<ValuationRecord> {
        let id = self.ids.next_id();
        let record = self.store.add_record(id, input)?.clone();
        self.persist()?;
        info!(id = %record.id, ticker = %record.ticker, per = ?record.per, "added record");
        Ok(record)
    }

    pub fn remove_record(&mut self, id: &str) -> Result<ValuationRecord> {
        let record = self.store.remove_record(id)?;
        self.persist()?;
        info!(id, "removed record");
        Ok(record)
    }

    /// Current EPS profile for a ticker (defaults if never edited).
    pub fn eps_profile(&mut self, ticker: &str) -> EpsProfile {
        self.store.eps_profile(ticker).clone()
    }

    /// Replace a ticker's EPS profile. Returns how many records were recomputed.
    pub fn set_eps_profile(&mut self, ticker: &str, profile: EpsProfile) -> Result<usize> {
        let touched = self.store.set_eps_profile(ticker, profile)?;
        self.persist()?;
        info!(ticker, touched, "updated EPS profile");
        Ok(touched)
    }

    pub fn add_or_update_quarter(&mut self, ticker: &str, quarter: &str, eps: f64) -> Result<usize> {
        let touched = self.store.add_or_update_quarter(ticker, quarter, eps)?;
        self.persist()?;
        info!(ticker, quarter, eps, touched, "recorded quarterly EPS");
        Ok(touched)
    }

    pub fn remove_quarter(&mut self, ticker: &str, quarter: &str) -> Result<usize> {
        let touched = self.store.remove_quarter(ticker, quarter)?;
        self.persist()?;
        info!(ticker, quarter, touched, "removed quarterly EPS");
        Ok(touched)
    }

    /// Replace everything with an imported snapshot.
    pub fn import(&mut self, snapshot: Snapshot) -> Result<()> {
        self.store.replace_all(snapshot);
        self.persist()?;
        info!(
            stocks = self.store.stocks().len(),
            records = self.store.records().len(),
            "imported snapshot"
        );
        Ok(())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EpsMode;
    use crate::storage::{DEFAULT_STORAGE_KEY, MemoryKeyValueStore, SequentialIds};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Memory store whose contents stay visible to the test after the app takes it.
    #[derive(Clone, Default)]
    struct SharedStore(Rc<RefCell<MemoryKeyValueStore>>);

    impl KeyValueStore for SharedStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.0.borrow().get(key)
        }
        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            self.0.borrow_mut().set(key, value)
        }
        fn remove(&mut self, key: &str) -> Result<()> {
            self.0.borrow_mut().remove(key)
        }
    }

    fn app_with(storage: &SharedStore) -> App {
        App::load(
            Box::new(storage.clone()),
            Box::new(SequentialIds::default()),
            DEFAULT_STORAGE_KEY,
        )
        .unwrap()
    }

    fn record(ticker: &str, date: &str, price: f64) -> NewRecord {
        NewRecord {
            ticker: ticker.to_string(),
            date: date.to_string(),
            price,
            bps: None,
            memo: String::new(),
        }
    }

    #[test]
    fn test_mutations_are_persisted() {
        let storage = SharedStore::default();
        let mut app = app_with(&storage);
        app.add_stock("7203", "Toyota").unwrap();
        let rec = app.add_record(record("7203", "2024-01-05", 2700.0)).unwrap();
        assert_eq!(rec.id, "rec-1");
        app.set_eps_profile("7203", EpsProfile { fixed_eps: Some(270.0), ..EpsProfile::default() })
            .unwrap();

        let reloaded = app_with(&storage);
        assert_eq!(reloaded.snapshot(), app.snapshot());
        assert_eq!(reloaded.store().records()[0].per, Some(10.0));
    }

    #[test]
    fn test_failed_mutation_does_not_persist() {
        let storage = SharedStore::default();
        let mut app = app_with(&storage);
        app.add_stock("7203", "Toyota").unwrap();
        let stored = storage.get(DEFAULT_STORAGE_KEY).unwrap();

        assert!(app.add_stock("7203", "Again").is_err());
        assert!(app.add_record(record("7203", "2024-01-05", -1.0)).is_err());
        assert_eq!(storage.get(DEFAULT_STORAGE_KEY).unwrap(), stored);
    }

    #[test]
    fn test_corrupt_storage_loads_empty_and_is_discarded() {
        let mut storage = SharedStore::default();
        storage.set(DEFAULT_STORAGE_KEY, "{ definitely not json").unwrap();

        let app = app_with(&storage);
        assert!(app.store().stocks().is_empty());
        assert!(app.store().records().is_empty());
        assert_eq!(storage.get(DEFAULT_STORAGE_KEY).unwrap(), None);
    }

    #[test]
    fn test_export_import_roundtrip() {
        let storage = SharedStore::default();
        let mut app = app_with(&storage);
        app.add_stock("7203", "Toyota").unwrap();
        app.add_stock("AAPL", "Apple").unwrap();
        app.set_eps_profile(
            "AAPL",
            EpsProfile { mode: EpsMode::Quarterly, ..EpsProfile::default() },
        )
        .unwrap();
        for (q, eps) in [("2024Q1", 1.53), ("2024Q2", 1.4), ("2024Q3", 0.97), ("2024Q4", 2.4)] {
            app.add_or_update_quarter("AAPL", q, eps).unwrap();
        }
        app.add_record(record("AAPL", "2025-01-10", 236.85)).unwrap();
        app.add_record(record("7203", "2025-01-10", 2950.0)).unwrap();
        let exported = app.snapshot();

        let mut other = app_with(&SharedStore::default());
        other.import(exported.clone()).unwrap();
        assert_eq!(other.snapshot(), exported);
        assert_eq!(other.store().records()[0].eps_used, Some(6.3));
    }

    #[test]
    fn test_import_replaces_everything() {
        let storage = SharedStore::default();
        let mut app = app_with(&storage);
        app.add_stock("OLD", "Old Co").unwrap();

        app.import(Snapshot::default()).unwrap();
        assert!(app.store().stocks().is_empty());
        assert_eq!(app_with(&storage).snapshot(), Snapshot::default());
    }

    #[test]
    fn test_remove_quarter_recomputes() {
        let storage = SharedStore::default();
        let mut app = app_with(&storage);
        app.add_stock("X", "X Corp").unwrap();
        app.set_eps_profile("X", EpsProfile { mode: EpsMode::Quarterly, ..EpsProfile::default() })
            .unwrap();
        for q in ["2023Q1", "2023Q2", "2023Q3", "2023Q4"] {
            app.add_or_update_quarter("X", q, 2.5).unwrap();
        }
        app.add_record(record("X", "2024-01-01", 100.0)).unwrap();
        assert_eq!(app.store().records()[0].per, Some(10.0));

        assert_eq!(app.remove_quarter("X", "2023Q1").unwrap(), 1);
        assert_eq!(app.store().records()[0].per, None);
    }
}
