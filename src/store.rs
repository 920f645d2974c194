//! The record store: stocks, valuation records and EPS profiles.
//!
//! The store owns the data and its invariants. It knows nothing about
//! persistence; the controller in `app.rs` snapshots it after each
//! mutation.

use crate::error::{SnapshotError, StoreError};
use crate::models::{EpsProfile, Snapshot, Stock, ValuationRecord};
use crate::valuation::is_valid_quarter;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, warn};

/// Input for a new valuation record, before EPS resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub ticker: String,
    pub date: String,
    pub price: f64,
    pub bps: Option<f64>,
    pub memo: String,
}

/// In-memory state for every ticker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    stocks: Vec<Stock>,
    records: Vec<ValuationRecord>,
    eps_profiles: BTreeMap<String, EpsProfile>,
}

/// Normalize a user-entered ticker.
pub fn normalize_ticker(input: &str) -> String {
    input.trim().to_uppercase()
}

/// Normalize a user-entered quarter label (`2024q1` -> `2024Q1`).
pub fn normalize_quarter(input: &str) -> String {
    input.trim().to_uppercase()
}

fn parse_date(input: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
        .map_err(|_| StoreError::InvalidDate(input.to_string()))
}

fn check_finite(value: Option<f64>, field: &'static str) -> Result<(), StoreError> {
    match value {
        Some(v) if !v.is_finite() => Err(StoreError::NotFinite { field }),
        _ => Ok(()),
    }
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a snapshot, taking it as-is.
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            stocks: snapshot.stocks,
            records: snapshot.records,
            eps_profiles: snapshot.eps_profiles,
        }
    }

    /// Copy the full state out for persistence or export.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            stocks: self.stocks.clone(),
            records: self.records.clone(),
            eps_profiles: self.eps_profiles.clone(),
        }
    }

    pub fn stocks(&self) -> &[Stock] {
        &self.stocks
    }

    pub fn records(&self) -> &[ValuationRecord] {
        &self.records
    }

    pub fn stock(&self, ticker: &str) -> Option<&Stock> {
        self.stocks.iter().find(|s| s.ticker == ticker)
    }

    pub fn has_stock(&self, ticker: &str) -> bool {
        self.stock(ticker).is_some()
    }

    /// Records sorted by date, optionally limited to one ticker.
    pub fn records_for(&self, ticker: Option<&str>) -> Vec<&ValuationRecord> {
        let mut records: Vec<&ValuationRecord> = self
            .records
            .iter()
            .filter(|r| ticker.is_none_or(|t| r.ticker == t))
            .collect();
        records.sort_by(|a, b| a.date.cmp(&b.date));
        records
    }

    /// Register a stock. The ticker is trimmed and uppercased.
    pub fn add_stock(&mut self, ticker: &str, name: &str) -> Result<Stock, StoreError> {
        let ticker = normalize_ticker(ticker);
        let name = name.trim();
        if ticker.is_empty() {
            return Err(StoreError::EmptyTicker);
        }
        if name.is_empty() {
            return Err(StoreError::EmptyName);
        }
        if self.has_stock(&ticker) {
            return Err(StoreError::DuplicateTicker(ticker));
        }

        let stock = Stock {
            ticker,
            name: name.to_string(),
        };
        self.stocks.push(stock.clone());
        self.stocks.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(stock)
    }

    /// Current profile for a ticker, created with defaults on first access.
    pub fn eps_profile(&mut self, ticker: &str) -> &EpsProfile {
        self.eps_profiles.entry(ticker.to_string()).or_default()
    }

    /// Look up a profile without creating one.
    pub fn peek_eps_profile(&self, ticker: &str) -> Option<&EpsProfile> {
        self.eps_profiles.get(ticker)
    }

    /// Resolve the EPS that valuations for `ticker` should use.
    pub fn resolve_eps(&mut self, ticker: &str) -> Option<f64> {
        self.eps_profile(ticker).resolve()
    }

    /// Add a record, or replace the record with the same id.
    ///
    /// EPS, PER and PBR are derived from the ticker's current profile.
    pub fn add_record(&mut self, id: String, input: NewRecord) -> Result<&ValuationRecord, StoreError> {
        let ticker = normalize_ticker(&input.ticker);
        if ticker.is_empty() {
            return Err(StoreError::EmptyTicker);
        }
        if !self.has_stock(&ticker) {
            return Err(StoreError::UnknownTicker(ticker));
        }
        let date = parse_date(&input.date)?;
        if !input.price.is_finite() || input.price <= 0.0 {
            return Err(StoreError::NonPositivePrice(input.price));
        }
        check_finite(input.bps, "BPS")?;

        let mode = self.eps_profile(&ticker).mode;
        let eps = self.resolve_eps(&ticker);

        let mut record = ValuationRecord {
            id,
            ticker,
            date,
            price: input.price,
            eps_mode: mode,
            eps_used: None,
            per: None,
            bps: input.bps,
            pbr: None,
            memo: input.memo.trim().to_string(),
        };
        record.apply_eps(mode, eps);

        let index = match self.records.iter().position(|r| r.id == record.id) {
            Some(index) => {
                self.records[index] = record;
                index
            }
            None => {
                self.records.push(record);
                self.records.len() - 1
            }
        };
        Ok(&self.records[index])
    }

    /// Delete a record by id.
    pub fn remove_record(&mut self, id: &str) -> Result<ValuationRecord, StoreError> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| StoreError::RecordNotFound(id.to_string()))?;
        Ok(self.records.remove(index))
    }

    /// Replace a ticker's EPS profile and recompute its records.
    pub fn set_eps_profile(&mut self, ticker: &str, profile: EpsProfile) -> Result<usize, StoreError> {
        let ticker = normalize_ticker(ticker);
        if !self.has_stock(&ticker) {
            return Err(StoreError::UnknownTicker(ticker));
        }
        check_finite(profile.fixed_eps, "fixed EPS")?;
        check_finite(profile.forward_eps, "forward EPS")?;
        // Labels already stored (possibly imported in another format) pass through.
        {
            let stored: HashSet<&str> = self
                .eps_profiles
                .get(&ticker)
                .map(|p| p.quarterly.iter().map(|q| q.quarter.as_str()).collect())
                .unwrap_or_default();
            if let Some(bad) = profile
                .quarterly
                .iter()
                .find(|q| !is_valid_quarter(&q.quarter) && !stored.contains(q.quarter.as_str()))
            {
                return Err(StoreError::InvalidQuarter(bad.quarter.clone()));
            }
        }
        if profile.quarterly.iter().any(|q| !q.eps.is_finite()) {
            return Err(StoreError::NotFinite { field: "quarterly EPS" });
        }

        // Later duplicates of a label overwrite earlier ones.
        let mut profile = profile;
        let quarterly = std::mem::take(&mut profile.quarterly);
        for entry in quarterly {
            profile.upsert_quarter(&entry.quarter, entry.eps);
        }

        self.eps_profiles.insert(ticker.clone(), profile);
        Ok(self.recompute_ticker(&ticker))
    }

    /// Add a quarter's EPS, overwriting an existing entry for the same label.
    pub fn add_or_update_quarter(&mut self, ticker: &str, quarter: &str, eps: f64) -> Result<usize, StoreError> {
        let ticker = normalize_ticker(ticker);
        let quarter = normalize_quarter(quarter);
        if !self.has_stock(&ticker) {
            return Err(StoreError::UnknownTicker(ticker));
        }
        if !is_valid_quarter(&quarter) {
            return Err(StoreError::InvalidQuarter(quarter));
        }
        check_finite(Some(eps), "quarterly EPS")?;

        self.eps_profiles
            .entry(ticker.clone())
            .or_default()
            .upsert_quarter(&quarter, eps);
        Ok(self.recompute_ticker(&ticker))
    }

    /// Delete a quarter's EPS.
    pub fn remove_quarter(&mut self, ticker: &str, quarter: &str) -> Result<usize, StoreError> {
        let ticker = normalize_ticker(ticker);
        let quarter = normalize_quarter(quarter);
        let removed = self
            .eps_profiles
            .get_mut(&ticker)
            .is_some_and(|profile| profile.remove_quarter(&quarter));
        if !removed {
            return Err(StoreError::UnknownQuarter { ticker, quarter });
        }
        Ok(self.recompute_ticker(&ticker))
    }

    /// Re-resolve EPS for every record of one ticker. Returns the number touched.
    pub fn recompute_ticker(&mut self, ticker: &str) -> usize {
        let profile = self.eps_profiles.entry(ticker.to_string()).or_default();
        let mode = profile.mode;
        let eps = profile.resolve();

        let mut touched = 0;
        for record in self.records.iter_mut().filter(|r| r.ticker == ticker) {
            record.apply_eps(mode, eps);
            touched += 1;
        }
        debug!(ticker, touched, eps = ?eps, "recomputed valuations");
        touched
    }

    /// Swap in a whole new state (import).
    pub fn replace_all(&mut self, snapshot: Snapshot) {
        *self = Self::from_snapshot(snapshot);
    }
}

fn field_or_default<T: DeserializeOwned + Default>(
    object: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> T {
    match object.get(key) {
        None | Some(serde_json::Value::Null) => T::default(),
        Some(value) => serde_json::from_value(value.clone()).unwrap_or_else(|e| {
            warn!(field = key, error = %e, "ignoring malformed snapshot field");
            T::default()
        }),
    }
}

/// Decode an array field element by element, keeping the entries that fit.
fn items_or_default<T: DeserializeOwned>(
    object: &serde_json::Map<String, serde_json::Value>,
    key: &str,
) -> Vec<T> {
    let items = match object.get(key) {
        None | Some(serde_json::Value::Null) => return Vec::new(),
        Some(serde_json::Value::Array(items)) => items,
        Some(_) => {
            warn!(field = key, "ignoring snapshot field that is not an array");
            return Vec::new();
        }
    };

    let mut dropped = 0;
    let kept: Vec<T> = items
        .iter()
        .filter_map(|item| match serde_json::from_value(item.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(field = key, error = %e, "skipping malformed snapshot entry");
                dropped += 1;
                None
            }
        })
        .collect();
    if dropped > 0 {
        warn!(field = key, dropped, kept = kept.len(), "dropped malformed snapshot entries");
    }
    kept
}

/// Decode a snapshot from JSON, coercing it into the fixed shape.
///
/// Anything that isn't a JSON object is an error. Inside the object each
/// collection is decoded on its own and falls back to empty when its shape
/// is wrong; malformed stocks and records are skipped one by one. Duplicate tickers keep the first entry and records for
/// unregistered tickers are dropped.
pub fn decode_snapshot(json: &str) -> Result<Snapshot, SnapshotError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let object = value.as_object().ok_or(SnapshotError::NotAnObject)?;

    let mut stocks: Vec<Stock> = items_or_default(object, "stocks");
    let mut records: Vec<ValuationRecord> = items_or_default(object, "records");
    let eps_profiles: BTreeMap<String, EpsProfile> = field_or_default(object, "epsProfiles");

    let mut seen = HashSet::new();
    stocks.retain(|s| !s.ticker.is_empty() && seen.insert(s.ticker.clone()));

    let before = records.len();
    records.retain(|r| seen.contains(&r.ticker));
    if records.len() != before {
        warn!(dropped = before - records.len(), "dropped records for unregistered tickers");
    }

    Ok(Snapshot {
        stocks,
        records,
        eps_profiles,
    })
}

/// Encode a snapshot as pretty-printed JSON.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<String, SnapshotError> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}
