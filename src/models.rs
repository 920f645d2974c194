//! Data models for stocks, EPS profiles and valuation records.

use crate::valuation::{calc_pbr, calc_per, ttm_eps};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A registered stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stock {
    /// Ticker code, trimmed and uppercase (e.g., "7203", "AAPL")
    pub ticker: String,
    /// Display name
    pub name: String,
}

/// Which EPS figure a ticker's valuations are based on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EpsMode {
    /// A single manually entered EPS
    #[default]
    Fixed,
    /// Sum of the latest four quarterly EPS figures
    Quarterly,
    /// Forward (company or consensus) estimate
    Forward,
}

impl std::fmt::Display for EpsMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EpsMode::Fixed => write!(f, "fixed"),
            EpsMode::Quarterly => write!(f, "quarterly"),
            EpsMode::Forward => write!(f, "forward"),
        }
    }
}

/// EPS reported for one fiscal quarter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuarterlyEps {
    /// Label in `YYYYQn` form
    pub quarter: String,
    pub eps: f64,
}

/// Per-ticker EPS settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct EpsProfile {
    #[serde(default)]
    pub mode: EpsMode,
    #[serde(default)]
    pub fixed_eps: Option<f64>,
    #[serde(default)]
    pub forward_eps: Option<f64>,
    /// Quarterly figures, insertion ordered, labels unique
    #[serde(default)]
    pub quarterly: Vec<QuarterlyEps>,
}

impl EpsProfile {
    /// Resolve the EPS this profile's mode points at.
    pub fn resolve(&self) -> Option<f64> {
        match self.mode {
            EpsMode::Fixed => self.fixed_eps,
            EpsMode::Forward => self.forward_eps,
            EpsMode::Quarterly => ttm_eps(&self.quarterly),
        }
    }

    /// Insert a quarter or overwrite the value of an existing label.
    pub fn upsert_quarter(&mut self, quarter: &str, eps: f64) {
        match self.quarterly.iter_mut().find(|entry| entry.quarter == quarter) {
            Some(entry) => entry.eps = eps,
            None => self.quarterly.push(QuarterlyEps {
                quarter: quarter.to_string(),
                eps,
            }),
        }
    }

    /// Remove a quarter. Returns whether it was present.
    pub fn remove_quarter(&mut self, quarter: &str) -> bool {
        let before = self.quarterly.len();
        self.quarterly.retain(|entry| entry.quarter != quarter);
        self.quarterly.len() != before
    }
}

/// A dated price observation with the valuation derived from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationRecord {
    pub id: String,
    pub ticker: String,
    pub date: NaiveDate,
    pub price: f64,
    /// Profile mode at the time `eps_used` was resolved
    #[serde(default)]
    pub eps_mode: EpsMode,
    #[serde(default)]
    pub eps_used: Option<f64>,
    #[serde(default)]
    pub per: Option<f64>,
    /// Book value per share, if entered
    #[serde(default)]
    pub bps: Option<f64>,
    #[serde(default)]
    pub pbr: Option<f64>,
    #[serde(default)]
    pub memo: String,
}

impl ValuationRecord {
    /// Refresh the EPS snapshot and derived ratios.
    pub fn apply_eps(&mut self, mode: EpsMode, eps: Option<f64>) {
        self.eps_mode = mode;
        self.eps_used = eps;
        self.per = calc_per(Some(self.price), eps);
        self.pbr = calc_pbr(Some(self.price), self.bps);
    }

    /// Value of a chartable metric, if numeric.
    pub fn metric(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Price => Some(self.price),
            Metric::Eps => self.eps_used,
            Metric::Per => self.per,
            Metric::Pbr => self.pbr,
        }
    }
}

/// Metrics that can be charted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Price,
    Eps,
    #[default]
    Per,
    Pbr,
}

impl Metric {
    /// Get the next metric in cycle.
    pub fn next(self) -> Self {
        match self {
            Metric::Price => Metric::Eps,
            Metric::Eps => Metric::Per,
            Metric::Per => Metric::Pbr,
            Metric::Pbr => Metric::Price,
        }
    }

    /// Get the display label.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Price => "Price",
            Metric::Eps => "EPS",
            Metric::Per => "PER",
            Metric::Pbr => "PBR",
        }
    }
}

/// Everything the store persists, in its on-disk JSON shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub stocks: Vec<Stock>,
    #[serde(default)]
    pub records: Vec<ValuationRecord>,
    #[serde(default)]
    pub eps_profiles: BTreeMap<String, EpsProfile>,
}
