//! Chart data for the records view.

use crate::models::{Metric, ValuationRecord};
use tracing::debug;

/// One line of the chart: a label and value per record.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub metric: Metric,
    /// `"<date> <ticker>"` per point
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

impl ChartSeries {
    /// Build a series from date-sorted records, skipping records where the
    /// metric is not a number.
    pub fn build(records: &[&ValuationRecord], metric: Metric) -> Self {
        let (labels, values): (Vec<String>, Vec<f64>) = records
            .iter()
            .filter_map(|r| {
                r.metric(metric)
                    .map(|value| (format!("{} {}", r.date, r.ticker), value))
            })
            .unzip();

        Self {
            metric,
            labels,
            values,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Points as `(x, y)` with x the point index.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as f64, *v))
            .collect()
    }

    /// Y-axis bounds with a little headroom; `[0, 1]` when empty.
    pub fn y_bounds(&self) -> [f64; 2] {
        let min = self.values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !min.is_finite() || !max.is_finite() {
            return [0.0, 1.0];
        }
        let pad = ((max - min) * 0.1).max(max.abs() * 0.05).max(0.01);
        [(min - pad).max(0.0), max + pad]
    }
}

/// Holds the chart currently on screen.
///
/// A new chart always replaces the previous one; the old series is dropped
/// before the new one is installed.
#[derive(Debug, Default)]
pub struct ChartSlot {
    current: Option<ChartSeries>,
    generation: u64,
}

impl ChartSlot {
    pub fn replace(&mut self, series: ChartSeries) -> &ChartSeries {
        if let Some(old) = self.current.take() {
            debug!(points = old.values.len(), "disposing previous chart");
            drop(old);
        }
        self.generation += 1;
        self.current.insert(series)
    }

    pub fn current(&self) -> Option<&ChartSeries> {
        self.current.as_ref()
    }

    /// How many charts have been installed.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
