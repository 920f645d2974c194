//! State of the interactive records view.

use crate::app::App;
use crate::chart::{ChartSeries, ChartSlot};
use crate::models::{Metric, ValuationRecord};
use crate::store::normalize_ticker;

/// What the view is showing and where the cursor is.
#[derive(Debug)]
pub struct ViewState {
    /// Registered tickers, in display order
    pub tickers: Vec<String>,
    /// 0 shows every ticker, `n` shows `tickers[n - 1]`
    pub filter: usize,
    pub metric: Metric,
    pub selected: usize,
    pub show_help: bool,
    pub error: Option<String>,
    pub status: Option<String>,
    pub running: bool,
    pub read_only: bool,
    pub chart: ChartSlot,
}

impl ViewState {
    /// Create a view, optionally pre-filtered to one ticker.
    pub fn new(app: &App, ticker: Option<&str>, metric: Metric, read_only: bool) -> Self {
        let tickers: Vec<String> = app.store().stocks().iter().map(|s| s.ticker.clone()).collect();
        let filter = ticker
            .map(normalize_ticker)
            .and_then(|t| tickers.iter().position(|x| *x == t))
            .map_or(0, |i| i + 1);

        let mut view = Self {
            tickers,
            filter,
            metric,
            selected: 0,
            show_help: false,
            error: None,
            status: None,
            running: true,
            read_only,
            chart: ChartSlot::default(),
        };
        view.rebuild(app);
        view
    }

    /// Ticker the records are filtered to, if any.
    pub fn ticker_filter(&self) -> Option<&str> {
        self.filter
            .checked_sub(1)
            .and_then(|i| self.tickers.get(i))
            .map(String::as_str)
    }

    /// Records currently listed, sorted by date.
    pub fn records<'a>(&self, app: &'a App) -> Vec<&'a ValuationRecord> {
        app.store().records_for(self.ticker_filter())
    }

    /// Refresh the chart and clamp the selection after any change.
    pub fn rebuild(&mut self, app: &App) {
        let records = self.records(app);
        self.selected = self.selected.min(records.len().saturating_sub(1));
        self.chart.replace(ChartSeries::build(&records, self.metric));
    }

    /// Cycle the ticker filter.
    pub fn next_filter(&mut self, app: &App) {
        self.filter = (self.filter + 1) % (self.tickers.len() + 1);
        self.selected = 0;
        self.rebuild(app);
    }

    /// Cycle the charted metric.
    pub fn next_metric(&mut self, app: &App) {
        self.metric = self.metric.next();
        self.rebuild(app);
    }

    /// Move selection up.
    pub fn select_up(&mut self, rows: usize) {
        self.selected = self.selected.saturating_sub(rows);
    }

    /// Move selection down.
    pub fn select_down(&mut self, app: &App, rows: usize) {
        let last = self.records(app).len().saturating_sub(1);
        self.selected = (self.selected + rows).min(last);
    }

    /// Move selection to top.
    pub fn select_top(&mut self) {
        self.selected = 0;
    }

    /// Move selection to bottom.
    pub fn select_bottom(&mut self, app: &App) {
        self.selected = self.records(app).len().saturating_sub(1);
    }

    /// Delete the highlighted record.
    pub fn delete_selected(&mut self, app: &mut App) {
        if self.read_only {
            self.status = Some("Read-only mode: deleting is disabled".to_string());
            return;
        }
        let Some(id) = self.records(app).get(self.selected).map(|r| r.id.clone()) else {
            return;
        };
        match app.remove_record(&id) {
            Ok(record) => {
                self.status = Some(format!("Deleted {} {}", record.date, record.ticker));
            }
            Err(e) => self.error = Some(format!("{:#}", e)),
        }
        self.rebuild(app);
    }

    /// Toggle help display.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Quit the view.
    pub fn quit(&mut self) {
        self.running = false;
    }
}
