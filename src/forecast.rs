//! Forecast calculator - days until stockout and reorder suggestions from
//! trailing sales velocity.
//!
//! Velocity is `units sold in window / window days` with a fixed denominator,
//! even for items whose sales history is shorter than the window. Such
//! forecasts are flagged `low_confidence` instead of being rescaled.
//!
//! This is a point estimate for a human to read. Nothing here triggers a
//! reorder.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{display_name, Catalog, SalesHistory};
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::record::{StockRecord, StockStatus};
use crate::store::StockStore;

/// Snapshot view, not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockForecast {
    pub variant_id: String,
    pub name: String,
    pub current_stock: i64,
    pub units_sold_in_window: u64,
    pub average_daily_sales: f64,
    pub days_until_stockout: i64,
    pub days_until_reorder: i64,
    pub suggested_reorder_date: DateTime<Utc>,
    pub suggested_reorder_quantity: u64,
    /// Sales history is shorter than the window (or empty).
    pub low_confidence: bool,
}

/// Tunables for `project`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForecastParams {
    pub window_days: u32,
    pub cover_days: u32,
    pub reorder_trigger_percent: u32,
    pub sentinel_days: i64,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self::from(&LedgerConfig::default())
    }
}

impl From<&LedgerConfig> for ForecastParams {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            window_days: config.forecast_window_days,
            cover_days: config.reorder_cover_days,
            reorder_trigger_percent: config.reorder_trigger_percent,
            sentinel_days: config.stockout_sentinel_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub average_daily_sales: f64,
    pub days_until_stockout: i64,
    pub days_until_reorder: i64,
    pub suggested_reorder_quantity: u64,
}

/// Pure projection from stock and units sold in the window.
///
/// Floors and ceilings are done in integer arithmetic on
/// `stock * window / sold`, which equals `stock / (sold / window)` without
/// float drift. Zero velocity reports `sentinel_days`; stock at or below
/// zero projects 0 days.
pub fn project(current_stock: i64, units_sold: u64, params: ForecastParams) -> Projection {
    let window = i128::from(params.window_days.max(1));
    let sold = i128::from(units_sold);
    let average_daily_sales = units_sold as f64 / window as f64;

    let (days_until_stockout, days_until_reorder) = if sold == 0 {
        (params.sentinel_days, params.sentinel_days)
    } else if current_stock <= 0 {
        (0, 0)
    } else {
        let stock = i128::from(current_stock);
        let keep_percent = 100 - i128::from(params.reorder_trigger_percent.min(100));
        let stockout = stock * window / sold;
        let reorder = stock * keep_percent * window / (100 * sold);
        (saturate(stockout), saturate(reorder))
    };

    let cover = i128::from(params.cover_days);
    let reorder_quantity = (sold * cover + window - 1) / window;

    Projection {
        average_daily_sales,
        days_until_stockout,
        days_until_reorder,
        suggested_reorder_quantity: u64::try_from(reorder_quantity).unwrap_or(u64::MAX),
    }
}

fn saturate(value: i128) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Clone)]
pub struct ForecastCalculator {
    store: Arc<dyn StockStore>,
    catalog: Arc<dyn Catalog>,
    sales: Arc<dyn SalesHistory>,
    params: ForecastParams,
}

impl ForecastCalculator {
    pub fn new(
        store: Arc<dyn StockStore>,
        catalog: Arc<dyn Catalog>,
        sales: Arc<dyn SalesHistory>,
    ) -> Self {
        Self {
            store,
            catalog,
            sales,
            params: ForecastParams::default(),
        }
    }

    pub fn with_params(mut self, params: ForecastParams) -> Self {
        self.params = params;
        self
    }

    pub fn forecast(&self, variant_id: &str) -> Result<StockForecast, LedgerError> {
        self.forecast_at(variant_id, Utc::now())
    }

    pub fn forecast_at(
        &self,
        variant_id: &str,
        now: DateTime<Utc>,
    ) -> Result<StockForecast, LedgerError> {
        let record = self
            .store
            .get(variant_id)?
            .ok_or_else(|| LedgerError::NotFound(variant_id.to_string()))?
            .data;
        if !record.track_quantity {
            return Err(LedgerError::Validation(format!(
                "{variant_id} does not track quantity, nothing to forecast"
            )));
        }
        self.forecast_record(&record, now)
    }

    /// Forecasts for every tracked low or out-of-stock item, soonest stockout first.
    pub fn forecast_low_stock(&self) -> Result<Vec<StockForecast>, LedgerError> {
        let now = Utc::now();
        let records = self.store.find(&|record: &StockRecord| {
            record.track_quantity && record.status() != StockStatus::InStock
        })?;

        let mut forecasts = records
            .iter()
            .map(|versioned| self.forecast_record(&versioned.data, now))
            .collect::<Result<Vec<_>, _>>()?;
        forecasts.sort_by(|a, b| {
            a.days_until_stockout
                .cmp(&b.days_until_stockout)
                .then_with(|| a.variant_id.cmp(&b.variant_id))
        });
        Ok(forecasts)
    }

    fn forecast_record(
        &self,
        record: &StockRecord,
        now: DateTime<Utc>,
    ) -> Result<StockForecast, LedgerError> {
        let window_start = Duration::try_days(i64::from(self.params.window_days))
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "a {}-day sales window is out of range",
                    self.params.window_days
                ))
            })?;
        let units_sold = self
            .sales
            .units_sold(&record.variant_id, window_start, now)?;
        let low_confidence = match self.sales.first_sale_at(&record.variant_id)? {
            Some(first) => first > window_start,
            None => true,
        };

        let projection = project(record.quantity, units_sold, self.params);
        let suggested_reorder_date = Duration::try_days(projection.days_until_reorder)
            .and_then(|days| now.checked_add_signed(days))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Ok(StockForecast {
            variant_id: record.variant_id.clone(),
            name: display_name(self.catalog.as_ref(), &record.variant_id),
            current_stock: record.quantity,
            units_sold_in_window: units_sold,
            average_daily_sales: projection.average_daily_sales,
            days_until_stockout: projection.days_until_stockout,
            days_until_reorder: projection.days_until_reorder,
            suggested_reorder_date,
            suggested_reorder_quantity: projection.suggested_reorder_quantity,
            low_confidence,
        })
    }
}
