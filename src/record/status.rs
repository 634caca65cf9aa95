use serde::{Deserialize, Serialize};

/// Stock bucket of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

/// The one classification rule shared by scanning, stats and queries.
///
/// `quantity <= 0` is out of stock, `0 < quantity <= threshold` is low stock,
/// anything above the threshold is in stock.
pub fn classify(quantity: i64, low_stock_threshold: i64) -> StockStatus {
    if quantity <= 0 {
        StockStatus::OutOfStock
    } else if quantity <= low_stock_threshold {
        StockStatus::LowStock
    } else {
        StockStatus::InStock
    }
}
