//! Shared fixtures for ledger integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use stock_ledger::{
    AdjustmentRequest, CatalogEntry, InMemoryLedger, LedgerConfig, StockSettings,
};

/// A ledger whose variants are registered and counted in with one audited
/// "initial count" adjustment each.
pub fn seeded(stock: &[(&str, i64)]) -> InMemoryLedger {
    seeded_with(LedgerConfig::default(), stock)
}

pub fn seeded_with(config: LedgerConfig, stock: &[(&str, i64)]) -> InMemoryLedger {
    let fixture = InMemoryLedger::new(config);
    for (variant_id, quantity) in stock {
        fixture
            .ledger
            .register(variant_id, Some(sku_for(variant_id)), &StockSettings::default())
            .unwrap();
        if *quantity > 0 {
            fixture
                .ledger
                .adjust(&AdjustmentRequest::set(*variant_id, *quantity, "initial count"))
                .unwrap();
        }
    }
    fixture
}

pub fn sku_for(variant_id: &str) -> String {
    format!("SKU-{}", variant_id.to_uppercase())
}

pub fn add_product(fixture: &InMemoryLedger, variant_id: &str, name: &str, price_cents: i64) {
    fixture
        .catalog
        .put(
            variant_id,
            CatalogEntry::new(name, Decimal::new(price_cents, 2)).with_sku(sku_for(variant_id)),
        )
        .unwrap();
}

pub fn sell(fixture: &InMemoryLedger, variant_id: &str, quantity: u64, at: DateTime<Utc>) {
    fixture.sales.record_sale(variant_id, quantity, at).unwrap();
}
