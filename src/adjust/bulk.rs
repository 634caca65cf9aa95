//! BulkCoordinator - runs a batch of independent adjustments.
//!
//! There is no transaction across the batch: each item succeeds or fails on
//! its own and the counts always add up to `total`. Items are grouped by
//! variant; groups run on scoped worker threads, items within a group run in
//! list order, so same-variant changes still serialize through the store's
//! conditional update.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde::{Deserialize, Serialize};

use super::engine::{AdjustOptions, AdjustmentEngine};
use super::{AdjustmentOutcome, AdjustmentRequest};
use crate::error::LedgerError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkRequest {
    pub adjustments: Vec<AdjustmentRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResult {
    pub variant_id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<AdjustmentOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ItemResult {
    fn from_result(variant_id: &str, result: Result<AdjustmentOutcome, LedgerError>) -> Self {
        match result {
            Ok(outcome) => Self {
                variant_id: variant_id.to_string(),
                success: true,
                data: Some(outcome),
                error: None,
            },
            Err(err) => Self {
                variant_id: variant_id.to_string(),
                success: false,
                data: None,
                error: Some(err.user_message()),
            },
        }
    }

    /// The item may or may not have been applied.
    fn outcome_unknown(variant_id: &str) -> Self {
        Self {
            variant_id: variant_id.to_string(),
            success: false,
            data: None,
            error: Some("adjustment outcome unknown, re-read the record".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkResult {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub results: Vec<ItemResult>,
}

impl BulkResult {
    fn from_items(results: Vec<ItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self {
            total: results.len(),
            succeeded,
            failed: results.len() - succeeded,
            results,
        }
    }
}

#[derive(Clone)]
pub struct BulkCoordinator {
    engine: AdjustmentEngine,
    parallelism: usize,
}

impl BulkCoordinator {
    pub fn new(engine: AdjustmentEngine) -> Self {
        Self {
            engine,
            parallelism: 1,
        }
    }

    /// Number of worker threads per batch. 1 runs the batch inline.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism.max(1);
        self
    }

    pub fn adjust_bulk(&self, adjustments: &[AdjustmentRequest]) -> BulkResult {
        self.adjust_bulk_with(adjustments, AdjustOptions::default())
    }

    /// Apply every adjustment; `opts` bounds each item, not the batch.
    pub fn adjust_bulk_with(
        &self,
        adjustments: &[AdjustmentRequest],
        opts: AdjustOptions,
    ) -> BulkResult {
        let groups = group_by_variant(adjustments);
        let workers = self.parallelism.min(groups.len());

        let mut slots: Vec<Option<ItemResult>> = vec![None; adjustments.len()];

        if workers <= 1 {
            for group in &groups {
                for (index, item) in self.run_group(adjustments, group, opts) {
                    slots[index] = Some(item);
                }
            }
        } else {
            let next_group = AtomicUsize::new(0);
            let (next_group, groups) = (&next_group, &groups);
            thread::scope(|scope| {
                let handles: Vec<_> = (0..workers)
                    .map(|_| {
                        scope.spawn(move || {
                            let mut done = Vec::new();
                            loop {
                                let g = next_group.fetch_add(1, Ordering::Relaxed);
                                let Some(group) = groups.get(g) else {
                                    break;
                                };
                                done.extend(self.run_group(adjustments, group, opts));
                            }
                            done
                        })
                    })
                    .collect();

                for handle in handles {
                    match handle.join() {
                        Ok(done) => {
                            for (index, item) in done {
                                slots[index] = Some(item);
                            }
                        }
                        Err(_) => tracing::error!("bulk adjustment worker panicked"),
                    }
                }
            });
        }

        let results: Vec<ItemResult> = slots
            .into_iter()
            .zip(adjustments)
            .map(|(slot, request)| {
                slot.unwrap_or_else(|| ItemResult::outcome_unknown(&request.variant_id))
            })
            .collect();

        let result = BulkResult::from_items(results);
        tracing::info!(
            total = result.total,
            succeeded = result.succeeded,
            failed = result.failed,
            "bulk adjustment finished"
        );
        result
    }

    fn run_group(
        &self,
        adjustments: &[AdjustmentRequest],
        group: &[usize],
        opts: AdjustOptions,
    ) -> Vec<(usize, ItemResult)> {
        group
            .iter()
            .map(|&index| {
                let request = &adjustments[index];
                let attempt = panic::catch_unwind(AssertUnwindSafe(|| {
                    self.engine.adjust_with(request, opts)
                }));
                let item = match attempt {
                    Ok(result) => ItemResult::from_result(&request.variant_id, result),
                    Err(_) => {
                        tracing::error!(
                            variant_id = %request.variant_id,
                            index,
                            "bulk adjustment item panicked"
                        );
                        ItemResult::outcome_unknown(&request.variant_id)
                    }
                };
                (index, item)
            })
            .collect()
    }
}

/// Indices grouped by variant id, in order of first appearance.
fn group_by_variant(adjustments: &[AdjustmentRequest]) -> Vec<Vec<usize>> {
    let mut slot_of: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (index, request) in adjustments.iter().enumerate() {
        let slot = *slot_of
            .entry(request.variant_id.as_str())
            .or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
        groups[slot].push(index);
    }
    groups
}
