//! Test fixtures for pipeline client testing.

use crate::core::{Product, ResultRecord, StageId, StageState, StageStatus, STAGE_COUNT};

/// Builds a product whose five stages carry the given statuses, in
/// pipeline order.
#[must_use]
pub fn product_with_statuses(statuses: [StageStatus; STAGE_COUNT]) -> Product {
    let mut product = Product::new("fixture-product");
    for (stage, status) in StageId::ALL.into_iter().zip(statuses) {
        let state = match status {
            StageStatus::Pending => StageState::pending(),
            StageStatus::Running => StageState::running(),
            StageStatus::Completed => StageState::completed(),
            StageStatus::Error => StageState::failed("fixture failure"),
        };
        product.set_stage(stage, state);
    }
    product
}

/// Builds a result record with the given name and description, with
/// stable title and date fields.
#[must_use]
pub fn record(name: &str, description: &str) -> ResultRecord {
    ResultRecord::new(name, "fixture title", "2024-06-01", description)
}
