//! Post-processing of mined rules: temporal filter, ordering, truncation.

use super::RelationRecord;
use crate::config::RuleOrder;
use std::cmp::Ordering;

/// A rule mixing two or more temporal labels describes no real invoice,
/// since every transaction carries exactly one.
pub fn has_temporal_collision(record: &RelationRecord) -> bool {
    record.items.iter().filter(|item| item.is_temporal()).count() > 1
}

/// Keep rules with at most one temporal label, preserving order.
pub fn retain_single_temporal(records: Vec<RelationRecord>) -> Vec<RelationRecord> {
    records
        .into_iter()
        .filter(|record| !has_temporal_collision(record))
        .collect()
}

/// Order rules by `order` (descending, stable) and keep the first `top_n`.
pub fn rank_rules(
    mut records: Vec<RelationRecord>,
    order: RuleOrder,
    top_n: usize,
) -> Vec<RelationRecord> {
    let key = |record: &RelationRecord| match order {
        RuleOrder::Discovery => 0.0,
        RuleOrder::Support => record.support,
        RuleOrder::Confidence => record.best_confidence(),
        RuleOrder::Lift => record.best_lift(),
    };

    if order != RuleOrder::Discovery {
        records.sort_by(|a, b| key(b).partial_cmp(&key(a)).unwrap_or(Ordering::Equal));
    }
    records.truncate(top_n);
    records
}
