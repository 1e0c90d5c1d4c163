//! Level-wise Apriori over sorted itemsets.

use super::{OrderedStatistic, RelationRecord, RuleMiner, Transaction};
use crate::config::MiningParams;
use crate::error::{MiningError, Result};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Apriori frequent itemset miner.
///
/// Supports are exact: each frequent itemset carries the list of
/// transaction indices containing it, and a candidate's list is the
/// intersection of the two itemsets it was joined from.
#[derive(Debug, Clone, Copy, Default)]
pub struct Apriori;

impl RuleMiner for Apriori {
    fn mine(
        &self,
        transactions: &[Transaction],
        params: &MiningParams,
    ) -> Result<Vec<RelationRecord>> {
        params
            .validate()
            .map_err(|e| MiningError::InvalidConfig(e.to_string()))?;
        Ok(self.records(transactions, params))
    }
}

/// Transaction indices per item.
struct ItemIndex<T> {
    transactions: usize,
    tids: BTreeMap<T, Vec<usize>>,
}

impl<T: Ord + Clone> ItemIndex<T> {
    fn new<S: AsRef<[T]>>(transactions: &[S]) -> Self {
        let mut tids: BTreeMap<T, Vec<usize>> = BTreeMap::new();
        for (tid, transaction) in transactions.iter().enumerate() {
            let distinct: BTreeSet<&T> = transaction.as_ref().iter().collect();
            for item in distinct {
                tids.entry(item.clone()).or_default().push(tid);
            }
        }
        Self {
            transactions: transactions.len(),
            tids,
        }
    }

    fn support(&self, items: &[T]) -> f64 {
        if items.is_empty() {
            return 1.0;
        }
        if self.transactions == 0 {
            return 0.0;
        }
        let mut matching: Option<Vec<usize>> = None;
        for item in items {
            let Some(tids) = self.tids.get(item) else {
                return 0.0;
            };
            matching = Some(match matching {
                None => tids.clone(),
                Some(acc) => intersect(&acc, tids),
            });
        }
        matching.map_or(0.0, |m| m.len() as f64 / self.transactions as f64)
    }
}

/// A frequent itemset and the transactions that contain it.
struct Frequent<T> {
    items: Vec<T>,
    tids: Vec<usize>,
}

impl Apriori {
    /// Mine relation records from any collection of item lists.
    ///
    /// Records come out level by level, and within a level in the
    /// lexicographic order of their sorted items. `params` is assumed valid.
    pub fn records<T, S>(&self, transactions: &[S], params: &MiningParams) -> Vec<RelationRecord<T>>
    where
        T: Ord + Clone,
        S: AsRef<[T]>,
    {
        let mut records = Vec::new();
        if transactions.len() < 2 {
            debug!("Not enough transactions to mine ({})", transactions.len());
            return records;
        }

        let index = ItemIndex::new(transactions);
        let total = transactions.len() as f64;
        let is_frequent = |tids: &[usize]| tids.len() as f64 / total >= params.min_support;

        let mut level: Vec<Frequent<T>> = index
            .tids
            .iter()
            .filter(|(_, tids)| is_frequent(tids.as_slice()))
            .map(|(item, tids)| Frequent {
                items: vec![item.clone()],
                tids: tids.clone(),
            })
            .collect();

        let mut supports: BTreeMap<Vec<T>, f64> = BTreeMap::new();
        let mut length = 1;

        while !level.is_empty() {
            debug!("Level {}: {} frequent itemsets", length, level.len());
            for frequent in &level {
                supports.insert(frequent.items.clone(), frequent.tids.len() as f64 / total);
            }

            if length >= params.min_length {
                for frequent in &level {
                    let support = frequent.tids.len() as f64 / total;
                    let ordered_statistics =
                        ordered_statistics(&frequent.items, support, &supports, &index, params);
                    if !ordered_statistics.is_empty() {
                        records.push(RelationRecord {
                            items: frequent.items.clone(),
                            support,
                            ordered_statistics,
                        });
                    }
                }
            }

            if params.max_length.is_some_and(|max| length >= max) {
                break;
            }

            level = next_level(&level, &supports, &is_frequent);
            length += 1;
        }

        records
    }
}

/// Join itemsets sharing all but their last item, keeping candidates whose
/// every subset one item shorter is frequent and which are frequent
/// themselves.
fn next_level<T, F>(
    level: &[Frequent<T>],
    supports: &BTreeMap<Vec<T>, f64>,
    is_frequent: &F,
) -> Vec<Frequent<T>>
where
    T: Ord + Clone,
    F: Fn(&[usize]) -> bool,
{
    let mut next = Vec::new();
    for (i, a) in level.iter().enumerate() {
        let prefix = &a.items[..a.items.len() - 1];
        for b in &level[i + 1..] {
            if &b.items[..b.items.len() - 1] != prefix {
                break;
            }
            let Some(last) = b.items.last() else {
                continue;
            };

            let mut candidate = a.items.clone();
            candidate.push(last.clone());

            let all_subsets_frequent = (0..candidate.len()).all(|skip| {
                let subset: Vec<T> = candidate
                    .iter()
                    .enumerate()
                    .filter(|(idx, _)| *idx != skip)
                    .map(|(_, item)| item.clone())
                    .collect();
                supports.contains_key(&subset)
            });
            if !all_subsets_frequent {
                continue;
            }

            let tids = intersect(&a.tids, &b.tids);
            if is_frequent(&tids[..]) {
                next.push(Frequent {
                    items: candidate,
                    tids,
                });
            }
        }
    }
    next
}

/// Every `base -> add` split of `items` meeting the confidence and lift
/// thresholds, bases taken by increasing size in combination order.
fn ordered_statistics<T: Ord + Clone>(
    items: &[T],
    support: f64,
    supports: &BTreeMap<Vec<T>, f64>,
    index: &ItemIndex<T>,
    params: &MiningParams,
) -> Vec<OrderedStatistic<T>> {
    let support_of = |subset: &[T]| -> f64 {
        if subset.is_empty() {
            return 1.0;
        }
        supports
            .get(subset)
            .copied()
            .unwrap_or_else(|| index.support(subset))
    };

    let mut statistics = Vec::new();
    for base_length in 0..items.len() {
        for positions in combinations(items.len(), base_length) {
            let items_base: Vec<T> = positions.iter().map(|&p| items[p].clone()).collect();
            let items_add: Vec<T> = items
                .iter()
                .enumerate()
                .filter(|(idx, _)| !positions.contains(idx))
                .map(|(_, item)| item.clone())
                .collect();

            let confidence = support / support_of(&items_base);
            let lift = confidence / support_of(&items_add);
            if confidence < params.min_confidence || lift < params.min_lift {
                continue;
            }

            statistics.push(OrderedStatistic {
                items_base,
                items_add,
                confidence,
                lift,
            });
        }
    }
    statistics
}

/// Index combinations of `k` out of `n`, in lexicographic order.
fn combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }
    let mut result = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        result.push(current.clone());

        let Some(pivot) = (0..k).rev().find(|&i| current[i] != i + n - k) else {
            return result;
        };
        current[pivot] += 1;
        for i in pivot + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }
}

/// Intersection of two ascending index lists.
fn intersect(a: &[usize], b: &[usize]) -> Vec<usize> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}
