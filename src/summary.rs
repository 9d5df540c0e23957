//! Per-cluster business profile

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use crate::model::{ClusteredPoint, ClusteringResult};

/// Number of dominant values reported per field unless configured otherwise.
pub const DEFAULT_TOP_N: usize = 3;

/// A field value and how often it occurs. `None` is the missing-value bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueCount {
    pub value: Option<String>,
    pub count: usize,
}

/// Value frequencies ordered by count descending, ties by first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyTable {
    entries: Vec<ValueCount>,
}

impl FrequencyTable {
    pub fn from_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut index: HashMap<Option<&'a str>, usize> = HashMap::new();
        let mut entries: Vec<ValueCount> = Vec::new();
        for value in values {
            match index.get(&value) {
                Some(&slot) => entries[slot].count += 1,
                None => {
                    index.insert(value, entries.len());
                    entries.push(ValueCount {
                        value: value.map(str::to_owned),
                        count: 1,
                    });
                }
            }
        }
        // Stable sort keeps first-appearance order among equal counts.
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        Self { entries }
    }

    pub fn entries(&self) -> &[ValueCount] {
        &self.entries
    }

    pub fn top(&self, n: usize) -> &[ValueCount] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }
}

/// Member count and dominant attribute values of one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    /// Cluster label
    pub cluster: usize,
    /// Number of points carrying the label
    pub count: usize,
    /// Frequencies of `Kategori`, missing values counted separately
    pub categories: FrequencyTable,
    /// Frequencies of `Bentuk Badan Hukum/Usaha`, missing values counted separately
    pub legal_forms: FrequencyTable,
    /// How many entries the `top_*` accessors return
    pub top_n: usize,
}

impl ClusterSummary {
    /// Most frequent categories, at most `top_n`.
    pub fn top_categories(&self) -> &[ValueCount] {
        self.categories.top(self.top_n)
    }

    pub fn top_legal_forms(&self) -> &[ValueCount] {
        self.legal_forms.top(self.top_n)
    }
}

/// Summaries for every label present, in ascending label order.
pub fn summarize_clusters(result: &ClusteringResult, top_n: usize) -> Vec<ClusterSummary> {
    let mut groups: BTreeMap<usize, Vec<&ClusteredPoint>> = BTreeMap::new();
    for point in &result.points {
        groups.entry(point.cluster).or_default().push(point);
    }

    groups
        .into_iter()
        .map(|(cluster, members)| {
            let summary = ClusterSummary {
                cluster,
                count: members.len(),
                categories: FrequencyTable::from_values(
                    members.iter().map(|p| p.record.category.as_deref()),
                ),
                legal_forms: FrequencyTable::from_values(
                    members.iter().map(|p| p.record.legal_form.as_deref()),
                ),
                top_n,
            };
            debug!(
                "Cluster {}: {} points, {} categories, {} legal forms",
                cluster,
                summary.count,
                summary.categories.entries().len(),
                summary.legal_forms.entries().len()
            );
            summary
        })
        .collect()
}
