//! List merging and cohort definition roll-up.

use std::collections::BTreeSet;

use cohort_core::{CohortDefinition, SegmentPair};

/// Element types that can be accumulated with [`merge_list`].
///
/// The `Ord` bound keeps every merged list totally ordered, so a list can
/// never mix identifiers of incomparable kinds.
pub trait Mergeable: Ord + Clone {
    /// Blank values are dropped while merging.
    fn is_blank(&self) -> bool {
        false
    }
}

impl Mergeable for String {
    fn is_blank(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Mergeable for i64 {}

impl Mergeable for SegmentPair {
    fn is_blank(&self) -> bool {
        self.provider.trim().is_empty() || self.segment.trim().is_empty()
    }
}

/// Concatenate `a` and `b`, drop blanks and duplicates, return sorted.
pub fn merge_list<T: Mergeable>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter()
        .chain(b)
        .filter(|value| !value.is_blank())
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// [`merge_list`] with a single scalar on the right-hand side.
pub fn merge_item<T: Mergeable>(a: &[T], item: T) -> Vec<T> {
    merge_list(a, std::slice::from_ref(&item))
}

/// Folds the list-valued signals of one definition into another.
pub trait CohortMerger {
    /// Merge every non-empty list field of `source` into `self`. Identity
    /// fields (`name`, `id`, `code`) and scalar settings are left alone.
    fn merge(&mut self, source: &CohortDefinition);
}

impl CohortMerger for CohortDefinition {
    fn merge(&mut self, source: &CohortDefinition) {
        merge_field(&mut self.segments, &source.segments);
        merge_field(&mut self.accurate_segments, &source.accurate_segments);
        merge_field(&mut self.volume_segments, &source.volume_segments);
        merge_field(&mut self.obsidian_segments, &source.obsidian_segments);
        merge_field(&mut self.keywords, &source.keywords);
        merge_field(&mut self.taxonomy, &source.taxonomy);
        merge_field(&mut self.urls, &source.urls);
        merge_field(&mut self.second_party_segments, &source.second_party_segments);
        merge_field(&mut self.third_party_segments, &source.third_party_segments);
        tracing::debug!(target_name = %self.name, source_name = %source.name, "Merged cohort definition");
    }
}

fn merge_field<T: Mergeable>(target: &mut Option<Vec<T>>, source: &Option<Vec<T>>) {
    let Some(incoming) = source.as_ref().filter(|values| !values.is_empty()) else {
        return;
    };
    *target = Some(match target.take() {
        Some(existing) => merge_list(&existing, incoming),
        None => incoming.clone(),
    });
}
