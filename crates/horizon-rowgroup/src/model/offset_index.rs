//! Flat-row offsets for a sequence of variable-size groups.
//!
//! Group `i` occupies `span(i)` consecutive flat rows (its lead row plus its
//! sub-rows). [`GroupOffsetIndex`] caches the first flat row of every group so
//! that both directions are cheap:
//!
//! - group → lead row: an array read;
//! - flat row → group: a binary search over the (strictly increasing) offsets.
//!
//! The index holds no identity, only counts. It is a derived cache that the
//! owning model rebuilds, from the first invalidated group onwards, inside the
//! same call that changes group structure.

use horizon_rowgroup_core::PerfSpan;
use horizon_rowgroup_core::logging::targets;

/// Default growth increment of the offsets array.
pub const DEFAULT_OFFSET_GROWTH: usize = 64;

/// Start rows of a sequence of groups.
///
/// # Example
///
/// ```
/// use horizon_rowgroup::model::GroupOffsetIndex;
///
/// // Group A has 2 sub-rows, group B has none.
/// let spans = [3, 1];
/// let mut index = GroupOffsetIndex::new();
/// index.rebuild_from(0, spans.len(), |g| spans[g]);
///
/// assert_eq!(index.row_count(), 4);
/// assert_eq!(index.group_number(2), Some(0));
/// assert_eq!(index.group_number(3), Some(1));
/// assert_eq!(index.lead_row(1), Some(3));
/// ```
#[derive(Debug, Clone)]
pub struct GroupOffsetIndex {
    /// `offsets[..group_count]` is valid; the tail is spare capacity.
    offsets: Vec<usize>,
    group_count: usize,
    row_count: usize,
    growth: usize,
}

impl Default for GroupOffsetIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupOffsetIndex {
    /// Creates an empty index with the default growth increment.
    pub fn new() -> Self {
        Self::with_growth(DEFAULT_OFFSET_GROWTH)
    }

    /// Creates an empty index that grows its backing array by `growth` slots
    /// at a time.
    pub fn with_growth(growth: usize) -> Self {
        Self {
            offsets: Vec::new(),
            group_count: 0,
            row_count: 0,
            growth: growth.max(1),
        }
    }

    /// Number of groups covered.
    pub fn group_count(&self) -> usize {
        self.group_count
    }

    /// Total number of flat rows covered.
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of offset slots currently allocated.
    pub fn capacity(&self) -> usize {
        self.offsets.len()
    }

    /// The valid offsets, one per group.
    pub fn offsets(&self) -> &[usize] {
        &self.offsets[..self.group_count]
    }

    /// The group that contains `flat_row`.
    ///
    /// Rows past the end resolve to the last group, so a row that was just
    /// appended to the last group resolves even before a view re-queries the
    /// row count. Returns `None` only when there are no groups.
    pub fn group_number(&self, flat_row: usize) -> Option<usize> {
        if self.group_count == 0 {
            return None;
        }
        match self.offsets().binary_search(&flat_row) {
            Ok(group) => Some(group),
            // offsets[0] == 0, so the insertion point is never 0.
            Err(insertion_point) => Some(insertion_point - 1),
        }
    }

    /// The first flat row of `group`.
    pub fn lead_row(&self, group: usize) -> Option<usize> {
        self.offsets().get(group).copied()
    }

    /// Number of flat rows occupied by `group`.
    pub fn span(&self, group: usize) -> Option<usize> {
        let start = self.lead_row(group)?;
        let end = self.lead_row(group + 1).unwrap_or(self.row_count);
        Some(end - start)
    }

    /// Recomputes the offsets of groups `from..group_count`.
    ///
    /// `span(i)` must return the number of flat rows of group `i` (lead row
    /// included, so at least 1). Offsets before `from` are trusted as-is.
    pub fn rebuild_from<F>(&mut self, from: usize, group_count: usize, span: F)
    where
        F: Fn(usize) -> usize,
    {
        let _perf = (from == 0 && group_count > self.growth).then(|| PerfSpan::new("offset_rebuild"));

        if group_count > self.offsets.len() {
            let needed = group_count - self.offsets.len();
            let chunks = needed.div_ceil(self.growth);
            self.offsets.resize(self.offsets.len() + chunks * self.growth, 0);
        }

        let from = from.min(group_count).min(self.group_count);
        let mut next = if from == 0 { 0 } else { self.offsets[from - 1] + span(from - 1) };
        for group in from..group_count {
            self.offsets[group] = next;
            next += span(group);
        }

        self.group_count = group_count;
        self.row_count = next;
        tracing::trace!(
            target: targets::MODEL,
            from,
            group_count,
            row_count = next,
            "rebuilt group offsets"
        );
    }

    /// Drops every group.
    pub fn clear(&mut self) {
        self.group_count = 0;
        self.row_count = 0;
    }

    /// Recomputes the offsets from scratch and compares them with the cache.
    ///
    /// Returns the first group whose cached offset is wrong, or `None` when
    /// the cache is consistent.
    pub fn verify<F>(&self, group_count: usize, span: F) -> Option<usize>
    where
        F: Fn(usize) -> usize,
    {
        if group_count != self.group_count {
            return Some(group_count.min(self.group_count));
        }
        let mut expected = 0;
        for group in 0..group_count {
            if self.offsets[group] != expected {
                return Some(group);
            }
            expected += span(group);
        }
        (expected != self.row_count).then_some(group_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn build(spans: &[usize]) -> GroupOffsetIndex {
        let mut index = GroupOffsetIndex::with_growth(4);
        index.rebuild_from(0, spans.len(), |g| spans[g]);
        index
    }

    #[test]
    fn test_header_detail_scenario() {
        let index = build(&[3, 1]);
        assert_eq!(index.offsets(), &[0, 3]);
        assert_eq!(index.group_number(0), Some(0));
        assert_eq!(index.group_number(2), Some(0));
        assert_eq!(index.group_number(3), Some(1));
        assert_eq!(index.lead_row(1), Some(3));
        assert_eq!(index.lead_row(2), None);
        assert_eq!(index.span(0), Some(3));
        assert_eq!(index.span(1), Some(1));
    }

    #[test]
    fn test_empty() {
        let index = GroupOffsetIndex::new();
        assert_eq!(index.group_number(0), None);
        assert_eq!(index.lead_row(0), None);
        assert_eq!(index.row_count(), 0);
    }

    #[test]
    fn test_row_past_end_resolves_to_last_group() {
        let index = build(&[2, 2]);
        assert_eq!(index.group_number(4), Some(1));
        assert_eq!(index.group_number(100), Some(1));
    }

    #[test]
    fn test_grows_in_fixed_increments() {
        let mut index = GroupOffsetIndex::with_growth(4);
        index.rebuild_from(0, 1, |_| 1);
        assert_eq!(index.capacity(), 4);
        index.rebuild_from(0, 5, |_| 1);
        assert_eq!(index.capacity(), 8);
        index.rebuild_from(0, 17, |_| 1);
        assert_eq!(index.capacity(), 20);
    }

    #[test]
    fn test_partial_rebuild_after_resize() {
        let mut spans = vec![1, 3, 2, 1];
        let mut index = build(&spans);

        spans[2] = 5;
        index.rebuild_from(2, spans.len(), |g| spans[g]);
        assert_eq!(index.offsets(), &[0, 1, 4, 9]);
        assert_eq!(index.row_count(), 10);
        assert_eq!(index.verify(spans.len(), |g| spans[g]), None);
    }

    #[test]
    fn test_verify_detects_stale_cache() {
        let mut spans = vec![1, 3, 2];
        let index = build(&spans);
        spans[0] = 2;
        assert_eq!(index.verify(spans.len(), |g| spans[g]), Some(1));
    }

    #[test]
    fn test_shrink_group_count() {
        let mut spans = vec![2, 2, 2];
        let mut index = build(&spans);
        spans.remove(1);
        index.rebuild_from(1, spans.len(), |g| spans[g]);
        assert_eq!(index.offsets(), &[0, 2]);
        assert_eq!(index.row_count(), 4);
    }

    proptest! {
        #[test]
        fn prop_offsets_match_spans(spans in prop::collection::vec(1usize..6, 0..40)) {
            let index = build(&spans);
            for g in 0..spans.len() {
                let lead = index.lead_row(g).unwrap();
                prop_assert_eq!(index.group_number(lead), Some(g));
                prop_assert_eq!(index.span(g), Some(spans[g]));
                for row in lead..lead + spans[g] {
                    prop_assert_eq!(index.group_number(row), Some(g));
                }
            }
            prop_assert_eq!(index.row_count(), spans.iter().sum::<usize>());
        }

        #[test]
        fn prop_partial_rebuild_equals_full(
            spans in prop::collection::vec(1usize..6, 1..30),
            at in 0usize..30,
            new_span in 1usize..6,
        ) {
            let mut spans = spans;
            let mut index = build(&spans);
            let at = at % spans.len();
            spans[at] = new_span;
            index.rebuild_from(at, spans.len(), |g| spans[g]);
            prop_assert_eq!(index.verify(spans.len(), |g| spans[g]), None);
        }
    }
}
