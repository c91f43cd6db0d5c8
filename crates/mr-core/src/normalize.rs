//! Percentile normalizer.
//!
//! The corpus sample is an explicit [`NormContext`] value built from persisted
//! derived records. It is never global: a batch builds one context at start and
//! updates it as it saves, a single recompute builds a fresh one.
//!
//! Percentiles use the mid-rank definition
//! `(count below v + 0.5 * count equal v) / n * 100`. An empty sample falls back
//! to the linear `v / 120 * 100`.

use mr_common::{
    Axis, AxisScores, DerivedRecord, EntityId, PercentileScores, RawScores, MAX_RAW_SCORE,
};
use std::collections::BTreeMap;

/// Sorted per-axis samples of the corpus raw scores.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormContext {
    samples: [Vec<u8>; 5],
    members: BTreeMap<EntityId, RawScores>,
}

impl NormContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(id, scores)` pairs. A repeated id keeps its last scores.
    pub fn from_scores(scores: impl IntoIterator<Item = (EntityId, RawScores)>) -> Self {
        let members: BTreeMap<EntityId, RawScores> = scores.into_iter().collect();
        let mut samples: [Vec<u8>; 5] = Default::default();
        for raw in members.values() {
            for (axis, value) in raw.iter() {
                samples[axis.index()].push(value);
            }
        }
        for sample in &mut samples {
            sample.sort_unstable();
        }
        Self { samples, members }
    }

    /// Number of entities in the sample.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains_key(&id)
    }

    pub fn scores_of(&self, id: EntityId) -> Option<&RawScores> {
        self.members.get(&id)
    }

    /// Sorted sample for one axis.
    pub fn sample(&self, axis: Axis) -> &[u8] {
        &self.samples[axis.index()]
    }

    /// Insert or replace an entity's scores, keeping every sample sorted.
    pub fn upsert(&mut self, id: EntityId, raw: RawScores) {
        if let Some(old) = self.members.insert(id, raw) {
            for (axis, value) in old.iter() {
                remove_one(&mut self.samples[axis.index()], value);
            }
        }
        for (axis, value) in raw.iter() {
            let sample = &mut self.samples[axis.index()];
            let at = sample.partition_point(|v| *v < value);
            sample.insert(at, value);
        }
    }

    /// Drop an entity from the sample.
    pub fn remove(&mut self, id: EntityId) -> Option<RawScores> {
        let old = self.members.remove(&id)?;
        for (axis, value) in old.iter() {
            remove_one(&mut self.samples[axis.index()], value);
        }
        Some(old)
    }

    /// Percentiles for `id` with its fresh scores counted in the sample.
    ///
    /// Any previously stored scores for `id` are replaced by `raw`. When no
    /// other entity is in the sample the linear fallback applies. Returns the
    /// percentiles and the sample size, self included.
    pub fn normalize_including(&self, id: EntityId, raw: &RawScores) -> (PercentileScores, usize) {
        let previous = self.members.get(&id);
        let others = self.members.len() - usize::from(previous.is_some());
        if others == 0 {
            return (raw.map(|_, v| linear_percentile(v)), 1);
        }

        let n = others + 1;
        let percentiles = raw.map(|axis, value| {
            let sample = self.sample(axis);
            let (mut below, mut equal) = rank_counts(sample, value);
            if let Some(old) = previous.map(|p| p.get(axis)) {
                if old < value {
                    below -= 1;
                } else if old == value {
                    equal -= 1;
                }
            }
            equal += 1;
            mid_rank(below, equal, n)
        });
        (percentiles, n)
    }
}

fn remove_one(sample: &mut Vec<u8>, value: u8) {
    if let Ok(at) = sample.binary_search(&value) {
        sample.remove(at);
    }
}

/// `(count < value, count == value)` in a sorted sample.
fn rank_counts(sample: &[u8], value: u8) -> (usize, usize) {
    let below = sample.partition_point(|v| *v < value);
    let through = sample.partition_point(|v| *v <= value);
    (below, through - below)
}

fn mid_rank(below: usize, equal: usize, n: usize) -> f64 {
    let p = (below as f64 + 0.5 * equal as f64) / n as f64 * 100.0;
    p.clamp(0.0, 100.0)
}

/// Mid-rank percentile of `value` in a sorted sample; linear when empty.
pub fn mid_rank_percentile(sample: &[u8], value: u8) -> f64 {
    if sample.is_empty() {
        return linear_percentile(value);
    }
    let (below, equal) = rank_counts(sample, value);
    mid_rank(below, equal, sample.len())
}

/// Cold-start percentile: the raw score's share of the scale.
pub fn linear_percentile(value: u8) -> f64 {
    (f64::from(value.min(MAX_RAW_SCORE)) / f64::from(MAX_RAW_SCORE) * 100.0).clamp(0.0, 100.0)
}

/// Build a context from persisted derived records.
pub fn build_context<'a>(records: impl IntoIterator<Item = &'a DerivedRecord>) -> NormContext {
    NormContext::from_scores(records.into_iter().map(|r| (r.entity_id, r.scores)))
}

/// Percentiles of `raw` against the context as-is.
pub fn normalize(raw: &RawScores, ctx: &NormContext) -> PercentileScores {
    AxisScores::from_fn(|axis| mid_rank_percentile(ctx.sample(axis), raw.get(axis)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn id(n: u64) -> EntityId {
        EntityId(n)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_mid_rank_definition() {
        let sample = [10, 20, 20, 30];
        assert!(close(mid_rank_percentile(&sample, 20), 50.0));
        assert!(close(mid_rank_percentile(&sample, 10), 12.5));
        assert!(close(mid_rank_percentile(&sample, 5), 0.0));
        assert!(close(mid_rank_percentile(&sample, 31), 100.0));
    }

    #[test]
    fn test_cold_start_linear() {
        let ctx = NormContext::new();
        let p = normalize(&RawScores::splat(60), &ctx);
        assert!(close(p.offense, 50.0));
        assert!(close(linear_percentile(120), 100.0));
        assert!(close(linear_percentile(0), 0.0));
    }

    #[test]
    fn test_upsert_replaces_previous_scores() {
        let mut ctx = NormContext::from_scores([(id(1), RawScores::splat(10))]);
        ctx.upsert(id(1), RawScores::splat(90));
        ctx.upsert(id(2), RawScores::splat(40));
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.sample(Axis::Tempo), &[40, 90]);
        assert_eq!(ctx.remove(id(1)), Some(RawScores::splat(90)));
        assert_eq!(ctx.sample(Axis::Tempo), &[40]);
    }

    #[test]
    fn test_build_context_from_records() {
        use crate::test_utils::record_with_scores;
        let records = vec![
            record_with_scores(1, RawScores::splat(30)),
            record_with_scores(2, RawScores::splat(10)),
        ];
        let ctx = build_context(&records);
        assert_eq!(ctx.len(), 2);
        assert_eq!(ctx.sample(Axis::Offense), &[10, 30]);
        assert!(ctx.contains(id(2)));
    }

    #[test]
    fn test_include_self_replaces_stale_value() {
        // Entity 1 stored at 10; others at 50 and 70.
        let ctx = NormContext::from_scores([
            (id(1), RawScores::splat(10)),
            (id(2), RawScores::splat(50)),
            (id(3), RawScores::splat(70)),
        ]);
        // Fresh score 60: one below, self equal, one above.
        let (p, n) = ctx.normalize_including(id(1), &RawScores::splat(60));
        assert_eq!(n, 3);
        assert!(close(p.offense, 50.0));

        // Unknown entity joins the sample.
        let (p, n) = ctx.normalize_including(id(9), &RawScores::splat(70));
        assert_eq!(n, 4);
        // below: 10, 50 -> 2; equal: 70 + self -> 2
        assert!(close(p.offense, 75.0));
    }

    #[test]
    fn test_include_self_cold_start_when_alone() {
        let ctx = NormContext::from_scores([(id(1), RawScores::splat(10))]);
        let (p, n) = ctx.normalize_including(id(1), &RawScores::splat(60));
        assert_eq!(n, 1);
        assert!(close(p.control, 50.0));
    }

    #[test]
    fn test_including_matches_upserted_context() {
        let mut ctx = NormContext::from_scores([
            (id(1), RawScores::splat(25)),
            (id(2), RawScores::splat(60)),
            (id(3), RawScores::splat(60)),
        ]);
        let fresh = RawScores::splat(60);
        let (incl, _) = ctx.normalize_including(id(1), &fresh);
        ctx.upsert(id(1), fresh);
        assert_eq!(incl, normalize(&fresh, &ctx));
    }

    proptest! {
        #[test]
        fn prop_percentiles_bounded(
            corpus in proptest::collection::vec(0u8..=120, 0..40),
            value in 0u8..=120,
        ) {
            let ctx = NormContext::from_scores(
                corpus.iter().enumerate().map(|(i, v)| (EntityId(i as u64 + 1), RawScores::splat(*v))),
            );
            let p = normalize(&RawScores::splat(value), &ctx);
            let (q, _) = ctx.normalize_including(EntityId(1), &RawScores::splat(value));
            for (_, v) in p.iter().chain(q.iter()) {
                prop_assert!((0.0..=100.0).contains(&v));
            }
        }
    }
}
