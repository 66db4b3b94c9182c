//! Per-feature state split across the worker/reducer boundary: the
//! immutable part workers read concurrently (`FeatureContext`) and the
//! accumulator the reducer alone mutates (`FeatureExt`). Keeping these as
//! two parallel arrays, rather than one struct with mixed mutability,
//! lets worker threads borrow the former for the pipeline's whole
//! lifetime while the reducer holds `&mut` on the latter — no interior
//! mutability or unsafe aliasing needed. Grounded on
//! `original_source/lib/feature/feature_ext.go` (`ExtendFeatures`,
//! `WriteCounts`).

use std::sync::Arc;

use crate::coord_mapper::CoordMapper;
use crate::feature::{Exon, Feature, FeatureSet};

/// Symmetric extension of the first/last exon (in genomic order, which
/// covers both transcript-order ends regardless of strand — see
/// `SPEC_FULL.md` §10), clamped at 0.
pub fn extend_exons(exons: &[Exon], overhang: u32) -> Vec<Exon> {
    if exons.is_empty() || overhang == 0 {
        return exons.to_vec();
    }
    let mut exons = exons.to_vec();
    exons.sort_by_key(|&(s, _)| s);
    let oh = overhang as u64;
    exons.first_mut().unwrap().0 = exons.first().unwrap().0.saturating_sub(oh);
    let last_end = exons.last().unwrap().1 + oh;
    exons.last_mut().unwrap().1 = last_end;
    exons
}

/// Read-only, built once before the worker pool starts, then shared
/// across worker threads for the run's whole lifetime.
pub struct FeatureContext {
    pub feature: Arc<Feature>,
    pub coord_mapper: Option<CoordMapper>,
}

impl FeatureContext {
    pub fn genome_end(&self) -> u64 {
        self.feature.exons.iter().map(|&(_, e)| e).max().unwrap_or(0)
    }
}

/// Reducer-owned accumulator. `counts` is laid out as
/// `[totalLength, count_m1, rpkm_m1, count_m2, rpkm_m2, ...]`.
pub struct FeatureExt {
    pub counts: Vec<f64>,
    pub profile: Vec<f32>,
}

impl FeatureExt {
    pub fn total_length(&self) -> f64 {
        self.counts[0]
    }
}

/// Builds one `FeatureContext` per feature, in feature-array order.
pub fn build_feature_contexts(features: &FeatureSet, overhang: u32, profiling: bool) -> Vec<FeatureContext> {
    features
        .features
        .iter()
        .cloned()
        .map(|f| {
            let coord_mapper = if profiling && f.strand != 0 {
                let exons = extend_exons(&f.exons, overhang);
                Some(CoordMapper::build(&exons, f.strand))
            } else {
                None
            };
            FeatureContext { feature: Arc::new(f), coord_mapper }
        })
        .collect()
}

/// Builds the matching `FeatureExt` accumulator array, index-parallel to
/// `contexts`.
pub fn build_feature_exts(contexts: &[FeatureContext], n_tiers: usize) -> Vec<FeatureExt> {
    contexts
        .iter()
        .map(|ctx| {
            let length = ctx.feature.length() as f64;
            let mut counts = vec![0.0; 1 + 2 * n_tiers];
            counts[0] = length;
            let profile_len = ctx.coord_mapper.as_ref().map(|cm| cm.length()).unwrap_or(0);
            FeatureExt { counts, profile: vec![0.0; profile_len as usize] }
        })
        .collect()
}

/// `rpkm = count * (1000 / length) * (1_000_000 / tierTotal)`.
pub fn rpkm(count: f64, length: f64, tier_total: f64) -> f64 {
    if length == 0.0 || tier_total == 0.0 {
        return 0.0;
    }
    count * (1000.0 / length) * (1_000_000.0 / tier_total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overhang_extends_only_outer_edges() {
        let exons = vec![(100, 110), (200, 210)];
        let extended = extend_exons(&exons, 5);
        assert_eq!(extended, vec![(95, 110), (200, 215)]);
    }

    #[test]
    fn overhang_clamps_at_zero() {
        let exons = vec![(2, 10)];
        let extended = extend_exons(&exons, 5);
        assert_eq!(extended[0].0, 0);
    }

    #[test]
    fn rpkm_matches_count_conservation_scenario() {
        // S1: count_1(A) = 2, length 100, total 2
        let r = rpkm(2.0, 100.0, 2.0);
        assert!((r - 10_000_000.0).abs() < 1e-6);
    }
}
