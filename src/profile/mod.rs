//! The six projection kernels (spec §4.4): tagged dispatch, not a class
//! hierarchy, keyed by `ProfileType`. Each kernel has the same signature
//! `(&mut KernelContext) -> Result<bool>`, `bool` meaning "did the
//! projected coordinate fall inside the feature's profile axis".
//!
//! Grounded file-for-file on `original_source/lib/profile/profile_*.go`.

mod all;
mod change;
mod extension;
mod first;
mod first_last;
mod last;
mod position;
mod splice;

pub use change::ProfileChange;

use rust_htslib::bam::record::Record;

use crate::coord_mapper::CoordMapper;
use crate::config::ProfileType;
use crate::error::Result;
use crate::feature_tree::FeatureOverlap;

pub struct KernelContext<'a> {
    pub reads: &'a [Record],
    pub only_read1: bool,
    pub paired: bool,
    pub library_r1_strand: i8,
    pub overlap: &'a FeatureOverlap,
    pub feature_strand: i8,
    pub feature_genome_end: u64,
    pub coord_mapper: Option<&'a CoordMapper>,
    pub pair_count: f32,
    pub profile_change: &'a mut ProfileChange,
    pub no_map: bool,
    pub profile_untemplated: u32,
    pub profile_no_untemplated: bool,
    pub extension_length: u32,
    pub position_fraction: f64,
}

/// `FragmentCoords(reads, overlap, feat, noMap)`: the smallest and largest
/// genomic position among contributing reads mappable to a transcript
/// coordinate (identity when `no_map`), normalized so `start < end`.
pub fn fragment_coords(
    reads: &[Record],
    overlap: &FeatureOverlap,
    coord_mapper: Option<&CoordMapper>,
    no_map: bool,
) -> Option<(u64, u64)> {
    let mut min_t: Option<u64> = None;
    let mut max_t: Option<u64> = None;

    for (i, read) in reads.iter().enumerate() {
        if !overlap.read.get(i).copied().unwrap_or(false) {
            continue;
        }
        let (rs, re) = crate::align::reference_span(read);
        for &g in &[rs, re.saturating_sub(1)] {
            let t = if no_map { Some(g) } else { coord_mapper.and_then(|cm| cm.genome_to_transcript(g)) };
            if let Some(t) = t {
                min_t = Some(min_t.map_or(t, |m| m.min(t)));
                max_t = Some(max_t.map_or(t, |m| m.max(t)));
            }
        }
    }

    match (min_t, max_t) {
        (Some(a), Some(b)) if a <= b => Some((a, b + 1)),
        (Some(a), Some(b)) => Some((b, a + 1)),
        _ => None,
    }
}

pub fn apply(kind: ProfileType, ctx: &mut KernelContext) -> Result<bool> {
    match kind {
        ProfileType::First => first::apply(ctx),
        ProfileType::Last => last::apply(ctx),
        ProfileType::FirstLast => first_last::apply(ctx),
        ProfileType::Position => position::apply(ctx),
        ProfileType::All => all::apply(ctx),
        ProfileType::Splice => splice::apply(ctx),
        ProfileType::Extension => extension::apply(ctx),
    }
}
