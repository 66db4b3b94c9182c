//! `ProfileTypeLast`, symmetric to `first` — requires a stranded library,
//! no untemplated-nucleotide handling. Grounded on
//! `original_source/lib/profile/profile_last.go`.

use crate::align;
use crate::error::{GeneAbacusError, Result};

use super::KernelContext;

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    if ctx.library_r1_strand == 0 {
        return Err(GeneAbacusError::FormatError(
            "profile kernel 'last' requires a stranded library".into(),
        ));
    }

    let n = ctx.reads.len();
    let idx = if ctx.library_r1_strand == 1 { if n == 2 { 1 } else { 0 } } else { 0 };

    if !ctx.overlap.read.get(idx).copied().unwrap_or(false) {
        return Ok(false);
    }

    let read = &ctx.reads[idx];
    let (rs, re) = align::reference_span(read);
    let g = if ctx.feature_strand >= 0 { re - 1 } else { rs };

    let t = if ctx.no_map { Some(g) } else { ctx.coord_mapper.and_then(|cm| cm.genome_to_transcript(g)) };
    match t {
        Some(t) => {
            ctx.profile_change.write(t as u32, ctx.pair_count);
            Ok(true)
        }
        None => Ok(false),
    }
}
