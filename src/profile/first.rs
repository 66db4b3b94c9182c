//! `ProfileTypeFirst`, grounded on `original_source/lib/profile/profile_first.go`.

use crate::align;
use crate::error::{GeneAbacusError, Result};

use super::KernelContext;

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    if ctx.library_r1_strand == 0 {
        return Err(GeneAbacusError::FormatError(
            "profile kernel 'first' requires a stranded library".into(),
        ));
    }

    let n = ctx.reads.len();
    let idx = if ctx.library_r1_strand == 1 { 0 } else if n == 2 { 1 } else { 0 };

    if !ctx.overlap.read.get(idx).copied().unwrap_or(false) {
        return Ok(false);
    }

    let read = &ctx.reads[idx];
    let (rs, re) = align::reference_span(read);
    let mut g = if ctx.feature_strand >= 0 { rs } else { re - 1 };

    if ctx.profile_untemplated > 0 {
        let recon = align::reconstruct(read);
        let read_strand: i8 = if read.is_reverse() { -1 } else { 1 };
        let len_tu = align::trim_untemplated(&recon.symbol, ctx.profile_untemplated as usize, read_strand);
        if len_tu > 0 {
            if ctx.profile_no_untemplated {
                return Ok(false);
            }
            match align::shift_pos(read, len_tu as u64, read_strand) {
                Some((new_pos, true)) => g = new_pos as u64,
                _ => return Ok(false),
            }
        }
    }

    let t = if ctx.no_map { Some(g) } else { ctx.coord_mapper.and_then(|cm| cm.genome_to_transcript(g)) };
    match t {
        Some(t) => {
            ctx.profile_change.write(t as u32, ctx.pair_count);
            Ok(true)
        }
        None => Ok(false),
    }
}
