//! `ProfileTypeExtension`: single-end, unstranded. Extends from the read's
//! own aligned strand toward the feature interior by `extension_length`,
//! optionally mapped to transcript coordinates. Grounded on
//! `original_source/lib/profile/profile_extension.go`.

use crate::align;
use crate::error::Result;

use super::KernelContext;

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    let read = &ctx.reads[0];
    let (rs, re) = align::reference_span(read);
    let ext = ctx.extension_length as u64;

    let (g_start, g_end) = if !read.is_reverse() {
        (rs, (rs + ext).min(ctx.feature_genome_end))
    } else {
        (re.saturating_sub(ext), re)
    };
    if g_end <= g_start {
        return Ok(false);
    }

    let (t_start, t_end) = if ctx.no_map {
        (g_start, g_end)
    } else {
        let cm = match ctx.coord_mapper {
            Some(cm) => cm,
            None => return Ok(false),
        };
        let ts = cm.genome_to_transcript(g_start);
        let te = cm.genome_to_transcript(g_end - 1);
        match (ts, te) {
            (Some(a), Some(b)) => (a.min(b), a.max(b) + 1),
            _ => return Ok(false),
        }
    };

    for idx in t_start..t_end {
        ctx.profile_change.write(idx as u32, ctx.pair_count);
    }
    Ok(true)
}
