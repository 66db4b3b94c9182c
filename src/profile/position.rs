//! `ProfileTypePosition`: writes one count at
//! `startProfile + round((endProfile - 1 - startProfile) * fraction)`.
//! Grounded on `original_source/lib/profile/profile_position.go`.

use crate::error::Result;

use super::{fragment_coords, KernelContext};

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    match fragment_coords(ctx.reads, ctx.overlap, ctx.coord_mapper, ctx.no_map) {
        Some((start, end)) => {
            let span = (end - 1 - start) as f64;
            let idx = start as f64 + (span * ctx.position_fraction).round();
            ctx.profile_change.write(idx as u32, ctx.pair_count);
            Ok(true)
        }
        None => Ok(false),
    }
}
