//! `ProfileFirstLast`: writes one count at `startProfile` and one at
//! `endProfile - 1`. Grounded on
//! `original_source/lib/profile/profile_first_last.go`.

use crate::error::Result;

use super::{fragment_coords, KernelContext};

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    match fragment_coords(ctx.reads, ctx.overlap, ctx.coord_mapper, ctx.no_map) {
        Some((start, end)) => {
            ctx.profile_change.write(start as u32, ctx.pair_count);
            ctx.profile_change.write((end - 1) as u32, ctx.pair_count);
            Ok(true)
        }
        None => Ok(false),
    }
}
