//! `ProfileTypeAll`: writes `pairCount` to every index in
//! `[startProfile, endProfile)`. Grounded on
//! `original_source/lib/profile/profile_all.go`.

use crate::error::Result;

use super::{fragment_coords, KernelContext};

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    match fragment_coords(ctx.reads, ctx.overlap, ctx.coord_mapper, ctx.no_map) {
        Some((start, end)) => {
            for idx in start..end {
                ctx.profile_change.write(idx as u32, ctx.pair_count);
            }
            Ok(true)
        }
        None => Ok(false),
    }
}
