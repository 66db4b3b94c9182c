//! `ProfileTypeSplice`: walks each contributing read's CIGAR, writing one
//! count per transcript coordinate for every reference-and-query-consuming
//! (match/mismatch) position, deduped within this fragment. Reference-skip
//! (`N`) regions are never written. Grounded on
//! `original_source/lib/profile/profile_splice.go`.

use rust_htslib::bam::record::Cigar;

use crate::error::Result;

use super::KernelContext;

pub fn apply(ctx: &mut KernelContext) -> Result<bool> {
    let start_marker = ctx.profile_change.last_idx + 1;
    let mut wrote_any = false;

    for (i, read) in ctx.reads.iter().enumerate() {
        if !ctx.overlap.read.get(i).copied().unwrap_or(false) {
            continue;
        }
        let mut ref_pos = read.pos() as u64;
        for c in read.cigar().iter() {
            match *c {
                Cigar::Match(len) | Cigar::Equal(len) | Cigar::Diff(len) => {
                    for g in ref_pos..ref_pos + len as u64 {
                        let t = if ctx.no_map {
                            Some(g)
                        } else {
                            ctx.coord_mapper.and_then(|cm| cm.genome_to_transcript(g))
                        };
                        if let Some(t) = t {
                            let idx = t as u32;
                            if !ctx.profile_change.contains_since(start_marker, idx) {
                                ctx.profile_change.write(idx, ctx.pair_count);
                                wrote_any = true;
                            }
                        }
                    }
                    ref_pos += len as u64;
                }
                Cigar::Del(len) | Cigar::RefSkip(len) => {
                    ref_pos += len as u64;
                }
                _ => {}
            }
        }
    }

    Ok(wrote_any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord_mapper::CoordMapper;
    use crate::feature_tree::FeatureOverlap;
    use crate::profile::ProfileChange;
    use rust_htslib::bam::record::{Cigar as C, CigarString, Record};

    fn record_with(pos: i64, cigar: Vec<C>, len: usize) -> Record {
        let mut rec = Record::new();
        rec.set(b"r1", Some(&CigarString(cigar)), &vec![b'A'; len], &vec![30u8; len]);
        rec.set_pos(pos);
        rec
    }

    #[test]
    fn splice_dedups_within_one_fragment() {
        // 10M90N10M at genomic 100, exons [[100,110),[200,210)] strand +.
        let read = record_with(100, vec![C::Match(10), C::RefSkip(90), C::Match(10)], 20);
        let coord_mapper = CoordMapper::build(&[(100, 110), (200, 210)], 1);
        let overlap = FeatureOverlap { length: 20, read: vec![true] };
        let mut profile_change = ProfileChange::new();
        let mut ctx = KernelContext {
            reads: std::slice::from_ref(&read),
            only_read1: false,
            paired: false,
            library_r1_strand: 0,
            overlap: &overlap,
            feature_strand: 1,
            feature_genome_end: 210,
            coord_mapper: Some(&coord_mapper),
            pair_count: 1.0,
            profile_change: &mut profile_change,
            no_map: false,
            profile_untemplated: 0,
            profile_no_untemplated: false,
            extension_length: 0,
            position_fraction: 0.5,
        };
        let within = apply(&mut ctx).unwrap();
        assert!(within);

        let mut profile = vec![0.0f32; 20];
        for (idx, delta) in profile_change.entries() {
            profile[idx as usize] += delta;
        }
        assert!(profile.iter().all(|&v| (v - 1.0).abs() < 1e-6));
    }
}
