use crate::feature::Exon;

/// Bijection between a strand-aware concatenation of exon intervals and a
/// transcript-local axis `[0, length)`. Built once per feature when
/// profiling is requested.
#[derive(Debug, Clone)]
pub struct CoordMapper {
    /// Genomic exon intervals, already overhang-extended, in genomic order.
    genome_exons: Vec<Exon>,
    /// Transcript-local intervals, parallel to `genome_exons`.
    transcript_exons: Vec<Exon>,
    strand: i8,
    length: u64,
}

impl CoordMapper {
    /// `Build`: strand `+` iterates exons in genomic order; strand `-`
    /// iterates in reverse, so transcript position 0 is always the
    /// feature's 5' end.
    pub fn build(exons: &[Exon], strand: i8) -> Self {
        let mut genome_exons = exons.to_vec();
        let mut transcript_exons = vec![(0u64, 0u64); exons.len()];

        let mut cursor = 0u64;
        if strand >= 0 {
            for (i, &(s, e)) in genome_exons.iter().enumerate() {
                let len = e - s;
                transcript_exons[i] = (cursor, cursor + len);
                cursor += len;
            }
        } else {
            for i in (0..genome_exons.len()).rev() {
                let (s, e) = genome_exons[i];
                let len = e - s;
                transcript_exons[i] = (cursor, cursor + len);
                cursor += len;
            }
        }
        genome_exons.sort_by_key(|&(s, _)| s);
        transcript_exons = Self::reorder_by_genome(&genome_exons, exons, &transcript_exons);

        CoordMapper {
            genome_exons,
            transcript_exons,
            strand,
            length: cursor,
        }
    }

    // Exons are kept sorted by genomic start for the linear scan in
    // `genome_to_transcript`; reorder the transcript intervals to match.
    fn reorder_by_genome(sorted: &[Exon], original: &[Exon], transcript: &[Exon]) -> Vec<Exon> {
        sorted
            .iter()
            .map(|&ge| {
                let idx = original.iter().position(|&oe| oe == ge).unwrap();
                transcript[idx]
            })
            .collect()
    }

    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn strand(&self) -> i8 {
        self.strand
    }

    /// `Genome2Transcript(g) -> (t, within)`. Linear scan of exons
    /// (genomic half-open containment `start <= g < end`).
    pub fn genome_to_transcript(&self, g: u64) -> Option<u64> {
        for (i, &(gs, ge)) in self.genome_exons.iter().enumerate() {
            if gs <= g && g < ge {
                let (ts, te) = self.transcript_exons[i];
                return Some(if self.strand >= 0 {
                    ts + (g - gs)
                } else {
                    te - 1 - (g - gs)
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_strand_is_increasing() {
        let cm = CoordMapper::build(&[(100, 110), (200, 210)], 1);
        assert_eq!(cm.length(), 20);
        assert_eq!(cm.genome_to_transcript(100), Some(0));
        assert_eq!(cm.genome_to_transcript(109), Some(9));
        assert_eq!(cm.genome_to_transcript(200), Some(10));
        assert_eq!(cm.genome_to_transcript(209), Some(19));
        assert_eq!(cm.genome_to_transcript(150), None);
    }

    #[test]
    fn reverse_strand_is_decreasing() {
        let cm = CoordMapper::build(&[(100, 110), (200, 210)], -1);
        assert_eq!(cm.length(), 20);
        // Reverse strand: the last genomic exon maps to the start of the transcript.
        assert_eq!(cm.genome_to_transcript(200), Some(9));
        assert_eq!(cm.genome_to_transcript(209), Some(0));
        assert_eq!(cm.genome_to_transcript(100), Some(19));
        assert_eq!(cm.genome_to_transcript(109), Some(10));
    }

    #[test]
    fn strictly_monotonic_round_trip() {
        let cm = CoordMapper::build(&[(0, 5), (10, 15), (20, 30)], 1);
        let mut prev = None;
        for g in [0u64, 1, 4, 10, 14, 20, 29] {
            let t = cm.genome_to_transcript(g).unwrap();
            if let Some(p) = prev {
                assert!(t > p);
            }
            prev = Some(t);
        }
    }
}
