//! Worker-local write buffer (spec §3 `Cache`/`Packet`), grounded on
//! `original_source/cmd/geneabacus/pc.go`'s `Cache`/`Packet`/`NewCache`/`Grow`.

use std::collections::HashSet;

use crate::profile::ProfileChange;

/// One feature's partial contribution from a single worker: per-tier
/// partial counts plus the profile-kernel's write log.
pub struct Packet {
    pub feature_id: u32,
    pub counts: Vec<f32>,
    pub profile_change: ProfileChange,
}

/// Worker-local cache. Packets grow like `Vec` (amortized doubling);
/// `last_packet` is the monotone cursor into the valid prefix, reset to
/// `-1` (empty) before the cache returns to the pool.
pub struct Cache {
    packets: Vec<Packet>,
    pub last_packet: i64,
    pub input_count: f64,
    pub multi_counts: Vec<f64>,
    /// Read names inserted per tier, used only when `countTotalRealRead`
    /// asks for real-read (rather than inverse-multiplicity-weighted)
    /// tier totals; merged into the reducer's global sets at reduce time.
    pub multi_set_names: Vec<HashSet<String>>,
    pub n_input: u64,
    pub n_unique: u64,
    pub n_multi: u64,
    n_tiers: usize,
}

impl Cache {
    pub fn new(n_tiers: usize) -> Self {
        Cache {
            packets: Vec::new(),
            last_packet: -1,
            input_count: 0.0,
            multi_counts: vec![0.0; n_tiers],
            multi_set_names: vec![HashSet::new(); n_tiers],
            n_input: 0,
            n_unique: 0,
            n_multi: 0,
            n_tiers,
        }
    }

    /// Advances the cursor and returns a freshly-zeroed packet slot,
    /// reusing prior allocations when available.
    pub fn next_packet(&mut self, feature_id: u32) -> &mut Packet {
        self.last_packet += 1;
        let i = self.last_packet as usize;
        if i < self.packets.len() {
            let p = &mut self.packets[i];
            p.feature_id = feature_id;
            for c in p.counts.iter_mut() {
                *c = 0.0;
            }
            p.profile_change.reset();
        } else {
            self.packets.push(Packet {
                feature_id,
                counts: vec![0.0; self.n_tiers],
                profile_change: ProfileChange::new(),
            });
        }
        &mut self.packets[i]
    }

    pub fn packets(&self) -> &[Packet] {
        if self.last_packet < 0 {
            &[]
        } else {
            &self.packets[..=self.last_packet as usize]
        }
    }

    pub fn is_empty(&self) -> bool {
        self.last_packet < 0
    }

    /// Resets scratch state before the Cache is returned to the free-pool.
    pub fn reset(&mut self) {
        self.last_packet = -1;
        self.input_count = 0.0;
        for m in self.multi_counts.iter_mut() {
            *m = 0.0;
        }
        for s in self.multi_set_names.iter_mut() {
            s.clear();
        }
        self.n_input = 0;
        self.n_unique = 0;
        self.n_multi = 0;
    }
}
