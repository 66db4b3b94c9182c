/// A growable log of `(index, delta)` pairs into a single feature's
/// profile array (spec §3), produced by a projection kernel and drained
/// by the reducer. Preallocates 100 entries and grows like a normal
/// `Vec` (amortized doubling) rather than the manual `Grow(factor)` the
/// Go original hand-rolls, since that's exactly what `Vec` already gives
/// us for free.
pub struct ProfileChange {
    idxs: Vec<u32>,
    deltas: Vec<f32>,
    /// `-1` means empty; otherwise the index of the last valid entry.
    pub last_idx: i64,
}

const INITIAL_CAPACITY: usize = 100;

impl ProfileChange {
    pub fn new() -> Self {
        ProfileChange {
            idxs: Vec::with_capacity(INITIAL_CAPACITY),
            deltas: Vec::with_capacity(INITIAL_CAPACITY),
            last_idx: -1,
        }
    }

    pub fn write(&mut self, idx: u32, delta: f32) {
        self.last_idx += 1;
        let i = self.last_idx as usize;
        if i < self.idxs.len() {
            self.idxs[i] = idx;
            self.deltas[i] = delta;
        } else {
            self.idxs.push(idx);
            self.deltas.push(delta);
        }
    }

    /// Resets the scratch cursor. Called by the reducer before the Cache
    /// (and its ProfileChanges) return to the pool.
    pub fn reset(&mut self) {
        self.last_idx = -1;
    }

    pub fn entries(&self) -> impl Iterator<Item = (u32, f32)> + '_ {
        let len = if self.last_idx < 0 { 0 } else { self.last_idx as usize + 1 };
        self.idxs[..len].iter().copied().zip(self.deltas[..len].iter().copied())
    }

    /// Whether `idx` was already written at or after entry `since`
    /// (inclusive); used by the splice kernel to dedup within one fragment.
    pub fn contains_since(&self, since: i64, idx: u32) -> bool {
        if self.last_idx < 0 {
            return false;
        }
        let from = since.max(0) as usize;
        let to = self.last_idx as usize;
        if from > to {
            return false;
        }
        self.idxs[from..=to].contains(&idx)
    }
}

impl Default for ProfileChange {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_grows_and_resets() {
        let mut pc = ProfileChange::new();
        pc.write(5, 1.0);
        pc.write(7, 2.0);
        assert_eq!(pc.entries().collect::<Vec<_>>(), vec![(5, 1.0), (7, 2.0)]);
        pc.reset();
        assert_eq!(pc.entries().count(), 0);
        pc.write(1, 0.5);
        assert_eq!(pc.entries().collect::<Vec<_>>(), vec![(1, 0.5)]);
    }

    #[test]
    fn contains_since_scopes_to_fragment() {
        let mut pc = ProfileChange::new();
        pc.write(1, 1.0);
        let marker = pc.last_idx + 1;
        pc.write(2, 1.0);
        assert!(!pc.contains_since(marker, 1));
        assert!(pc.contains_since(marker, 2));
        assert!(pc.contains_since(0, 1));
    }
}
