use super::state::AnnounceEntry;

pub const HISTORY_CAPACITY: usize = 10;

/// The most recent announces, oldest first. Pushing onto a full history
/// overwrites the oldest slot.
#[derive(Debug, Clone)]
pub struct AnnounceHistory {
    slots: [Option<AnnounceEntry>; HISTORY_CAPACITY],
    head: usize,
    len: usize,
}

impl Default for AnnounceHistory {
    fn default() -> Self {
        Self {
            slots: [None; HISTORY_CAPACITY],
            head: 0,
            len: 0,
        }
    }
}

impl AnnounceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `entry`, returning the evicted oldest entry when full.
    pub fn push(&mut self, entry: AnnounceEntry) -> Option<AnnounceEntry> {
        if self.len < HISTORY_CAPACITY {
            self.slots[(self.head + self.len) % HISTORY_CAPACITY] = Some(entry);
            self.len += 1;
            None
        } else {
            let evicted = self.slots[self.head].replace(entry);
            self.head = (self.head + 1) % HISTORY_CAPACITY;
            evicted
        }
    }

    pub fn back(&self) -> Option<&AnnounceEntry> {
        if self.len == 0 {
            return None;
        }
        self.slots[(self.head + self.len - 1) % HISTORY_CAPACITY].as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &AnnounceEntry> + '_ {
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % HISTORY_CAPACITY].as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::state::AnnounceStatus;

    fn entry(sequence: u64) -> AnnounceEntry {
        AnnounceEntry {
            sequence,
            status: AnnounceStatus::Update,
            downloaded: sequence * 10,
            uploaded: 0,
            left: 1000 - sequence * 10,
            percent_downloaded: sequence as f64,
        }
    }

    #[test]
    fn test_push_below_capacity() {
        let mut history = AnnounceHistory::new();
        assert!(history.back().is_none());
        for sequence in 1..=3 {
            assert!(history.push(entry(sequence)).is_none());
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.back().unwrap().sequence, 3);
    }

    #[test]
    fn test_eleventh_push_evicts_first() {
        let mut history = AnnounceHistory::new();
        for sequence in 1..=10 {
            history.push(entry(sequence));
        }
        let evicted = history.push(entry(11)).unwrap();
        assert_eq!(evicted.sequence, 1);
        assert_eq!(history.len(), HISTORY_CAPACITY);

        let sequences: Vec<u64> = history.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, (2..=11).collect::<Vec<_>>());
        assert_eq!(history.back().unwrap().sequence, 11);
    }

    #[test]
    fn test_order_survives_many_wraps() {
        let mut history = AnnounceHistory::new();
        for sequence in 1..=37 {
            history.push(entry(sequence));
            assert!(history.len() <= HISTORY_CAPACITY);
        }
        let sequences: Vec<u64> = history.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, (28..=37).collect::<Vec<_>>());
        assert!(sequences.windows(2).all(|w| w[1] == w[0] + 1));
    }
}
