use crate::environments::env::State;

/// One remembered transition: the encoded `(previous state, previous action)`
/// pair, the state it led to and the reward collected on the way.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayEntry {
    pub features: Vec<f64>,
    pub resulting_state: State,
    pub reward: f64,
}

/// Fixed-capacity ring of the most recent transitions.
///
/// Once full, every push overwrites the oldest entry. A capacity of zero
/// turns the buffer off entirely.
#[derive(Clone, Debug)]
pub struct RecencyBuffer {
    storage: Vec<ReplayEntry>,
    capacity: usize,
    head: usize,
    count: usize,
}

impl RecencyBuffer {
    pub fn new(capacity: usize) -> Self {
        Self { storage: Vec::with_capacity(capacity), capacity, head: 0, count: 0 }
    }

    pub fn capacity(&self) -> usize { self.capacity }

    pub fn len(&self) -> usize { self.count }

    pub fn is_empty(&self) -> bool { self.count == 0 }

    pub fn is_enabled(&self) -> bool { self.capacity > 0 }

    pub fn push(&mut self, features: Vec<f64>, resulting_state: State, reward: f64) {
        if self.capacity == 0 {
            return;
        }
        let entry = ReplayEntry { features, resulting_state, reward };
        if self.count < self.capacity {
            let tail = (self.head + self.count) % self.capacity;
            if tail == self.storage.len() {
                self.storage.push(entry);
            } else {
                self.storage[tail] = entry;
            }
            self.count += 1;
        } else {
            self.storage[self.head] = entry;
            self.head = (self.head + 1) % self.capacity;
        }
    }

    /// Held entries in insertion order, oldest first. Calling again restarts
    /// the walk from the current oldest entry.
    pub fn entries_oldest_first(&self) -> impl Iterator<Item = &ReplayEntry> + '_ {
        (0..self.count).map(move |i| &self.storage[(self.head + i) % self.capacity])
    }
}
