use crate::reading::Reading;

/// A fixed-capacity ring of the `N` most recent readings.
///
/// Writes never fail: once every slot has been written the oldest reading is
/// overwritten. The write cursor `next` alone recovers the age ordering, the
/// newest reading sits at `next - 1` and, after the first wrap, the oldest at
/// `next`. Slots at or beyond `next` are not history until the ring has
/// wrapped once.
///
/// There is no locking here. The owning loop is the only writer and reads back
/// between its own writes.
pub struct CircularHistory<const N: usize> {
    slots: [Reading; N],
    next: usize,
    wrapped: bool,
}

impl<const N: usize> Default for CircularHistory<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> CircularHistory<N> {
    pub const fn new() -> Self {
        Self {
            slots: [Reading::new(0.0, 0.0, 0.0, 0.0, 0.0, 0.0); N],
            next: 0,
            wrapped: false,
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Slot that the next `push` overwrites.
    pub fn position(&self) -> usize {
        self.next
    }

    pub fn is_wrapped(&self) -> bool {
        self.wrapped
    }

    /// Number of populated slots.
    pub fn len(&self) -> usize {
        if self.wrapped {
            N
        } else {
            self.next
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn reset(&mut self) {
        self.next = 0;
        self.wrapped = false;
    }

    pub fn push(&mut self, reading: Reading) {
        if N == 0 {
            return;
        }
        self.slots[self.next] = reading;
        self.next = (self.next + 1) % N;
        if self.next == 0 {
            self.wrapped = true;
        }
    }

    /// Position `offset` slots after `pos`, modulo capacity.
    pub fn wrap(&self, pos: usize, offset: usize) -> usize {
        if N == 0 {
            return 0;
        }
        (pos % N + offset % N) % N
    }

    /// Position `count` slots before `pos`, modulo capacity.
    pub fn rewind(&self, pos: usize, count: usize) -> usize {
        if N == 0 {
            return 0;
        }
        (pos % N + N - count % N) % N
    }

    pub fn oldest_position(&self) -> usize {
        if self.wrapped {
            self.next
        } else {
            0
        }
    }

    pub fn latest(&self) -> Option<&Reading> {
        if self.is_empty() {
            return None;
        }
        self.get(self.rewind(self.next, 1))
    }

    /// Reading at a physical slot, `None` if that slot was never written.
    pub fn get(&self, pos: usize) -> Option<&Reading> {
        if pos >= N || (!self.wrapped && pos >= self.next) {
            return None;
        }
        Some(&self.slots[pos])
    }

    /// Lazy sequence of `length` readings starting at `anchor`.
    ///
    /// The sequence wraps modulo capacity and is restartable by cloning. A
    /// `length` above capacity re-reads slots already visited. It stops early
    /// at the first slot that has never been written.
    pub fn read_window(&self, anchor: usize, length: usize) -> Window<'_, N> {
        Window {
            history: self,
            anchor: self.wrap(anchor, 0),
            length,
            index: 0,
        }
    }
}

#[derive(Clone)]
pub struct Window<'a, const N: usize> {
    history: &'a CircularHistory<N>,
    anchor: usize,
    length: usize,
    index: usize,
}

impl<const N: usize> Window<'_, N> {
    pub fn anchor(&self) -> usize {
        self.anchor
    }

    pub fn restart(&mut self) {
        self.index = 0;
    }
}

impl<const N: usize> Iterator for Window<'_, N> {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        if self.index >= self.length {
            return None;
        }
        let pos = self.history.wrap(self.anchor, self.index);
        match self.history.get(pos) {
            Some(reading) => {
                self.index += 1;
                Some(*reading)
            }
            None => {
                self.index = self.length;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.length - self.index))
    }
}
