//! Timed events drained at tick boundaries.
//!
//! Timers never touch weights. They post a pending state change with a due
//! time on the rig clock; the frame tick pops everything that is due and
//! applies it, so all mutation stays inside the tick.

/// A pending event and the rig-clock time it becomes due.
#[derive(Clone, Debug, PartialEq)]
pub struct Timed<E> {
    pub due: f64,
    pub event: E,
    seq: u64,
}

/// Small ordered queue keyed on due time (FIFO among equal due times).
#[derive(Clone, Debug)]
pub struct TimerQueue<E> {
    pending: Vec<Timed<E>>,
    next_seq: u64,
    cancelled: bool,
}

impl<E> Default for TimerQueue<E> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_seq: 0,
            cancelled: false,
        }
    }
}

impl<E> TimerQueue<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Post `event` at `due`. Ignored once the queue is cancelled.
    pub fn schedule(&mut self, due: f64, event: E) {
        if self.cancelled {
            return;
        }
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        let at = self
            .pending
            .partition_point(|t| (t.due, t.seq) <= (due, seq));
        self.pending.insert(at, Timed { due, event, seq });
    }

    /// Keep only the pending events for which `pred` holds.
    pub fn retain(&mut self, mut pred: impl FnMut(&E) -> bool) {
        self.pending.retain(|t| pred(&t.event));
    }

    /// Pop the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<Timed<E>> {
        match self.pending.first() {
            Some(t) if t.due <= now => Some(self.pending.remove(0)),
            _ => None,
        }
    }

    pub fn next_due(&self) -> Option<f64> {
        self.pending.first().map(|t| t.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Cancel every pending event and refuse new ones.
    pub fn cancel_all(&mut self) -> usize {
        self.cancelled = true;
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}
