//! Frame loop and deferred timers
//!
//! Host-agnostic: the host feeds wall-clock milliseconds in, the scheduler
//! says which timers are due and whether the frame loop wants another frame.
//! Timer ids are never reused, so a cancelled id can not alias a newer timer.

pub type TimerId = u64;

#[derive(Debug, Clone)]
struct Entry<T> {
    id: TimerId,
    at: f64,
    event: T,
}

/// A timer that came due
#[derive(Debug, Clone, PartialEq)]
pub struct Due<T> {
    pub id: TimerId,
    /// Scheduled deadline (not the time it was noticed)
    pub at: f64,
    pub event: T,
}

#[derive(Debug, Clone, Copy, Default)]
struct FrameLoop {
    last_frame_ms: Option<f64>,
}

/// One-shot timer queue plus the per-frame loop flag
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    /// Sorted by deadline, ties in scheduling order
    timers: Vec<Entry<T>>,
    next_id: TimerId,
    frame_loop: Option<FrameLoop>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            timers: Vec::new(),
            next_id: 1,
            frame_loop: None,
        }
    }

    /// Schedule `event` at an absolute time
    pub fn schedule_at(&mut self, at: f64, event: T) -> TimerId {
        let id = self.next_id;
        self.next_id += 1;

        let pos = self.timers.iter().position(|e| e.at > at).unwrap_or(self.timers.len());
        self.timers.insert(pos, Entry { id, at, event });
        id
    }

    /// Schedule `event` `delay_ms` after `now`
    pub fn schedule_in(&mut self, now: f64, delay_ms: f64, event: T) -> TimerId {
        self.schedule_at(now + delay_ms.max(0.0), event)
    }

    /// Cancel a pending timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.iter().position(|e| e.id == id) {
            Some(pos) => {
                self.timers.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Cancel every pending timer, returning how many were dropped
    pub fn cancel_all(&mut self) -> usize {
        let n = self.timers.len();
        self.timers.clear();
        n
    }

    /// Pop the earliest timer due at `now`
    pub fn pop_due(&mut self, now: f64) -> Option<Due<T>> {
        match self.timers.first() {
            Some(first) if first.at <= now => {
                let Entry { id, at, event } = self.timers.remove(0);
                Some(Due { id, at, event })
            }
            _ => None,
        }
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<f64> {
        self.timers.first().map(|e| e.at)
    }

    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    pub fn start_frame_loop(&mut self) {
        if self.frame_loop.is_none() {
            self.frame_loop = Some(FrameLoop::default());
        }
    }

    /// Stop the frame loop. Returns true if it was running.
    pub fn stop_frame_loop(&mut self) -> bool {
        self.frame_loop.take().is_some()
    }

    pub fn frame_loop_active(&self) -> bool {
        self.frame_loop.is_some()
    }

    /// Time since the previous frame of the running loop.
    ///
    /// The first frame after a start reports `nominal_ms`. None when the loop
    /// is stopped.
    pub fn frame_delta(&mut self, now: f64, nominal_ms: f64) -> Option<f64> {
        let frame_loop = self.frame_loop.as_mut()?;
        let dt = match frame_loop.last_frame_ms {
            Some(last) => (now - last).max(0.0),
            None => nominal_ms,
        };
        frame_loop.last_frame_ms = Some(now);
        Some(dt)
    }
}
