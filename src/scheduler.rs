//! Redraw coalescing and interval timers.
//!
//! Any number of redraw requests between two frames collapse into one paint.
//! Time is passed in as seconds (e.g. `macroquad::time::get_time()`), so the
//! scheduler itself never reads a clock.

/// Handle for an interval timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u32);

#[derive(Debug)]
struct Timer {
    id: TimerId,
    period: f64,
    next_due: f64,
}

/// Coalesced redraw flag plus interval timers.
#[derive(Debug, Default)]
pub struct RedrawScheduler {
    pending: bool,
    closed: bool,
    frames: u64,
    timers: Vec<Timer>,
    next_timer: u32,
}

impl RedrawScheduler {
    /// Nothing pending, no timers
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a repaint on the next frame. Returns `true` if this request
    /// scheduled a new frame, `false` if one was already pending or the
    /// scheduler has been shut down.
    pub fn request(&mut self) -> bool {
        if self.closed || self.pending {
            return false;
        }
        self.pending = true;
        true
    }

    /// A repaint is scheduled
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the pending request at the start of a frame.
    pub fn take(&mut self) -> bool {
        if std::mem::take(&mut self.pending) {
            self.frames += 1;
            true
        } else {
            false
        }
    }

    /// Number of frames actually painted
    pub fn frames_painted(&self) -> u64 {
        self.frames
    }

    /// Fire every `period` seconds, first at `now + period`. `None` after
    /// shutdown or for a period that is not a positive finite number.
    pub fn add_interval(&mut self, period: f64, now: f64) -> Option<TimerId> {
        if self.closed || !(period.is_finite() && period > 0.0) {
            return None;
        }
        let id = TimerId(self.next_timer);
        self.next_timer += 1;
        self.timers.push(Timer {
            id,
            period,
            next_due: now + period,
        });
        Some(id)
    }

    /// Remove a timer; unknown ids are ignored
    pub fn cancel(&mut self, id: TimerId) {
        self.timers.retain(|t| t.id != id);
    }

    /// Timers due at `now`. A timer that fell several periods behind fires
    /// once and skips the missed periods.
    pub fn poll_timers(&mut self, now: f64) -> Vec<TimerId> {
        let mut due = Vec::new();
        for t in &mut self.timers {
            if now >= t.next_due {
                due.push(t.id);
                let missed = ((now - t.next_due) / t.period).floor() + 1.0;
                t.next_due += missed * t.period;
                // period too small to register against `now`
                if !t.next_due.is_finite() || t.next_due <= now {
                    t.next_due = now + t.period;
                }
            }
        }
        due
    }

    /// Live timers
    pub fn timer_count(&self) -> usize {
        self.timers.len()
    }

    /// Drop the pending frame and every timer; later requests are ignored.
    pub fn shutdown(&mut self) {
        self.pending = false;
        self.closed = true;
        self.timers.clear();
    }

    /// [`Self::shutdown`] was called
    pub fn is_shut_down(&self) -> bool {
        self.closed
    }
}
