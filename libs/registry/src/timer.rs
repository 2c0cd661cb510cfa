//! Registration-update debounce timer (spec §4.B, §9).
//!
//! Creating instances schedules a one-shot timer restarted on each further
//! create; when it finally fires, a single registration-update collapsing
//! all the creates since the last firing is sent. The event loop that
//! actually owns wall-clock time is the gateway binary's business (spec
//! §1); this crate only knows the [`DebounceTimer`] trait boundary, the
//! same separation `conn_pushqueue` keeps from the real CoAP transport.

/// A one-shot, restartable timer. `schedule` (re)arms the timer for
/// `delay_secs` from now, discarding any previous unfired schedule — this
/// is exactly the "restarted on each instance creation" debounce behavior.
pub trait DebounceTimer {
    fn schedule(&mut self, delay_secs: u64);
    fn cancel(&mut self);
}

/// Debounces a burst of instance creations into a single fired callback.
/// Owns no wall-clock state itself; it only tracks whether a schedule is
/// outstanding so `cancel`-on-shutdown (spec §9) is idempotent.
pub struct RegistrationUpdateDebouncer {
    delay_secs: u64,
    armed: bool,
}

impl RegistrationUpdateDebouncer {
    pub fn new(delay_secs: u64) -> Self {
        Self {
            delay_secs,
            armed: false,
        }
    }

    /// Call on every instance creation. Restarts the timer unconditionally,
    /// matching spec §4.B: "creating instances schedules a one-shot timer
    /// (1s); ... collapsing multiple creates."
    pub fn notify_instance_created(&mut self, timer: &mut impl DebounceTimer) {
        timer.schedule(self.delay_secs);
        self.armed = true;
    }

    /// Called by the event loop when the timer fires. Returns `true` if a
    /// registration-update should actually be emitted (it was armed); a
    /// stray fire with nothing armed is a no-op.
    pub fn on_timer_fired(&mut self) -> bool {
        std::mem::replace(&mut self.armed, false)
    }

    /// Release the timer on shutdown (spec §9: "cancellation on shutdown
    /// must release the timer").
    pub fn shutdown(&mut self, timer: &mut impl DebounceTimer) {
        if self.armed {
            timer.cancel();
            self.armed = false;
        }
    }
}
