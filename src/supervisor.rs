//! Wall-clock supervision of the link.
//!
//! A handheld that is switched off or reset mid-packet simply stops
//! clocking, leaving the assembler stuck in a partial state. The supervisor
//! notices the silence and asks for a reset. It also debounces the start of
//! the real print so it never overlaps status polling from the handheld.

use std::time::{Duration, Instant};

/// Silence after which the link is reset.
pub const LINK_TIMEOUT: Duration = Duration::from_millis(3000);

/// Quiet time required after the last packet before a print may start.
pub const PRINT_QUIET_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTimings {
    pub timeout: Duration,
    pub quiet_window: Duration,
}

impl Default for LinkTimings {
    fn default() -> Self {
        LinkTimings {
            timeout: LINK_TIMEOUT,
            quiet_window: PRINT_QUIET_WINDOW,
        }
    }
}

/// Control over the bit-serial engine that clocks bytes in and out.
pub trait LinkTransport {
    /// Stop exchanging bytes and drain anything buffered.
    fn shutdown(&mut self);

    /// Restart the engine and prime the first reply byte (0x00).
    fn startup(&mut self);
}

/// Transport with nothing behind it, for replayed captures and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullTransport;

impl LinkTransport for NullTransport {
    fn shutdown(&mut self) {}

    fn startup(&mut self) {}
}

impl<T: LinkTransport + ?Sized> LinkTransport for &mut T {
    fn shutdown(&mut self) {
        (**self).shutdown()
    }

    fn startup(&mut self) {
        (**self).startup()
    }
}

#[derive(Debug, Clone)]
pub struct LinkSupervisor {
    last_packet_time: Instant,
    timings: LinkTimings,
}

impl LinkSupervisor {
    pub fn new(now: Instant) -> Self {
        Self::with_timings(now, LinkTimings::default())
    }

    pub fn with_timings(now: Instant, timings: LinkTimings) -> Self {
        LinkSupervisor {
            last_packet_time: now,
            timings,
        }
    }

    pub fn timings(&self) -> LinkTimings {
        self.timings
    }

    pub fn last_packet_time(&self) -> Instant {
        self.last_packet_time
    }

    /// Record that a packet was handled at `now`.
    pub fn touch(&mut self, now: Instant) {
        self.last_packet_time = now;
    }

    /// True when the link has been silent for longer than the timeout.
    ///
    /// The timer restarts when this fires, so a dead link is reported once
    /// per timeout period. The caller performs the actual reset.
    pub fn check_timeout(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last_packet_time) > self.timings.timeout {
            self.last_packet_time = now;
            true
        } else {
            false
        }
    }

    /// True once the final part of an image has arrived and the link has
    /// been quiet for the debounce window.
    ///
    /// Consumes `end_of_print_data`, so a print is triggered at most once.
    pub fn check_print_ready(&self, now: Instant, end_of_print_data: &mut bool) -> bool {
        if *end_of_print_data
            && now.saturating_duration_since(self.last_packet_time) >= self.timings.quiet_window
        {
            *end_of_print_data = false;
            return true;
        }
        false
    }
}
