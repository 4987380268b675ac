//! The 16 µs monotonic tick counter and the ISR-visible shared state it
//! anchors.
//!
//! `SharedIsrState` models the single-producer/single-consumer discipline
//! the MAC's concurrency model requires: a simulated interrupt source (or,
//! on an embedded target, a real timer ISR) advances the tick counter; the
//! main loop only ever reads it. No lock is needed because the field has
//! exactly one writer. Preamble/packet-valid detection is surfaced through
//! [`crate::phy::Phy`] instead (`preamble_detected`, `receive_in_progress`,
//! `receive_packet`), since on real hardware those conditions come from the
//! radio's own status registers, not a separate ISR-latched flag.

use crate::constants::TICK_DURATION_USEC;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Instant;

/// A 16 µs tick count, wrapping on overflow like the original firmware's
/// 16-bit hardware timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Tick(pub u16);

impl Tick {
    /// Wrapping difference `self - earlier`, valid as long as the true
    /// elapsed time is less than half the tick counter's range (standard
    /// wrapping-counter assumption).
    pub fn wrapping_sub(self, earlier: Tick) -> u16 {
        self.0.wrapping_sub(earlier.0)
    }

    pub fn wrapping_add(self, ticks: u16) -> Tick {
        Tick(self.0.wrapping_add(ticks))
    }
}

/// Produces the current tick count. `HardwareTickSource` implements this
/// against a real clock; tests drive the MAC directly with explicit tick
/// deltas instead of a `TickSource`.
pub trait TickSource {
    fn now(&self) -> Tick;
}

/// A `TickSource` backed by `std::time::Instant`, scaled to 16 µs ticks.
/// Stands in for the hardware timer ISR on a hosted build; an embedded
/// target swaps in a real timer-driven source without the MAC or main loop
/// changing.
pub struct HardwareTickSource {
    epoch: Instant,
}

impl HardwareTickSource {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for HardwareTickSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TickSource for HardwareTickSource {
    fn now(&self) -> Tick {
        let elapsed_us = self.epoch.elapsed().as_micros() as u64;
        Tick((elapsed_us / TICK_DURATION_USEC as u64) as u16)
    }
}

/// Written by a simulated interrupt source (or real timer ISR) and read by
/// the main loop to compute `tdelta`.
#[derive(Default)]
pub struct SharedIsrState {
    tick: AtomicU16,
}

impl SharedIsrState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&self) -> Tick {
        Tick(self.tick.load(Ordering::Acquire))
    }

    /// ISR-side: advance the tick counter by one.
    pub fn advance_tick(&self) {
        self.tick.fetch_add(1, Ordering::Release);
    }
}
