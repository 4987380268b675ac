//! Frequency-hopping channel sequence, deterministic and netid-seeded.
//!
//! Grounded in the shape of a channel-hopping collaborator that owns a
//! channel table and a current index separate from the scheduler driving
//! it, but reduced from a fixed regional channel plan to the netid-seeded
//! pseudo-random sequence over a configurable `[MIN_FREQ, MAX_FREQ]` /
//! `NUM_CHANNELS` span, and driven by MAC phase boundaries instead of a
//! wall-clock scan interval.

use crate::constants::UNLOCKED_COUNT_RESCAN;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Maintains the current transmit/receive channel for one peer.
///
/// Both peers, given the same network ID and channel count, generate the
/// same pseudo-random hop sequence; `window_change` advances the shared
/// index and `transmit_channel`/`receive_channel` report the current one.
pub struct FreqHopper {
    num_channels: u8,
    sequence: Vec<u8>,
    index: usize,
    locked: bool,
    unlocked_periods: u8,
    rng: StdRng,
}

impl FreqHopper {
    /// Builds a hop sequence of `num_channels` distinct channel indices,
    /// shuffled deterministically from `netid` (mirrors the original
    /// firmware's `srand(param_s_get(PARAM_NETID))`).
    pub fn new(netid: u16, num_channels: u8) -> Self {
        let num_channels = num_channels.max(1);
        let mut rng = StdRng::seed_from_u64(netid as u64);
        let mut sequence: Vec<u8> = (0..num_channels).collect();
        for i in (1..sequence.len()).rev() {
            let j = rng.gen_range(0..=i);
            sequence.swap(i, j);
        }
        Self {
            num_channels,
            sequence,
            index: 0,
            locked: false,
            unlocked_periods: 0,
            rng,
        }
    }

    /// Advances to the next channel in the sequence. Called by the MAC on
    /// every entry to TX and to SILENCE1.
    pub fn window_change(&mut self) {
        self.index = (self.index + 1) % self.sequence.len();
    }

    pub fn transmit_channel(&self) -> u8 {
        self.sequence[self.index]
    }

    pub fn receive_channel(&self) -> u8 {
        self.sequence[self.index]
    }

    pub fn num_channels(&self) -> u8 {
        self.num_channels
    }

    /// Called once per `link_update` period. `packet_seen` reports whether
    /// any packet was received since the previous call.
    pub fn note_link_update(&mut self, packet_seen: bool) {
        if packet_seen {
            self.unlocked_periods = 0;
            self.locked = true;
        } else {
            self.unlocked_periods = self.unlocked_periods.saturating_add(1);
            if self.unlocked_periods >= UNLOCKED_COUNT_RESCAN {
                self.locked = false;
            }
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// When unlocked, returns a random jitter in `0..=max_jitter` ticks to
    /// add to `state_remaining`, breaking symmetric lock-out between two
    /// peers stuck hopping in lockstep without ever overlapping.
    pub fn rescan_jitter(&mut self, max_jitter: u16) -> u16 {
        if self.locked || max_jitter == 0 {
            0
        } else {
            self.rng.gen_range(0..=max_jitter)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_netid_produces_same_sequence() {
        let a = FreqHopper::new(42, 10);
        let b = FreqHopper::new(42, 10);
        assert_eq!(a.sequence, b.sequence);
    }

    #[test]
    fn different_netid_usually_differs() {
        let a = FreqHopper::new(1, 20);
        let b = FreqHopper::new(2, 20);
        assert_ne!(a.sequence, b.sequence);
    }

    #[test]
    fn window_change_cycles_through_all_channels() {
        let mut hopper = FreqHopper::new(7, 5);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..5 {
            seen.insert(hopper.transmit_channel());
            hopper.window_change();
        }
        assert_eq!(seen.len(), 5);
    }

    #[test]
    fn unlocks_after_rescan_threshold() {
        let mut hopper = FreqHopper::new(1, 4);
        hopper.note_link_update(true);
        assert!(hopper.is_locked());
        for _ in 0..UNLOCKED_COUNT_RESCAN {
            hopper.note_link_update(false);
        }
        assert!(!hopper.is_locked());
    }
}
