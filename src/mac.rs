//! The TDM MAC: a four-phase state machine that divides airtime between two
//! half-duplex peers without a shared clock, synchronized purely by the
//! trailer each side appends to its packets.

use crate::constants::{
    LBT_MIN_TIME_USEC, LINK_UPDATE_PERIOD_TICKS, MAX_WINDOW_TICKS, PACKET_OVERHEAD,
    REGULATORY_MAX_WINDOW_TICKS, TICK_DURATION_USEC,
};
use crate::duty_cycle::DutyCycleController;
use crate::error::TdmError;
use crate::fhop::FreqHopper;
use crate::framer::PacketFramer;
use crate::phy::Phy;
use crate::power_hunt::PowerHunt;
use crate::statistics::LinkStatistics;
use crate::trailer::Trailer;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Current position in the TX -> SILENCE1 -> RX -> SILENCE2 -> TX cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Tx,
    Silence1,
    Rx,
    Silence2,
}

impl Phase {
    fn next(self) -> Phase {
        match self {
            Phase::Tx => Phase::Silence1,
            Phase::Silence1 => Phase::Rx,
            Phase::Rx => Phase::Silence2,
            Phase::Silence2 => Phase::Tx,
        }
    }
}

/// Round parameters derived once from the configured air rate and never
/// mutated afterwards.
#[derive(Debug, Clone, Copy)]
pub struct RoundParams {
    pub ticks_per_byte: u32,
    pub packet_latency: u32,
    pub silence_period: u32,
    pub tx_window_width: u32,
    pub max_data_packet_length: usize,
}

impl RoundParams {
    /// Computes round sizing the same way `tdm_init`'s `try_again` loop
    /// does: start from a chunk size sized to hold three full packets, and
    /// shrink it until `2 * (silence_period + tx_window_width)` fits within
    /// the regulatory/trailer window cap.
    pub fn new(ticks_per_byte: u32, preamble_bits: u32, golay_enabled: bool, mtu: usize) -> Self {
        let preamble_ticks = (preamble_bits * ticks_per_byte) / 8;
        let base_packet_latency = preamble_ticks + 4 * ticks_per_byte;

        let (ticks_per_byte, packet_latency) = if golay_enabled {
            (ticks_per_byte * 2, base_packet_latency + 4 * ticks_per_byte * 2)
        } else {
            (ticks_per_byte, base_packet_latency)
        };

        let max_window = MAX_WINDOW_TICKS.min(REGULATORY_MAX_WINDOW_TICKS);
        let trailer_size = crate::constants::TRAILER_SIZE;
        let max_data_packet_length = if golay_enabled { mtu / 2 } else { mtu }.saturating_sub(trailer_size);

        let silence_period = 2 * packet_latency;
        let mut tx_chunk_size = max_data_packet_length;
        loop {
            let tx_window_width = packet_latency + tx_chunk_size as u32 * ticks_per_byte;
            if tx_window_width <= max_window || tx_chunk_size <= 1 {
                return Self {
                    ticks_per_byte,
                    packet_latency,
                    silence_period,
                    tx_window_width: tx_window_width.min(max_window),
                    max_data_packet_length: tx_chunk_size.max(1),
                };
            }
            tx_chunk_size = (tx_chunk_size * 3) / 4;
        }
    }

    pub fn round_ticks(&self) -> u32 {
        2 * (self.silence_period + self.tx_window_width)
    }
}

/// Owns all MAC state touched only by the main loop: phase, timers, and the
/// frequency-hop/duty-cycle/power-hunt collaborators.
pub struct TdmMac {
    pub params: RoundParams,
    phase: Phase,
    state_remaining: u32,
    transmit_yield: bool,
    bonus_transmit: bool,
    transmit_wait: u32,
    duty_cycle_wait: bool,
    transmitted_ticks_this_round: u32,

    pub fhop: FreqHopper,
    pub duty_cycle: DutyCycleController,
    pub power_hunt: PowerHunt,

    lbt_rssi: u8,
    lbt_rand: u32,
    lbt_listen_ticks: u32,
    lbt_rng: StdRng,
    ticks_since_link_update: u16,
    send_statistics: bool,
}

impl TdmMac {
    pub fn new(
        params: RoundParams,
        fhop: FreqHopper,
        duty_cycle: DutyCycleController,
        power_hunt: PowerHunt,
        lbt_rssi: u8,
    ) -> Self {
        Self {
            state_remaining: params.tx_window_width,
            phase: Phase::Tx,
            transmit_yield: false,
            bonus_transmit: false,
            transmit_wait: 0,
            duty_cycle_wait: false,
            transmitted_ticks_this_round: 0,
            params,
            fhop,
            duty_cycle,
            power_hunt,
            lbt_rssi,
            lbt_rand: 0,
            lbt_listen_ticks: 0,
            lbt_rng: StdRng::from_entropy(),
            ticks_since_link_update: 0,
            send_statistics: false,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state_remaining(&self) -> u32 {
        self.state_remaining
    }

    pub fn bonus_transmit(&self) -> bool {
        self.bonus_transmit
    }

    /// Advances phase state by `tdelta` ticks, handling a delta spanning
    /// multiple phase boundaries (a long pause since the last poll).
    pub fn on_tick(&mut self, tdelta: u32) {
        let mut remaining_delta = tdelta;
        if self.transmit_wait > 0 {
            self.transmit_wait = self.transmit_wait.saturating_sub(tdelta);
        }
        while remaining_delta >= self.state_remaining {
            remaining_delta -= self.state_remaining;
            self.advance_phase();
        }
        self.state_remaining -= remaining_delta;

        self.ticks_since_link_update = self
            .ticks_since_link_update
            .saturating_add(tdelta.min(u16::MAX as u32) as u16);
    }

    fn advance_phase(&mut self) {
        if self.phase == Phase::Tx {
            self.transmit_yield = false;
        }
        self.phase = self.phase.next();
        self.state_remaining = match self.phase {
            Phase::Tx | Phase::Rx => self.params.tx_window_width,
            Phase::Silence1 | Phase::Silence2 => self.params.silence_period,
        };
        if matches!(self.phase, Phase::Tx | Phase::Silence1) {
            self.fhop.window_change();
        }
        if self.phase == Phase::Tx {
            self.bonus_transmit = false;
            self.duty_cycle.note_round(
                self.transmitted_ticks_this_round,
                self.params.round_ticks(),
            );
            self.duty_cycle_wait = self.duty_cycle.is_waiting();
            self.transmitted_ticks_this_round = 0;
        }
    }

    /// Folds a received packet's trailer into our own phase clock.
    pub fn sync_tx_windows(&mut self, trailer: Trailer, payload_len: usize) {
        if trailer.bonus {
            match self.phase {
                Phase::Silence1 => {}
                Phase::Silence2 => {
                    self.state_remaining = 1;
                }
                _ => {
                    self.phase = Phase::Tx;
                    self.state_remaining = trailer.window as u32;
                }
            }
        } else {
            self.phase = Phase::Rx;
            self.state_remaining = trailer.window as u32;
        }

        if payload_len == 0 && self.phase == Phase::Rx {
            self.bonus_transmit = true;
        }
    }

    /// Whether the MAC is currently permitted to key the transmitter.
    pub fn transmit_eligible(&mut self, phy: &dyn Phy, rssi_below_threshold_ticks: u32) -> bool {
        let phase_ok = self.phase == Phase::Tx || (self.bonus_transmit && self.phase == Phase::Rx);
        if !phase_ok {
            return false;
        }
        if self.transmit_yield {
            return false;
        }
        if self.transmit_wait > 0 {
            return false;
        }
        if phy.preamble_detected() || phy.receive_in_progress() {
            return false;
        }
        if self.duty_cycle_wait {
            return false;
        }
        if self.state_remaining < self.params.packet_latency + self.params.ticks_per_byte {
            return false;
        }
        if self.lbt_rssi != 0 {
            let lbt_min_ticks = LBT_MIN_TIME_USEC / TICK_DURATION_USEC;
            if rssi_below_threshold_ticks < lbt_min_ticks + self.lbt_rand {
                return false;
            }
        }
        true
    }

    /// Randomizes `lbt_rand` once per listen window (called when a new
    /// listen-before-talk measurement window starts).
    fn roll_lbt_jitter(&mut self, max_extra_ticks: u32) {
        self.lbt_rand = if max_extra_ticks == 0 {
            0
        } else {
            self.lbt_rng.gen_range(0..max_extra_ticks)
        };
    }

    /// Whether listen-before-talk is configured at all.
    pub fn lbt_enabled(&self) -> bool {
        self.lbt_rssi != 0
    }

    /// Continuous ticks the measured RSSI has been below `lbt_rssi`, the
    /// value `transmit_eligible` compares against `lbt_min_time + lbt_rand`.
    pub fn lbt_elapsed_ticks(&self) -> u32 {
        self.lbt_listen_ticks
    }

    /// Folds one main-loop pass's RSSI sample into the LBT listen-time
    /// tracker, matching the original firmware's inline `tdm_state_update`
    /// loop body: below threshold accumulates listen time; at or above it,
    /// the listen time resets and a fresh `lbt_rand` is rolled for the next
    /// listen window (only when the previous window's jitter has already
    /// been consumed by a transmit, i.e. `lbt_rand == 0`). A no-op when LBT
    /// is disabled.
    pub fn note_rssi_sample(&mut self, rssi: u8, tdelta: u32) {
        if !self.lbt_enabled() {
            return;
        }
        if rssi < self.lbt_rssi {
            self.lbt_listen_ticks = self.lbt_listen_ticks.saturating_add(tdelta);
        } else {
            self.lbt_listen_ticks = 0;
            if self.lbt_rand == 0 {
                let lbt_min_ticks = LBT_MIN_TIME_USEC / TICK_DURATION_USEC;
                self.roll_lbt_jitter(lbt_min_ticks);
            }
        }
    }

    /// Flight-time estimate for a packet of `total_len` bytes (payload plus
    /// trailer), matching `packet_latency + len * ticks_per_byte`.
    pub fn flight_time_estimate(&self, total_len: usize) -> u32 {
        self.params.packet_latency + total_len as u32 * self.params.ticks_per_byte
    }

    /// Builds and hands off one outbound packet, if transmit-eligible and
    /// the framer/statistics path produces one. Returns the raw bytes
    /// (payload + trailer) that were handed to the PHY, or `None` if there
    /// was nothing to send this pass.
    pub fn build_and_send(
        &mut self,
        framer: &mut PacketFramer,
        phy: &mut dyn Phy,
        now: u16,
        local_stats: &LinkStatistics,
    ) -> Result<Option<Vec<u8>>, TdmError> {
        let max_xmit = ((self.state_remaining.saturating_sub(self.params.packet_latency))
            / self.params.ticks_per_byte) as usize;
        let max_xmit = max_xmit
            .saturating_sub(PACKET_OVERHEAD)
            .min(self.params.max_data_packet_length);

        // Pending remote AT command injection is out of scope (spec §1);
        // the framer is always asked first, exactly as `packet_get_next` is.
        let from_framer = framer.get_next(max_xmit, now);
        let wants_stats = self.phase == Phase::Tx
            && self.send_statistics
            && max_xmit >= 16
            && from_framer.as_ref().map_or(true, |p| p.is_empty());

        let is_stats_packet = wants_stats;
        let mut payload = if wants_stats {
            self.send_statistics = false;
            local_stats.to_bytes().to_vec()
        } else {
            match from_framer {
                Some(p) => p,
                None => return Ok(None),
            }
        };

        if payload.len() > self.params.max_data_packet_length {
            return Err(TdmError::OversizedPacket {
                len: payload.len(),
                max: self.params.max_data_packet_length,
            });
        }

        let mut trailer = if is_stats_packet {
            // trailer.window == 0 marks a statistics packet (spec §4.4).
            Trailer::new(0)
        } else {
            let flight = self.flight_time_estimate(payload.len() + crate::constants::TRAILER_SIZE);
            Trailer::new(self.state_remaining.saturating_sub(flight) as u16)
        };
        trailer.resend = if is_stats_packet { false } else { framer.is_resend() };
        trailer.bonus = self.phase == Phase::Rx;

        if payload.is_empty() {
            self.transmit_yield = true;
        }

        payload.extend_from_slice(&trailer.pack());

        let timeout = self.state_remaining + self.params.silence_period / 2;
        let sent = phy.transmit(&payload, timeout.min(u16::MAX as u32) as u16)?;

        if self.lbt_enabled() {
            self.lbt_listen_ticks = 0;
            self.lbt_rand = 0;
        }

        if !sent {
            if !is_stats_packet {
                framer.force_resend();
            }
            return Ok(None);
        }

        let flight = self.flight_time_estimate(payload.len());
        self.transmitted_ticks_this_round = self
            .transmitted_ticks_this_round
            .saturating_add(flight.min(self.state_remaining));

        Ok(Some(payload))
    }

    /// Runs roughly every [`LINK_UPDATE_PERIOD_TICKS`]: folds frequency-hop
    /// lock tracking and duty-cycle temperature backoff. Returns true when
    /// a link-update pass actually ran (the caller may use this to decide
    /// whether to emit a statistics packet).
    pub fn maybe_link_update(&mut self, packet_seen_since_last: bool, pa_temperature_c: i16) -> bool {
        if (self.ticks_since_link_update as u32) < LINK_UPDATE_PERIOD_TICKS as u32 {
            return false;
        }
        self.ticks_since_link_update = 0;
        self.fhop.note_link_update(packet_seen_since_last);
        self.duty_cycle.temperature_update(pa_temperature_c);
        self.send_statistics = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phy::SimPhy;

    fn test_mac() -> TdmMac {
        let params = RoundParams::new(2, 40, false, 64);
        TdmMac::new(
            params,
            FreqHopper::new(1, 10),
            DutyCycleController::new(100),
            PowerHunt::new(0, 5, 20, 20),
            0,
        )
    }

    #[test]
    fn starts_in_tx_with_full_window() {
        let mac = test_mac();
        assert_eq!(mac.phase(), Phase::Tx);
        assert_eq!(mac.state_remaining(), mac.params.tx_window_width);
    }

    #[test]
    fn phase_advance_within_window() {
        let mut mac = test_mac();
        let w = mac.params.tx_window_width;
        mac.on_tick(w - 1);
        assert_eq!(mac.phase(), Phase::Tx);
        assert_eq!(mac.state_remaining(), 1);
    }

    #[test]
    fn phase_advance_crosses_into_rx() {
        let mut mac = test_mac();
        let w = mac.params.tx_window_width;
        let s = mac.params.silence_period;
        mac.on_tick(w + s + 1);
        assert_eq!(mac.phase(), Phase::Rx);
        assert_eq!(mac.state_remaining(), w - 1);
    }

    #[test]
    fn sync_tx_windows_non_bonus_enters_rx() {
        let mut mac = test_mac();
        let trailer = Trailer {
            window: 640,
            command: false,
            bonus: false,
            resend: false,
        };
        mac.sync_tx_windows(trailer, 10);
        assert_eq!(mac.phase(), Phase::Rx);
        assert_eq!(mac.state_remaining(), 640);
    }

    #[test]
    fn zero_length_packet_in_rx_grants_bonus_transmit() {
        let mut mac = test_mac();
        // Force into RX first.
        mac.sync_tx_windows(
            Trailer {
                window: 500,
                command: false,
                bonus: false,
                resend: false,
            },
            1,
        );
        assert_eq!(mac.phase(), Phase::Rx);
        mac.sync_tx_windows(
            Trailer {
                window: 500,
                command: false,
                bonus: false,
                resend: false,
            },
            0,
        );
        assert!(mac.bonus_transmit());
    }

    #[test]
    fn never_transmits_outside_tx_without_bonus() {
        let mut mac = test_mac();
        mac.sync_tx_windows(
            Trailer {
                window: 500,
                command: false,
                bonus: false,
                resend: false,
            },
            5,
        );
        assert_eq!(mac.phase(), Phase::Rx);
        let (phy, _peer) = SimPhy::channel_pair();
        assert!(!mac.transmit_eligible(&phy, 0));
    }

    #[test]
    fn round_params_fit_within_trailer_window() {
        let params = RoundParams::new(2, 40, false, 256);
        assert!(params.tx_window_width <= MAX_WINDOW_TICKS);
    }

    fn lbt_mac(lbt_rssi: u8) -> TdmMac {
        let params = RoundParams::new(2, 40, false, 64);
        TdmMac::new(
            params,
            FreqHopper::new(1, 10),
            DutyCycleController::new(100),
            PowerHunt::new(0, 5, 20, 20),
            lbt_rssi,
        )
    }

    #[test]
    fn lbt_disabled_ignores_rssi_samples() {
        let mut mac = lbt_mac(0);
        assert!(!mac.lbt_enabled());
        mac.note_rssi_sample(5, 1000);
        assert_eq!(mac.lbt_elapsed_ticks(), 0);
    }

    #[test]
    fn lbt_accumulates_below_threshold_and_resets_above() {
        let mut mac = lbt_mac(100);
        assert!(mac.lbt_enabled());
        mac.note_rssi_sample(50, 100);
        mac.note_rssi_sample(50, 50);
        assert_eq!(mac.lbt_elapsed_ticks(), 150);

        // Rising above the threshold resets the tracker and rolls jitter.
        mac.note_rssi_sample(150, 10);
        assert_eq!(mac.lbt_elapsed_ticks(), 0);
    }

    #[test]
    fn lbt_blocks_transmit_until_elapsed_ticks_clear_min_time() {
        let mut mac = lbt_mac(100);
        mac.sync_tx_windows(
            Trailer {
                window: 0,
                command: false,
                bonus: true,
                resend: false,
            },
            1,
        );
        assert_eq!(mac.phase(), Phase::Tx);
        let (phy, _peer) = SimPhy::channel_pair();
        let lbt_min_ticks = LBT_MIN_TIME_USEC / TICK_DURATION_USEC;
        assert!(!mac.transmit_eligible(&phy, lbt_min_ticks - 1));
        assert!(mac.transmit_eligible(&phy, lbt_min_ticks));
    }

    #[test]
    fn build_and_send_emits_statistics_packet_when_due() {
        let mut mac = test_mac();
        let mut framer = PacketFramer::new(false, true);
        let (mut phy, mut peer) = SimPhy::channel_pair();
        let mut local_stats = LinkStatistics::new();
        local_stats.note_received(123);

        // Advance by whole rounds (so phase lands back on Tx with a full
        // window) until the link-update period has elapsed.
        let round_ticks = mac.params.round_ticks();
        let rounds = crate::constants::LINK_UPDATE_PERIOD_TICKS as u32 / round_ticks + 1;
        mac.on_tick(round_ticks * rounds);
        assert_eq!(mac.phase(), Phase::Tx);
        assert!(mac.maybe_link_update(false, 20));

        let sent = mac
            .build_and_send(&mut framer, &mut phy, 0, &local_stats)
            .unwrap()
            .expect("a statistics packet should have been sent");

        let trailer_bytes = [sent[sent.len() - 2], sent[sent.len() - 1]];
        let trailer = Trailer::unpack(trailer_bytes);
        assert_eq!(trailer.window, 0, "a statistics packet is marked by trailer.window == 0");
        assert_eq!(sent.len() - crate::constants::TRAILER_SIZE, 16);

        let received = peer.receive_packet().expect("peer should observe the stats packet");
        assert_eq!(&received.payload[..16], &local_stats.to_bytes());
    }
}
