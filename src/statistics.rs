//! Link statistics: the counters the original firmware's `tdm_show_rssi`
//! prints, plus the remote-reported copy a statistics packet carries over
//! the air for the power-hunt state machine to consume.
//!
//! Serialized with a fixed manual byte layout rather than `serde`, matching
//! the original firmware's `memcpy`-a-struct wire format: the statistics
//! packet is a small, fixed-size record and its on-air size must stay
//! predictable independent of whatever serialization crate is in the
//! dependency set for `ParameterStore` JSON persistence.

/// Local link counters, accumulated by the main loop and periodically
/// reset into a statistics packet (spec §4.4, §7).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStatistics {
    pub average_rssi: u8,
    pub average_noise: u8,
    pub receive_count: u32,
    pub tx_errors: u32,
    pub rx_errors: u32,
    /// Saturating at 255, per spec §7's overflow-counter policy.
    pub serial_tx_overflow: u8,
    pub serial_rx_overflow: u8,
    pub corrected_errors: u32,
    pub corrected_packets: u32,
}

impl LinkStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds in one CRC-valid received packet's RSSI as a cheap running
    /// average (matches the original's shift-and-blend, here an EWMA with
    /// an 1/8 weight on the new sample for integer-friendly division).
    pub fn note_received(&mut self, rssi: u8) {
        self.receive_count = self.receive_count.saturating_add(1);
        self.average_rssi = (((self.average_rssi as u16) * 7 + rssi as u16) / 8) as u8;
    }

    pub fn note_noise_sample(&mut self, noise: u8) {
        self.average_noise = (((self.average_noise as u16) * 7 + noise as u16) / 8) as u8;
    }

    pub fn note_tx_error(&mut self) {
        self.tx_errors = self.tx_errors.saturating_add(1);
    }

    pub fn note_rx_error(&mut self) {
        self.rx_errors = self.rx_errors.saturating_add(1);
    }

    pub fn note_serial_tx_overflow(&mut self) {
        self.serial_tx_overflow = self.serial_tx_overflow.saturating_add(1);
    }

    pub fn note_serial_rx_overflow(&mut self) {
        self.serial_rx_overflow = self.serial_rx_overflow.saturating_add(1);
    }

    pub fn note_golay_correction(&mut self, corrected_bits: u32, corrected_blocks: u32) {
        if corrected_blocks > 0 {
            self.corrected_errors = self.corrected_errors.saturating_add(corrected_bits);
            self.corrected_packets = self.corrected_packets.saturating_add(1);
        }
    }

    /// Resets the accumulators a statistics packet reports per period,
    /// keeping running totals (`receive_count`, error counts) intact.
    pub fn reset_period(&mut self) {
        self.average_rssi = 0;
        self.average_noise = 0;
    }

    /// Fixed 16-byte wire layout: big-endian `u32` counters, raw `u8`
    /// samples, in field declaration order.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0] = self.average_rssi;
        out[1] = self.average_noise;
        out[2..6].copy_from_slice(&self.receive_count.to_be_bytes());
        out[6..10].copy_from_slice(&self.tx_errors.to_be_bytes());
        out[10] = self.serial_tx_overflow;
        out[11] = self.serial_rx_overflow;
        out[12..16].copy_from_slice(&self.rx_errors.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8; 16]) -> Self {
        Self {
            average_rssi: bytes[0],
            average_noise: bytes[1],
            receive_count: u32::from_be_bytes(bytes[2..6].try_into().unwrap()),
            tx_errors: u32::from_be_bytes(bytes[6..10].try_into().unwrap()),
            rx_errors: u32::from_be_bytes(bytes[12..16].try_into().unwrap()),
            serial_tx_overflow: bytes[10],
            serial_rx_overflow: bytes[11],
            corrected_errors: 0,
            corrected_packets: 0,
        }
    }
}

/// The remote peer's statistics as reported in the last statistics packet
/// we received, consumed once per packet by [`crate::power_hunt::PowerHunt`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteStatistics {
    pub average_rssi: u8,
    pub average_noise: u8,
}

impl RemoteStatistics {
    pub fn from_link_statistics(remote: &LinkStatistics) -> Self {
        Self {
            average_rssi: remote.average_rssi,
            average_noise: remote.average_noise,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip_preserves_counters_but_not_corrections() {
        let mut stats = LinkStatistics::new();
        stats.note_received(200);
        stats.note_tx_error();
        stats.note_rx_error();
        stats.note_serial_tx_overflow();
        stats.note_golay_correction(2, 1);

        let bytes = stats.to_bytes();
        let round_tripped = LinkStatistics::from_bytes(&bytes);

        assert_eq!(round_tripped.average_rssi, stats.average_rssi);
        assert_eq!(round_tripped.receive_count, stats.receive_count);
        assert_eq!(round_tripped.tx_errors, stats.tx_errors);
        assert_eq!(round_tripped.rx_errors, stats.rx_errors);
        assert_eq!(round_tripped.serial_tx_overflow, stats.serial_tx_overflow);
        // corrected_* never crosses the wire; it's a local-only counter.
        assert_eq!(round_tripped.corrected_packets, 0);
    }

    #[test]
    fn serial_overflow_counter_saturates_at_255() {
        let mut stats = LinkStatistics::new();
        for _ in 0..300 {
            stats.note_serial_rx_overflow();
        }
        assert_eq!(stats.serial_rx_overflow, 255);
    }

    #[test]
    fn remote_statistics_extracted_from_received_packet() {
        let mut remote = LinkStatistics::new();
        remote.note_received(150);
        let extracted = RemoteStatistics::from_link_statistics(&remote);
        assert_eq!(extracted.average_rssi, remote.average_rssi);
    }
}
