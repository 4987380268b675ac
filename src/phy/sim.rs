//! In-memory [`Phy`] pair used by tests and the bridge demo to run two full
//! MAC instances against each other without hardware.
//!
//! Grounded in the shape of a mock transport that hands queued bytes back
//! out on demand rather than touching real I/O, generalized here from a
//! byte-stream mock to a packet-oriented one (matching what the PHY
//! contract actually exchanges) and built on `std::sync::mpsc` instead of
//! a shared `Vec` behind a mutex, since each direction has exactly one
//! sender and one receiver.

use crate::error::TdmError;
use crate::phy::{Phy, PhyStats, ReceivedPacket};
use std::sync::mpsc::{self, Receiver, Sender};

struct RawFrame {
    payload: Vec<u8>,
    trailer_echo: u8,
    rssi: u8,
}

/// One end of a simulated, lossless point-to-point radio link.
pub struct SimPhy {
    tx: Sender<RawFrame>,
    rx: Receiver<RawFrame>,
    air_rate_bps: u32,
    network_id: u16,
    current_channel: u8,
    transmit_power_dbm: u8,
    simulated_rssi: u8,
    last_rssi: u8,
    stats: PhyStats,
    /// When set, the next `transmit` silently fails instead of delivering,
    /// modelling a dropped packet on the simulated air interface.
    pub drop_next_transmit: bool,
}

impl SimPhy {
    /// Builds a cross-wired pair: bytes sent by one side's `transmit`
    /// arrive in the other side's `receive_packet`.
    pub fn channel_pair() -> (SimPhy, SimPhy) {
        let (tx_a, rx_b) = mpsc::channel();
        let (tx_b, rx_a) = mpsc::channel();
        let a = SimPhy::new(tx_a, rx_a);
        let b = SimPhy::new(tx_b, rx_b);
        (a, b)
    }

    fn new(tx: Sender<RawFrame>, rx: Receiver<RawFrame>) -> Self {
        Self {
            tx,
            rx,
            air_rate_bps: 64_000,
            network_id: 0,
            current_channel: 0,
            transmit_power_dbm: 20,
            simulated_rssi: 180,
            last_rssi: 0,
            stats: PhyStats::default(),
            drop_next_transmit: false,
        }
    }

    /// Sets the RSSI this side reports to `current_rssi`/received packets,
    /// for tests exercising the power-hunt state machine.
    pub fn set_simulated_rssi(&mut self, rssi: u8) {
        self.simulated_rssi = rssi;
    }

    pub fn network_id(&self) -> u16 {
        self.network_id
    }

    pub fn current_channel(&self) -> u8 {
        self.current_channel
    }

    pub fn transmit_power_dbm(&self) -> u8 {
        self.transmit_power_dbm
    }
}

impl Phy for SimPhy {
    fn initialise(&mut self) -> Result<(), TdmError> {
        Ok(())
    }

    fn configure(&mut self, air_rate_bps: u32) -> Result<u32, TdmError> {
        self.air_rate_bps = air_rate_bps;
        Ok(air_rate_bps)
    }

    fn set_frequency(&mut self, _hz: u32) {}

    fn set_channel_spacing(&mut self, _hz: u32) {}

    fn set_channel(&mut self, channel: u8) {
        self.current_channel = channel;
    }

    fn set_network_id(&mut self, netid: u16) {
        self.network_id = netid;
    }

    fn set_transmit_power(&mut self, dbm: u8) {
        self.transmit_power_dbm = dbm;
    }

    fn transmit(&mut self, payload: &[u8], timeout_ticks: u16) -> Result<bool, TdmError> {
        if timeout_ticks == 0 {
            self.stats.tx_timeouts += 1;
            return Ok(false);
        }
        if self.drop_next_transmit {
            self.drop_next_transmit = false;
            return Ok(true);
        }
        let trailer_echo = payload.last().copied().unwrap_or(0);
        let frame = RawFrame {
            payload: payload.to_vec(),
            trailer_echo,
            rssi: self.simulated_rssi,
        };
        // The peer may have been dropped (single-ended test); a send
        // failure there is not this side's transmit failure.
        let _ = self.tx.send(frame);
        Ok(true)
    }

    fn receive_packet(&mut self) -> Option<ReceivedPacket> {
        match self.rx.try_recv() {
            Ok(frame) => {
                self.last_rssi = frame.rssi;
                self.stats.packets_received += 1;
                self.stats.packets_crc_valid += 1;
                Some(ReceivedPacket {
                    payload: frame.payload,
                    header_byte_3: frame.trailer_echo,
                    rssi: frame.rssi,
                })
            }
            Err(_) => None,
        }
    }

    fn preamble_detected(&mut self) -> bool {
        false
    }

    fn receive_in_progress(&self) -> bool {
        false
    }

    fn receiver_on(&mut self) {}

    fn current_rssi(&self) -> u8 {
        self.simulated_rssi
    }

    fn last_rssi(&self) -> u8 {
        self.last_rssi
    }

    fn air_rate(&self) -> u32 {
        self.air_rate_bps
    }

    fn stats(&self) -> PhyStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transmit_delivers_to_peer() {
        let (mut a, mut b) = SimPhy::channel_pair();
        assert!(a.transmit(&[1, 2, 3], 100).unwrap());
        let received = b.receive_packet().unwrap();
        assert_eq!(received.payload, vec![1, 2, 3]);
        assert_eq!(received.header_byte_3, 3);
    }

    #[test]
    fn receive_with_nothing_queued_returns_none() {
        let (_a, mut b) = SimPhy::channel_pair();
        assert!(b.receive_packet().is_none());
    }

    #[test]
    fn zero_timeout_counts_as_tx_timeout() {
        let (mut a, _b) = SimPhy::channel_pair();
        assert_eq!(a.transmit(&[1], 0).unwrap(), false);
        assert_eq!(a.stats().tx_timeouts, 1);
    }

    #[test]
    fn dropped_transmit_never_arrives() {
        let (mut a, mut b) = SimPhy::channel_pair();
        a.drop_next_transmit = true;
        assert!(a.transmit(&[9, 9], 100).unwrap());
        assert!(b.receive_packet().is_none());
    }
}
