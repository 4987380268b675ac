//! PHY adapter contract: the only layer permitted to touch radio registers.
//!
//! [`Phy`] is deliberately synchronous. The MAC's concurrency model is a
//! single-threaded cooperative loop with a couple of bounded blocking
//! spin-waits, not a multi-tasking executor, so this crate does not pull in
//! `tokio`/`async-trait` the way an async radio driver would; `transmit`
//! spins internally up to its timeout and returns, matching the original
//! firmware's `radio_transmit`.

pub mod air_rate;
pub mod si100x;
pub mod sim;

use crate::error::TdmError;

pub use si100x::Si100xPhy;
pub use sim::SimPhy;

/// A received, CRC-valid packet consumed from the PHY's receive FIFO.
#[derive(Debug, Clone)]
pub struct ReceivedPacket {
    /// Payload bytes (trailer still appended, not yet stripped by the MAC).
    pub payload: Vec<u8>,
    /// Third header byte: the peer's trailer echo, carried in the hardware
    /// header ahead of the payload.
    pub header_byte_3: u8,
    /// RSSI measured for this packet.
    pub rssi: u8,
}

/// Running counters reported by a PHY implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhyStats {
    pub packets_received: u64,
    pub packets_crc_valid: u64,
    pub packets_crc_error: u64,
    pub tx_timeouts: u64,
}

/// Operations the TDM MAC requires of a transceiver. Any implementation
/// satisfying this contract, hardware or simulated, is substitutable.
pub trait Phy {
    /// Resets and powers up the transceiver. Fails if no chip responds.
    fn initialise(&mut self) -> Result<(), TdmError>;

    /// Programs modulation/bandwidth/deviation/data-rate registers for the
    /// nearest supported air rate and returns the rate actually programmed.
    fn configure(&mut self, air_rate_bps: u32) -> Result<u32, TdmError>;

    fn set_frequency(&mut self, hz: u32);
    fn set_channel_spacing(&mut self, hz: u32);
    fn set_channel(&mut self, channel: u8);
    fn set_network_id(&mut self, netid: u16);
    fn set_transmit_power(&mut self, dbm: u8);

    /// Loads the FIFO, keys the transmitter, and waits up to `timeout_ticks`
    /// for the packet-sent interrupt. Returns `Ok(true)` on success,
    /// `Ok(false)` on timeout (the FIFO is cleared and the transmitter
    /// returned to receive mode before returning).
    fn transmit(&mut self, payload: &[u8], timeout_ticks: u16) -> Result<bool, TdmError>;

    /// Returns and consumes at most one complete CRC-valid packet.
    fn receive_packet(&mut self) -> Option<ReceivedPacket>;

    /// Returns and clears a latched preamble-valid flag.
    fn preamble_detected(&mut self) -> bool;

    /// Whether a packet reception is currently in progress (arms
    /// transmit-eligibility backoff).
    fn receive_in_progress(&self) -> bool;

    /// Switches to receive mode and (re-)enables packet-valid, CRC-error
    /// and preamble-valid interrupts.
    fn receiver_on(&mut self);

    fn current_rssi(&self) -> u8;
    fn last_rssi(&self) -> u8;

    /// The air rate actually programmed by the last `configure` call.
    fn air_rate(&self) -> u32;

    fn stats(&self) -> PhyStats;
}
