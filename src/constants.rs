//! TDM radio modem protocol constants
//!
//! Values taken from the SiK/RFD900 `tdm.c` and `radio.c` reference
//! implementation this crate's MAC is grounded on.

/// Size of the on-air trailer, in bytes (window:13 | command:1 | bonus:1 | resend:1).
pub const TRAILER_SIZE: usize = 2;

/// Fixed overhead assumed per packet by the TDM round-size calculation, beyond
/// the trailer: preamble/sync/header/CRC turnaround the PHY hardware handler adds.
pub const PACKET_OVERHEAD: usize = TRAILER_SIZE + 16;

/// Upper bound on a single over-the-air packet body (payload + trailer),
/// before Golay expansion. Matches the original firmware's `MAX_PACKET_LENGTH`.
pub const MAX_PACKET_LENGTH: usize = 256;

/// 13 bits of trailer.window: the largest value a TX/RX window can encode.
pub const MAX_WINDOW_TICKS: u32 = 0x1FFF;

/// Regulatory cap on a TX/RX window: 0.4 seconds, in 16 us ticks.
pub const REGULATORY_MAX_WINDOW_TICKS: u32 = ((1_000_000u32 / 16) * 4) / 10;

/// Minimum listen-before-talk time, in microseconds, before the randomized
/// extra listen time is added.
pub const LBT_MIN_TIME_USEC: u32 = 5_000;

/// Duration of one tick, in microseconds.
pub const TICK_DURATION_USEC: u32 = 16;

/// Number of consecutive ~0.5s link-update periods without a received packet
/// before frequency-hop lock is dropped and rescanning begins.
pub const UNLOCKED_COUNT_RESCAN: u8 = 10;

/// Number of consecutive unlocked periods before the link LED starts blinking
/// instead of staying lit (kept for parity with the original link_update()
/// even though LED control itself is out of scope).
pub const UNLOCKED_COUNT_BLINK: u8 = 2;

/// Approximate number of ticks between `link_update()` calls (~0.5s).
pub const LINK_UPDATE_PERIOD_TICKS: u16 = 32_768;

/// Maximum PA temperature, degrees C, above which duty cycle is derated.
pub const MAX_PA_TEMPERATURE: i16 = 40;

/// Floor below which duty_cycle_offset cannot push the effective duty cycle,
/// to keep the link alive even when hot.
pub const DUTY_CYCLE_FLOOR_BELOW_TARGET: u8 = 20;

/// Maximum supported frequency-hopping channel count.
pub const MAX_FREQ_CHANNELS: u8 = 50;

/// Supported air data rates, in bits per second.
pub const SUPPORTED_AIR_RATES_BPS: [u32; 13] = [
    500, 1_000, 2_000, 4_000, 8_000, 9_600, 16_000, 19_200, 24_000, 32_000, 64_000, 128_000,
    192_000,
];

/// Threshold, in buffered serial bytes, below which the framer prefers an
/// opportunistic resend of the last packet over reading new serial data.
pub const PACKET_RESEND_THRESHOLD: usize = 256;

/// On-air sync word.
pub const SYNC_WORD: [u8; 2] = [0x2D, 0xD4];

/// Preamble length in bits assumed for flight-time estimation before the
/// real PHY preamble length is known.
pub const DEFAULT_PREAMBLE_BITS: u32 = 40;

/// Valid range for the serial baud rates the host-facing UART may run at.
pub const SUPPORTED_SERIAL_BAUDS: [u32; 6] = [9_600, 19_200, 38_400, 57_600, 115_200, 230_400];
