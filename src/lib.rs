//! # tdm-modem - TDM MAC, packet framer and Golay FEC for a half-duplex FSK radio
//!
//! This crate implements the link layer of a time-division-multiplexed
//! serial-bridge radio modem: a [`golay`] forward-error-correction codec, a
//! [`phy`] adapter contract that isolates the only code touching radio
//! registers, a [`framer`] that turns a serial byte stream into bounded
//! packets with opportunistic MAVLink-aware resend, and a [`mac`] state
//! machine that divides airtime between two half-duplex peers without a
//! shared clock.
//!
//! ## Features
//!
//! - Binary Golay (23,12,3) encode/decode, correcting up to 3 bit errors per
//!   23-bit codeword
//! - A synchronous [`phy::Phy`] trait so the MAC can run against real
//!   register-level radio hardware or an in-memory simulation
//! - Frequency hopping, duty-cycle throttling and an RSSI-driven transmit
//!   power hunt, all grounded in the same control loop as the MAC tick
//! - `serde`-backed configuration persistence via [`config::ParameterStore`]
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! tdm-modem = "0.1.0"
//! ```
//!
//! ```rust
//! use tdm_modem::golay;
//!
//! let encoded = golay::encode(&[0x12, 0x34, 0x56]).unwrap();
//! assert_eq!(encoded.len(), 6);
//! ```

pub mod config;
pub mod constants;
pub mod duty_cycle;
pub mod error;
pub mod fhop;
pub mod framer;
pub mod golay;
pub mod logging;
pub mod mac;
pub mod mainloop;
pub mod phy;
pub mod power_hunt;
pub mod statistics;
pub mod tick;
pub mod trailer;
pub mod util;

pub use crate::error::TdmError;
pub use crate::framer::PacketFramer;
pub use crate::logging::{init_logger, log_info};
pub use crate::mac::{Phase, RoundParams, TdmMac};
pub use crate::phy::{Phy, PhyStats};
pub use crate::tick::Tick;
