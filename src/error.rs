//! # TDM Modem Error Handling
//!
//! This module defines the [`TdmError`] enum. Transient link errors (CRC
//! failures, missed sync windows, preamble timeouts) are *not* represented
//! here - they are counted in [`crate::statistics`] and recovered from
//! locally. Only invariant violations and configuration failures reach the
//! caller as a `Result::Err`.

use thiserror::Error;

/// Errors that can occur while configuring or driving the TDM modem.
#[derive(Debug, Error)]
pub enum TdmError {
    /// A byte slice passed to the Golay codec was not a multiple of the
    /// required block size (3 bytes for encode, 6 bytes for decode).
    #[error("Golay input length {0} is not a multiple of {1}")]
    InvalidBlockLength(usize, usize),

    /// The PHY failed to respond during `initialise()`.
    #[error("PHY initialisation failed: {0}")]
    PhyInit(String),

    /// A PHY transmit did not complete before its timeout.
    #[error("PHY transmit timed out after {0} ticks")]
    PhyTimeout(u16),

    /// A constructed outbound packet exceeded the window's capacity; this is
    /// an invariant violation (`max_xmit`/`max_data_packet_length` should
    /// have prevented it) rather than a recoverable condition.
    #[error("outbound packet of {len} bytes exceeds the {max} byte window")]
    OversizedPacket { len: usize, max: usize },

    /// The configured board frequency plan is invalid (e.g. `MIN_FREQ` >=
    /// `MAX_FREQ`, or zero channels).
    #[error("invalid frequency plan: {0}")]
    InvalidFrequencyPlan(String),

    /// A `TdmConfig` field was out of its documented valid range.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The requested air data rate has no entry in the supported-rate table.
    #[error("unsupported air rate: {0} bps")]
    UnsupportedAirRate(u32),

    /// A `ParameterStore` backend failed to load or save settings.
    #[error("parameter store error: {0}")]
    ParameterStore(String),
}
