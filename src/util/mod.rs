//! # Utility Modules
//!
//! Common utility functions and types used throughout the crate: a streaming
//! byte buffer for the serial-side byte FIFOs, hex encoding/decoding for
//! packet dumps, and rate-limited logging.

pub mod hex;
pub mod iobuffer;
pub mod logging;

// Re-export commonly used types and functions
pub use hex::{decode_hex, encode_hex, format_hex_compact, hex_to_bytes, pretty_hex};
pub use iobuffer::{IoBuffer, IoBufferError};
pub use logging::{log_frame_hex, log_frame_structured, LogThrottle, ThrottleManager};
