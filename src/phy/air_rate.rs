//! Per-air-rate timing table.
//!
//! Reduced from the teacher's register-value table (one row per supported
//! modulation setting, keyed by a requested parameter) down to the fields
//! the TDM round-size calculation actually needs: how long one byte takes
//! on air, and how many preamble bits the PHY emits before the sync word.

use crate::constants::{DEFAULT_PREAMBLE_BITS, SUPPORTED_AIR_RATES_BPS};

/// Timing parameters derived from a programmed air rate.
#[derive(Debug, Clone, Copy)]
pub struct AirRateTiming {
    pub air_rate_bps: u32,
    /// Time to transmit one byte on air, in 16 µs ticks.
    pub ticks_per_byte: u32,
    /// Preamble length in bits.
    pub preamble_bits: u32,
}

/// Returns the timing row for the nearest supported rate at or above
/// `requested_bps`, matching the original firmware's `radio_configure`
/// (`for (i=0; i<NUM_DATA_RATES-1; i++) if (air_data_rates[i] >= air_rate)
/// break;`): pick the first table entry at least as fast as requested,
/// capping at the fastest supported rate if `requested_bps` exceeds all of
/// them.
pub fn nearest_timing(requested_bps: u32) -> AirRateTiming {
    let chosen = SUPPORTED_AIR_RATES_BPS
        .iter()
        .copied()
        .filter(|&rate| rate >= requested_bps)
        .min()
        .unwrap_or_else(|| *SUPPORTED_AIR_RATES_BPS.iter().max().unwrap());
    timing_for(chosen)
}

fn timing_for(air_rate_bps: u32) -> AirRateTiming {
    // ticks_per_byte = (8 bits/byte) / (bits/sec) / (16us/tick), scaled up
    // to avoid losing precision in integer division for the faster rates.
    let ticks_per_byte = ((8u64 * 1_000_000 / 16) / air_rate_bps as u64).max(1) as u32;
    AirRateTiming {
        air_rate_bps,
        ticks_per_byte,
        preamble_bits: DEFAULT_PREAMBLE_BITS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_rate_matches() {
        let t = nearest_timing(9_600);
        assert_eq!(t.air_rate_bps, 9_600);
    }

    #[test]
    fn rounds_up_to_nearest_supported_rate() {
        let t = nearest_timing(15_000);
        assert_eq!(t.air_rate_bps, 16_000);
    }

    #[test]
    fn above_fastest_rate_falls_back_to_fastest() {
        let t = nearest_timing(500_000);
        assert_eq!(t.air_rate_bps, *SUPPORTED_AIR_RATES_BPS.iter().max().unwrap());
    }

    #[test]
    fn faster_rates_take_fewer_ticks_per_byte() {
        let slow = nearest_timing(500);
        let fast = nearest_timing(192_000);
        assert!(fast.ticks_per_byte < slow.ticks_per_byte);
    }
}
