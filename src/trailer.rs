//! The 2-byte phase-sync trailer appended to every on-air packet.

use crate::constants::MAX_WINDOW_TICKS;

/// Phase-sync metadata carried in the last 2 bytes of every on-air packet.
///
/// Packed little-endian as `window:13 | command:1 | bonus:1 | resend:1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Trailer {
    /// Ticks remaining in the sender's current phase after this packet.
    pub window: u16,
    /// Payload is a remote AT command/response.
    pub command: bool,
    /// Sender is transmitting inside the peer's window.
    pub bonus: bool,
    /// Payload is byte-identical to the sender's previous packet.
    pub resend: bool,
}

impl Trailer {
    pub fn new(window: u16) -> Self {
        Self {
            window: window.min(MAX_WINDOW_TICKS as u16),
            command: false,
            bonus: false,
            resend: false,
        }
    }

    pub fn pack(&self) -> [u8; 2] {
        let mut bits = (self.window & (MAX_WINDOW_TICKS as u16)) as u16;
        if self.command {
            bits |= 1 << 13;
        }
        if self.bonus {
            bits |= 1 << 14;
        }
        if self.resend {
            bits |= 1 << 15;
        }
        bits.to_le_bytes()
    }

    pub fn unpack(bytes: [u8; 2]) -> Self {
        let bits = u16::from_le_bytes(bytes);
        Self {
            window: bits & (MAX_WINDOW_TICKS as u16),
            command: bits & (1 << 13) != 0,
            bonus: bits & (1 << 14) != 0,
            resend: bits & (1 << 15) != 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trip() {
        for window in [0u16, 1, 4095, 8191] {
            for command in [false, true] {
                for bonus in [false, true] {
                    for resend in [false, true] {
                        let t = Trailer {
                            window,
                            command,
                            bonus,
                            resend,
                        };
                        let round_tripped = Trailer::unpack(t.pack());
                        assert_eq!(round_tripped, t);
                    }
                }
            }
        }
    }

    #[test]
    fn window_is_clamped_to_13_bits() {
        let t = Trailer::new(0xFFFF);
        assert_eq!(t.window, MAX_WINDOW_TICKS as u16);
    }
}
