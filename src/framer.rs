//! Packet framer: decouples the serial byte stream from air packets, with
//! optional MAVLink message-boundary alignment and opportunistic resend.
//!
//! Implements the exact three-branch `get_next` policy and the
//! one-packet-of-history resend/dedup scheme the original firmware's
//! `packet_get_next`/`packet_is_duplicate` implement, generalized only in
//! that the serial FIFO is the teacher's `IoBuffer` rather than a fixed C
//! ring buffer.

use crate::constants::PACKET_RESEND_THRESHOLD;
use crate::util::iobuffer::IoBuffer;

const MAVLINK09_STX: u8 = 0x55;
const MAVLINK10_STX: u8 = 0xFE;
const MAVLINK_HEADER_CRC_OVERHEAD: usize = 8;

struct PendingMavlinkFrame {
    expected_len: usize,
    arrived_at_tick: u16,
}

/// Turns a serial byte stream into bounded outbound packets and
/// deduplicates inbound resends.
pub struct PacketFramer {
    serial_rx: IoBuffer,
    max_xmit: usize,
    per_byte_timeout_ticks: u32,
    mavlink_enabled: bool,
    opportunistic_resend_enabled: bool,

    last_sent: Vec<u8>,
    last_sent_was_resend: bool,
    force_resend: bool,

    last_received: Vec<u8>,

    pending_mavlink: Option<PendingMavlinkFrame>,
}

impl PacketFramer {
    pub fn new(mavlink_enabled: bool, opportunistic_resend_enabled: bool) -> Self {
        Self {
            serial_rx: IoBuffer::new(),
            max_xmit: 64,
            per_byte_timeout_ticks: 1,
            mavlink_enabled,
            opportunistic_resend_enabled,
            last_sent: Vec::new(),
            last_sent_was_resend: false,
            force_resend: false,
            last_received: Vec::new(),
            pending_mavlink: None,
        }
    }

    /// Feeds bytes received from the local host's serial port.
    pub fn feed_serial(&mut self, bytes: &[u8]) {
        let _ = self.serial_rx.write(bytes);
    }

    pub fn set_max_xmit(&mut self, n: usize) {
        self.max_xmit = n;
    }

    /// Used to compute the per-byte timeout for partial MAVLink frames.
    pub fn set_serial_speed(&mut self, bytes_per_sec: u32) {
        self.per_byte_timeout_ticks = if bytes_per_sec == 0 {
            1
        } else {
            ((1_000_000u64 / 16) / bytes_per_sec as u64).max(1) as u32
        };
    }

    pub fn force_resend(&mut self) {
        self.force_resend = true;
    }

    pub fn is_resend(&self) -> bool {
        self.last_sent_was_resend
    }

    /// Returns the next packet to transmit, if one is ready, given the
    /// caller's current tick and a transmit budget of `max_xmit` bytes.
    pub fn get_next(&mut self, max_xmit: usize, now: u16) -> Option<Vec<u8>> {
        let max_xmit = max_xmit.min(self.max_xmit);
        let avail = self.serial_rx.len();

        let should_resend = self.force_resend
            || (self.opportunistic_resend_enabled
                && !self.last_sent_was_resend
                && !self.last_sent.is_empty()
                && avail < PACKET_RESEND_THRESHOLD);

        if should_resend {
            self.force_resend = false;
            self.last_sent_was_resend = true;
            return Some(self.last_sent.clone());
        }

        if self.mavlink_enabled {
            if let Some(packet) = self.get_next_mavlink(max_xmit, now) {
                self.last_sent = packet.clone();
                self.last_sent_was_resend = false;
                return Some(packet);
            }
            return None;
        }

        if avail == 0 {
            return None;
        }
        let packet = self.serial_rx.consume(max_xmit);
        self.last_sent = packet.clone();
        self.last_sent_was_resend = false;
        Some(packet)
    }

    fn get_next_mavlink(&mut self, max_xmit: usize, now: u16) -> Option<Vec<u8>> {
        if let Some(pending) = &self.pending_mavlink {
            if self.serial_rx.len() >= pending.expected_len {
                let expected_len = pending.expected_len;
                self.pending_mavlink = None;
                return Some(self.serial_rx.consume(expected_len));
            }
            let elapsed = now.wrapping_sub(pending.arrived_at_tick) as u32;
            let timeout = pending.expected_len as u32 * self.per_byte_timeout_ticks;
            if elapsed >= timeout {
                self.pending_mavlink = None;
                let available = self.serial_rx.len();
                return Some(self.serial_rx.consume(available));
            }
            return None;
        }

        let first = self.serial_rx.peek(1);
        let Some(&stx) = first.first() else {
            return None;
        };

        if stx != MAVLINK09_STX && stx != MAVLINK10_STX {
            // Flush the non-stanza prefix up to (not including) the next
            // stanza byte, as its own packet.
            let prefix_len = self.find_prefix_before_stanza();
            return Some(self.serial_rx.consume(prefix_len.max(1).min(max_xmit)));
        }

        let header = self.serial_rx.peek(2);
        let Some(&payload_len) = header.get(1) else {
            return None;
        };
        let frame_len = payload_len as usize + MAVLINK_HEADER_CRC_OVERHEAD;

        if frame_len > max_xmit {
            // Oversized frame: fall through to raw-byte mode for this call.
            return Some(self.serial_rx.consume(max_xmit));
        }

        if self.serial_rx.len() >= frame_len {
            return Some(self.serial_rx.consume(frame_len));
        }

        self.pending_mavlink = Some(PendingMavlinkFrame {
            expected_len: frame_len,
            arrived_at_tick: now,
        });
        None
    }

    fn find_prefix_before_stanza(&self) -> usize {
        let len = self.serial_rx.len();
        for i in 1..len {
            let byte = self.serial_rx.peek_range(i, 1);
            if let Some(&b) = byte.first() {
                if b == MAVLINK09_STX || b == MAVLINK10_STX {
                    return i;
                }
            }
        }
        len
    }

    /// Inbound dedup: true if `resend_bit` is set and `payload` matches the
    /// last accepted payload (caller should drop it without delivering).
    pub fn is_duplicate(&mut self, payload: &[u8], resend_bit: bool) -> bool {
        if resend_bit && payload == self.last_received.as_slice() {
            return true;
        }
        self.last_received = payload.to_vec();
        false
    }
}
