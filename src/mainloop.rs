//! The cooperative main loop (spec §4.5): a single run-to-completion pass
//! repeated forever, driven by the 16 µs tick source and the PHY's
//! receive-packet poll.
//!
//! AT command processing and LED/test-output reporting are out of scope
//! (spec §1) and modeled as no-op stubs so the ordering spec §4.5 specifies
//! is still visible in the code even though those collaborators aren't
//! implemented here.

use crate::error::TdmError;
use crate::fhop::FreqHopper;
use crate::framer::PacketFramer;
use crate::golay;
use crate::mac::TdmMac;
use crate::phy::Phy;
use crate::statistics::{LinkStatistics, RemoteStatistics};
use crate::tick::{SharedIsrState, Tick};
use crate::trailer::Trailer;
use log::{debug, warn};

/// Everything one `run_once` pass needs beyond the MAC/framer/PHY: Golay
/// on/off, the last tick observed (so `tdelta` can be computed), and the
/// PA temperature sample `link_update` folds into duty-cycle backoff.
pub struct MainLoopContext {
    pub golay_enabled: bool,
    pub last_tick: Tick,
    pub pa_temperature_c: i16,
    pub packet_seen_since_last_update: bool,
}

impl MainLoopContext {
    pub fn new(now: Tick) -> Self {
        Self {
            golay_enabled: false,
            last_tick: now,
            pa_temperature_c: 20,
            packet_seen_since_last_update: false,
        }
    }
}

/// Runs one pass of the main loop. `serial_tx` receives bytes delivered to
/// the local host's serial port (deduplicated application payload); it is
/// not called for a dropped duplicate or a zero-length yield/stats packet.
pub fn run_once(
    mac: &mut TdmMac,
    framer: &mut PacketFramer,
    phy: &mut dyn Phy,
    stats: &mut LinkStatistics,
    isr: &SharedIsrState,
    ctx: &mut MainLoopContext,
    serial_tx: &mut dyn FnMut(&[u8]),
) -> Result<(), TdmError> {
    // AT command processing and test-output reporting: out of scope,
    // intentionally no-op (spec §1).

    phy.set_channel(mac.fhop.receive_channel());

    if let Some(received) = phy.receive_packet() {
        ctx.packet_seen_since_last_update = true;
        handle_received_packet(
            mac,
            framer,
            phy,
            stats,
            ctx,
            received.payload,
            received.rssi,
            serial_tx,
        )?;
    } else {
        let now = isr.tick();
        let tdelta = now.wrapping_sub(ctx.last_tick);
        ctx.last_tick = now;
        mac.on_tick(tdelta as u32);

        // Listen-before-talk: fold this pass's RSSI sample into the
        // continuous below-threshold tracker the same pass `tdm_state` is
        // advanced, mirroring the original firmware's inline check.
        mac.note_rssi_sample(phy.current_rssi(), tdelta as u32);
    }

    if mac.maybe_link_update(ctx.packet_seen_since_last_update, ctx.pa_temperature_c) {
        ctx.packet_seen_since_last_update = false;
        stats.reset_period();
    }

    let lbt_elapsed_ticks = mac.lbt_elapsed_ticks();
    if mac.transmit_eligible(&*phy, lbt_elapsed_ticks) {
        phy.set_channel(mac.fhop.transmit_channel());
        if let Some(sent) = mac.build_and_send(framer, phy, isr.tick().0, stats)? {
            debug!("transmitted {} bytes", sent.len());
        }
    }

    Ok(())
}

fn handle_received_packet(
    mac: &mut TdmMac,
    framer: &mut PacketFramer,
    phy: &mut dyn Phy,
    stats: &mut LinkStatistics,
    ctx: &mut MainLoopContext,
    mut payload: Vec<u8>,
    rssi: u8,
    serial_tx: &mut dyn FnMut(&[u8]),
) -> Result<(), TdmError> {
    stats.note_received(rssi);

    if ctx.golay_enabled {
        match golay::decode(&payload) {
            Ok((decoded, corrected_bits, corrected_blocks)) => {
                stats.note_golay_correction(corrected_bits, corrected_blocks);
                payload = decoded;
            }
            Err(e) => {
                warn!("Golay decode rejected packet: {e}");
                stats.note_rx_error();
                return Ok(());
            }
        }
    }

    if payload.len() < crate::constants::TRAILER_SIZE {
        stats.note_rx_error();
        return Ok(());
    }
    let split_at = payload.len() - crate::constants::TRAILER_SIZE;
    let trailer_bytes = [payload[split_at], payload[split_at + 1]];
    let body = &payload[..split_at];
    let trailer = Trailer::unpack(trailer_bytes);

    mac.sync_tx_windows(trailer, body.len());

    if trailer.window == 0 && !trailer.command && body.len() == 16 {
        // A stats packet: trailer.window == 0 marks it (spec §4.4).
        let bytes: [u8; 16] = body.try_into().unwrap_or([0u8; 16]);
        let remote = crate::statistics::LinkStatistics::from_bytes(&bytes);
        let remote_summary = RemoteStatistics::from_link_statistics(&remote);
        mac.power_hunt.on_remote_rssi(remote_summary.average_rssi);
        phy.set_transmit_power(mac.power_hunt.power_dbm());
        return Ok(());
    }

    if framer.is_duplicate(body, trailer.resend) {
        debug!("dropped duplicate resend ({} bytes)", body.len());
        return Ok(());
    }

    if !trailer.command && !body.is_empty() {
        serial_tx(body);
    }

    Ok(())
}

/// Rebuilds the frequency-hop sequence after a configuration change
/// (netid or channel count), matching the original firmware re-seeding
/// `fhop` whenever `tdm_init` is re-run.
pub fn rebuild_fhop(netid: u16, num_channels: u8) -> FreqHopper {
    FreqHopper::new(netid, num_channels)
}
