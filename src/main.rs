use clap::{Parser, Subcommand};
use tdm_modem::config::{as_named_integers, JsonFileParameterStore, ParameterStore, TdmConfig};
use tdm_modem::util::hex::{decode_hex, encode_hex};
use tdm_modem::{golay, init_logger, log_info, TdmError};

/// Configuration and diagnostics CLI for the TDM radio modem core.
///
/// The AT-style command language and flash parameter store are out of
/// scope for this crate (they live in the board firmware); this binary
/// exposes the same persisted parameters (spec §6.4) against a JSON file
/// instead, and a couple of Golay codec utilities useful when bench-testing
/// a link offline.
#[derive(Parser)]
#[command(name = "tdm-modem")]
#[command(about = "TDM radio modem core: configuration and Golay codec utilities")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the persisted configuration as named integers (spec §6.4).
    ShowConfig {
        #[arg(long, default_value = "tdm_config.json")]
        path: String,
    },
    /// Set one named parameter and persist it.
    SetParam {
        #[arg(long, default_value = "tdm_config.json")]
        path: String,
        name: String,
        value: String,
    },
    /// Encode 3*N bytes (hex) into 6*N Golay-protected bytes.
    GolayEncode { hex: String },
    /// Decode 6*N Golay-protected bytes (hex) back to 3*N bytes, correcting
    /// up to 3 bit errors per 23-bit block.
    GolayDecode { hex: String },
}

fn main() -> Result<(), TdmError> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::ShowConfig { path } => {
            let store = JsonFileParameterStore::new(&path);
            let config = store.load()?;
            for (name, value) in as_named_integers(&config) {
                println!("{name}={value}");
            }
        }
        Commands::SetParam { path, name, value } => {
            let mut store = JsonFileParameterStore::new(&path);
            let mut config = store.load()?;
            set_named_param(&mut config, &name, &value)?;
            config
                .validate()
                .map_err(|e| TdmError::ConfigInvalid(e.to_string()))?;
            store.save(&config)?;
            log_info(&format!("saved {name}={value} to {path}"));
        }
        Commands::GolayEncode { hex } => {
            let data = decode_hex(&hex).map_err(|e| TdmError::ConfigInvalid(e.to_string()))?;
            let encoded = golay::encode(&data)?;
            println!("{}", encode_hex(&encoded));
        }
        Commands::GolayDecode { hex } => {
            let data = decode_hex(&hex).map_err(|e| TdmError::ConfigInvalid(e.to_string()))?;
            let (decoded, corrected_bits, corrected_blocks) = golay::decode(&data)?;
            println!(
                "{} (corrected {corrected_bits} bits across {corrected_blocks} blocks)",
                encode_hex(&decoded)
            );
        }
    }

    Ok(())
}

fn set_named_param(config: &mut TdmConfig, name: &str, value: &str) -> Result<(), TdmError> {
    let parse_u32 = |v: &str| {
        v.parse::<u32>()
            .map_err(|_| TdmError::ConfigInvalid(format!("{v} is not a valid integer")))
    };
    let parse_u8 = |v: &str| {
        v.parse::<u8>()
            .map_err(|_| TdmError::ConfigInvalid(format!("{v} is not a valid integer")))
    };
    let parse_bool = |v: &str| match v {
        "0" | "false" => Ok(false),
        "1" | "true" => Ok(true),
        _ => Err(TdmError::ConfigInvalid(format!("{v} is not 0/1"))),
    };

    match name {
        "SERIAL_SPEED" => config.serial_speed = parse_u32(value)?,
        "AIR_SPEED" => config.air_speed = parse_u32(value)?,
        "NETID" => config.netid = parse_u32(value)? as u16,
        "TXPOWER" => config.tx_power_dbm = parse_u8(value)?,
        "ECC" => config.ecc = parse_bool(value)?,
        "MAVLINK" => config.mavlink = parse_bool(value)?,
        "OPPRESEND" => config.opportunistic_resend = parse_bool(value)?,
        "LBT_RSSI" => config.lbt_rssi = parse_u8(value)?,
        "DUTY_CYCLE" => config.duty_cycle = parse_u8(value)?,
        "NUM_CHANNELS" => config.num_channels = parse_u8(value)?,
        "MIN_FREQ" => config.min_freq_khz = parse_u32(value)?,
        "MAX_FREQ" => config.max_freq_khz = parse_u32(value)?,
        "MAX_WINDOW" => config.max_window_ms = parse_u32(value)?,
        "TARGET_RSSI" => config.target_rssi = parse_u8(value)?,
        "HYSTERESIS_RSSI" => config.hysteresis_rssi = parse_u8(value)?,
        other => return Err(TdmError::ConfigInvalid(format!("unknown parameter {other}"))),
    }
    Ok(())
}
