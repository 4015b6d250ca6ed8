//! fm350ctl
//!
//! One-shot control of an FM350-class 5G modem: restart it, bring the data
//! connection up or down, install a default route, and report device info,
//! temperatures, bands, DNS servers or stored SMS. `--graph` keeps polling
//! and plots received power until interrupted.

mod plot;

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use fm350_modem::config::{DEFAULT_CONFIG_PATH, RNDIS_SYSFS_ROOT};
use fm350_modem::net::{IpRoute2, NetSync};
use fm350_modem::sms::PduCodec;
use fm350_modem::telemetry::{band_record, temperature_record, DeviceInfo, Record};
use fm350_modem::{Modem, ModemConfig};
use tracing_subscriber::EnvFilter;

/// Control an FM350 5G modem over its AT port.
#[derive(Parser, Debug)]
#[command(name = "fm350ctl", version, about = "FM350 5G modem control")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Serial device of the AT port.
    #[arg(long)]
    serial: Option<String>,

    /// Serial baud rate.
    #[arg(long)]
    baud: Option<u32>,

    /// Serial read/write timeout in milliseconds.
    #[arg(long)]
    timeout: Option<u64>,

    /// PDP context id.
    #[arg(long)]
    cid: Option<u32>,

    /// Network device bound to the modem (default: auto-detect).
    #[arg(long)]
    netdev: Option<String>,

    /// SIM card PIN.
    #[arg(long)]
    simpin: Option<String>,

    /// Access point name.
    #[arg(long)]
    apn: Option<String>,

    /// Log raw AT traffic.
    #[arg(long, default_value_t = false)]
    debug: bool,

    /// Print info/temp/bands/dns/sms as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Restart the modem.
    #[arg(long)]
    restart: bool,

    /// Plot the received signal power continuously.
    #[arg(long)]
    graph: bool,

    /// List stored SMS.
    #[arg(long)]
    sms: bool,

    /// Connect and configure the network device.
    #[arg(long)]
    connect: bool,

    /// Disconnect and flush the network device.
    #[arg(long)]
    disconnect: bool,

    /// Add a default route via the modem.
    #[arg(long)]
    route: bool,

    /// Print the DNS servers of the active context.
    #[arg(long)]
    dns: bool,

    /// Print device information.
    #[arg(long)]
    info: bool,

    /// Print thermal sensor readings.
    #[arg(long)]
    temp: bool,

    /// Print the RAT and band configuration.
    #[arg(long)]
    bands: bool,

    /// Enable every supported band.
    #[arg(long)]
    unlock_bands: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Restart,
    Graph,
    Sms,
    Connect { route: bool },
    Disconnect,
    Route,
    Dns,
    Info,
    Temp,
    Bands,
    UnlockBands,
}

impl Cli {
    /// Resolve the mode flags. `--route` may ride along with `--connect`
    /// and is ignored with `--disconnect`.
    fn mode(&self, route_from_config: bool) -> Result<Mode, String> {
        let route = self.route || route_from_config;
        let selected: Vec<Mode> = [
            (self.restart, Mode::Restart),
            (self.graph, Mode::Graph),
            (self.sms, Mode::Sms),
            (self.connect, Mode::Connect { route }),
            (self.disconnect, Mode::Disconnect),
            (self.dns, Mode::Dns),
            (self.info, Mode::Info),
            (self.temp, Mode::Temp),
            (self.bands, Mode::Bands),
            (self.unlock_bands, Mode::UnlockBands),
        ]
        .into_iter()
        .filter_map(|(on, mode)| on.then_some(mode))
        .collect();

        match selected.as_slice() {
            [] if self.route => Ok(Mode::Route),
            [] => Err(
                "requires a mode: restart | graph | sms | connect | disconnect | route | dns | info | temp | bands | unlock-bands"
                    .to_string(),
            ),
            [mode] => Ok(*mode),
            _ => Err("only one mode may be given".to_string()),
        }
    }

    fn apply(&self, cfg: &mut ModemConfig) {
        if let Some(serial) = &self.serial {
            cfg.serial = serial.clone();
        }
        if let Some(baud) = self.baud {
            cfg.baud = baud;
        }
        if let Some(timeout) = self.timeout {
            cfg.timeout_ms = timeout;
        }
        if let Some(cid) = self.cid {
            cfg.context_id = cid;
        }
        if let Some(netdev) = &self.netdev {
            cfg.netdev = Some(netdev.clone());
        }
        if let Some(pin) = &self.simpin {
            cfg.sim_pin = Some(pin.clone());
        }
        if let Some(apn) = &self.apn {
            cfg.apn = Some(apn.clone());
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .compact()
        .init();

    let mut config = ModemConfig::load(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    cli.apply(&mut config);

    let mode = match cli.mode(config.route) {
        Ok(mode) => mode,
        Err(msg) => Cli::command()
            .error(clap::error::ErrorKind::MissingRequiredArgument, msg)
            .exit(),
    };
    tracing::debug!(?mode, serial = %config.serial, cid = config.context_id, "fm350ctl starting");

    let mut modem = Modem::open(&config, cli.debug).context("failed to open modem")?;
    let result = run(mode, &mut modem, &config, cli.json);
    modem.close();
    result
}

fn run<T: Read + Write>(
    mode: Mode,
    modem: &mut Modem<T>,
    config: &ModemConfig,
    json: bool,
) -> anyhow::Result<()> {
    match mode {
        Mode::Restart => {
            modem.reset()?;
            tracing::info!("modem restarting");
        }
        Mode::Graph => plot::run(modem)?,
        Mode::Sms => {
            let messages = modem.sms_list(&PduCodec)?;
            if json {
                println!("{}", serde_json::to_string(&messages)?);
            } else {
                for msg in &messages {
                    println!("{} {}", msg.sender, msg.message);
                }
            }
        }
        Mode::Info => print_record(&DeviceInfo::collect(modem)?.to_record(), json)?,
        Mode::Temp => print_record(&temperature_record(&modem.temperatures()?), json)?,
        Mode::Bands => print_record(&band_record(&modem.band_configuration()?), json)?,
        Mode::Dns => {
            let servers = modem.dns()?;
            if json {
                println!("{}", serde_json::to_string(&servers)?);
            } else {
                for server in &servers {
                    println!("{server}");
                }
            }
        }
        Mode::UnlockBands => {
            modem.unlock_bands()?;
        }
        Mode::Connect { route } => {
            let mut net = netdev(config)?;
            modem.connect(&mut net, config.sim_pin.as_deref(), config.apn.as_deref())?;
            if route {
                net.install_default_routes()?;
            }
        }
        Mode::Disconnect => {
            let mut net = netdev(config)?;
            modem.disconnect(&mut net)?;
        }
        Mode::Route => {
            netdev(config)?.install_default_routes()?;
        }
    }
    Ok(())
}

fn netdev(config: &ModemConfig) -> anyhow::Result<NetSync<IpRoute2>> {
    let name = config.resolve_netdev(Path::new(RNDIS_SYSFS_ROOT))?;
    Ok(NetSync::new(IpRoute2::new(), name))
}

fn print_record(record: &Record, json: bool) -> anyhow::Result<()> {
    let mut out = io::stdout().lock();
    if json {
        writeln!(out, "{}", record.to_json()?)?;
    } else {
        writeln!(out, "{}", record.to_text())?;
    }
    Ok(())
}
