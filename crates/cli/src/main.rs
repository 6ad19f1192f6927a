//! wsl-usb command-line tool
//!
//! Front-end for the usbipd wrapper: lists USB devices known to the
//! usbipd-win tool and drives the share/attach lifecycle from the terminal.

mod config;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use usbipd::{SystemRunner, UsbDevice, Usbipd};

#[derive(Parser, Debug)]
#[command(name = "wsl-usb")]
#[command(
    author,
    version,
    about = "Share USB devices from a Windows host into WSL"
)]
#[command(long_about = "
Drives the usbipd-win command-line tool to share USB devices into WSL.
Every mutating operation is verified by re-querying device state rather
than trusting the tool's exit status.

EXAMPLES:
    # List devices (default when no subcommand is given)
    wsl-usb list

    # Share a device, then attach it into WSL
    wsl-usb bind 2-1
    wsl-usb attach 2-1

    # Detach from WSL, keeping the share in place
    wsl-usb detach 2-1

    # Machine-readable device list
    wsl-usb list --json

CONFIGURATION:
    Settings are read from <config_dir>/wsl-usb/config.toml, or the path
    given with --config. Use --save-config to write the defaults there.
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<std::path::PathBuf>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List USB devices known to usbipd
    List {
        /// Emit the device list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Share a device (forced bind)
    Bind {
        /// Bus id of the device, e.g. 2-1
        bus_id: String,
    },
    /// Stop sharing a device
    Unbind {
        /// Bus id of the device, e.g. 2-1
        bus_id: String,
    },
    /// Attach a shared device into WSL
    Attach {
        /// Bus id of the device, e.g. 2-1
        bus_id: String,
    },
    /// Detach a device from WSL, keeping the share
    Detach {
        /// Bus id of the device, e.g. 2-1
        bus_id: String,
    },
    /// Print the detected usbipd version
    Version,
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    if args.save_config {
        let config = config::CliConfig::default();
        let path = config::CliConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let config = match args.config {
        Some(ref path) => config::CliConfig::load(Some(path.clone()))
            .context("Failed to load configuration")?,
        None => config::CliConfig::load_or_default(),
    };

    let log_level = args.log_level.as_deref().unwrap_or(&config.cli.log_level);
    logging::setup_logging(log_level).context("Failed to setup logging")?;

    let Some(tool) = Usbipd::detect_with(config.tool.program.clone(), Box::new(SystemRunner))
    else {
        return Err(usbipd::Error::ToolUnavailable)
            .with_context(|| format!("{} was not found", config.tool.program));
    };

    match args.command.unwrap_or(Command::List { json: false }) {
        Command::List { json } => {
            list_devices(&tool, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Version => {
            println!("{}", tool.version());
            Ok(ExitCode::SUCCESS)
        }
        Command::Bind { bus_id } => transition(&tool, &bus_id, "bind", Usbipd::bind),
        Command::Unbind { bus_id } => transition(&tool, &bus_id, "unbind", Usbipd::unbind),
        Command::Attach { bus_id } => transition(&tool, &bus_id, "attach", Usbipd::attach),
        Command::Detach { bus_id } => transition(&tool, &bus_id, "detach", Usbipd::detach),
    }
}

/// Resolve the target device by bus id, run the transition, report result
fn transition(
    tool: &Usbipd,
    bus_id: &str,
    verb: &str,
    op: fn(&Usbipd, &UsbDevice) -> bool,
) -> Result<ExitCode> {
    let devices = tool.devices().context("Failed to query device state")?;
    let Some(device) = devices.iter().find(|d| d.bus_id() == Some(bus_id)) else {
        eprintln!("No device with bus id {bus_id}");
        return Ok(ExitCode::FAILURE);
    };

    if op(tool, device) {
        println!("{verb} {bus_id}: ok");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("{verb} {bus_id}: failed");
        Ok(ExitCode::FAILURE)
    }
}

fn list_devices(tool: &Usbipd, json: bool) -> Result<()> {
    let devices = tool.devices().context("Failed to query device state")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No devices reported by usbipd.");
        return Ok(());
    }

    println!("Found {} device(s):\n", devices.len());
    for device in &devices {
        println!(
            "  [{}] {}:{} - {}",
            device.bus_id().unwrap_or("-"),
            device.vid(),
            device.pid(),
            device.description().unwrap_or("Unknown Device"),
        );
        println!("      State: {}", device.state().describe());
        if let Some(client) = device.client_ip_addr() {
            println!("      Client: {client}");
        }
        if device.is_forced() {
            println!("      Forced: yes");
        }
        println!();
    }

    Ok(())
}
