use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use rusb::{Device, GlobalContext};
use simple_logger::SimpleLogger;

use rcwtool::bridge::{BusSpeed, Mcp2221};
use rcwtool::eeprom::DEFAULT_ADDRESS;
use rcwtool::error::Error;
use rcwtool::report::RcwReport;
use rcwtool::session::Session;
use rcwtool::structures::rcw::BootMedia;

fn parse_address(s: &str) -> Result<u8, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    match u8::from_str_radix(digits, 16) {
        Ok(address) if address <= 0x7f => Ok(address),
        _ => Err(format!("illegal address: {s}")),
    }
}

/// Read and rewrite the reset configuration word in the boot EEPROM.
#[derive(Debug, Clone, Parser)]
#[command(name = "rcwtool", version)]
struct CliArgs {
    /// Boot media to configure
    #[arg(long, value_enum, default_value_t = BootMedia::Sd)]
    boot: BootMedia,

    /// 7-bit I2C address of the EEPROM (hex) [default: 50]
    #[arg(long, value_parser = parse_address)]
    addr: Option<u8>,

    /// MCP2221 to use when several are attached
    #[arg(long)]
    index: Option<usize>,

    #[arg(long, value_enum, default_value_t = BusSpeed::Fast)]
    bus_speed: BusSpeed,

    /// Show the planned RCW without writing it
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

fn prompt_index(count: usize) -> Result<usize> {
    print!("Enter number of desired device [0-{}]: ", count - 1);
    std::io::stdout().flush()?;

    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .context("Could not read device number")?;
    let line = line.trim();
    Ok(line
        .parse()
        .map_err(|_| Error::InvalidDeviceNumber(line.to_string()))?)
}

fn select_device(
    devices: &[Device<GlobalContext>],
    index: Option<usize>,
) -> Result<&Device<GlobalContext>> {
    let count = devices.len();
    if count == 0 {
        return Err(Error::NoDevice.into());
    }
    println!("Found {count} device{}", if count == 1 { "" } else { "s" });

    let index = match index {
        Some(index) => index,
        None if count == 1 => 0,
        None => prompt_index(count)?,
    };
    Ok(devices
        .get(index)
        .ok_or(Error::InvalidDeviceIndex { index, count })?)
}

fn run(args: CliArgs) -> Result<()> {
    let address = args.addr.unwrap_or(DEFAULT_ADDRESS);

    let devices = Mcp2221::enumerate().map_err(Error::Open)?;
    let device = select_device(&devices, args.index)?;
    let bridge = Mcp2221::open(device).map_err(Error::Open)?;

    let mut session = Session::open(bridge, address, args.bus_speed)?;
    let before = session.read_rcw().context("Could not read RCW")?;
    print!("{}", RcwReport(&before));

    let outcome = session
        .apply(before, args.boot, args.dry_run)
        .context("Could not update RCW")?;
    if let Some(after) = outcome.after {
        if args.dry_run {
            println!("Planned (not written):");
        }
        print!("{}", RcwReport(&after));
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Error: {e:#}");
            ExitCode::from(e.downcast_ref::<Error>().map_or(1, Error::exit_code))
        }
    }
}
