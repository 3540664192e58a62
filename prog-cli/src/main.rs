// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
    io::{self, Write},
    path::PathBuf,
    time::Duration,
};

use serial::SerialPort;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use microboot::constants::{DEFAULT_RETRIES, DEFAULT_SPEED, DEFAULT_TIMEOUT_MS};
use microboot::Session;

mod dump;
mod flash;
mod gencommand;
mod list;

#[cfg(unix)]
const DEFAULT_PORT: &str = "/dev/ttyACM0";
#[cfg(windows)]
const DEFAULT_PORT: &str = "COM0";

/// Host-side client for the Microboot serial bootloader.
#[derive(Parser)]
#[command(name = "mb", version, author, about)]
struct Cli {
    /// Serial port to use
    #[arg(short, long, default_value = DEFAULT_PORT, global = true)]
    port: PathBuf,

    /// Device to talk to, e.g. attiny85, atmega8, atmega88, atmega168
    #[arg(short, long, global = true)]
    device: Option<String>,

    /// Serial port baud rate
    #[arg(short = 'B', long, default_value_t = DEFAULT_SPEED, global = true)]
    baud: usize,

    /// Response timeout in milliseconds
    #[arg(short = 't', long, default_value_t = DEFAULT_TIMEOUT_MS as u64, global = true)]
    timeout_ms: u64,

    /// Number of retries for a malformed or failed response
    #[arg(short, long, default_value_t = DEFAULT_RETRIES, global = true)]
    retries: usize,

    /// Sets the level of verbosity, -v (debug), -vv (trace)
    #[arg(short = 'v', action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Flash an Intel HEX file to the device
    Flash(flash::FlashArgs),
    /// Dump the device's entire addressable range to an Intel HEX file
    Dump(dump::DumpArgs),
    /// Verify an Intel HEX file against the device's current contents
    Verify(flash::VerifyArgs),
    /// Generate protocol command frames offline, without a device attached
    Gencommand(gencommand::GencommandArgs),
    /// List available serial ports
    List,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    })?;

    if let Command::List = cli.command {
        return list::list();
    }

    let device_name = cli
        .device
        .clone()
        .context("`--device` is required for this command")?;

    if let Command::Gencommand(ref args) = cli.command {
        return gencommand::run(&device_name, args);
    }

    log::info!("Opening serial port `{}`", cli.port.display());
    let mut port = serial::SystemPort::open(&cli.port).with_context(|| {
        format!("Couldn't open serial port `{}`", cli.port.display())
    })?;

    port.configure(&serial::PortSettings {
        baud_rate: baud_rate(cli.baud),
        char_size: serial::CharSize::Bits8,
        parity: serial::Parity::ParityNone,
        stop_bits: serial::StopBits::Stop1,
        flow_control: serial::FlowControl::FlowNone,
    })?;
    port.set_timeout(Duration::from_millis(cli.timeout_ms))?;

    let mut session: Session<serial::SystemPort> = Session::new();
    session.set_retries(cli.retries);
    session.set_logger(|command, response| {
        log::trace!("-> {}", String::from_utf8_lossy(command).trim_end());
        log::trace!("<- {}", String::from_utf8_lossy(response).trim_end());
    });

    log::info!("Connecting to device `{}`", device_name);
    session
        .connect(&device_name, port)
        .context("Failed to connect to device")?;

    let info = session.boot_info().expect("connect succeeded");
    log::info!(
        "Connected: protocol {:#04X}, block size {}, family {:#04X}, model {:#04X}",
        info.protocol_version,
        info.block_size,
        info.family,
        info.model
    );

    match cli.command {
        Command::Flash(args) => flash::run(&mut session, &args),
        Command::Dump(args) => dump::run(&mut session, &args),
        Command::Verify(args) => flash::verify(&mut session, &args),
        Command::Gencommand(_) | Command::List => unreachable!("handled above"),
    }
}

pub(crate) fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})"),
    );
    bar
}

fn baud_rate(value: usize) -> serial::BaudRate {
    match value {
        110 => serial::BaudRate::Baud110,
        300 => serial::BaudRate::Baud300,
        600 => serial::BaudRate::Baud600,
        1200 => serial::BaudRate::Baud1200,
        2400 => serial::BaudRate::Baud2400,
        4800 => serial::BaudRate::Baud4800,
        9600 => serial::BaudRate::Baud9600,
        19200 => serial::BaudRate::Baud19200,
        38400 => serial::BaudRate::Baud38400,
        57600 => serial::BaudRate::Baud57600,
        115200 => serial::BaudRate::Baud115200,
        n => serial::BaudRate::BaudOther(n),
    }
}

fn init_logger(level: log::LevelFilter) -> Result<()> {
    let mut logger = env_logger::Builder::from_env("MICROBOOT_LOG");
    logger.filter_level(level);

    #[cfg(unix)]
    logger.format(log_format_color);
    #[cfg(not(unix))]
    logger.format(log_format_no_color);

    logger.try_init().context("Failed to initialize logger")
}

#[cfg(unix)]
fn log_format_color(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> io::Result<()> {
    let level = match record.level() {
        log::Level::Error => ansi_term::Color::Red.bold().paint("ERROR"),
        log::Level::Warn => ansi_term::Color::Yellow.bold().paint("WARN"),
        log::Level::Info => ansi_term::Color::Green.bold().paint("INFO"),
        log::Level::Debug => ansi_term::Color::Cyan.bold().paint("DBG"),
        log::Level::Trace => ansi_term::Color::Cyan.bold().paint("TRACE"),
    };

    writeln!(fmt, "[{}] - {}", level, record.args())
}

#[cfg(not(unix))]
fn log_format_no_color(
    fmt: &mut env_logger::fmt::Formatter,
    record: &log::Record<'_>,
) -> io::Result<()> {
    let level = match record.level() {
        log::Level::Error => "ERROR",
        log::Level::Warn => "WARN",
        log::Level::Info => "INFO",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRACE",
    };

    writeln!(fmt, "[{}] - {}", level, record.args())
}
