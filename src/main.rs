// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

// XMODEM-CRC sender
mod cancel;
mod config;
mod crc;
mod error;
mod logging;
mod packet;
mod protocol;
mod sender;
mod serial;
mod session;
mod source;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};
use cancel::CancelToken;
use config::{BaudRate, LineMode, SerialConfig, TransferConfig};
use error::SenderError;
use serial::RealSerialPort;
use session::{LogProgress, Outcome};
use source::BlockReader;

#[derive(Parser)]
#[command(name = "xmodem-send")]
#[command(about = "Send a file to an XMODEM-CRC receiver over a serial line", long_about = None)]
struct Cli {
    /// File to send
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Serial port to use (e.g., /dev/ttyUSB0 or COM1)
    #[arg(short, long)]
    port: String,

    /// Baud rate: 1200 1800 2400 4800 9600 19200 38400 57600 115200 230400
    #[arg(short, long, default_value = "115200")]
    speed: BaudRate,

    /// Line mode <data bits><parity><stop bits>, e.g. 7E2
    #[arg(short, long, default_value = "8N1")]
    mode: LineMode,

    /// Upper bound in milliseconds on each wait for the receiver
    #[arg(long, default_value = "10", value_name = "MS")]
    poll_ms: u64,

    /// Give up on a packet after this many resends (default: never)
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,

    /// Give up if the receiver has not asked to start within this many seconds
    #[arg(long, value_name = "SECS")]
    sync_timeout: Option<u64>,

    /// Resend a packet if the receiver stays silent this many seconds
    #[arg(long, value_name = "SECS")]
    response_timeout: Option<u64>,

    /// How long to wait for the receiver to answer EOT
    #[arg(long, default_value = "3000", value_name = "MS")]
    eot_timeout_ms: u64,

    /// Exit once the transfer is done instead of echoing the receiver's output
    #[arg(long)]
    no_relay: bool,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            poll_interval: Duration::from_millis(self.poll_ms),
            sync_timeout: self.sync_timeout.map(Duration::from_secs),
            response_timeout: self.response_timeout.map(Duration::from_secs),
            max_retries: self.max_retries,
            eot_timeout: Duration::from_millis(self.eot_timeout_ms),
        }
    }

    fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            path: self.port.clone(),
            baud: self.speed,
            mode: self.mode,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(&cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), SenderError> {
    let serial_config = cli.serial_config();
    let config = cli.transfer_config();

    info!("send file {} on {}", cli.input.display(), serial_config.path);
    info!("Settings: {} baud, {}", serial_config.baud, serial_config.mode);

    let mut serial_port = RealSerialPort::open(&serial_config)?;
    let mut source = BlockReader::open(&cli.input)?;

    let cancel = CancelToken::new();
    cancel::cancel_on_ctrl_c(cancel.clone())?;

    let summary = session::send(&mut serial_port, &mut source, &config, &cancel, &mut LogProgress)?;
    if summary.outcome == Outcome::Cancelled {
        return Ok(());
    }

    info!(
        "Transfer complete: {} packets, {} bytes, {} retries",
        summary.session.accepted,
        summary.session.bytes,
        summary.session.total_retries
    );

    if !cli.no_relay {
        info!("Press ^C to exit");
        let mut stdout = std::io::stdout().lock();
        session::relay(&mut serial_port, &mut stdout, &cancel, config.poll_interval)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["xmodem-send", "-i", "fw.bin", "-p", "/dev/ttyUSB0"]).unwrap();
        assert_eq!(cli.speed.get(), 115200);
        assert_eq!(cli.mode, LineMode::default());
        assert!(!cli.no_relay);

        let config = cli.transfer_config();
        assert_eq!(config.poll_interval, Duration::from_millis(10));
        assert!(config.max_retries.is_none());
        assert!(config.sync_timeout.is_none());
    }

    #[test]
    fn test_cli_options() {
        let cli = Cli::try_parse_from([
            "xmodem-send", "-i", "fw.bin", "-p", "COM3", "-s", "9600", "-m", "7E2",
            "--max-retries", "5", "--sync-timeout", "30", "--no-relay", "-vv",
        ])
        .unwrap();

        assert_eq!(cli.serial_config().baud.get(), 9600);
        assert_eq!(cli.serial_config().mode.to_string(), "7E2");
        assert_eq!(cli.verbose, 2);
        assert!(cli.no_relay);

        let config = cli.transfer_config();
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.sync_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_cli_rejects_bad_line_settings() {
        assert!(Cli::try_parse_from(["xmodem-send", "-i", "f", "-p", "p", "-s", "1234"]).is_err());
        assert!(Cli::try_parse_from(["xmodem-send", "-i", "f", "-p", "p", "-m", "8Z1"]).is_err());
        assert!(Cli::try_parse_from(["xmodem-send", "-p", "p"]).is_err());
    }
}
