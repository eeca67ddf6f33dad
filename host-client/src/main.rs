// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundation.xyz>
// SPDX-License-Identifier: GPL-3.0-or-later

use clap::{Args, Parser, Subcommand, ValueEnum};
use consts::{DEVELOPMENT_AES_KEY, FLASH_PAGE_SIZE};
use host_client::{protect, Device};
use host_protocol::Region;
use serialport::SerialPort;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct BootctlArgs {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args)]
struct PortArgs {
    /// Serial port the bootloader is attached to
    #[arg(short, long)]
    port: String,
    #[arg(short, long, default_value_t = 115_200)]
    baud: u32,
    /// Flash page size of the device, one upload frame
    #[arg(long, default_value_t = FLASH_PAGE_SIZE, value_parser = clap::value_parser!(u32).range(1..))]
    page_size: u32,
}

#[derive(Clone, Copy, ValueEnum)]
enum RegionArg {
    Firmware,
    Configuration,
}

impl From<RegionArg> for Region {
    fn from(region: RegionArg) -> Self {
        match region {
            RegionArg::Firmware => Region::Firmware,
            RegionArg::Configuration => Region::Configuration,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a plain firmware binary and print its digest
    Protect {
        input: PathBuf,
        /// Where the encrypted image goes
        output: PathBuf,
    },

    /// Protect a plain firmware binary and upload it
    Update {
        #[command(flatten)]
        port: PortArgs,
        image: PathBuf,
        /// Version of the image, 0 keeps the installed version
        #[arg(long, default_value_t = 0)]
        version: u16,
        /// Release message shown on boot
        #[arg(short, long, default_value = "")]
        message: String,
    },

    /// Upload a configuration blob
    Configure {
        #[command(flatten)]
        port: PortArgs,
        file: PathBuf,
    },

    /// Dump a stored region
    Readback {
        #[command(flatten)]
        port: PortArgs,
        #[arg(value_enum)]
        region: RegionArg,
        size: u32,
        output: PathBuf,
    },

    /// Verify and start the installed firmware
    Boot {
        #[command(flatten)]
        port: PortArgs,
    },

    /// List the serial ports of this machine
    ListPorts,
}

fn open(args: &PortArgs) -> Result<Device<Box<dyn SerialPort>>, Box<dyn Error>> {
    tracing::info!("opening {} at {} baud", args.port, args.baud);
    let port = serialport::new(&args.port, args.baud)
        .timeout(Duration::from_secs(5))
        .open()?;
    Ok(Device::new(port, args.page_size))
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = BootctlArgs::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();

    match args.command {
        Commands::Protect { input, output } => {
            let image = protect(&fs::read(input)?, &DEVELOPMENT_AES_KEY);
            fs::write(&output, &image.body)?;
            tracing::info!("wrote {} bytes to {}", image.body.len(), output.display());
            println!("{}", image.digest_hex());
        }
        Commands::Update {
            port,
            image,
            version,
            message,
        } => {
            let image = protect(&fs::read(image)?, &DEVELOPMENT_AES_KEY);
            open(&port)?.update(version, &message, &image)?;
        }
        Commands::Configure { port, file } => {
            open(&port)?.configure(&fs::read(file)?)?;
        }
        Commands::Readback {
            port,
            region,
            size,
            output,
        } => {
            let data = open(&port)?.readback(region.into(), size)?;
            fs::write(&output, data)?;
            tracing::info!("wrote {} bytes to {}", size, output.display());
        }
        Commands::Boot { port } => {
            let message = open(&port)?.boot()?;
            println!("{message}");
        }
        Commands::ListPorts => {
            for port in serialport::available_ports()? {
                println!("{}", port.port_name);
            }
        }
    }
    Ok(())
}
