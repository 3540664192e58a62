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

//! Offline command generation, for testing the bootloader without a CLI
//! session driving it.

use std::{io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};

use microboot::constants::DEFAULT_BLOCK_SIZE;
use microboot::{device, generator};

#[derive(Clone, Copy, ValueEnum)]
pub enum GenOp {
    Read,
    Write,
}

#[derive(Args)]
pub struct GencommandArgs {
    /// Size of each data block in bytes
    #[arg(short, long, default_value_t = DEFAULT_BLOCK_SIZE)]
    block_size: u8,

    /// Command sequence to generate
    #[arg(short, long, value_enum)]
    command: GenOp,

    /// Start address in hex, e.g. 0x0100. Defaults to the device's lowest
    /// address. Ignored for a write from an Intel HEX file, which always
    /// uses the file's own address range
    #[arg(short, long)]
    start: Option<String>,

    /// Number of bytes to process. Defaults to the whole device for read,
    /// or the whole device for --random write. Ignored for a write from an
    /// Intel HEX file, which always uses the file's own address range
    #[arg(short, long)]
    length: Option<usize>,

    /// For the write command only: use random bytes instead of an input file
    #[arg(short, long)]
    random: bool,

    /// Intel HEX file to read write data from (ignored with --random)
    file: Option<PathBuf>,
}

pub fn run(device_name: &str, args: &GencommandArgs) -> Result<()> {
    let descriptor = device::lookup(device_name)?;

    let start = match &args.start {
        Some(s) => u16::from_str_radix(s.trim_start_matches("0x"), 16)
            .context("Invalid --start address, expected a hex number")?,
        None => descriptor.addr_low,
    };

    let commands = match args.command {
        GenOp::Read => {
            let length = args
                .length
                .unwrap_or(usize::from(descriptor.addr_high - start) + 1);
            generator::generate_read_commands(descriptor, args.block_size, start, length)?
        }
        GenOp::Write if args.random => {
            let length = args.length.unwrap_or(
                usize::from(descriptor.addr_high - descriptor.addr_low) + 1,
            );
            let data = generator::random_data(length);
            generator::generate_write_commands(descriptor, args.block_size, start, &data)?
        }
        GenOp::Write => {
            let path = args
                .file
                .as_ref()
                .context("Must specify an input file or --random with the write command")?;
            let image = crate::flash::load_hex(path)?;
            // A write from a HEX file always uses the file's own address
            // range, ignoring --start/--length.
            let (file_start, data) = image
                .to_contiguous(microboot::constants::GENERATOR_PAD_BYTE)
                .context("HEX file contains no data")?;
            generator::generate_write_commands(descriptor, args.block_size, file_start, &data)?
        }
    };

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for command in &commands {
        // Drop the trailing terminator before printing; the `writeln!`
        // below supplies its own.
        let _ = out.write_all(&command[..command.len() - 1]);
        let _ = out.write_all(b"\n");
    }

    Ok(())
}
