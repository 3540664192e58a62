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

use std::{fs::File, io::Read, path::PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serial::SystemPort;

use microboot::relocate::{relocate_reset_vector, FlashImage, SparseImage};
use microboot::Session;

#[derive(Args)]
pub struct FlashArgs {
    /// Intel HEX file to flash
    pub file: PathBuf,

    /// Skip the read-back verification pass after writing
    #[arg(long)]
    pub no_verify: bool,

    /// Skip reset-vector relocation, even on a device that needs it
    #[arg(long)]
    pub no_relocate: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// Intel HEX file to verify against
    pub file: PathBuf,

    /// Skip reset-vector relocation, even on a device that needs it
    #[arg(long)]
    pub no_relocate: bool,
}

pub fn run(session: &mut Session<SystemPort>, args: &FlashArgs) -> Result<()> {
    let (start, data) = prepare_image(session, &args.file, args.no_relocate)?;

    log::info!("Writing {} bytes starting at {:#06X}", data.len(), start);
    let bar = crate::progress_bar(data.len() as u64);
    session.write(
        start,
        data.len(),
        &data,
        Some(&mut |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }),
    )?;
    bar.finish_with_message("written");

    if !args.no_verify {
        log::info!("Verifying");
        let bar = crate::progress_bar(data.len() as u64);
        session.verify(
            start,
            data.len(),
            &data,
            Some(&mut |done, total| {
                bar.set_length(total as u64);
                bar.set_position(done as u64);
            }),
        )?;
        bar.finish_with_message("verified");
    }

    Ok(())
}

pub fn verify(session: &mut Session<SystemPort>, args: &VerifyArgs) -> Result<()> {
    let (start, data) = prepare_image(session, &args.file, args.no_relocate)?;

    log::info!("Verifying {} bytes starting at {:#06X}", data.len(), start);
    let bar = crate::progress_bar(data.len() as u64);
    session.verify(
        start,
        data.len(),
        &data,
        Some(&mut |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }),
    )?;
    bar.finish_with_message("verified");

    Ok(())
}

/// Load `file`, relocate the reset vector if the connected device needs it,
/// and flatten the result into a single contiguous buffer.
fn prepare_image(
    session: &Session<SystemPort>,
    file: &PathBuf,
    no_relocate: bool,
) -> Result<(u16, Vec<u8>)> {
    let mut image = load_hex(file)?;

    let device = session.device().expect("connected before flash/verify");
    if device.soft_uart && !no_relocate && image.min_addr() == 0 {
        let original_entry = relocate_reset_vector(&mut image, device.addr_high)
            .context("Failed to relocate the reset vector")?;
        log::info!(
            "Relocated reset vector, original entry point was {:#06X}",
            original_entry
        );
    }

    image
        .to_contiguous(0xFF)
        .context("HEX file contains no data")
}

pub(crate) fn load_hex(path: &PathBuf) -> Result<SparseImage> {
    let mut text = String::new();
    File::open(path)
        .with_context(|| format!("Couldn't open HEX file `{}`", path.display()))?
        .read_to_string(&mut text)
        .context("Failed to read HEX file contents")?;

    let mut image = SparseImage::new();
    let mut base: u32 = 0;

    for record in ihex::Reader::new(&text) {
        let record = record.context("Malformed Intel HEX record")?;
        match record {
            ihex::Record::Data { offset, value } => {
                let start = base + u32::from(offset);
                for (i, byte) in value.into_iter().enumerate() {
                    image.set((start + i as u32) as u16, byte);
                }
            }
            ihex::Record::ExtendedLinearAddress(addr) => {
                base = u32::from(addr) << 16;
            }
            ihex::Record::ExtendedSegmentAddress(addr) => {
                base = u32::from(addr) << 4;
            }
            ihex::Record::EndOfFile => break,
            _ => {}
        }
    }

    if image.iter().next().is_none() {
        bail!("HEX file `{}` contains no data records", path.display());
    }

    Ok(image)
}
