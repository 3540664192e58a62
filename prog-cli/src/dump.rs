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

use std::{fs::File, io::Write, path::PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serial::SystemPort;

use microboot::Session;

#[derive(Args)]
pub struct DumpArgs {
    /// Intel HEX file to write the dump to
    pub file: PathBuf,
}

pub fn run(session: &mut Session<SystemPort>, args: &DumpArgs) -> Result<()> {
    let device = session.device().expect("connected before dump");
    let start = device.addr_low;
    let length = usize::from(device.addr_high - device.addr_low) + 1;

    log::info!("Reading {} bytes starting at {:#06X}", length, start);
    let bar = crate::progress_bar(length as u64);
    let data = session.read(
        start,
        length,
        Some(&mut |done, total| {
            bar.set_length(total as u64);
            bar.set_position(done as u64);
        }),
    )?;
    bar.finish_with_message("read complete");

    let mut records: Vec<ihex::Record> = data
        .chunks(32)
        .enumerate()
        .map(|(index, chunk)| ihex::Record::Data {
            offset: (u32::from(start) + (index * 32) as u32) as u16,
            value: chunk.to_vec(),
        })
        .collect();
    records.push(ihex::Record::EndOfFile);

    let text = ihex::create_object_file_representation(&records)
        .context("Failed to render Intel HEX output")?;

    File::create(&args.file)
        .with_context(|| format!("Couldn't create output file `{}`", args.file.display()))?
        .write_all(text.as_bytes())
        .context("Failed to write output file")?;

    Ok(())
}
