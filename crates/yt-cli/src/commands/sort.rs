//! Sort command for ordering timers by title.

use std::io::Write;

use anyhow::Result;
use yt_storage::Storage;

pub fn run<W: Write>(writer: &mut W, storage: &Storage) -> Result<()> {
    let mut data = storage.load_data()?;
    data.sort_by_title();
    storage.save_data(&data)?;
    writeln!(writer, "Sorted {} timers", data.timerdata.len())?;
    Ok(())
}
