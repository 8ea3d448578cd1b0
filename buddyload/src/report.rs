//! Export of finished run statistics.
use crate::Error;
use buddyload_core::RunStatistics;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Write `stats` to `path` as pretty-printed JSON.
pub fn export(stats: &RunStatistics, path: impl AsRef<Path>) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path.as_ref())?);
    serde_json::to_writer_pretty(&mut writer, stats)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    tracing::info!("Summary written to {}", path.as_ref().display());
    Ok(())
}
