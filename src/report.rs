//! Optional run summary (spec §6), grounded on
//! `original_source/cmd/geneabacus/main.go`'s final JSON report dump.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;

use crate::error::Result;

/// All fields are truncated to `u32` per spec §6, even though the
/// underlying pipeline accumulates them as wider/fractional counters.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct RunReport {
    pub input: u32,
    pub align_unique: u32,
    pub align_multi: u32,
    pub output: u32,
}

impl RunReport {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }
}
