//! Excel export (CLI)
//!
//! A terminal has no share sheet, so the workbook is always saved to the
//! output folder under the session file name.

use flora_track_common::export::excel_core::generate_excel_buffer;
use flora_track_common::{Error, ExportAdapter, ExportContext, ExportOutcome, PriceRecord, Result};
use std::path::{Path, PathBuf};

pub struct XlsxFileExporter {
    output_dir: PathBuf,
}

impl XlsxFileExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl ExportAdapter for XlsxFileExporter {
    fn export(&mut self, records: &[PriceRecord], context: &ExportContext) -> Result<ExportOutcome> {
        let buffer = generate_excel_buffer(records)?;

        std::fs::create_dir_all(&self.output_dir)
            .map_err(|e| Error::Export(format!("{}: {}", self.output_dir.display(), e)))?;
        let path = self.output_dir.join(context.file_name());
        std::fs::write(&path, buffer)
            .map_err(|e| Error::Export(format!("{}: {}", path.display(), e)))?;

        tracing::info!(path = %path.display(), records = records.len(), "workbook written");
        Ok(ExportOutcome::Saved(path))
    }
}
