use std::io::Write;

use serde::Serialize;

use crate::{chromatogram::Chromatogram, error::ExtractionError};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// One tab-separated row per chromatogram point
    #[default]
    Tsv,
    /// The chromatograms serialized whole
    Json,
}

#[derive(Debug, Serialize)]
struct PointRow {
    chromatogram: usize,
    scan_index: usize,
    retention_time: f64,
    mass: f64,
    intensity: f32,
    is_seed: bool,
    is_inflection: bool,
    mean_mass: f64,
}

pub fn write_tsv<W: Write>(
    handle: W,
    chromatograms: &[Chromatogram],
) -> Result<(), ExtractionError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(handle);
    for (i, chrom) in chromatograms.iter().enumerate() {
        for (j, point) in chrom.points.iter().enumerate() {
            writer.serialize(PointRow {
                chromatogram: i,
                scan_index: point.scan_index,
                retention_time: point.retention_time,
                mass: point.mass,
                intensity: point.intensity,
                is_seed: j == chrom.seed_index,
                is_inflection: chrom.inflection_indices.binary_search(&j).is_ok(),
                mean_mass: chrom.mean_mass,
            })?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_json<W: Write>(
    handle: W,
    chromatograms: &[Chromatogram],
) -> Result<(), ExtractionError> {
    serde_json::to_writer_pretty(handle, chromatograms)?;
    Ok(())
}

pub fn write_report<W: Write>(
    handle: W,
    chromatograms: &[Chromatogram],
    format: ReportFormat,
) -> Result<(), ExtractionError> {
    log::debug!("Writing {} chromatograms as {format:?}", chromatograms.len());
    match format {
        ReportFormat::Tsv => write_tsv(handle, chromatograms),
        ReportFormat::Json => write_json(handle, chromatograms),
    }
}
