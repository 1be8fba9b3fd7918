use std::{fs, io, path::PathBuf, time::Instant};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::{Itertools, MinMaxResult};

use mzchrom::{
    CandidatePool, ExtractionError, ExtractionParams, ReportFormat, ScanRun, ScanSource,
    extract_from_pool, write_report,
};

/// Extract extended ion chromatograms from an LC-MS run
#[derive(Parser, Debug, Clone)]
struct App {
    /// Input file path, any format mzdata can read
    filename: PathBuf,

    #[arg(short = 'c', long, help = "Read extraction settings from a JSON file")]
    config: Option<PathBuf>,

    #[arg(
        short = 'n',
        long,
        help = "Points at or below this intensity are not used as candidates. Defaults to 500"
    )]
    noise_threshold: Option<f32>,

    #[arg(
        short = 'g',
        long,
        help = "Chromatograms stop growing at the first scan whose best match is at or below this intensity. Defaults to 1000"
    )]
    growth_threshold: Option<f32>,

    #[arg(
        short = 't',
        long,
        help = "The m/z matching tolerance in parts-per-million. Defaults to 400"
    )]
    tolerance_ppm: Option<f64>,

    #[arg(short = 'l', long, help = "The MS level to extract from. Defaults to 1")]
    ms_level: Option<u8>,

    #[arg(short = 'o', long, help = "Output file path, writes to STDOUT when absent")]
    outpath: Option<PathBuf>,

    #[arg(short = 'f', long, value_enum, default_value_t = ReportFormat::Tsv)]
    format: ReportFormat,

    #[arg(long = "no-progress", help = "Disable progress bar")]
    no_progress: bool,
}

impl App {
    fn params(&self) -> Result<ExtractionParams, ExtractionError> {
        let mut params = match self.config.as_ref() {
            Some(path) => ExtractionParams::from_json_path(path)?,
            None => ExtractionParams::default(),
        };
        if let Some(value) = self.noise_threshold {
            params.noise_threshold = value;
        }
        if let Some(value) = self.growth_threshold {
            params.growth_threshold = value;
        }
        if let Some(value) = self.tolerance_ppm {
            params.tolerance_ppm = value;
        }
        if let Some(value) = self.ms_level {
            params.ms_level = value;
        }
        params.validate()?;
        Ok(params)
    }
}

fn main() -> Result<(), ExtractionError> {
    env_logger::init();
    let args = App::parse();
    let params = args.params()?;
    log::debug!("Extraction settings: {params:?}");
    let start = Instant::now();

    let run = ScanRun::open_path(&args.filename, params.ms_level)?;
    match run.iter_scans().map(|s| s.retention_time).minmax() {
        MinMaxResult::MinMax(low, high) => {
            log::info!("Read {} scans from {low:0.3} to {high:0.3}", run.len())
        }
        MinMaxResult::OneElement(time) => log::info!("Read a single scan at {time:0.3}"),
        MinMaxResult::NoElements => {
            log::warn!("No MS{} scans found in {}", params.ms_level, args.filename.display())
        }
    }

    let mut pool = CandidatePool::build(&run, params.noise_threshold);
    let progress = if args.no_progress {
        None
    } else {
        let pb = ProgressBar::new(pool.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec}, {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    };
    let chromatograms = extract_from_pool(&run, &mut pool, &params, progress.as_ref());

    match args.outpath.as_ref() {
        Some(path) => write_report(
            io::BufWriter::new(fs::File::create(path)?),
            &chromatograms,
            args.format,
        )?,
        None => write_report(io::stdout().lock(), &chromatograms, args.format)?,
    }

    eprintln!(
        "{} chromatograms extracted in {:0.2} seconds",
        chromatograms.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
