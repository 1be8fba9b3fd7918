use std::{fs, path::Path};

use indicatif::ProgressBar;
use serde::{Deserialize, Serialize};

use crate::{
    chromatogram::{Chromatogram, ChromatogramBuilder},
    error::ExtractionError,
    pool::CandidatePool,
    scan::ScanSource,
};

/// Settings for one extraction run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionParams {
    /// Points at or below this intensity never enter the candidate pool
    pub noise_threshold: f32,
    /// Growth stops at the first scan whose best match is at or below this intensity
    pub growth_threshold: f32,
    /// Half-width of the m/z matching window, in parts-per-million of the tracked mass
    pub tolerance_ppm: f64,
    /// The MS level of the scans to read from a file
    pub ms_level: u8,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            noise_threshold: 500.0,
            growth_threshold: 1000.0,
            tolerance_ppm: 400.0,
            ms_level: 1,
        }
    }
}

impl ExtractionParams {
    /// Use `threshold` both as the noise and the growth threshold.
    pub fn new(threshold: f32, tolerance_ppm: f64) -> Self {
        Self {
            noise_threshold: threshold,
            growth_threshold: threshold,
            tolerance_ppm,
            ..Default::default()
        }
    }

    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ExtractionError> {
        let handle = fs::File::open(path)?;
        let this: Self = serde_json::from_reader(handle)?;
        this.validate()?;
        Ok(this)
    }

    pub fn validate(&self) -> Result<(), ExtractionError> {
        for (name, value) in [
            ("noise_threshold", self.noise_threshold),
            ("growth_threshold", self.growth_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ExtractionError::InvalidParameter {
                    name,
                    value: value as f64,
                });
            }
        }
        if !self.tolerance_ppm.is_finite() || self.tolerance_ppm <= 0.0 {
            return Err(ExtractionError::InvalidParameter {
                name: "tolerance_ppm",
                value: self.tolerance_ppm,
            });
        }
        Ok(())
    }
}

/// Build the candidate pool for `scans` and extract every chromatogram from it.
pub fn extract_chromatograms<S: ScanSource + ?Sized>(
    scans: &S,
    params: &ExtractionParams,
) -> Result<Vec<Chromatogram>, ExtractionError> {
    params.validate()?;
    let mut pool = CandidatePool::build(scans, params.noise_threshold);
    Ok(extract_from_pool(scans, &mut pool, params, None))
}

/// Walk `pool` from the most intense record down and grow a chromatogram from
/// every record no earlier chromatogram has claimed.
///
/// Each seed is the most intense unclaimed record at the moment its
/// chromatogram starts, so seed intensities never increase along the result.
/// Records appended to the pool during growth are already claimed and are
/// not visited.
pub fn extract_from_pool<S: ScanSource + ?Sized>(
    scans: &S,
    pool: &mut CandidatePool,
    params: &ExtractionParams,
    progress: Option<&ProgressBar>,
) -> Vec<Chromatogram> {
    let n = pool.sorted_len();
    if let Some(pb) = progress {
        pb.set_length(n as u64);
    }

    let mut chromatograms = Vec::new();
    for i in 0..n {
        if let Some(pb) = progress {
            pb.inc(1);
        }
        if pool.is_claimed(i) {
            continue;
        }
        let Some(seed) = pool.get(i).copied() else {
            break;
        };
        let chromatogram = ChromatogramBuilder::new(
            scans,
            pool,
            params.tolerance_ppm,
            params.growth_threshold,
        )
        .build(seed);
        chromatograms.push(chromatogram);
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    log::info!(
        "Extracted {} chromatograms claiming {} of {} candidates",
        chromatograms.len(),
        pool.claimed_count(),
        pool.len()
    );
    chromatograms
}

#[cfg(test)]
mod test {
    use std::{collections::HashMap, io::Write};

    use super::*;
    use crate::scan::{Scan, ScanRun};

    fn three_scan_run() -> ScanRun {
        [
            Scan::from_points(0, 1.0, [(100.0, 600.0)]),
            Scan::from_points(1, 2.0, [(100.01, 800.0)]),
            Scan::from_points(2, 3.0, [(100.0, 700.0)]),
        ]
        .into_iter()
        .collect()
    }

    /// Several traces at distinct masses with overlapping elution and a
    /// couple of interleaved noise points.
    fn busy_run() -> ScanRun {
        let profiles: [(f64, [f32; 8]); 3] = [
            (150.05, [0.0, 900.0, 3000.0, 8000.0, 4000.0, 1500.0, 700.0, 0.0]),
            (150.07, [600.0, 2500.0, 6000.0, 2500.0, 900.0, 2000.0, 5000.0, 1200.0]),
            (421.2, [0.0, 0.0, 1100.0, 1900.0, 2600.0, 1900.0, 1100.0, 0.0]),
        ];
        (0..8)
            .map(|i| {
                let points = profiles
                    .iter()
                    .map(|(mz, ints)| (*mz + (i as f64) * 1e-4, ints[i]))
                    .filter(|(_, intensity)| *intensity > 0.0)
                    .chain([(300.0 + i as f64, 550.0)]);
                Scan::from_points(i, i as f64 * 0.1, points)
            })
            .collect()
    }

    #[test]
    fn test_three_scan_scenario() -> Result<(), ExtractionError> {
        let run = three_scan_run();
        let chroms = extract_chromatograms(&run, &ExtractionParams::new(500.0, 400.0))?;
        assert_eq!(chroms.len(), 1);
        let chrom = &chroms[0];
        assert_eq!(chrom.len(), 3);
        assert_eq!(chrom.seed().map(|p| p.scan_index), Some(1));
        assert_eq!(chrom.seed_intensity, 800.0);
        assert!((chrom.mean_mass - 100.0034).abs() < 1e-3);
        assert!(chrom.inflection_indices.is_empty());
        Ok(())
    }

    #[test]
    fn test_scan_indices_need_not_match_positions() -> Result<(), ExtractionError> {
        let scans = vec![
            Scan::from_points(1, 1.0, [(100.0, 600.0)]),
            Scan::from_points(2, 2.0, [(100.01, 800.0)]),
            Scan::from_points(3, 3.0, [(100.0, 700.0)]),
        ];
        let params = ExtractionParams::new(500.0, 400.0);
        let mut pool = CandidatePool::build(&scans, params.noise_threshold);
        let chroms = extract_from_pool(&scans, &mut pool, &params, None);
        assert_eq!(chroms.len(), 1);
        let chrom = &chroms[0];
        assert_eq!(chrom.len(), 3);
        assert_eq!(chrom.scan_range(), Some((0, 2)));
        assert_eq!(chrom.seed().map(|p| p.scan_index), Some(1));
        assert_eq!(pool.len(), pool.sorted_len());
        assert_eq!(pool.unclaimed().count(), 0);
        Ok(())
    }

    #[test]
    fn test_empty_run() -> Result<(), ExtractionError> {
        let run = ScanRun::default();
        let chroms = extract_chromatograms(&run, &ExtractionParams::default())?;
        assert!(chroms.is_empty());
        Ok(())
    }

    #[test]
    fn test_seed_intensities_do_not_increase() -> Result<(), ExtractionError> {
        let run = busy_run();
        let chroms = extract_chromatograms(&run, &ExtractionParams::new(500.0, 40.0))?;
        assert!(chroms.len() > 1);
        for pair in chroms.windows(2) {
            assert!(pair[0].seed_intensity >= pair[1].seed_intensity);
        }
        Ok(())
    }

    #[test]
    fn test_claims_are_exclusive() -> Result<(), ExtractionError> {
        let run = busy_run();
        let chroms = extract_chromatograms(&run, &ExtractionParams::new(500.0, 40.0))?;
        let mut owners = HashMap::new();
        for (i, chrom) in chroms.iter().enumerate() {
            for pair in chrom.points.windows(2) {
                assert!(pair[0].scan_index < pair[1].scan_index);
            }
            for point in chrom.points.iter() {
                if let Some(prev) = owners.insert(point.key(), i) {
                    panic!("{point:?} is in chromatograms {prev} and {i}");
                }
            }
        }
        Ok(())
    }

    #[test]
    fn test_every_candidate_is_claimed() -> Result<(), ExtractionError> {
        let run = busy_run();
        let params = ExtractionParams::new(500.0, 40.0);
        let mut pool = CandidatePool::build(&run, params.noise_threshold);
        let chroms = extract_from_pool(&run, &mut pool, &params, Some(&ProgressBar::hidden()));
        assert!(!chroms.is_empty());
        assert_eq!(pool.unclaimed().count(), 0);
        Ok(())
    }

    #[test]
    fn test_constant_mass_spans_run() -> Result<(), ExtractionError> {
        let run: ScanRun = (0..25)
            .map(|i| {
                let jitter = if i % 2 == 0 { 2e-4 } else { -2e-4 };
                let intensity = 1e5 + 1e3 * (12.0 - (i as f32 - 12.0).abs());
                Scan::from_points(i, i as f64 * 0.05, [(622.0289 + jitter, intensity)])
            })
            .collect();
        let chroms = extract_chromatograms(&run, &ExtractionParams::new(1000.0, 10.0))?;
        assert_eq!(chroms.len(), 1);
        let chrom = &chroms[0];
        assert_eq!(chrom.scan_range(), Some((0, 24)));
        assert_eq!(chrom.seed().map(|p| p.scan_index), Some(12));
        let tolerance = 622.0289 * 10.0 / 1e6;
        assert!((chrom.mean_mass - 622.0289).abs() < tolerance);
        Ok(())
    }

    #[test]
    fn test_validate() {
        assert!(ExtractionParams::default().validate().is_ok());
        assert!(ExtractionParams::new(-1.0, 10.0).validate().is_err());
        assert!(ExtractionParams::new(100.0, 0.0).validate().is_err());
        assert!(ExtractionParams::new(f32::NAN, 10.0).validate().is_err());
        assert!(matches!(
            extract_chromatograms(&three_scan_run(), &ExtractionParams::new(100.0, f64::INFINITY)),
            Err(ExtractionError::InvalidParameter { name: "tolerance_ppm", .. })
        ));
    }

    #[test]
    fn test_params_from_json() -> Result<(), ExtractionError> {
        let mut handle = tempfile::NamedTempFile::new()?;
        handle.write_all(br#"{"noise_threshold": 250.0, "tolerance_ppm": 15.0}"#)?;
        let params = ExtractionParams::from_json_path(handle.path())?;
        assert_eq!(params.noise_threshold, 250.0);
        assert_eq!(params.tolerance_ppm, 15.0);
        assert_eq!(params.growth_threshold, 1000.0);
        assert_eq!(params.ms_level, 1);
        Ok(())
    }
}
