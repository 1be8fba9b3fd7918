use std::path::Path;

use mzdata::{
    prelude::*,
    spectrum::{RefPeakDataLevel, bindata::ArrayRetrievalError},
};
use mzpeaks::{
    CentroidLike, CentroidPeak, DeconvolutedCentroidLike, PeakSet, Tolerance, prelude::*,
};

use crate::error::ExtractionError;

/// One acquisition of the run: a retention time and an m/z sorted peak list.
#[derive(Debug, Clone)]
pub struct Scan {
    /// Position of this scan within its run, starting at zero
    pub index: usize,
    /// The native identifier of the spectrum this scan was read from
    pub id: String,
    pub retention_time: f64,
    pub peaks: PeakSet,
}

impl Scan {
    pub fn new(index: usize, id: String, retention_time: f64, peaks: Vec<CentroidPeak>) -> Self {
        Self {
            index,
            id,
            retention_time,
            peaks: PeakSet::new(peaks),
        }
    }

    /// Build a scan from `(m/z, intensity)` pairs in any order.
    pub fn from_points(
        index: usize,
        retention_time: f64,
        points: impl IntoIterator<Item = (f64, f32)>,
    ) -> Self {
        let peaks = points
            .into_iter()
            .enumerate()
            .map(|(i, (mz, intensity))| CentroidPeak::new(mz, intensity, i as u32))
            .collect();
        Self::new(index, format!("index={index}"), retention_time, peaks)
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn as_slice(&self) -> &[CentroidPeak] {
        self.peaks.as_slice()
    }

    /// All peaks whose m/z lies within `ppm` parts-per-million of `center`,
    /// bounds included.
    ///
    /// Returns `None` when no peak falls in the window.
    pub fn points_within_mass(&self, center: f64, ppm: f64) -> Option<&[CentroidPeak]> {
        let (lower, upper) = Tolerance::PPM(ppm).bounds(center);
        let peaks = self.as_slice();
        let start = peaks.partition_point(|p| p.mz < lower);
        let end = peaks.partition_point(|p| p.mz <= upper);
        if start < end {
            Some(&peaks[start..end])
        } else {
            None
        }
    }
}

/// An index-addressable, ordered sequence of scans.
///
/// Scans are addressed by their position in the sequence. Observations taken
/// from a source record that position as their scan index.
pub trait ScanSource {
    fn len(&self) -> usize;

    fn get_scan(&self, index: usize) -> Option<&Scan>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn iter_scans(&self) -> impl Iterator<Item = &Scan> {
        (0..self.len()).filter_map(|i| self.get_scan(i))
    }
}

impl ScanSource for [Scan] {
    fn len(&self) -> usize {
        <[Scan]>::len(self)
    }

    fn get_scan(&self, index: usize) -> Option<&Scan> {
        self.get(index)
    }
}

impl ScanSource for Vec<Scan> {
    fn len(&self) -> usize {
        Vec::len(self)
    }

    fn get_scan(&self, index: usize) -> Option<&Scan> {
        self.get(index)
    }
}

/// A fully loaded run of scans of a single MS level.
#[derive(Debug, Default, Clone)]
pub struct ScanRun {
    scans: Vec<Scan>,
    ms_level: u8,
}

impl ScanRun {
    pub fn new(scans: Vec<Scan>, ms_level: u8) -> Self {
        let mut this = Self { scans, ms_level };
        this.reindex();
        this
    }

    pub fn ms_level(&self) -> u8 {
        self.ms_level
    }

    pub fn scans(&self) -> &[Scan] {
        &self.scans
    }

    pub fn push(&mut self, mut scan: Scan) {
        scan.index = self.scans.len();
        self.scans.push(scan);
    }

    fn reindex(&mut self) {
        for (i, scan) in self.scans.iter_mut().enumerate() {
            scan.index = i;
        }
    }

    /// Open any file format `mzdata` can read and load all of its scans at `ms_level`.
    pub fn open_path(path: impl AsRef<Path>, ms_level: u8) -> Result<Self, ExtractionError> {
        let path = path.as_ref();
        let mut reader = mzdata::MZReader::open_path(path)
            .inspect_err(|e| log::error!("Failed to open {}: {e}", path.display()))?;
        Self::from_spectra(reader.iter(), ms_level)
    }

    /// Collect the spectra at `ms_level` in acquisition order.
    ///
    /// Spectra without peak data are skipped, the remaining scans are indexed
    /// contiguously from zero.
    pub fn from_spectra<C, D, S>(
        spectra: impl IntoIterator<Item = S>,
        ms_level: u8,
    ) -> Result<Self, ExtractionError>
    where
        C: CentroidLike,
        D: DeconvolutedCentroidLike,
        S: SpectrumLike<C, D>,
    {
        let mut this = Self {
            scans: Vec::new(),
            ms_level,
        };
        let mut n_skipped = 0usize;
        for spectrum in spectra {
            if spectrum.ms_level() != ms_level {
                continue;
            }
            match spectrum_points(&spectrum)? {
                Some(peaks) => {
                    this.push(Scan::new(
                        0,
                        spectrum.id().to_string(),
                        spectrum.start_time(),
                        peaks,
                    ));
                }
                None => {
                    n_skipped += 1;
                }
            }
        }
        if n_skipped > 0 {
            log::warn!("Skipped {n_skipped} MS{ms_level} spectra without usable peak data");
        }
        log::info!("Loaded {} MS{ms_level} scans", this.len());
        Ok(this)
    }
}

fn spectrum_points<C, D, S>(spectrum: &S) -> Result<Option<Vec<CentroidPeak>>, ArrayRetrievalError>
where
    C: CentroidLike,
    D: DeconvolutedCentroidLike,
    S: SpectrumLike<C, D>,
{
    let peaks = match spectrum.peaks() {
        RefPeakDataLevel::Centroid(peaks) => Some(
            peaks
                .iter()
                .enumerate()
                .map(|(i, p)| CentroidPeak::new(p.coordinate(), p.intensity(), i as u32))
                .collect(),
        ),
        RefPeakDataLevel::RawData(arrays) => {
            let mzs = arrays.mzs()?;
            let intensities = arrays.intensities()?;
            Some(
                mzs.iter()
                    .zip(intensities.iter())
                    .enumerate()
                    .map(|(i, (mz, intensity))| CentroidPeak::new(*mz, *intensity, i as u32))
                    .collect(),
            )
        }
        RefPeakDataLevel::Deconvoluted(_) => {
            log::warn!(
                "{} only carries deconvoluted peaks, which have no m/z to track",
                spectrum.id()
            );
            None
        }
        RefPeakDataLevel::Missing => None,
    };
    Ok(peaks)
}

impl ScanSource for ScanRun {
    fn len(&self) -> usize {
        self.scans.len()
    }

    fn get_scan(&self, index: usize) -> Option<&Scan> {
        self.scans.get(index)
    }
}

impl FromIterator<Scan> for ScanRun {
    fn from_iter<T: IntoIterator<Item = Scan>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect(), 1)
    }
}
