use mzpeaks::CentroidPeak;
use serde::{Deserialize, Serialize};

use crate::{peak::LocalPeak, pool::CandidatePool, scan::ScanSource};

/// An extended ion trace: the most intense point found in a moving m/z window,
/// one per consecutive scan, on both sides of a seed observation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chromatogram {
    /// Observations in increasing scan order, no scan repeated
    pub points: Vec<LocalPeak>,
    /// Mean m/z over all of `points`
    pub mean_mass: f64,
    pub tolerance_ppm: f64,
    pub threshold: f32,
    /// Position of the seed within `points`
    pub seed_index: usize,
    pub seed_retention_time: f64,
    pub seed_intensity: f32,
    /// Positions within `points` that are strict local intensity minima
    pub inflection_indices: Vec<usize>,
}

impl Chromatogram {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn seed(&self) -> Option<&LocalPeak> {
        self.points.get(self.seed_index)
    }

    pub fn intensities(&self) -> Vec<f32> {
        self.points.iter().map(|p| p.intensity).collect()
    }

    pub fn retention_times(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.retention_time).collect()
    }

    /// The first and last scan index covered, inclusive.
    pub fn scan_range(&self) -> Option<(usize, usize)> {
        Some((self.points.first()?.scan_index, self.points.last()?.scan_index))
    }

    pub fn retention_time_range(&self) -> Option<(f64, f64)> {
        Some((
            self.points.first()?.retention_time,
            self.points.last()?.retention_time,
        ))
    }

    /// Trapezoidal integral of intensity over retention time.
    pub fn area(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| {
                let dt = w[1].retention_time - w[0].retention_time;
                dt * (w[0].intensity as f64 + w[1].intensity as f64) / 2.0
            })
            .sum()
    }
}

/// Positions `i` in `1..len - 1` where `intensities[i]` is strictly smaller
/// than both of its neighbors.
pub fn local_minima(intensities: &[f32]) -> Vec<usize> {
    intensities
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[0] > w[1] && w[1] < w[2])
        .map(|(i, _)| i + 1)
        .collect()
}

fn mean_mass<'a>(points: impl IntoIterator<Item = &'a LocalPeak>) -> Option<f64> {
    let (total, n) = points
        .into_iter()
        .fold((0.0, 0usize), |(total, n), p| (total + p.mass, n + 1));
    (n > 0).then(|| total / n as f64)
}

/// Grows chromatograms against a shared [`CandidatePool`].
///
/// The builder holds the pool mutably, so claims made while growing one
/// chromatogram are visible to the next one and no two builders can
/// interleave claims on the same pool.
pub struct ChromatogramBuilder<'a, S: ScanSource + ?Sized> {
    scans: &'a S,
    pool: &'a mut CandidatePool,
    tolerance_ppm: f64,
    threshold: f32,
}

impl<'a, S: ScanSource + ?Sized> ChromatogramBuilder<'a, S> {
    pub fn new(
        scans: &'a S,
        pool: &'a mut CandidatePool,
        tolerance_ppm: f64,
        threshold: f32,
    ) -> Self {
        Self {
            scans,
            pool,
            tolerance_ppm,
            threshold,
        }
    }

    pub fn pool(&self) -> &CandidatePool {
        &*self.pool
    }

    /// The most intense point of scan `scan_index` within the window around
    /// `center`, if it is above the growth threshold.
    ///
    /// Equally intense points resolve to the lowest m/z.
    fn best_in_window(&self, scan_index: usize, center: f64) -> Option<LocalPeak> {
        let scan = self.scans.get_scan(scan_index)?;
        let window = scan.points_within_mass(center, self.tolerance_ppm)?;
        let best: &CentroidPeak = window.iter().reduce(|best, p| {
            if p.intensity > best.intensity { p } else { best }
        })?;
        if best.intensity > self.threshold {
            Some(LocalPeak::new(
                scan_index,
                best.intensity,
                best.mz,
                scan.retention_time,
            ))
        } else {
            log::trace!(
                "Scan {scan_index} best intensity {} at {} is not above {}",
                best.intensity,
                best.mz,
                self.threshold
            );
            None
        }
    }

    /// Grow toward lower scan indices. The window follows the mean mass of
    /// the points found in this direction only.
    fn grow_backward(&mut self, seed: &LocalPeak) -> Vec<LocalPeak> {
        let mut points = Vec::new();
        let mut mean = seed.mass;
        let mut scan_index = seed.scan_index;
        while scan_index > 0 {
            scan_index -= 1;
            let Some(peak) = self.best_in_window(scan_index, mean) else {
                break;
            };
            self.pool.claim(&peak);
            points.push(peak);
            mean = mean_mass(&points).unwrap_or(mean);
        }
        points
    }

    /// Grow toward higher scan indices, appending to `points`. The window
    /// follows the mean mass of everything collected so far, backward points
    /// and seed included.
    fn grow_forward(&mut self, seed: &LocalPeak, points: &mut Vec<LocalPeak>) -> f64 {
        let mut mean = mean_mass(points.iter()).unwrap_or(seed.mass);
        for scan_index in (seed.scan_index + 1)..self.scans.len() {
            let Some(peak) = self.best_in_window(scan_index, mean) else {
                break;
            };
            self.pool.claim(&peak);
            points.push(peak);
            mean = mean_mass(points.iter()).unwrap_or(mean);
        }
        mean
    }

    /// Grow one chromatogram outward from `seed`, claiming every point it takes,
    /// the seed included.
    pub fn build(&mut self, seed: LocalPeak) -> Chromatogram {
        self.pool.claim(&seed);

        let backward = self.grow_backward(&seed);
        let seed_index = backward.len();

        let mut points: Vec<LocalPeak> = backward.into_iter().rev().collect();
        points.push(seed);
        let mean = self.grow_forward(&seed, &mut points);

        let intensities: Vec<f32> = points.iter().map(|p| p.intensity).collect();
        let inflection_indices = local_minima(&intensities);

        log::debug!(
            "Chromatogram at m/z {mean:0.5} seeded by scan {} ({}) spans {} scans with {} inflections",
            seed.scan_index,
            seed.intensity,
            points.len(),
            inflection_indices.len()
        );

        Chromatogram {
            points,
            mean_mass: mean,
            tolerance_ppm: self.tolerance_ppm,
            threshold: self.threshold,
            seed_index,
            seed_retention_time: seed.retention_time,
            seed_intensity: seed.intensity,
            inflection_indices,
        }
    }
}
