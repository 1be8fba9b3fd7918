use std::collections::HashMap;

use crate::{
    peak::{LocalPeak, PeakKey},
    scan::ScanSource,
};

/// Every above-noise observation of a run, most intense first, plus the
/// claims chromatograms have made on them.
///
/// Records are looked up by value. A record that growth reaches but that
/// was never pooled is appended already claimed, after the sorted prefix.
#[derive(Debug, Default, Clone)]
pub struct CandidatePool {
    peaks: Vec<LocalPeak>,
    claimed: Vec<bool>,
    positions: HashMap<PeakKey, usize>,
    n_claimed: usize,
    n_sorted: usize,
}

impl CandidatePool {
    /// Sweep every scan once and pool each point whose intensity is strictly
    /// above `noise_threshold`.
    ///
    /// Records carry the position of their scan in `scans`, the same address
    /// growth uses, whatever [`Scan::index`](crate::scan::Scan::index) says.
    pub fn build<S: ScanSource + ?Sized>(scans: &S, noise_threshold: f32) -> Self {
        let mut peaks = Vec::new();
        for scan_index in 0..scans.len() {
            let Some(scan) = scans.get_scan(scan_index) else {
                continue;
            };
            if scan.index != scan_index {
                log::trace!("Scan at position {scan_index} reports index {}", scan.index);
            }
            peaks.extend(
                scan.as_slice()
                    .iter()
                    .filter(|p| p.intensity > noise_threshold)
                    .map(|p| LocalPeak::new(scan_index, p.intensity, p.mz, scan.retention_time)),
            );
        }
        log::debug!(
            "Pooled {} candidates above {noise_threshold} from {} scans",
            peaks.len(),
            scans.len()
        );
        Self::from_peaks(peaks)
    }

    /// Sort `peaks` by descending intensity and index them. Ties keep their
    /// input order.
    pub fn from_peaks(mut peaks: Vec<LocalPeak>) -> Self {
        peaks.sort_by(LocalPeak::by_descending_intensity);
        let mut positions = HashMap::with_capacity(peaks.len());
        for (i, peak) in peaks.iter().enumerate() {
            // Keep the first position when two observations collide.
            positions.entry(peak.key()).or_insert(i);
        }
        let n_sorted = peaks.len();
        Self {
            claimed: vec![false; peaks.len()],
            peaks,
            positions,
            n_claimed: 0,
            n_sorted,
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// The number of records that came from the noise sweep, in sorted order,
    /// before any record was appended by growth.
    pub fn sorted_len(&self) -> usize {
        self.n_sorted
    }

    pub fn get(&self, index: usize) -> Option<&LocalPeak> {
        self.peaks.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LocalPeak> {
        self.peaks.iter()
    }

    pub fn as_slice(&self) -> &[LocalPeak] {
        &self.peaks
    }

    pub fn is_claimed(&self, index: usize) -> bool {
        self.claimed.get(index).copied().unwrap_or(false)
    }

    pub fn claimed_count(&self) -> usize {
        self.n_claimed
    }

    pub fn position(&self, peak: &LocalPeak) -> Option<usize> {
        self.positions.get(&peak.key()).copied()
    }

    pub fn contains(&self, peak: &LocalPeak) -> bool {
        self.positions.contains_key(&peak.key())
    }

    /// Mark the record equal to `peak` as claimed, inserting it first if the
    /// pool has never seen it. Claiming a claimed record changes nothing.
    ///
    /// Returns the record's position.
    pub fn claim(&mut self, peak: &LocalPeak) -> usize {
        let index = match self.positions.get(&peak.key()) {
            Some(index) => *index,
            None => {
                let index = self.peaks.len();
                self.peaks.push(*peak);
                self.claimed.push(false);
                self.positions.insert(peak.key(), index);
                log::trace!("Inserted unpooled observation {peak:?} at {index}");
                index
            }
        };
        if !self.claimed[index] {
            self.claimed[index] = true;
            self.n_claimed += 1;
        }
        index
    }

    /// Records not yet claimed by any chromatogram, with their positions.
    pub fn unclaimed(&self) -> impl Iterator<Item = (usize, &LocalPeak)> + '_ {
        self.peaks
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.claimed[*i])
    }
}
