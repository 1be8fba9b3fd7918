use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
};

use serde::{Deserialize, Serialize};

/// A single above-threshold observation: one point of one scan's spectrum.
///
/// Two records are equal when all four fields are bitwise equal. A record
/// rebuilt from the same scan point during chromatogram growth therefore
/// finds the record the candidate pool created for it.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct LocalPeak {
    pub scan_index: usize,
    pub intensity: f32,
    pub mass: f64,
    pub retention_time: f64,
}

/// The value identity of a [`LocalPeak`], used to look records up in a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeakKey {
    scan_index: usize,
    intensity: u32,
    mass: u64,
    retention_time: u64,
}

impl LocalPeak {
    pub fn new(scan_index: usize, intensity: f32, mass: f64, retention_time: f64) -> Self {
        Self {
            scan_index,
            intensity,
            mass,
            retention_time,
        }
    }

    pub fn key(&self) -> PeakKey {
        PeakKey {
            scan_index: self.scan_index,
            intensity: self.intensity.to_bits(),
            mass: self.mass.to_bits(),
            retention_time: self.retention_time.to_bits(),
        }
    }

    /// Orders the most intense record first.
    ///
    /// Equal intensities compare as [`Ordering::Equal`], so a stable sort keeps
    /// them in the order they were produced.
    pub fn by_descending_intensity(a: &Self, b: &Self) -> Ordering {
        b.intensity.total_cmp(&a.intensity)
    }
}

impl PartialEq for LocalPeak {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for LocalPeak {}

impl Hash for LocalPeak {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl From<&LocalPeak> for PeakKey {
    fn from(value: &LocalPeak) -> Self {
        value.key()
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_value_equality() {
        let a = LocalPeak::new(3, 1200.0, 301.1412, 12.5);
        let b = LocalPeak::new(3, 1200.0, 301.1412, 12.5);
        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());

        let c = LocalPeak::new(4, 1200.0, 301.1412, 12.5);
        assert_ne!(a, c);

        let set: HashSet<LocalPeak> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_descending_order_is_stable() {
        let mut peaks = vec![
            LocalPeak::new(0, 500.0, 100.0, 1.0),
            LocalPeak::new(0, 900.0, 200.0, 1.0),
            LocalPeak::new(1, 500.0, 150.0, 2.0),
            LocalPeak::new(2, 700.0, 100.0, 3.0),
        ];
        peaks.sort_by(LocalPeak::by_descending_intensity);
        let order: Vec<_> = peaks.iter().map(|p| (p.scan_index, p.mass)).collect();
        assert_eq!(order, vec![(0, 200.0), (2, 100.0), (0, 100.0), (1, 150.0)]);
    }
}
