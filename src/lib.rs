pub mod chromatogram;
pub mod error;
pub mod extract;
pub mod peak;
pub mod pool;
pub mod scan;
pub mod writer;

pub use chromatogram::{Chromatogram, ChromatogramBuilder, local_minima};
pub use error::ExtractionError;
pub use extract::{ExtractionParams, extract_chromatograms, extract_from_pool};
pub use peak::{LocalPeak, PeakKey};
pub use pool::CandidatePool;
pub use scan::{Scan, ScanRun, ScanSource};
pub use writer::{ReportFormat, write_report};
