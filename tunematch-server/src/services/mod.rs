//! Service modules for tunematch-server

pub mod acquisition;
pub mod catalog_import;
pub mod comparison;

pub use acquisition::{AcquiredAudio, AudioSource, YtDlpSource};
pub use catalog_import::{import_catalog_file, import_catalog_json, ImportSummary};
pub use comparison::{CompareRequest, ComparisonOutcome, ComparisonService, PipelineError};
