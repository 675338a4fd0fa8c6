pub mod config;
pub mod models;
pub mod processing;
pub mod validation;
pub mod utils;
pub mod mrz_extractor;

pub use config::ExtractorConfig;
pub use models::{Extraction, KeyMaterial};
pub use mrz_extractor::{ExtractionPool, MrzExtractor};
pub use utils::MrzError;
