//! Methylation window features for promoter activity models.
//!
//! This crate turns per-position methylation values into the multi-resolution
//! feature tensor consumed by the promoter models:
//!
//! - Windowed statistics (mean, SSD, fraction of region SSD, variance) around every TSS, at several window sizes
//! - Min-max normalisation per (resolution, statistic) group
//! - Assembly into a `(promoter, resolution, window, channel)` tensor with aligned promoter metadata
//! - The ChIP/Input response variable from bigWig signal
//!
//! # Example
//!
//! ```no_run
//! use m2a_core::models::{MethylationSet, PromoterSet};
//! use m2a_features::{PipelineConfig, combine, extract_features};
//!
//! let promoters = PromoterSet::try_from("promoters.tsv").unwrap();
//! let methylation = MethylationSet::try_from("methylation.tsv").unwrap();
//! let config = PipelineConfig::default();
//!
//! let features = extract_features(&promoters, &methylation, &config).unwrap();
//! let bundle = combine(&features, &config, None).unwrap();
//! m2a_io::write_npz(&bundle, "features.npz").unwrap();
//! ```

pub mod config;
pub mod errors;
pub mod extract;
pub mod metadata;
pub mod normalize;
pub mod pipeline;
pub mod response;
pub mod schema;
pub mod table;
pub mod tensor;
pub mod utils;
pub mod windows;

// re-exports
pub use config::PipelineConfig;
pub use errors::{FeatureError, Result};
pub use extract::extract_features;
pub use metadata::{ResponseTable, align_metadata};
pub use normalize::{MinMaxScaler, NormalizedTable, normalize};
pub use pipeline::combine;
pub use response::{compute_response, write_response_tsv};
pub use schema::{FeatureSchema, Statistic};
pub use table::FeatureTable;
pub use tensor::{AssembledTensor, assemble, split_resolutions};
