//! Cover-art resolution: cache lookups across track/path/hash, and
//! generation via direct copy, raw-container dump, or rescaling.

pub mod cache;
pub mod error;
pub mod service;
pub mod source;

pub use cache::{CoverCache, CoverCacheEntry};
pub use error::{CoverError, Result};
pub use service::CoverService;
pub use source::{CoverContainer, CoverFormat, CoverSource, ImageCrateScaler, ScalingBackend};
