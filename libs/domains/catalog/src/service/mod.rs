//! Catalog and retrieval orchestration.
//!
//! Both services hold their collaborators as `Arc<dyn Trait>` and bound every
//! collaborator call with [`with_timeout`](crate::error::with_timeout).

mod catalog;
mod retrieval;

pub use catalog::CatalogService;
pub use retrieval::{HOME_SCREEN_SAMPLE, HOME_SCREEN_SIZE, RetrievalService, draw_with_replacement};

use std::time::Duration;

/// Deadline for a single store, index or model call
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);
