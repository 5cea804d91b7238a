//! URL handling module for Threadwalk
//!
//! This module provides URL normalization (the canonical form used as the
//! frontier's dedup key) and the scope filter that restricts a crawl to a
//! base prefix.

mod normalize;
mod scope;

pub(crate) use normalize::normalize_in_place;
pub use normalize::normalize_url;
pub use scope::Scope;
