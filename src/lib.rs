//! Localize the user-facing strings of a front-end source tree.
//!
//! The pipeline has three stages, each usable on its own:
//! - [`extract`] walks the tree and writes `extracted-text.json`
//! - [`translation`] translates those strings through an OpenAI-compatible
//!   API with a persistent cache and writes `translation-mapping.json`
//! - [`replace`] backs up the tree and rewrites it from the mapping

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod metrics;
pub mod openai;
pub mod replace;
pub mod retry;
pub mod source_tree;
pub mod translation;
pub mod validator;

pub use error::PipelineError;
