//! Join-side transformation.
//!
//! - Rules: ordered join-key rewrites applied before geometry lookup
//! - Pipeline: job orchestration for PxWeb, SDMX, CSV and batch runs

pub mod pipeline;
pub mod rules;

pub use pipeline::*;
pub use rules::{rules_description, RuleSet, TransformOp, TransformRule, DELETE_SENTINEL};
