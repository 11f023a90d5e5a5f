//! Development pipeline.
//!
//! Six agent roles take one natural-language requirement through to a
//! bundle of artifacts:
//! - Analyst: structures the requirement as JSON
//! - Developer: writes the code, and rewrites it on review feedback
//! - Reviewer: approves or rejects the code (bounded revision loop)
//! - Writer: documentation for the final code
//! - QA: tests for the final code
//! - DevOps: deployment script
//!
//! Stages run strictly in sequence; each waits on its model call.

mod orchestrator;
mod review;

pub use orchestrator::{Pipeline, PipelineError, Stage};
pub use review::review_and_revise;
