//! devcrew: a fixed crew of LLM agent roles that turns a natural-language
//! software requirement into code, a review verdict, documentation, tests
//! and a deployment script.
//!
//! - [`pipeline::Pipeline`] sequences the roles over one requirement
//! - [`pipeline::review_and_revise`] is the bounded developer/reviewer loop
//! - [`parse::extract_structured`] pulls JSON out of free-form replies
//! - [`store::ResultStore`] writes the artifacts to a directory

pub mod artifacts;
pub mod config;
pub mod conversation;
pub mod llm;
pub mod output;
pub mod parse;
pub mod pipeline;
pub mod roles;
pub mod store;
