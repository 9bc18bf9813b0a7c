/// Oxbow - Mirror generation backend
///
/// Turns a user's accumulated journal entries into a "Mirror": themes, a
/// biblical parallel and observations, generated by an LLM and stored for
/// the Oxbow app.

pub mod api;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod metrics;
pub mod mirror;
pub mod push;
pub mod rate_limit;
pub mod server;
