//! HTTP adapters for the external collaborators: Slack, GitHub, and the Dify
//! LLM backend. Each adapter sits behind a trait so the orchestration layer
//! never sees a wire format.

pub mod dify;
pub mod github;
pub mod slack;
