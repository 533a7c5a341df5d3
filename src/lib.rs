//! bugclerk: a Slack bot that turns bug-report threads into GitHub issues.
//!
//! When mentioned in a thread, bugclerk fetches the whole conversation, asks
//! an LLM backend whether it carries the six fields a bug report needs, and
//! either replies asking for the missing ones or files a GitHub issue and
//! confirms with the issue number and URL.
//!
//! Module map:
//! - [`config`]: environment-based configuration, validated once at startup.
//! - [`clients`]: HTTP adapters for Slack, GitHub, and the Dify LLM backend.
//! - [`llm`]: typed query abstraction (prompt construction + response parsing).
//! - [`usecase`]: the per-mention orchestration pipeline.
//! - [`messages`]: reply text construction.
//! - [`webhook`]: the inbound Slack events listener.

pub mod clients;
pub mod config;
pub mod llm;
pub mod messages;
pub mod usecase;
pub mod webhook;
