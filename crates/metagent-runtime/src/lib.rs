//! # metagent-runtime
//!
//! Production collaborator implementations for the metagent core:
//!
//! - **OpenAI-compatible completions** via `async-openai`
//! - **Google Programmable Search** over HTTP
//! - **AMap district and weather lookups** over HTTP
//!
//! The core depends only on the collaborator traits; this crate is the
//! single place real services are wired in.

pub mod openai;
pub mod search;
pub mod weather;

pub use openai::{OpenAiCompletion, DEFAULT_MODEL};
pub use search::GoogleSearchBackend;
pub use weather::AmapWeatherBackend;

use std::time::Duration;

/// Upper bound for one retrieval call
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the retrieval backends. Every outbound call is
/// bounded by a fixed short timeout so a slow upstream degrades one tool
/// call instead of the whole task.
pub fn http_client() -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()
}
