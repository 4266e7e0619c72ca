//! HTTP implementations of the bridge collaborator traits.
//!
//! [`SourceHttpClient`] talks to the proxy in front of the person-attribute system and
//! [`TargetHttpClient`] to a FHIR server. Both apply a whole-request timeout; the engine adds
//! its own per-fetch timeout on top.

mod http;
pub mod source;
pub mod target;

pub use source::SourceHttpClient;
pub use target::TargetHttpClient;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;
