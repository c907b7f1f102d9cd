#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `PostgREST` gateway client.
//!
//! Issues single-predicate reads against tables exposed under
//! `{base}/rest/v1/{table}` and bounding-box queries against server-side
//! RPC functions under `{base}/rest/v1/rpc/{name}`. Every request carries
//! the `apikey` header and a bearer token.
//!
//! The table is always an explicit argument; there is no selected-table
//! state on the client. Requests are never retried.

pub mod client;
pub mod config;

use async_trait::async_trait;
use kartlag_layer_models::{BoundingBox, QueryFilter, RawRecord};

pub use client::PostgrestClient;
pub use config::GatewayConfig;

/// Errors that can occur while talking to the upstream gateway.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// A required setting (table name, base URL, API key) is missing.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Which setting is missing or invalid.
        message: String,
    },

    /// The gateway answered with a non-success status.
    #[error("Upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("Decode error: {message}")]
    Decode {
        /// Description of what went wrong.
        message: String,
    },
}

impl GatewayError {
    pub(crate) fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

/// A source of raw upstream rows.
///
/// Implemented by [`PostgrestClient`]; the server holds it behind an `Arc`
/// so handlers can be exercised against a stub.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Reads every row of `table`, optionally restricted by one predicate.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if `table` is empty, and
    /// [`GatewayError`] if the request fails or the body is not a list of
    /// rows.
    async fn fetch(
        &self,
        table: &str,
        filter: Option<&QueryFilter>,
    ) -> Result<Vec<RawRecord>, GatewayError>;

    /// Calls the bounding-box RPC `rpc` and returns its rows.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if `rpc` is empty, and
    /// [`GatewayError`] if the request fails or the body is not a list of
    /// rows.
    async fn fetch_by_bbox(
        &self,
        rpc: &str,
        bbox: &BoundingBox,
    ) -> Result<Vec<RawRecord>, GatewayError>;

    /// Lists the tables the gateway exposes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the request fails or the schema
    /// document cannot be read.
    async fn list_tables(&self) -> Result<Vec<String>, GatewayError>;
}
