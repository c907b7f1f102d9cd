#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Map layers and the service that republishes them as `GeoJSON`.
//!
//! Each [`kartlag_layer_models::Layer`] has a TOML definition under
//! `layers/` (see [`registry`]). The [`service`] functions run one path per
//! layer: fetch rows from a [`kartlag_gateway::RecordSource`], normalize
//! each row, and assemble a [`kartlag_geojson::FeatureCollection`].

pub mod registry;
pub mod service;
