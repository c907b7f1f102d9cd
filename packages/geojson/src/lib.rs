#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! `GeoJSON` normalization of upstream rows.
//!
//! Upstream tables store geometry in several shapes: a bare `Point` or
//! `MultiPoint`, a full pre-wrapped `Feature`, or some other geometry
//! object. [`normalize`] classifies the stored value into a
//! [`normalize::GeometryField`] and turns it into a [`Feature`];
//! [`collection`] folds the results into a [`FeatureCollection`].
//!
//! Features are kept as JSON objects rather than [`geojson::Feature`] so
//! that pre-wrapped features pass through byte-for-byte and unrecognized
//! geometry objects can still be wrapped verbatim.

pub mod collection;
pub mod normalize;

use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use collection::assemble;
pub use normalize::{GeometryField, lat_lng, to_feature};

/// Errors raised while turning a single record into a feature.
///
/// These never escape [`to_feature`]; a failing record is dropped.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The geometry column held a string that is not valid JSON.
    #[error("Embedded GeoJSON is not valid JSON: {0}")]
    EmbeddedJson(#[from] serde_json::Error),

    /// The geometry value is not a JSON object.
    #[error("Geometry is not an object: {found}")]
    NotAnObject {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// A coordinate could not be read.
    #[error("Invalid coordinates: {message}")]
    Coordinates {
        /// Description of what went wrong.
        message: String,
    },
}

/// A `GeoJSON` `Feature` object.
///
/// Either passed through unchanged from upstream or built by
/// [`Feature::wrap`], in which case `type`, `geometry` and `properties` are
/// always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Feature(JsonObject);

impl Feature {
    /// Wraps a geometry object and its properties into a feature.
    #[must_use]
    pub fn wrap(geometry: Value, properties: JsonObject) -> Self {
        let mut object = JsonObject::new();
        object.insert("type".to_string(), Value::from("Feature"));
        object.insert("geometry".to_string(), geometry);
        object.insert("properties".to_string(), Value::Object(properties));
        Self(object)
    }

    /// Takes an already-normalized feature object as is.
    #[must_use]
    pub const fn from_object(object: JsonObject) -> Self {
        Self(object)
    }

    /// The `geometry` member.
    #[must_use]
    pub fn geometry(&self) -> Option<&Value> {
        self.0.get("geometry")
    }

    /// The `properties` member, if it is an object.
    #[must_use]
    pub fn properties(&self) -> Option<&JsonObject> {
        self.0.get("properties").and_then(Value::as_object)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
enum CollectionKind {
    #[default]
    FeatureCollection,
}

/// A `GeoJSON` `FeatureCollection`.
///
/// Always serializes with a `features` array, empty when nothing
/// normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    kind: CollectionKind,
    /// Features in upstream order.
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    /// Creates a collection from already-normalized features.
    #[must_use]
    pub const fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: CollectionKind::FeatureCollection,
            features,
        }
    }

    /// A collection with no features.
    #[must_use]
    pub const fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl FromIterator<Feature> for FeatureCollection {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
