//! Record normalization.
//!
//! Classification runs in a fixed order, first match wins:
//!
//! 1. geometry column absent or `null` → no feature
//! 2. `{"type": "Feature", "geometry": <non-null>}` → passed through unchanged
//! 3. `Point` with at least two coordinates → wrapped as a `Point` feature
//! 4. non-empty `MultiPoint` → first position only, wrapped as a `Point`
//! 5. any other object → wrapped verbatim as the feature's geometry
//!
//! Any extraction error drops the record.

use geojson::JsonObject;
use kartlag_layer_models::{LayerDefinition, PropertyColumn, RawRecord};
use serde_json::{Number, Value};

use crate::{Feature, NormalizeError};

/// The shapes a stored geometry column can take.
///
/// Point coordinates keep the stored JSON numbers so wrapped geometries
/// carry them unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryField {
    /// Already a full `GeoJSON` feature.
    Feature(JsonObject),
    /// A `Point` geometry.
    Point {
        /// Longitude (first coordinate).
        lng: Number,
        /// Latitude (second coordinate).
        lat: Number,
    },
    /// A `MultiPoint` geometry, reduced to its first position.
    MultiPoint {
        /// Longitude of the first position.
        lng: Number,
        /// Latitude of the first position.
        lat: Number,
    },
    /// Any other geometry object, kept verbatim.
    Raw(JsonObject),
}

impl GeometryField {
    /// Classifies a stored geometry value.
    ///
    /// Returns `Ok(None)` when there is no geometry. A string is parsed as
    /// embedded JSON first.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] if the value is not an object, embedded
    /// JSON does not parse, or point coordinates are not numbers.
    pub fn classify(value: &Value) -> Result<Option<Self>, NormalizeError> {
        let object = match value {
            Value::Null => return Ok(None),
            Value::Object(object) => object,
            Value::String(text) => {
                let parsed: Value = serde_json::from_str(text)?;
                return Self::classify(&parsed);
            }
            other => {
                return Err(NormalizeError::NotAnObject {
                    found: json_type(other),
                });
            }
        };

        let kind = object.get("type").and_then(Value::as_str);
        let coordinates = object.get("coordinates").and_then(Value::as_array);

        match (kind, coordinates) {
            (Some("Feature"), _) if object.get("geometry").is_some_and(|g| !g.is_null()) => {
                Ok(Some(Self::Feature(object.clone())))
            }
            (Some("Point"), Some(position)) if position.len() >= 2 => {
                let (lng, lat) = read_position(position)?;
                Ok(Some(Self::Point { lng, lat }))
            }
            (Some("MultiPoint"), Some(positions)) if !positions.is_empty() => {
                let first = positions[0]
                    .as_array()
                    .ok_or_else(|| NormalizeError::Coordinates {
                        message: "MultiPoint position is not an array".to_string(),
                    })?;
                let (lng, lat) = read_position(first)?;
                Ok(Some(Self::MultiPoint { lng, lat }))
            }
            _ => Ok(Some(Self::Raw(object.clone()))),
        }
    }

    /// Turns this geometry into a feature.
    ///
    /// `properties` is used for wrapped geometries only; a pre-wrapped
    /// feature keeps its own.
    #[must_use]
    pub fn into_feature(self, properties: JsonObject) -> Feature {
        match self {
            Self::Feature(object) => Feature::from_object(object),
            Self::Point { lng, lat } | Self::MultiPoint { lng, lat } => {
                Feature::wrap(point_geometry(lng, lat), properties)
            }
            Self::Raw(object) => Feature::wrap(Value::Object(object), properties),
        }
    }

    /// The `(lat, lng)` pair of a point-like geometry.
    #[must_use]
    pub fn lat_lng(&self) -> Option<(f64, f64)> {
        match self {
            Self::Point { lng, lat } | Self::MultiPoint { lng, lat } => {
                Some((lat.as_f64()?, lng.as_f64()?))
            }
            Self::Feature(_) | Self::Raw(_) => None,
        }
    }
}

/// Converts a raw record into a feature using the layer's geometry column
/// and property mapping.
///
/// Returns `None` when the record has no geometry or cannot be normalized;
/// the failure is logged at debug level and never propagated.
#[must_use]
pub fn to_feature(record: &RawRecord, definition: &LayerDefinition) -> Option<Feature> {
    let geometry = record.get(&definition.geometry_column)?;

    let result = GeometryField::classify(geometry).map(|field| {
        field.map(|f| f.into_feature(copy_properties(record, &definition.properties)))
    });

    match result {
        Ok(feature) => {
            if feature.is_none() {
                log::debug!(
                    "{}: record {} has no geometry",
                    definition.table,
                    record_label(record)
                );
            }
            feature
        }
        Err(e) => {
            log::debug!(
                "{}: skipping record {}: {e}",
                definition.table,
                record_label(record)
            );
            None
        }
    }
}

/// Extracts a `(lat, lng)` pair from a `Point`, the first position of a
/// `MultiPoint`, or the geometry of a pre-wrapped feature.
///
/// Stored coordinates are `[lng, lat]`; the returned pair swaps them.
#[must_use]
pub fn lat_lng(geometry: &Value) -> Option<(f64, f64)> {
    match GeometryField::classify(geometry).ok()?? {
        GeometryField::Feature(object) => object.get("geometry").and_then(lat_lng),
        field => field.lat_lng(),
    }
}

/// Copies the mapped columns verbatim; missing columns become `null`.
fn copy_properties(record: &RawRecord, columns: &[PropertyColumn]) -> JsonObject {
    columns
        .iter()
        .map(|p| {
            (
                p.name.clone(),
                record.get(&p.column).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

fn read_position(position: &[Value]) -> Result<(Number, Number), NormalizeError> {
    if position.len() < 2 {
        return Err(NormalizeError::Coordinates {
            message: format!("position has {} elements", position.len()),
        });
    }
    let lng = read_number(&position[0], "longitude")?;
    let lat = read_number(&position[1], "latitude")?;
    Ok((lng, lat))
}

fn read_number(value: &Value, axis: &str) -> Result<Number, NormalizeError> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        other => Err(NormalizeError::Coordinates {
            message: format!("{axis} is not a number: {other}"),
        }),
    }
}

fn point_geometry(lng: Number, lat: Number) -> Value {
    let mut geometry = JsonObject::new();
    geometry.insert("type".to_string(), Value::from("Point"));
    geometry.insert(
        "coordinates".to_string(),
        Value::Array(vec![Value::Number(lng), Value::Number(lat)]),
    );
    Value::Object(geometry)
}

fn record_label(record: &RawRecord) -> String {
    record
        .get("id")
        .map_or_else(|| "<no id>".to_string(), ToString::to_string)
}

const fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
