#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Layer, filter, bounding box and row types for the kartlag map service.
//!
//! A [`Layer`] names one upstream table and, through its
//! [`LayerDefinition`], how rows of that table become `GeoJSON` features.
//! Filters are single `PostgREST` predicates ([`QueryFilter`]); the
//! power-plant specific filter operations are expressed as [`PlantFilter`]
//! and lowered to a [`QueryFilter`].

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// A raw upstream row: column name to JSON value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

/// A map layer backed by one upstream table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layer {
    /// Wind power plants (`Vindkraftverk`).
    Vindkraftverk,
    /// Flood zones (`Flomsoner`).
    Flomsoner,
    /// Hospitals (`Sykehus`).
    Sykehus,
    /// Police stations and prisons (`Politi_fengsel`).
    PolitiFengsel,
    /// Fire and ambulance stations (`Brann_ambulanse`).
    BrannAmbulanse,
}

impl Layer {
    /// Every known layer, in display order.
    pub const ALL: &[Self] = &[
        Self::Vindkraftverk,
        Self::Flomsoner,
        Self::Sykehus,
        Self::PolitiFengsel,
        Self::BrannAmbulanse,
    ];
}

/// How a layer maps onto its upstream table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LayerDefinition {
    /// Which layer this definition describes.
    pub id: Layer,
    /// Human-readable name.
    pub label: String,
    /// Upstream table name (e.g. `"Vindkraftverk"`).
    pub table: String,
    /// Column holding the geometry or pre-wrapped feature.
    pub geometry_column: String,
    /// Server-side RPC answering bounding-box queries, if the table has one.
    #[serde(default)]
    pub bbox_rpc: Option<String>,
    /// Columns copied into the properties of features built by wrapping a
    /// bare geometry.
    #[serde(default)]
    pub properties: Vec<PropertyColumn>,
}

/// One `GeoJSON` property and the upstream column it is copied from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyColumn {
    /// Property name in the emitted feature.
    pub name: String,
    /// Source column in the raw record.
    pub column: String,
}

/// `PostgREST` comparison operators.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum FilterOperator {
    /// Equal.
    Eq,
    /// Not equal.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// Case-sensitive pattern match.
    Like,
    /// Case-insensitive pattern match.
    Ilike,
}

/// A single `column=operator.value` predicate.
///
/// Exactly one predicate is sent per request; there is no AND/OR
/// composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Column the predicate applies to.
    pub column: String,
    /// Comparison operator.
    pub operator: FilterOperator,
    /// Right-hand side, sent verbatim.
    pub value: String,
}

impl QueryFilter {
    /// Creates a new predicate.
    #[must_use]
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    /// Whether the column or the value is empty.
    ///
    /// A blank predicate is never sent upstream.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.column.trim().is_empty() || self.value.trim().is_empty()
    }

    /// The query-string pair for this predicate, e.g.
    /// `("effekt_mw", "gte.10.5")`.
    #[must_use]
    pub fn query_pair(&self) -> (String, String) {
        (self.column.clone(), format!("{}.{}", self.operator, self.value))
    }

    /// The predicate as it appears in the query string, e.g.
    /// `effekt_mw=gte.10.5`.
    #[must_use]
    pub fn predicate(&self) -> String {
        let (column, expr) = self.query_pair();
        format!("{column}={expr}")
    }
}

impl std::fmt::Display for QueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.predicate())
    }
}

/// Filter operations offered for the power-plant layer.
#[derive(Debug, Clone, PartialEq)]
pub enum PlantFilter {
    /// Plants in the given municipality.
    Municipality(String),
    /// Plants in the given county.
    County(String),
    /// Plants with the given licensing status.
    Status(String),
    /// Plants with at least this installed effect, in MW.
    MinimumEffect(f64),
    /// A single plant by primary key.
    Id(i64),
}

impl From<&PlantFilter> for QueryFilter {
    fn from(filter: &PlantFilter) -> Self {
        match filter {
            PlantFilter::Municipality(name) => Self::new("kommunenavn", FilterOperator::Eq, name),
            PlantFilter::County(name) => Self::new("fylkesnavn", FilterOperator::Eq, name),
            PlantFilter::Status(status) => Self::new("status", FilterOperator::Eq, status),
            PlantFilter::MinimumEffect(mw) => {
                Self::new("effekt_mw", FilterOperator::Gte, mw.to_string())
            }
            PlantFilter::Id(id) => Self::new("id", FilterOperator::Eq, id.to_string()),
        }
    }
}

impl From<PlantFilter> for QueryFilter {
    fn from(filter: PlantFilter) -> Self {
        Self::from(&filter)
    }
}

/// A geographic bounding box in WGS84 coordinates.
///
/// Serializes to the body expected by the bounding-box RPC:
/// `{min_lng, min_lat, max_lng, max_lat}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Western longitude boundary.
    pub min_lng: f64,
    /// Southern latitude boundary.
    pub min_lat: f64,
    /// Eastern longitude boundary.
    pub max_lng: f64,
    /// Northern latitude boundary.
    pub max_lat: f64,
}

impl BoundingBox {
    /// Creates a new bounding box from the given coordinates.
    #[must_use]
    pub const fn new(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Self {
        Self {
            min_lng,
            min_lat,
            max_lng,
            max_lat,
        }
    }

    /// Whether the minimums do not exceed the maximums and every edge is
    /// finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.min_lng, self.min_lat, self.max_lng, self.max_lat]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lng <= self.max_lng
            && self.min_lat <= self.max_lat
    }
}

/// A row of the `Vindkraftverk` table.
///
/// Every column is optional; upstream rows are frequently sparse.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerPlant {
    /// Primary key.
    pub id: Option<i64>,
    /// Raw GML geometry as exported.
    pub gml: Option<String>,
    /// Object type.
    pub objekttype: Option<String>,
    /// Case ID in the licensing archive.
    #[serde(rename = "skaid")]
    pub ska_id: Option<i64>,
    /// Case title, used as the plant name.
    #[serde(rename = "saktittel")]
    pub sak_tittel: Option<String>,
    /// Developer.
    pub tiltakshaver: Option<String>,
    /// Case category.
    #[serde(rename = "sakkategori")]
    pub sak_kategori: Option<i64>,
    /// Licensing status.
    pub status: Option<String>,
    /// Licensed effect in MW.
    pub effekt_mw: Option<f64>,
    /// Effect in operation in MW.
    #[serde(rename = "effektidriftmw")]
    pub effekt_idrift_mw: Option<f64>,
    /// Expected yearly production in GWh.
    #[serde(rename = "forventetproduksjongwh")]
    pub forventet_produksjon_gwh: Option<f64>,
    /// Link to the licensing case.
    #[serde(rename = "saklenke")]
    pub sak_lenke: Option<String>,
    /// Municipality name.
    #[serde(rename = "kommunenavn")]
    pub kommune_navn: Option<String>,
    /// County name.
    #[serde(rename = "fylkesnavn")]
    pub fylkes_navn: Option<String>,
    /// Date put into operation.
    #[serde(rename = "idiftdato")]
    pub idift_dato: Option<String>,
    /// Date taken out of operation.
    #[serde(rename = "utavdriftdato")]
    pub ut_av_drift_dato: Option<String>,
    /// Total number of turbines.
    #[serde(rename = "totalantturbiner")]
    pub total_ant_turbiner: Option<i64>,
    /// Object status code.
    #[serde(rename = "objekstatus")]
    pub objek_status: Option<i64>,
    /// Local identifier.
    #[serde(rename = "lokalid")]
    pub lokal_id: Option<String>,
    /// Date of the data export.
    #[serde(rename = "datauttaksdato")]
    pub data_uttaks_dato: Option<String>,
    /// Export type.
    #[serde(rename = "eksporttype")]
    pub eksport_type: Option<String>,
    /// `GeoJSON` geometry (`Point` or `MultiPoint`, `[lng, lat]`).
    pub coord_geojson: Option<serde_json::Value>,
}
