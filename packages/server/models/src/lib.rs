#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! API request and response types for the kartlag server.
//!
//! These types are serialized to JSON for the REST API. They are separate
//! from the upstream row types to allow independent evolution of the API
//! contract.

use kartlag_layer_models::{Layer, LayerDefinition, PlantFilter, PowerPlant};
use serde::{Deserialize, Serialize};

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiHealth {
    /// Whether the server is healthy.
    pub healthy: bool,
    /// Server version.
    pub version: String,
}

/// A map layer as listed by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiLayer {
    /// Layer identifier used in URLs.
    pub id: Layer,
    /// Human-readable name.
    pub label: String,
    /// Upstream table.
    pub table: String,
    /// Whether the layer supports bounding-box queries.
    pub has_bbox_query: bool,
}

impl From<&LayerDefinition> for ApiLayer {
    fn from(def: &LayerDefinition) -> Self {
        Self {
            id: def.id,
            label: def.label.clone(),
            table: def.table.clone(),
            has_bbox_query: def.bbox_rpc.is_some(),
        }
    }
}

/// A wind power plant as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPowerPlant {
    /// Primary key.
    pub id: Option<i64>,
    /// Plant name (licensing case title).
    pub name: Option<String>,
    /// Developer.
    pub developer: Option<String>,
    /// Licensing status.
    pub status: Option<String>,
    /// Licensed effect in MW.
    pub effect_mw: Option<f64>,
    /// Effect in operation in MW.
    pub effect_in_operation_mw: Option<f64>,
    /// Expected yearly production in GWh.
    pub expected_production_gwh: Option<f64>,
    /// Municipality name.
    pub municipality: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// Total number of turbines.
    pub turbines: Option<i64>,
    /// Link to the licensing case.
    pub case_link: Option<String>,
    /// Latitude (WGS84), from the stored geometry.
    pub latitude: Option<f64>,
    /// Longitude (WGS84), from the stored geometry.
    pub longitude: Option<f64>,
}

impl From<PowerPlant> for ApiPowerPlant {
    fn from(plant: PowerPlant) -> Self {
        let coords = plant
            .coord_geojson
            .as_ref()
            .and_then(kartlag_geojson::lat_lng);
        Self {
            id: plant.id,
            name: plant.sak_tittel,
            developer: plant.tiltakshaver,
            status: plant.status,
            effect_mw: plant.effekt_mw,
            effect_in_operation_mw: plant.effekt_idrift_mw,
            expected_production_gwh: plant.forventet_produksjon_gwh,
            municipality: plant.kommune_navn,
            county: plant.fylkes_navn,
            turbines: plant.total_ant_turbiner,
            case_link: plant.sak_lenke,
            latitude: coords.map(|(lat, _)| lat),
            longitude: coords.map(|(_, lng)| lng),
        }
    }
}

/// Query parameters for the power-plant endpoints.
///
/// At most one filter may be given.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PowerPlantQueryParams {
    /// Municipality name.
    pub municipality: Option<String>,
    /// County name.
    pub county: Option<String>,
    /// Licensing status.
    pub status: Option<String>,
    /// Minimum effect in MW.
    pub min_effect: Option<f64>,
}

impl PowerPlantQueryParams {
    /// Converts the parameters into the single filter they describe.
    ///
    /// Blank text parameters count as absent.
    ///
    /// # Errors
    ///
    /// Returns an error message if more than one filter is given or
    /// `minEffect` is not a finite number.
    pub fn into_filter(self) -> Result<Option<PlantFilter>, String> {
        if let Some(mw) = self.min_effect.filter(|mw| !mw.is_finite()) {
            return Err(format!("minEffect must be a finite number, got {mw}"));
        }

        let mut filters: Vec<PlantFilter> = [
            non_blank(self.municipality).map(PlantFilter::Municipality),
            non_blank(self.county).map(PlantFilter::County),
            non_blank(self.status).map(PlantFilter::Status),
            self.min_effect.map(PlantFilter::MinimumEffect),
        ]
        .into_iter()
        .flatten()
        .collect();

        match filters.len() {
            0 | 1 => Ok(filters.pop()),
            n => Err(format!(
                "Only one filter may be given per request, got {n}"
            )),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Query parameters for the flood-zone endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodZoneQueryParams {
    /// Bounding box as `minLng,minLat,maxLng,maxLat`.
    pub bbox: Option<String>,
}
