//! Gateway → normalizer → assembler, one path per layer.

use kartlag_gateway::{GatewayError, RecordSource};
use kartlag_geojson::{FeatureCollection, assemble, to_feature};
use kartlag_layer_models::{
    BoundingBox, Layer, LayerDefinition, PlantFilter, PowerPlant, QueryFilter, RawRecord,
};

use crate::registry;

/// Normalizes rows of `definition`'s table into a feature collection.
///
/// Rows that fail normalization are dropped; order is preserved.
#[must_use]
pub fn normalize_rows(rows: &[RawRecord], definition: &LayerDefinition) -> FeatureCollection {
    let collection = assemble(rows.iter().map(|row| to_feature(row, definition)));
    log::info!(
        "{}: {} of {} rows normalized into features",
        definition.table,
        collection.len(),
        rows.len()
    );
    collection
}

/// Fetches a layer and returns it as a feature collection.
///
/// # Errors
///
/// Returns [`GatewayError`] if the upstream request fails.
pub async fn layer_geojson(
    source: &dyn RecordSource,
    layer: Layer,
    filter: Option<&QueryFilter>,
) -> Result<FeatureCollection, GatewayError> {
    let definition = registry::definition(layer);
    let rows = source.fetch(&definition.table, filter).await?;
    Ok(normalize_rows(&rows, definition))
}

/// Fetches the features of `layer` inside `bbox` through the layer's
/// bounding-box RPC.
///
/// # Errors
///
/// Returns [`GatewayError::Configuration`] if the layer has no bounding-box
/// RPC, and [`GatewayError`] if the upstream request fails.
pub async fn layer_geojson_in_bbox(
    source: &dyn RecordSource,
    layer: Layer,
    bbox: &BoundingBox,
) -> Result<FeatureCollection, GatewayError> {
    let definition = registry::definition(layer);
    let rpc = definition
        .bbox_rpc
        .as_deref()
        .ok_or_else(|| GatewayError::Configuration {
            message: format!("layer {layer} has no bounding-box query"),
        })?;
    let rows = source.fetch_by_bbox(rpc, bbox).await?;
    Ok(normalize_rows(&rows, definition))
}

/// Flood zones intersecting `bbox`.
///
/// # Errors
///
/// Returns [`GatewayError`] if the upstream request fails.
pub async fn flood_zones_in_bbox(
    source: &dyn RecordSource,
    bbox: &BoundingBox,
) -> Result<FeatureCollection, GatewayError> {
    layer_geojson_in_bbox(source, Layer::Flomsoner, bbox).await
}

/// Power plants as typed rows, optionally filtered.
///
/// # Errors
///
/// Returns [`GatewayError`] if the upstream request fails or a row does not
/// match the power-plant shape.
pub async fn power_plants(
    source: &dyn RecordSource,
    filter: Option<&PlantFilter>,
) -> Result<Vec<PowerPlant>, GatewayError> {
    let definition = registry::definition(Layer::Vindkraftverk);
    let filter = filter.map(QueryFilter::from);
    let rows = source.fetch(&definition.table, filter.as_ref()).await?;

    let plants = rows
        .into_iter()
        .map(|row| {
            serde_json::from_value::<PowerPlant>(serde_json::Value::Object(row)).map_err(|e| {
                GatewayError::Decode {
                    message: format!("invalid power plant row: {e}"),
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let with_geometry = plants.iter().filter(|p| p.coord_geojson.is_some()).count();
    log::info!(
        "Deserialized {} power plants, {with_geometry} with coordinates",
        plants.len()
    );
    Ok(plants)
}

/// Power plants as a feature collection, optionally filtered.
///
/// # Errors
///
/// Returns [`GatewayError`] if the upstream request fails.
pub async fn power_plants_geojson(
    source: &dyn RecordSource,
    filter: Option<&PlantFilter>,
) -> Result<FeatureCollection, GatewayError> {
    let filter = filter.map(QueryFilter::from);
    layer_geojson(source, Layer::Vindkraftverk, filter.as_ref()).await
}

/// A single power plant by primary key.
///
/// # Errors
///
/// Returns [`GatewayError`] if the upstream request fails.
pub async fn power_plant_by_id(
    source: &dyn RecordSource,
    id: i64,
) -> Result<Option<PowerPlant>, GatewayError> {
    let plants = power_plants(source, Some(&PlantFilter::Id(id))).await?;
    Ok(plants.into_iter().next())
}
