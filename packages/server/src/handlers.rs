//! HTTP handler functions for the kartlag API.

use actix_web::http::header::ContentType;
use actix_web::{HttpResponse, web};
use kartlag_gateway::GatewayError;
use kartlag_geojson::FeatureCollection;
use kartlag_layer::{registry, service};
use kartlag_layer_models::{BoundingBox, Layer};
use kartlag_server_models::{
    ApiHealth, ApiLayer, ApiPowerPlant, FloodZoneQueryParams, PowerPlantQueryParams,
};

use crate::AppState;

/// Response header naming the upstream failure behind a degraded (empty)
/// feature collection.
pub const UPSTREAM_ERROR_HEADER: &str = "x-kartlag-upstream-error";

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/layers`
///
/// Lists the layers the server can publish.
pub async fn layers() -> HttpResponse {
    let layers: Vec<ApiLayer> = registry::all_definitions()
        .iter()
        .map(ApiLayer::from)
        .collect();
    HttpResponse::Ok().json(layers)
}

/// `GET /api/tables`
///
/// Lists the tables exposed by the upstream gateway. Answers with an empty
/// list if the gateway cannot be reached.
pub async fn tables(state: web::Data<AppState>) -> HttpResponse {
    match state.source.list_tables().await {
        Ok(tables) => HttpResponse::Ok().json(tables),
        Err(e) => {
            log::error!("Failed to list upstream tables: {e}");
            HttpResponse::Ok().json(Vec::<String>::new())
        }
    }
}

/// `GET /api/layers/{layer}/geojson`
pub async fn layer_geojson(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let Ok(layer) = path.parse::<Layer>() else {
        return plain_text(
            HttpResponse::NotFound(),
            format!("Unknown layer: {}", path.as_str()),
        );
    };

    let result = service::layer_geojson(state.source.as_ref(), layer, None).await;
    geojson_response(result, &format!("{layer} data"))
}

/// `GET /api/power-plants`
///
/// Power plants as JSON rows, filtered by at most one of `municipality`,
/// `county`, `status` or `minEffect`.
pub async fn power_plants(
    state: web::Data<AppState>,
    params: web::Query<PowerPlantQueryParams>,
) -> HttpResponse {
    let filter = match params.into_inner().into_filter() {
        Ok(filter) => filter,
        Err(message) => return plain_text(HttpResponse::BadRequest(), message),
    };

    match service::power_plants(state.source.as_ref(), filter.as_ref()).await {
        Ok(plants) => {
            let plants: Vec<ApiPowerPlant> = plants.into_iter().map(ApiPowerPlant::from).collect();
            HttpResponse::Ok().json(plants)
        }
        Err(e) => {
            log::error!("Failed to retrieve power plants: {e}");
            plain_text(
                HttpResponse::InternalServerError(),
                format!("Failed to retrieve power plant data: {e}"),
            )
        }
    }
}

/// `GET /api/power-plants/geojson`
///
/// Same filters as [`power_plants`], answered as a feature collection.
pub async fn power_plants_geojson(
    state: web::Data<AppState>,
    params: web::Query<PowerPlantQueryParams>,
) -> HttpResponse {
    let filter = match params.into_inner().into_filter() {
        Ok(filter) => filter,
        Err(message) => return plain_text(HttpResponse::BadRequest(), message),
    };

    let result = service::power_plants_geojson(state.source.as_ref(), filter.as_ref()).await;
    geojson_response(result, "geographic data")
}

/// `GET /api/power-plants/{id}`
pub async fn power_plant(state: web::Data<AppState>, path: web::Path<i64>) -> HttpResponse {
    let id = path.into_inner();
    match service::power_plant_by_id(state.source.as_ref(), id).await {
        Ok(Some(plant)) => HttpResponse::Ok().json(ApiPowerPlant::from(plant)),
        Ok(None) => plain_text(
            HttpResponse::NotFound(),
            format!("No power plant with ID {id}"),
        ),
        Err(e) => {
            log::error!("Failed to retrieve power plant with ID {id}: {e}");
            plain_text(
                HttpResponse::InternalServerError(),
                format!("Failed to retrieve power plant with ID {id}: {e}"),
            )
        }
    }
}

/// `GET /api/flood-zones`
///
/// Flood zones inside `bbox` (`minLng,minLat,maxLng,maxLat`), or all flood
/// zones when no box is given.
pub async fn flood_zones(
    state: web::Data<AppState>,
    params: web::Query<FloodZoneQueryParams>,
) -> HttpResponse {
    let result = match params.bbox.as_deref() {
        Some(raw) => {
            let Some(bbox) = parse_bbox(raw) else {
                return plain_text(
                    HttpResponse::BadRequest(),
                    format!("Invalid bbox '{raw}', expected minLng,minLat,maxLng,maxLat"),
                );
            };
            service::flood_zones_in_bbox(state.source.as_ref(), &bbox).await
        }
        None => service::layer_geojson(state.source.as_ref(), Layer::Flomsoner, None).await,
    };
    geojson_response(result, "flood zone data")
}

/// Parses a bounding box string `"minLng,minLat,maxLng,maxLat"` into a
/// [`BoundingBox`].
fn parse_bbox(s: &str) -> Option<BoundingBox> {
    let parts: Vec<f64> = s
        .split(',')
        .map(|p| p.trim().parse().ok())
        .collect::<Option<_>>()?;
    if parts.len() != 4 {
        return None;
    }
    let bbox = BoundingBox::new(parts[0], parts[1], parts[2], parts[3]);
    bbox.is_valid().then_some(bbox)
}

/// Maps a service result onto a `GeoJSON` response.
///
/// Upstream, transport and decode failures degrade to an empty collection;
/// configuration failures are a 500.
fn geojson_response(result: Result<FeatureCollection, GatewayError>, what: &str) -> HttpResponse {
    match result {
        Ok(collection) => HttpResponse::Ok().json(collection),
        Err(e @ GatewayError::Configuration { .. }) => {
            log::error!("Failed to retrieve {what}: {e}");
            plain_text(
                HttpResponse::InternalServerError(),
                format!("Failed to retrieve {what}: {e}"),
            )
        }
        Err(e) => {
            log::error!("Failed to retrieve {what}, answering with an empty collection: {e}");
            HttpResponse::Ok()
                .insert_header((UPSTREAM_ERROR_HEADER, degraded_reason(&e)))
                .json(FeatureCollection::empty())
        }
    }
}

/// Short ASCII description of a gateway failure, safe for a header value.
fn degraded_reason(e: &GatewayError) -> String {
    match e {
        GatewayError::Upstream { status, .. } => format!("upstream status {status}"),
        GatewayError::Http(err) if err.is_timeout() => "upstream timeout".to_string(),
        GatewayError::Http(_) => "upstream unreachable".to_string(),
        GatewayError::Decode { .. } => "upstream response not understood".to_string(),
        GatewayError::Configuration { .. } => "configuration".to_string(),
    }
}

fn plain_text(mut builder: actix_web::HttpResponseBuilder, body: String) -> HttpResponse {
    builder.content_type(ContentType::plaintext()).body(body)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use actix_web::App;
    use actix_web::test as actix_test;
    use async_trait::async_trait;
    use kartlag_gateway::RecordSource;
    use kartlag_layer_models::{QueryFilter, RawRecord};
    use serde_json::{Value, json};

    use super::*;

    enum Reply {
        Rows(Value),
        Fail(fn() -> GatewayError),
    }

    struct StubSource {
        reply: Reply,
        calls: Mutex<Vec<String>>,
    }

    impl StubSource {
        fn rows(rows: Value) -> Self {
            Self {
                reply: Reply::Rows(rows),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing(make: fn() -> GatewayError) -> Self {
            Self {
                reply: Reply::Fail(make),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn respond(&self, call: String) -> Result<Vec<RawRecord>, GatewayError> {
            self.calls.lock().unwrap().push(call);
            match &self.reply {
                Reply::Rows(rows) => Ok(rows
                    .as_array()
                    .unwrap()
                    .iter()
                    .map(|r| r.as_object().cloned().unwrap())
                    .collect()),
                Reply::Fail(make) => Err(make()),
            }
        }
    }

    #[async_trait]
    impl RecordSource for StubSource {
        async fn fetch(
            &self,
            table: &str,
            filter: Option<&QueryFilter>,
        ) -> Result<Vec<RawRecord>, GatewayError> {
            let predicate = filter.map(QueryFilter::predicate).unwrap_or_default();
            self.respond(format!("GET {table}?{predicate}"))
        }

        async fn fetch_by_bbox(
            &self,
            rpc: &str,
            bbox: &BoundingBox,
        ) -> Result<Vec<RawRecord>, GatewayError> {
            self.respond(format!(
                "POST {rpc} {},{},{},{}",
                bbox.min_lng, bbox.min_lat, bbox.max_lng, bbox.max_lat
            ))
        }

        async fn list_tables(&self) -> Result<Vec<String>, GatewayError> {
            match &self.reply {
                Reply::Rows(_) => Ok(vec!["Vindkraftverk".to_string()]),
                Reply::Fail(make) => Err(make()),
            }
        }
    }

    fn upstream_unavailable() -> GatewayError {
        GatewayError::Upstream {
            status: 503,
            body: "unavailable".to_string(),
        }
    }

    fn missing_table() -> GatewayError {
        GatewayError::Configuration {
            message: "table name has not been set".to_string(),
        }
    }

    async fn call(
        source: Arc<StubSource>,
        uri: &str,
    ) -> actix_web::dev::ServiceResponse {
        let state = web::Data::new(AppState { source });
        let app =
            actix_test::init_service(App::new().app_data(state).configure(crate::configure)).await;
        actix_test::call_service(&app, actix_test::TestRequest::get().uri(uri).to_request())
            .await
    }

    #[actix_rt::test]
    async fn empty_upstream_gives_empty_feature_collection() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source, "/api/layers/sykehus/geojson").await;
        assert_eq!(resp.status(), 200);
        let body = actix_test::read_body(resp).await;
        assert_eq!(body, r#"{"type":"FeatureCollection","features":[]}"#);
    }

    #[actix_rt::test]
    async fn layer_geojson_normalizes_rows() {
        let source = Arc::new(StubSource::rows(json!([
            {"id": 1, "geojson": {"type": "Point", "coordinates": [8.0, 58.1]}},
            {"id": 2},
        ])));
        let resp = call(source.clone(), "/api/layers/politi_fengsel/geojson").await;
        assert_eq!(resp.status(), 200);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["features"].as_array().unwrap().len(), 1);
        assert_eq!(
            body["features"][0]["geometry"],
            json!({"type": "Point", "coordinates": [8.0, 58.1]})
        );
        assert_eq!(*source.calls.lock().unwrap(), vec!["GET Politi_fengsel?"]);
    }

    #[actix_rt::test]
    async fn unknown_layer_is_not_found() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source, "/api/layers/nope/geojson").await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_rt::test]
    async fn upstream_failure_degrades_to_empty_collection() {
        let source = Arc::new(StubSource::failing(upstream_unavailable));
        let resp = call(source, "/api/power-plants/geojson").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            resp.headers().get(UPSTREAM_ERROR_HEADER).unwrap(),
            "upstream status 503"
        );
        let body = actix_test::read_body(resp).await;
        assert_eq!(body, r#"{"type":"FeatureCollection","features":[]}"#);
    }

    #[actix_rt::test]
    async fn configuration_failure_is_a_server_error() {
        let source = Arc::new(StubSource::failing(missing_table));
        let resp = call(source, "/api/layers/flomsoner/geojson").await;
        assert_eq!(resp.status(), 500);
        let body = actix_test::read_body(resp).await;
        assert!(
            std::str::from_utf8(&body)
                .unwrap()
                .contains("table name has not been set")
        );
    }

    #[actix_rt::test]
    async fn power_plant_geojson_forwards_min_effect() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/power-plants/geojson?minEffect=10.5").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["GET Vindkraftverk?effekt_mw=gte.10.5"]
        );
    }

    #[actix_rt::test]
    async fn two_filters_are_a_bad_request() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/power-plants?county=Agder&status=Drift").await;
        assert_eq!(resp.status(), 400);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn blank_filter_lists_every_plant() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/power-plants?municipality=").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(*source.calls.lock().unwrap(), vec!["GET Vindkraftverk?"]);
    }

    #[actix_rt::test]
    async fn blank_filter_beside_real_filter_is_ignored() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/power-plants?municipality=&county=Agder").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["GET Vindkraftverk?fylkesnavn=eq.Agder"]
        );
    }

    #[actix_rt::test]
    async fn non_finite_min_effect_is_a_bad_request() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/power-plants/geojson?minEffect=NaN").await;
        assert_eq!(resp.status(), 400);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn power_plants_list_rows() {
        let source = Arc::new(StubSource::rows(json!([{
            "id": 3,
            "saktittel": "Egersund",
            "kommunenavn": "Eigersund",
            "coord_geojson": {"type": "Point", "coordinates": [5.99, 58.45]}
        }])));
        let resp = call(source.clone(), "/api/power-plants?municipality=Eigersund").await;
        assert_eq!(resp.status(), 200);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body[0]["name"], "Egersund");
        assert_eq!(body[0]["latitude"], 58.45);
        assert_eq!(body[0]["longitude"], 5.99);
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["GET Vindkraftverk?kommunenavn=eq.Eigersund"]
        );
    }

    #[actix_rt::test]
    async fn power_plant_rows_fail_loudly() {
        let source = Arc::new(StubSource::failing(upstream_unavailable));
        let resp = call(source, "/api/power-plants").await;
        assert_eq!(resp.status(), 500);
    }

    #[actix_rt::test]
    async fn power_plant_by_id() {
        let source = Arc::new(StubSource::rows(json!([{"id": 8, "saktittel": "Buheii"}])));
        let resp = call(source.clone(), "/api/power-plants/8").await;
        assert_eq!(resp.status(), 200);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["name"], "Buheii");
        assert_eq!(*source.calls.lock().unwrap(), vec!["GET Vindkraftverk?id=eq.8"]);

        let empty = Arc::new(StubSource::rows(json!([])));
        let resp = call(empty, "/api/power-plants/8").await;
        assert_eq!(resp.status(), 404);
    }

    #[actix_rt::test]
    async fn flood_zones_in_bbox_use_rpc() {
        let source = Arc::new(StubSource::rows(json!([{
            "feature": {
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [7.5, 58.5]},
                "properties": {"zone": "Q200"}
            }
        }])));
        let resp = call(source.clone(), "/api/flood-zones?bbox=7,58,8,59").await;
        assert_eq!(resp.status(), 200);
        let body: Value = actix_test::read_body_json(resp).await;
        assert_eq!(body["features"][0]["properties"]["zone"], "Q200");
        assert_eq!(
            *source.calls.lock().unwrap(),
            vec!["POST get_flomsoner_bbox 7,58,8,59"]
        );
    }

    #[actix_rt::test]
    async fn flood_zones_without_bbox_read_whole_table() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/flood-zones").await;
        assert_eq!(resp.status(), 200);
        assert_eq!(*source.calls.lock().unwrap(), vec!["GET Flomsoner?"]);
    }

    #[actix_rt::test]
    async fn malformed_bbox_is_a_bad_request() {
        let source = Arc::new(StubSource::rows(json!([])));
        let resp = call(source.clone(), "/api/flood-zones?bbox=7,58,8").await;
        assert_eq!(resp.status(), 400);
        assert!(source.calls.lock().unwrap().is_empty());
    }

    #[actix_rt::test]
    async fn tables_degrade_to_empty_list() {
        let ok = Arc::new(StubSource::rows(json!([])));
        let body: Value = actix_test::read_body_json(call(ok, "/api/tables").await).await;
        assert_eq!(body, json!(["Vindkraftverk"]));

        let failing = Arc::new(StubSource::failing(upstream_unavailable));
        let body: Value = actix_test::read_body_json(call(failing, "/api/tables").await).await;
        assert_eq!(body, json!([]));
    }

    #[actix_rt::test]
    async fn layers_lists_every_layer() {
        let source = Arc::new(StubSource::rows(json!([])));
        let body: Value = actix_test::read_body_json(call(source, "/api/layers").await).await;
        let ids: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l["id"].as_str().unwrap())
            .collect();
        assert_eq!(
            ids,
            ["vindkraftverk", "flomsoner", "sykehus", "politi_fengsel", "brann_ambulanse"]
        );
    }

    #[test]
    fn parses_bbox() {
        assert_eq!(
            parse_bbox("7, 58, 8.5, 59"),
            Some(BoundingBox::new(7.0, 58.0, 8.5, 59.0))
        );
        assert!(parse_bbox("7,58,x,59").is_none());
        assert!(parse_bbox("8,58,7,59").is_none());
        assert!(parse_bbox("7,58,8,59,1").is_none());
    }
}
