//! HTTP handler functions for the statmap API.

use std::sync::{Arc, PoisonError};
use std::time::Instant;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, web};
use statmap_choropleth::state::LayerKey;
use statmap_choropleth::svg::to_svg;
use statmap_choropleth::{MapStatus, build_layer};
use statmap_geography_models::{Granularity, LoadState};
use statmap_indicator::normalize::{available_periods, normalize};
use statmap_indicator::period::{parse_period, summarize_periods};
use statmap_indicator_models::Selection;
use statmap_server_models::{
    ApiDownload, ApiHealth, ApiIndicator, ApiPeriods, DatasetStatus, DownloadParams, MapFormat,
    MapQueryParams, ProxyQueryParams,
};
use statmap_storage::{StorageError, presign_expiry};

use crate::AppState;
use crate::programs::{all_programs, match_programs};
use crate::proxy::{ProxyCache, force_json_format, forward, truncate_body, upstream_url};

fn error_response(status: StatusCode, message: impl Into<String>) -> HttpResponse {
    HttpResponse::build(status).json(serde_json::json!({
        "error": message.into()
    }))
}

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/indicators`
///
/// Lists registered indicators with the load status of their datasets.
pub async fn indicators(state: web::Data<AppState>) -> HttpResponse {
    let listing: Vec<ApiIndicator> = state
        .indicators
        .iter()
        .map(|definition| {
            let status = match state.dataset(&definition.id).state {
                LoadState::Ready(_) => DatasetStatus::Ready,
                LoadState::Pending => DatasetStatus::Pending,
                LoadState::Unavailable(_) => DatasetStatus::Unavailable,
            };
            ApiIndicator::new(definition, status)
        })
        .collect();

    HttpResponse::Ok().json(listing)
}

/// `GET /api/indicators/{id}/periods`
///
/// Returns the periods available for an indicator, its latest period and
/// the distinct years.
pub async fn periods(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let id = path.into_inner();
    if state.indicator(&id).is_none() {
        return error_response(StatusCode::NOT_FOUND, format!("Unknown indicator: {id}"));
    }

    match state.dataset(&id).state {
        LoadState::Ready(dataset) => {
            let summary = summarize_periods(available_periods(&dataset));
            HttpResponse::Ok().json(ApiPeriods::new(id, summary, |code| {
                parse_period(code).map(|p| (p.to_string(), p.month_label()))
            }))
        }
        LoadState::Pending => error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Indicator data is still loading",
        ),
        LoadState::Unavailable(message) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, message)
        }
    }
}

/// `GET /api/map/{granularity}/{indicator}`
///
/// Resolves the choropleth for one indicator and period. Returns the
/// [`MapStatus`] as JSON, or an SVG document with `format=svg`.
pub async fn map(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
    params: web::Query<MapQueryParams>,
) -> HttpResponse {
    let (granularity, id) = path.into_inner();
    let Ok(granularity) = granularity.parse::<Granularity>() else {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("Unknown granularity: {granularity}"),
        );
    };
    let Some(definition) = state.indicator(&id) else {
        return error_response(StatusCode::NOT_FOUND, format!("Unknown indicator: {id}"));
    };
    if !definition.granularities.contains(&granularity) {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!("{} is not published for {granularity}", definition.label),
        );
    }

    let params = params.into_inner();
    let dataset = state.dataset(&id);

    let period = params.period.clone().or_else(|| {
        dataset
            .state
            .ready()
            .and_then(|ds| summarize_periods(available_periods(ds)).latest)
    });
    let selection = Selection {
        period: period.unwrap_or_default(),
        indicator: params.indicator.clone(),
        variable: params
            .variable
            .clone()
            .or_else(|| definition.variables.first().cloned()),
    };

    let values = match &dataset.state {
        LoadState::Pending => LoadState::Pending,
        LoadState::Unavailable(message) => LoadState::Unavailable(message.clone()),
        LoadState::Ready(ds) => LoadState::Ready(normalize(ds, &selection)),
    };

    let key = LayerKey {
        granularity,
        indicator: id,
        period: selection.period.clone(),
        variable: selection.variable.clone(),
        dataset_revision: dataset.revision,
        geometry_revision: state.boundaries.revision(granularity),
    };

    let status = MapStatus::resolve(
        &state.boundaries.state(granularity),
        &values,
        |collection, values| {
            state
                .layers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get_or_build(key, || {
                    build_layer(collection, values, &state.scale, state.viewport)
                })
        },
    );

    match (params.format, &status) {
        (MapFormat::Svg, MapStatus::Ready(layer)) => HttpResponse::Ok()
            .content_type("image/svg+xml")
            .body(to_svg(layer)),
        (MapFormat::Svg, MapStatus::Loading) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, "Map data is still loading")
        }
        (MapFormat::Svg, MapStatus::Unavailable(message)) => {
            error_response(StatusCode::SERVICE_UNAVAILABLE, message.clone())
        }
        (MapFormat::Json, _) => HttpResponse::Ok().json(&status),
    }
}

/// `POST /api/pxweb/{path}`
///
/// Forwards a table query upstream with the response format forced to
/// JSON. With `?cache=true` successful responses are served from memory
/// for an hour.
pub async fn pxweb(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<ProxyQueryParams>,
    body: web::Json<serde_json::Value>,
) -> HttpResponse {
    let Some(base) = state.config.pxweb_base_url.as_deref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Statistics proxy is not configured",
        );
    };

    let path = path.into_inner();
    let mut body = body.into_inner();
    force_json_format(&mut body);

    let cache_key = ProxyCache::key(&path, &body);
    if query.cache {
        if let Some(cached) = state.proxy_cache.get(&cache_key, Instant::now()) {
            log::debug!("Proxy cache hit for {path}");
            return HttpResponse::Ok()
                .content_type("application/json")
                .insert_header(("X-Cache", "HIT"))
                .body(cached);
        }
    }

    let url = upstream_url(base, &path);
    let upstream = match forward(&state.http, &url, &body).await {
        Ok(upstream) => upstream,
        Err(e) => {
            log::error!("Proxy request to {url} failed: {e}");
            return error_response(StatusCode::BAD_GATEWAY, "Upstream request failed");
        }
    };

    if !upstream.is_success() {
        let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
        return HttpResponse::build(status).json(serde_json::json!({
            "error": format!("Upstream returned {}", upstream.status),
            "body": truncate_body(&upstream.body),
        }));
    }

    if query.cache {
        state
            .proxy_cache
            .insert(cache_key, upstream.body.clone(), Instant::now());
    }

    HttpResponse::Ok()
        .content_type("application/json")
        .insert_header(("X-Cache", "MISS"))
        .body(upstream.body)
}

/// `GET /api/programs`
///
/// Lists statistical programs with a download link for each one that has
/// a matching publication in storage.
pub async fn programs(state: web::Data<AppState>) -> HttpResponse {
    let keys = match &state.storage {
        Some(storage) => storage.list_keys("").await.unwrap_or_else(|e| {
            log::error!("Failed to list publications: {e}");
            Vec::new()
        }),
        None => Vec::new(),
    };

    HttpResponse::Ok().json(match_programs(&all_programs(), &keys))
}

/// `GET /api/download`
///
/// Issues a presigned URL for a publication.
pub async fn download(
    state: web::Data<AppState>,
    params: web::Query<DownloadParams>,
) -> HttpResponse {
    let Some(storage) = state.storage.as_ref().map(Arc::clone) else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Publication storage is not configured",
        );
    };

    let params = params.into_inner();
    let key = params.key.trim();
    if key.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing key");
    }

    let expires_in = presign_expiry(params.expires);
    match storage.presign_get(key, expires_in).await {
        Ok(url) => HttpResponse::Ok().json(ApiDownload {
            key: key.to_string(),
            url,
            expires_in: expires_in.as_secs(),
        }),
        Err(StorageError::NotFound { key }) => {
            error_response(StatusCode::NOT_FOUND, format!("No such publication: {key}"))
        }
        Err(e) => {
            log::error!("Failed to presign {key}: {e}");
            error_response(StatusCode::BAD_GATEWAY, "Failed to create download link")
        }
    }
}
