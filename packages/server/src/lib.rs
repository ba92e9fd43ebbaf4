#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the statmap choropleth.
//!
//! Serves the indicator registry, period lists and rendered map layers
//! (JSON or SVG), proxies queries to the upstream statistics API, lists
//! downloadable publications and issues presigned download links. Static
//! frontend files are served from `app/dist`.
//!
//! Boundaries and datasets load in the background after the server starts;
//! until then map requests report a loading state.

mod handlers;
pub mod programs;
pub mod proxy;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};
use statmap_choropleth::ColorScale;
use statmap_choropleth::state::LayerCache;
use statmap_geography::GeoError;
use statmap_geography::loader::{BoundarySource, BoundaryStore};
use statmap_geography_models::{LoadState, Viewport};
use statmap_indicator::IndicatorError;
use statmap_indicator::dataset::load_dataset;
use statmap_indicator::registry::all_indicators;
use statmap_indicator_models::{IndicatorDataset, IndicatorDefinition};
use statmap_storage::{ObjectStorage, S3Storage, StorageError};
use thiserror::Error;

use crate::proxy::ProxyCache;

/// Number of rendered layers kept in memory.
const LAYER_CACHE_CAPACITY: usize = 32;

/// Errors raised by the server outside of request handling.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Boundary loading failed.
    #[error(transparent)]
    Geo(#[from] GeoError),

    /// Indicator loading failed.
    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    /// Object storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Outbound HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Settings read from the environment at start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Directory holding indicator dataset files.
    pub data_dir: PathBuf,
    /// Region boundary document.
    pub regions_source: BoundarySource,
    /// District boundary document.
    pub districts_source: BoundarySource,
    /// Base URL of the upstream statistics API; the proxy is disabled
    /// when unset.
    pub pxweb_base_url: Option<String>,
    /// Timeout for proxied requests.
    pub proxy_timeout: Duration,
}

impl ServerConfig {
    /// Reads `BIND_ADDR`, `PORT`, `STATMAP_DATA_DIR`,
    /// `STATMAP_REGIONS_SOURCE`, `STATMAP_DISTRICTS_SOURCE`,
    /// `PXWEB_BASE_URL` and `PXWEB_TIMEOUT_SECS`, falling back to local
    /// defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let env_or = |name: &str, default: &str| {
            std::env::var(name).unwrap_or_else(|_| default.to_string())
        };

        let source = |name: &str, default: &str| {
            env_or(name, default)
                .parse::<BoundarySource>()
                .unwrap_or_else(|e| match e {})
        };

        Self {
            bind_addr: env_or("BIND_ADDR", "127.0.0.1"),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            data_dir: PathBuf::from(env_or("STATMAP_DATA_DIR", "data")),
            regions_source: source("STATMAP_REGIONS_SOURCE", "data/geo/regions.geojson"),
            districts_source: source("STATMAP_DISTRICTS_SOURCE", "data/geo/districts.geojson"),
            pxweb_base_url: std::env::var("PXWEB_BASE_URL")
                .ok()
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            proxy_timeout: Duration::from_secs(
                std::env::var("PXWEB_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// A dataset slot with a revision that changes on every replacement.
#[derive(Debug, Clone, Default)]
pub struct DatasetEntry {
    /// Load state.
    pub state: LoadState<Arc<IndicatorDataset>>,
    /// Replacement counter.
    pub revision: u64,
}

/// Shared application state.
pub struct AppState {
    /// Server settings.
    pub config: ServerConfig,
    /// Registered indicators.
    pub indicators: Vec<IndicatorDefinition>,
    /// Region and district boundaries.
    pub boundaries: BoundaryStore,
    /// Loaded datasets by indicator id.
    pub datasets: RwLock<BTreeMap<String, DatasetEntry>>,
    /// Memo of rendered layers.
    pub layers: Mutex<LayerCache>,
    /// Fill palette.
    pub scale: ColorScale,
    /// Drawing area for rendered layers.
    pub viewport: Viewport,
    /// Outbound HTTP client.
    pub http: reqwest::Client,
    /// Statistics proxy response cache.
    pub proxy_cache: ProxyCache,
    /// Publication storage, if configured.
    pub storage: Option<Arc<dyn ObjectStorage>>,
}

impl AppState {
    /// Creates state with every boundary set and dataset pending.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Http`] if the HTTP client cannot be built.
    pub fn new(
        config: ServerConfig,
        storage: Option<Arc<dyn ObjectStorage>>,
    ) -> Result<Self, ServerError> {
        let http = reqwest::Client::builder()
            .timeout(config.proxy_timeout)
            .build()?;

        Ok(Self {
            config,
            indicators: all_indicators(),
            boundaries: BoundaryStore::new(),
            datasets: RwLock::new(BTreeMap::new()),
            layers: Mutex::new(LayerCache::new(LAYER_CACHE_CAPACITY)),
            scale: ColorScale::default(),
            viewport: Viewport::default(),
            http,
            proxy_cache: ProxyCache::default(),
            storage,
        })
    }

    /// Looks up a registered indicator.
    #[must_use]
    pub fn indicator(&self, id: &str) -> Option<&IndicatorDefinition> {
        self.indicators.iter().find(|i| i.id == id)
    }

    /// Current dataset entry for an indicator.
    #[must_use]
    pub fn dataset(&self, id: &str) -> DatasetEntry {
        self.datasets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces the dataset state for an indicator.
    pub fn set_dataset(&self, id: &str, state: LoadState<Arc<IndicatorDataset>>) {
        let mut datasets = self.datasets.write().unwrap_or_else(PoisonError::into_inner);
        let entry = datasets.entry(id.to_string()).or_default();
        entry.state = state;
        entry.revision += 1;
    }

    /// Loads every indicator dataset, one after another.
    pub async fn load_datasets(&self) {
        for definition in &self.indicators {
            let state = match load_dataset(&self.config.data_dir, definition).await {
                Ok(dataset) => LoadState::Ready(Arc::new(dataset)),
                Err(e) => {
                    log::error!("Failed to load indicator '{}': {e}", definition.id);
                    LoadState::Unavailable(format!("{} data is unavailable", definition.label))
                }
            };
            self.set_dataset(&definition.id, state);
        }
    }

    /// Loads boundaries and datasets concurrently.
    pub async fn load_all(&self) {
        tokio::join!(
            self.boundaries.load_all(
                &self.http,
                &self.config.regions_source,
                &self.config.districts_source,
            ),
            self.load_datasets(),
        );
        log::info!("Initial data load finished");
    }
}

/// Registers the `/api` routes.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/indicators", web::get().to(handlers::indicators))
            .route(
                "/indicators/{id}/periods",
                web::get().to(handlers::periods),
            )
            .route(
                "/map/{granularity}/{indicator}",
                web::get().to(handlers::map),
            )
            .route("/pxweb/{path:.*}", web::post().to(handlers::pxweb))
            .route("/programs", web::get().to(handlers::programs))
            .route("/download", web::get().to(handlers::download)),
    );
}

/// Starts the statmap API server.
///
/// Reads configuration from the environment, starts background loading of
/// boundaries and datasets, and runs the Actix-Web HTTP server. The caller
/// provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the state cannot be built or the HTTP server
/// fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let config = ServerConfig::from_env();

    let storage: Option<Arc<dyn ObjectStorage>> = match S3Storage::from_env() {
        Ok(storage) => Some(Arc::new(storage)),
        Err(e) => {
            log::warn!("Object storage disabled: {e}");
            None
        }
    };

    let bind_addr = config.bind_addr.clone();
    let port = config.port;
    let state = web::Data::new(AppState::new(config, storage)?);

    let loader = state.clone();
    actix_rt::spawn(async move {
        loader.load_all().await;
    });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            // Serve frontend static files (production)
            .service(Files::new("/", "app/dist").index_file("index.html"))
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
