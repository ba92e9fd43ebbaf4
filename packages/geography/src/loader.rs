//! Asynchronous boundary loading with stale-result protection.
//!
//! Regions and districts are fetched independently and may complete in
//! any order. Every load is issued a [`LoadTicket`]; a result is only
//! applied if its ticket is still the newest one for that granularity.
//! Cancelling (view teardown, mode switch) simply invalidates the
//! outstanding ticket so that a late response is dropped.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use statmap_geography_models::{Granularity, LoadState};

use crate::features::parse_feature_collection;
use crate::{FeatureCollection, GeoError};

/// Where a boundary document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundarySource {
    /// Fetched with an HTTP GET.
    Url(String),
    /// Read from the local filesystem.
    File(PathBuf),
}

impl FromStr for BoundarySource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.starts_with("http://") || s.starts_with("https://") {
            Ok(Self::Url(s.to_string()))
        } else {
            Ok(Self::File(PathBuf::from(s)))
        }
    }
}

impl std::fmt::Display for BoundarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Url(url) => f.write_str(url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetches and validates one feature collection.
///
/// # Errors
///
/// Returns [`GeoError`] if the document cannot be fetched, is not JSON,
/// or has no `features` array.
pub async fn fetch_collection(
    client: &reqwest::Client,
    granularity: Granularity,
    source: &BoundarySource,
) -> Result<FeatureCollection, GeoError> {
    log::info!("Loading {granularity} boundaries from {source}");

    let body = match source {
        BoundarySource::Url(url) => {
            let resp = client.get(url).send().await?;
            if !resp.status().is_success() {
                return Err(GeoError::InvalidCollection {
                    message: format!("Boundary request failed with status {}", resp.status()),
                });
            }
            resp.text().await?
        }
        BoundarySource::File(path) => tokio::fs::read_to_string(path).await?,
    };

    let document: serde_json::Value = serde_json::from_str(&body)?;
    parse_feature_collection(granularity, &document)
}

/// Proof that a load was requested at a particular generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    granularity: Granularity,
    generation: u64,
}

impl LoadTicket {
    /// Boundary set this ticket was issued for.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }
}

#[derive(Default)]
struct Slot {
    generation: AtomicU64,
    revision: AtomicU64,
    state: RwLock<LoadState<Arc<FeatureCollection>>>,
}

/// In-memory holder for the region and district collections.
#[derive(Default)]
pub struct BoundaryStore {
    regions: Slot,
    districts: Slot,
}

impl BoundaryStore {
    /// Creates a store with both granularities pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    const fn slot(&self, granularity: Granularity) -> &Slot {
        match granularity {
            Granularity::Regions => &self.regions,
            Granularity::Districts => &self.districts,
        }
    }

    /// Starts a load: marks the slot pending and returns the ticket that
    /// must accompany its result.
    pub fn begin(&self, granularity: Granularity) -> LoadTicket {
        let slot = self.slot(granularity);
        let mut state = slot.state.write().unwrap_or_else(PoisonError::into_inner);
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *state = LoadState::Pending;
        LoadTicket {
            granularity,
            generation,
        }
    }

    /// Invalidates any outstanding load for `granularity`.
    ///
    /// The current state is left untouched; only late results are dropped.
    /// Waits for a result that is already being applied, so nothing from
    /// the invalidated ticket lands after this returns.
    pub fn cancel(&self, granularity: Granularity) {
        let slot = self.slot(granularity);
        let _state = slot.state.write().unwrap_or_else(PoisonError::into_inner);
        slot.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Whether a result for `ticket` would still be applied.
    #[must_use]
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.slot(ticket.granularity)
            .generation
            .load(Ordering::SeqCst)
            == ticket.generation
    }

    /// Applies a load result if its ticket is still current.
    ///
    /// Returns `false` when the result was stale and discarded.
    pub fn complete(
        &self,
        ticket: LoadTicket,
        result: Result<FeatureCollection, GeoError>,
    ) -> bool {
        let slot = self.slot(ticket.granularity);
        let mut state = slot.state.write().unwrap_or_else(PoisonError::into_inner);

        if slot.generation.load(Ordering::SeqCst) != ticket.generation {
            log::debug!(
                "Discarding stale {} load (generation {})",
                ticket.granularity,
                ticket.generation
            );
            return false;
        }

        *state = match result {
            Ok(collection) => {
                if collection.is_empty() {
                    log::warn!("{} boundary document has no drawable features", ticket.granularity);
                }
                LoadState::Ready(Arc::new(collection))
            }
            Err(e) => {
                log::error!("Failed to load {} boundaries: {e}", ticket.granularity);
                LoadState::Unavailable(format!("{} boundaries are unavailable", ticket.granularity))
            }
        };
        slot.revision.fetch_add(1, Ordering::SeqCst);

        true
    }

    /// Current state for a granularity.
    #[must_use]
    pub fn state(&self, granularity: Granularity) -> LoadState<Arc<FeatureCollection>> {
        self.slot(granularity)
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of results applied so far; changes whenever the state does.
    #[must_use]
    pub fn revision(&self, granularity: Granularity) -> u64 {
        self.slot(granularity).revision.load(Ordering::SeqCst)
    }

    /// Loads one granularity end to end.
    ///
    /// Returns whether the result was applied.
    pub async fn load(
        &self,
        client: &reqwest::Client,
        granularity: Granularity,
        source: &BoundarySource,
    ) -> bool {
        let ticket = self.begin(granularity);
        let result = fetch_collection(client, granularity, source).await;
        self.complete(ticket, result)
    }

    /// Loads regions and districts concurrently.
    pub async fn load_all(
        &self,
        client: &reqwest::Client,
        regions: &BoundarySource,
        districts: &BoundarySource,
    ) {
        tokio::join!(
            self.load(client, Granularity::Regions, regions),
            self.load(client, Granularity::Districts, districts),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::MultiPolygon;

    use crate::GeoFeature;

    fn collection(granularity: Granularity, name: &str) -> FeatureCollection {
        FeatureCollection {
            granularity,
            features: vec![GeoFeature::new(name, MultiPolygon::new(vec![]))],
            excluded: 0,
        }
    }

    fn loaded_name(store: &BoundaryStore, granularity: Granularity) -> Option<String> {
        store
            .state(granularity)
            .ready()
            .map(|c| c.features[0].name.clone())
    }

    #[test]
    fn parses_sources() {
        assert_eq!(
            "https://example.org/regions.json".parse::<BoundarySource>().unwrap(),
            BoundarySource::Url("https://example.org/regions.json".to_string())
        );
        assert_eq!(
            "data/geo/districts.geojson".parse::<BoundarySource>().unwrap(),
            BoundarySource::File(PathBuf::from("data/geo/districts.geojson"))
        );
    }

    #[test]
    fn newer_ticket_wins_over_older() {
        let store = BoundaryStore::new();
        let first = store.begin(Granularity::Regions);
        let second = store.begin(Granularity::Regions);

        assert!(store.complete(second, Ok(collection(Granularity::Regions, "new"))));
        assert!(!store.complete(first, Ok(collection(Granularity::Regions, "old"))));
        assert_eq!(loaded_name(&store, Granularity::Regions).as_deref(), Some("new"));
    }

    #[test]
    fn cancelled_load_is_discarded() {
        let store = BoundaryStore::new();
        let ticket = store.begin(Granularity::Districts);
        store.cancel(Granularity::Districts);

        assert!(!store.is_current(ticket));
        assert!(!store.complete(ticket, Ok(collection(Granularity::Districts, "late"))));
        assert!(store.state(Granularity::Districts).is_pending());
        assert_eq!(store.revision(Granularity::Districts), 0);
    }

    #[test]
    fn cancel_waits_for_a_result_being_applied() {
        let store = Arc::new(BoundaryStore::new());
        let ticket = store.begin(Granularity::Regions);

        let guard = store.slot(Granularity::Regions).state.write().unwrap();
        let canceller = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || store.cancel(Granularity::Regions))
        };
        std::thread::sleep(std::time::Duration::from_millis(50));
        assert_eq!(
            store.slot(Granularity::Regions).generation.load(Ordering::SeqCst),
            1
        );
        drop(guard);
        canceller.join().unwrap();

        assert!(!store.is_current(ticket));
        assert!(!store.complete(ticket, Ok(collection(Granularity::Regions, "late"))));
        assert!(store.state(Granularity::Regions).is_pending());
    }

    #[test]
    fn granularities_are_independent() {
        let store = BoundaryStore::new();
        let regions = store.begin(Granularity::Regions);
        let districts = store.begin(Granularity::Districts);
        store.cancel(Granularity::Regions);

        assert!(store.complete(districts, Ok(collection(Granularity::Districts, "Ho"))));
        assert!(!store.complete(regions, Ok(collection(Granularity::Regions, "Volta"))));
        assert_eq!(loaded_name(&store, Granularity::Districts).as_deref(), Some("Ho"));
        assert!(store.state(Granularity::Regions).is_pending());
    }

    #[test]
    fn failure_becomes_unavailable() {
        let store = BoundaryStore::new();
        let ticket = store.begin(Granularity::Regions);
        let applied = store.complete(
            ticket,
            Err(GeoError::InvalidCollection {
                message: "boom".to_string(),
            }),
        );

        assert!(applied);
        assert!(matches!(
            store.state(Granularity::Regions),
            LoadState::Unavailable(_)
        ));
        assert_eq!(store.revision(Granularity::Regions), 1);
    }

    #[tokio::test]
    async fn loads_from_file_and_reports_missing_file() {
        let dir = std::env::temp_dir().join(format!("statmap-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let regions_path = dir.join("regions.geojson");
        std::fs::write(
            &regions_path,
            serde_json::json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "properties": { "name": "Volta Region" },
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 6.0], [1.0, 6.0], [1.0, 7.0], [0.0, 6.0]]]
                    }
                }]
            })
            .to_string(),
        )
        .unwrap();

        let store = BoundaryStore::new();
        let client = reqwest::Client::new();
        store
            .load_all(
                &client,
                &BoundarySource::File(regions_path),
                &BoundarySource::File(dir.join("missing.geojson")),
            )
            .await;

        let regions = store.state(Granularity::Regions);
        let regions = regions.ready().unwrap();
        assert_eq!(regions.features[0].key, "Volta");
        assert!(matches!(
            store.state(Granularity::Districts),
            LoadState::Unavailable(_)
        ));

        std::fs::remove_dir_all(&dir).ok();
    }
    #[tokio::test]
    async fn bundled_boundaries_load_without_exclusions() {
        let geo_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/geo");
        let client = reqwest::Client::new();

        for (granularity, file) in [
            (Granularity::Regions, "regions.geojson"),
            (Granularity::Districts, "districts.geojson"),
        ] {
            let collection =
                fetch_collection(&client, granularity, &BoundarySource::File(geo_dir.join(file)))
                    .await
                    .unwrap();
            assert_eq!(collection.excluded, 0);
            assert_eq!(collection.features.len(), 4);
        }
    }
}
