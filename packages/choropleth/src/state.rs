//! Map view state.
//!
//! All per-indicator state lives in one keyed map; switching indicator,
//! granularity or period replaces a single entry. Built layers are
//! memoized in a [`LayerCache`] so that unchanged inputs never rebuild.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use statmap_geography::FeatureCollection;
use statmap_geography_models::{Granularity, LoadState, Viewport};
use statmap_indicator::normalize::{available_periods, normalize};
use statmap_indicator::period::summarize_periods;
use statmap_indicator_models::{IndicatorDataset, Selection};

use crate::color::ColorScale;
use crate::layer::{ChoroplethLayer, MapStatus, build_layer};

/// Registry id of an indicator.
pub type IndicatorId = String;

/// Everything that determines a built layer.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerKey {
    /// Boundary set.
    pub granularity: Granularity,
    /// Indicator id.
    pub indicator: IndicatorId,
    /// Raw period code.
    pub period: String,
    /// Sub-variable selector.
    pub variable: Option<String>,
    /// Revision of the dataset the values came from.
    pub dataset_revision: u64,
    /// Revision of the boundary collection.
    pub geometry_revision: u64,
}

/// Bounded memo of built layers, evicting the oldest entry first.
#[derive(Debug)]
pub struct LayerCache {
    capacity: usize,
    layers: BTreeMap<LayerKey, Arc<ChoroplethLayer>>,
    order: VecDeque<LayerKey>,
}

impl Default for LayerCache {
    fn default() -> Self {
        Self::new(1)
    }
}

impl LayerCache {
    /// Creates a cache holding at most `capacity` layers (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            layers: BTreeMap::new(),
            order: VecDeque::new(),
        }
    }

    /// Returns the cached layer for `key`, building it on a miss.
    pub fn get_or_build(
        &mut self,
        key: LayerKey,
        build: impl FnOnce() -> ChoroplethLayer,
    ) -> Arc<ChoroplethLayer> {
        if let Some(layer) = self.layers.get(&key) {
            return Arc::clone(layer);
        }

        log::debug!(
            "Building {} layer for '{}' at {}",
            key.granularity,
            key.indicator,
            key.period
        );
        let layer = Arc::new(build());

        while self.order.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.layers.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.layers.insert(key, Arc::clone(&layer));

        layer
    }

    /// Number of cached layers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// State of one indicator in the view.
#[derive(Debug, Clone, Default)]
pub struct IndicatorViewState {
    /// Loaded dataset.
    pub dataset: LoadState<Arc<IndicatorDataset>>,
    /// Bumped whenever `dataset` is replaced.
    pub revision: u64,
    /// Selected raw period code.
    pub period: Option<String>,
    /// Selected sub-variable.
    pub variable: Option<String>,
}

/// The map view: active indicator, granularity and per-indicator state.
#[derive(Debug)]
pub struct MapViewState {
    indicators: BTreeMap<IndicatorId, IndicatorViewState>,
    active: Option<IndicatorId>,
    granularity: Granularity,
    cache: LayerCache,
}

impl MapViewState {
    /// Creates an empty view drawing `granularity`.
    #[must_use]
    pub fn new(granularity: Granularity) -> Self {
        Self {
            indicators: BTreeMap::new(),
            active: None,
            granularity,
            cache: LayerCache::default(),
        }
    }

    /// Makes `id` the active indicator, creating its state if needed.
    pub fn switch_indicator(&mut self, id: impl Into<IndicatorId>) {
        let id = id.into();
        self.indicators.entry(id.clone()).or_default();
        self.active = Some(id);
    }

    /// Changes the boundary set.
    pub const fn set_granularity(&mut self, granularity: Granularity) {
        self.granularity = granularity;
    }

    /// Current boundary set.
    #[must_use]
    pub const fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Selects a period for the active indicator.
    ///
    /// Returns `false` if no indicator is active.
    pub fn select_period(&mut self, period: impl Into<String>) -> bool {
        self.active_mut().is_some_and(|state| {
            state.period = Some(period.into());
            true
        })
    }

    /// Selects (or clears) a sub-variable for the active indicator.
    ///
    /// Returns `false` if no indicator is active.
    pub fn select_variable(&mut self, variable: Option<String>) -> bool {
        self.active_mut().is_some_and(|state| {
            state.variable = variable;
            true
        })
    }

    /// Replaces the dataset state of `id`.
    ///
    /// When the dataset becomes ready and no period has been chosen yet,
    /// the latest available period is preselected.
    pub fn set_dataset(&mut self, id: &str, dataset: LoadState<Arc<IndicatorDataset>>) {
        let state = self.indicators.entry(id.to_string()).or_default();

        if state.period.is_none() {
            if let Some(ready) = dataset.ready() {
                state.period = summarize_periods(available_periods(ready)).latest;
            }
        }

        state.dataset = dataset;
        state.revision += 1;
    }

    /// The active indicator and its state.
    #[must_use]
    pub fn active(&self) -> Option<(&str, &IndicatorViewState)> {
        let id = self.active.as_deref()?;
        Some((id, self.indicators.get(id)?))
    }

    /// State of any known indicator.
    #[must_use]
    pub fn indicator(&self, id: &str) -> Option<&IndicatorViewState> {
        self.indicators.get(id)
    }

    fn active_mut(&mut self) -> Option<&mut IndicatorViewState> {
        let id = self.active.as_deref()?;
        self.indicators.get_mut(id)
    }

    /// Resolves what to draw for the active indicator.
    ///
    /// `boundaries` must belong to the current granularity; its revision
    /// is part of the cache key.
    pub fn status(
        &mut self,
        boundaries: &LoadState<Arc<FeatureCollection>>,
        geometry_revision: u64,
        scale: &ColorScale,
        viewport: Viewport,
    ) -> MapStatus {
        let Some(id) = self.active.clone() else {
            return MapStatus::Loading;
        };
        let Some(state) = self.indicators.get(&id) else {
            return MapStatus::Loading;
        };

        let selection = Selection {
            period: state.period.clone().unwrap_or_default(),
            indicator: None,
            variable: state.variable.clone(),
        };
        let values = match &state.dataset {
            LoadState::Pending => LoadState::Pending,
            LoadState::Unavailable(message) => LoadState::Unavailable(message.clone()),
            LoadState::Ready(dataset) => LoadState::Ready(normalize(dataset, &selection)),
        };

        let key = LayerKey {
            granularity: self.granularity,
            indicator: id,
            period: selection.period,
            variable: selection.variable,
            dataset_revision: state.revision,
            geometry_revision,
        };
        let cache = &mut self.cache;

        MapStatus::resolve(boundaries, &values, |collection, values| {
            cache.get_or_build(key, || build_layer(collection, values, scale, viewport))
        })
    }
}
