//! Feature store boundary
//!
//! Persistence lives outside the core. The trait mirrors a transactional
//! editing session: one named edit command per finish gesture, committed
//! whole or abandoned whole. `MemoryStore` is an in-memory implementation
//! for tests and embedding.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;
use uuid::Uuid;

use crate::feature::{Feature, FeatureGeometry};

/// A write rejected by the feature store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError(pub String);

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Error for StoreError {}

/// Transactional feature persistence consumed by the digitizing tool
pub trait FeatureStore {
    /// Features currently selected by the host
    fn selected_features(&self) -> Vec<Feature>;

    /// Look up one feature by id
    fn feature(&self, id: Uuid) -> Option<Feature>;

    /// Add a new feature, returning its id
    fn add_feature(
        &mut self,
        geometry: FeatureGeometry,
        attributes: BTreeMap<String, String>,
    ) -> Result<Uuid, StoreError>;

    /// Replace a feature's geometry wholesale
    fn change_geometry(&mut self, id: Uuid, geometry: FeatureGeometry) -> Result<(), StoreError>;

    /// Open a named edit command scoping the writes of one gesture
    fn begin_edit_command(&mut self, name: &str);

    /// Commit the open edit command
    fn commit_edit_command(&mut self);

    /// Roll the open edit command back
    fn abandon_edit_command(&mut self);
}

/// In-memory feature table with snapshot-based edit commands
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    features: Vec<Feature>,
    selection: Vec<Uuid>,
    snapshot: Option<Vec<Feature>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature directly, outside any edit command
    pub fn insert(&mut self, feature: Feature) -> Uuid {
        let id = feature.id;
        self.features.push(feature);
        id
    }

    /// Replace the current selection
    pub fn select(&mut self, ids: &[Uuid]) {
        self.selection = ids.to_vec();
    }

    /// All stored features in insertion order
    pub fn features(&self) -> &[Feature] {
        &self.features
    }
}

impl FeatureStore for MemoryStore {
    fn selected_features(&self) -> Vec<Feature> {
        self.selection
            .iter()
            .filter_map(|id| self.feature(*id))
            .collect()
    }

    fn feature(&self, id: Uuid) -> Option<Feature> {
        self.features.iter().find(|feature| feature.id == id).cloned()
    }

    fn add_feature(
        &mut self,
        geometry: FeatureGeometry,
        attributes: BTreeMap<String, String>,
    ) -> Result<Uuid, StoreError> {
        Ok(self.insert(Feature::new(geometry, attributes)))
    }

    fn change_geometry(&mut self, id: Uuid, geometry: FeatureGeometry) -> Result<(), StoreError> {
        match self.features.iter_mut().find(|feature| feature.id == id) {
            Some(feature) => {
                feature.geometry = geometry;
                Ok(())
            }
            None => Err(StoreError(format!("no feature with id {}", id))),
        }
    }

    fn begin_edit_command(&mut self, name: &str) {
        log::debug!("begin edit command: {}", name);
        self.snapshot = Some(self.features.clone());
    }

    fn commit_edit_command(&mut self) {
        self.snapshot = None;
    }

    fn abandon_edit_command(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            self.features = snapshot;
        }
    }
}
