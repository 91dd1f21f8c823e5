//! Feature data model
//!
//! A feature owns exactly one polygon geometry plus a stable identifier and
//! attribute fields. Geometry is replaced wholesale on edit, never mutated
//! in place, which keeps the repair chain composable.

use geo::{MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::EditError;

/// Polygon geometry of a feature: one part or several
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FeatureGeometry {
    /// A single polygon (exterior ring plus holes)
    Single(Polygon<f64>),
    /// An ordered collection of polygon parts
    Multi(MultiPolygon<f64>),
}

impl FeatureGeometry {
    /// Parts in storage order
    pub fn parts(&self) -> &[Polygon<f64>] {
        match self {
            FeatureGeometry::Single(polygon) => std::slice::from_ref(polygon),
            FeatureGeometry::Multi(multi) => &multi.0,
        }
    }

    /// Number of parts
    pub fn part_count(&self) -> usize {
        self.parts().len()
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, FeatureGeometry::Multi(_))
    }

    /// View as a multi-polygon (clones the single case)
    pub fn to_multi(&self) -> MultiPolygon<f64> {
        match self {
            FeatureGeometry::Single(polygon) => MultiPolygon::new(vec![polygon.clone()]),
            FeatureGeometry::Multi(multi) => multi.clone(),
        }
    }

    /// Rebuild a geometry from parts
    ///
    /// Exactly one part becomes `Single`, so adding a part and then removing
    /// it restores the pre-edit geometry type. Zero parts is reported as
    /// `FeatureEmptied`: deleting the feature itself is the caller's call.
    pub fn from_parts(mut parts: Vec<Polygon<f64>>) -> Result<Self, EditError> {
        match parts.len() {
            0 => Err(EditError::FeatureEmptied),
            1 => Ok(FeatureGeometry::Single(parts.remove(0))),
            _ => Ok(FeatureGeometry::Multi(MultiPolygon::new(parts))),
        }
    }
}

/// A persisted polygon feature
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    /// Stable feature identifier
    pub id: Uuid,

    /// The owned geometry value
    pub geometry: FeatureGeometry,

    /// Attribute key/value pairs
    pub attributes: BTreeMap<String, String>,
}

impl Feature {
    /// Create a feature with a fresh id
    pub fn new(geometry: FeatureGeometry, attributes: BTreeMap<String, String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            geometry,
            attributes,
        }
    }
}
