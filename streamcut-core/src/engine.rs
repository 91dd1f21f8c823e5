//! Geometry engine boundary
//!
//! The core never implements computational-geometry primitives itself; it
//! drives them through this trait. All operations are pure and synchronous,
//! and collaborators are passed in per call rather than stored.

use geo::{Coord, LineString, MultiLineString, MultiPolygon, Polygon};

use crate::feature::FeatureGeometry;

/// Failure modes of the boundary-reshape primitive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReshapeError {
    /// The reshape line crosses the boundary fewer than two times
    NotEnoughCrossings,
    /// No spliced candidate produced a usable ring
    NoCandidate,
}

/// Exact-precision 2D operations consumed by the digitizing core
pub trait GeometryEngine {
    /// Boundary rings of a geometry, exteriors and holes alike
    fn boundary(&self, geometry: &FeatureGeometry) -> MultiLineString<f64>;

    /// Points where `probe` crosses any ring of `boundary`
    fn crossings(
        &self,
        boundary: &MultiLineString<f64>,
        probe: &LineString<f64>,
    ) -> Vec<Coord<f64>>;

    /// Absolute area enclosed by a closed ring
    fn ring_area(&self, ring: &LineString<f64>) -> f64;

    /// Whether `polygon` contains the closed ring `ring`
    fn contains_ring(&self, polygon: &Polygon<f64>, ring: &LineString<f64>) -> bool;

    /// Whether `a` contains `b`
    fn contains_polygon(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> bool;

    /// Whether `a` and `b` share any point
    fn intersects(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> bool;

    /// Area of the set intersection of two polygons
    fn overlap_area(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> f64;

    /// Simple-feature validity test
    fn is_valid(&self, geometry: &MultiPolygon<f64>) -> bool;

    /// Zero-distance buffer: dissolves self-overlaps without moving edges
    fn buffer_zero(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64>;

    /// Generic validity repair
    fn make_valid(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64>;

    /// Replace the boundary section between the first and last crossing of
    /// `line` with the line itself
    fn reshape(
        &self,
        polygon: &Polygon<f64>,
        line: &LineString<f64>,
    ) -> Result<Polygon<f64>, ReshapeError>;
}
