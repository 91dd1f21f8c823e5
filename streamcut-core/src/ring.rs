//! Ring builder
//!
//! Closes an open vertex sequence into a drawn-polygon candidate, rejecting
//! degenerate input. This is also the seam where map-space input points
//! become topology-space coordinates.

use geo::{Coord, LineString, Polygon};
use kurbo::Point;

use crate::engine::GeometryEngine;
use crate::error::EditError;
use crate::tool::ToolMode;

/// Minimum enclosed area for a freestanding drawn ring
const MIN_RING_AREA: f64 = 1e-9;

/// The drawn line closed into a polygon candidate
///
/// Immutable once built. The open line drives boundary reshapes; the closed
/// polygon drives containment and intersection classification.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawnRing {
    line: LineString<f64>,
    polygon: Polygon<f64>,
}

impl DrawnRing {
    /// Close `points` into a ring candidate for the given mode
    ///
    /// A reshape line needs at least 2 points; a freestanding outline needs
    /// at least 3 distinct points and must enclose area.
    pub fn close(
        points: &[Point],
        mode: ToolMode,
        engine: &dyn GeometryEngine,
    ) -> Result<Self, EditError> {
        let required = match mode {
            ToolMode::Reshape => 2,
            ToolMode::Draw => 3,
        };
        if points.len() < required {
            return Err(EditError::InsufficientVertices {
                required,
                actual: points.len(),
            });
        }

        let coords: Vec<Coord<f64>> = points
            .iter()
            .map(|point| Coord {
                x: point.x,
                y: point.y,
            })
            .collect();
        let line = LineString::new(coords.clone());

        let mut ring_coords = coords;
        if ring_coords.first() != ring_coords.last() {
            let first = ring_coords[0];
            ring_coords.push(first);
        }
        let ring = LineString::new(ring_coords);

        if mode == ToolMode::Draw {
            let distinct = distinct_vertex_count(&ring);
            if distinct < 3 {
                return Err(EditError::InsufficientVertices {
                    required: 3,
                    actual: distinct,
                });
            }
            if engine.ring_area(&ring) <= MIN_RING_AREA {
                return Err(EditError::DegenerateRing);
            }
        }

        Ok(Self {
            line,
            polygon: Polygon::new(ring, Vec::new()),
        })
    }

    /// The open drawn line, as captured
    pub fn reshape_line(&self) -> &LineString<f64> {
        &self.line
    }

    /// The closed candidate polygon
    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    /// The closed exterior ring
    pub fn ring(&self) -> &LineString<f64> {
        self.polygon.exterior()
    }
}

/// Number of distinct vertices on a ring, counting the closure vertex once
pub fn distinct_vertex_count(ring: &LineString<f64>) -> usize {
    let coords = &ring.0;
    if coords.is_empty() {
        return 0;
    }
    let mut slice = &coords[..];
    if coords.len() > 1 && coords.first() == coords.last() {
        slice = &coords[..coords.len() - 1];
    }
    let mut count = 0;
    let mut previous: Option<Coord<f64>> = None;
    for &coord in slice {
        if previous != Some(coord) {
            count += 1;
        }
        previous = Some(coord);
    }
    count
}
