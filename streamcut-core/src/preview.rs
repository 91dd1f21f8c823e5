//! Render-surface preview
//!
//! Derives the rubber-band overlays from the in-progress stream: the open
//! drawn line, the implied closed polygon including the live cursor, and
//! the points where the line crosses the target feature's boundary. Purely
//! observational; nothing here feeds back into core state.

use geo::{Coord, LineString};
use kurbo::{BezPath, Point};

use crate::engine::GeometryEngine;
use crate::feature::FeatureGeometry;
use crate::tool::ToolMode;
use crate::vertex_stream::VertexStream;

/// Overlay geometry for the host renderer
#[derive(Debug, Clone)]
pub struct Preview {
    /// The drawn line as captured so far
    pub line: BezPath,
    /// The implied closed polygon, live cursor included
    pub closed: Option<BezPath>,
    /// Boundary-crossing points of the in-progress line
    pub crossings: Vec<Point>,
}

/// Build the preview for the current stream state
pub fn build_preview(
    stream: &VertexStream,
    mode: ToolMode,
    target: Option<&FeatureGeometry>,
    engine: &dyn GeometryEngine,
) -> Preview {
    let points = stream.points();
    let mut preview = Preview {
        line: polyline(points),
        closed: None,
        crossings: Vec::new(),
    };

    if let Some(cursor) = stream.cursor() {
        let mut outline: Vec<Point> = points.to_vec();
        outline.push(cursor);
        if outline.len() >= 2 {
            if outline.first() != outline.last() {
                outline.push(outline[0]);
            }
            preview.closed = Some(polyline(&outline));
        }
    }

    if mode == ToolMode::Reshape && points.len() >= 2 {
        if let Some(target) = target {
            let probe = LineString::new(
                points
                    .iter()
                    .map(|point| Coord {
                        x: point.x,
                        y: point.y,
                    })
                    .collect(),
            );
            preview.crossings = engine
                .crossings(&engine.boundary(target), &probe)
                .into_iter()
                .map(|coord| Point::new(coord.x, coord.y))
                .collect();
        }
    }

    preview
}

fn polyline(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(&first) = iter.next() {
        path.move_to(first);
        for &point in iter {
            path.line_to(point);
        }
    }
    path
}
