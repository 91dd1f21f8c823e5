//! Topology classifier
//!
//! Given the drawn ring and the target feature's geometry, decides which
//! topological edit applies. The priority order is a deliberate tie-break
//! policy, not incidental: containment removal, then disjoint new part,
//! then new hole, then boundary reshape as the fallback.

use serde::{Deserialize, Serialize};

use crate::engine::GeometryEngine;
use crate::error::EditError;
use crate::feature::FeatureGeometry;
use crate::ring::DrawnRing;
use crate::tool::ToolMode;

/// Minimum intersection area treated as a real part overlap
const OVERLAP_EPSILON: f64 = 1e-9;

/// Which ring of a part a removal addresses
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RingIndex {
    /// The part's exterior ring; removing it removes the whole part
    Exterior,
    /// An interior ring (hole) by storage index
    Interior(usize),
}

/// Address of one ring inside a possibly multi-part geometry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingRef {
    /// Part index in storage order
    pub part: usize,
    /// Ring within the part
    pub ring: RingIndex,
}

/// The topological edit a finish gesture maps to
///
/// Produced once per gesture and consumed exactly once by the applier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TopologyDecision {
    /// Delete the addressed rings: holes vanish, exteriors take their whole
    /// part with them
    RemoveContained { rings: Vec<RingRef> },
    /// Replace a boundary section of one part with the drawn line
    Reshape { part: usize },
    /// Append the drawn ring as a new disjoint part
    AddPart,
    /// Carve the drawn ring as a hole into one part
    AddHole { part: usize },
}

/// Classifier output
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Classification {
    /// The decided edit
    Edit(TopologyDecision),
    /// Draw mode creates standalone features and bypasses classification
    NotApplicable,
}

/// Decide the topological edit for `drawn` against `target`
///
/// Containment tests run part-by-part and ring-by-ring in storage order;
/// the first match is authoritative. Targets with overlapping parts violate
/// the input contract and are flagged before classification proceeds.
pub fn classify(
    drawn: &DrawnRing,
    target: &FeatureGeometry,
    mode: ToolMode,
    engine: &dyn GeometryEngine,
) -> Result<Classification, EditError> {
    if mode == ToolMode::Draw {
        return Ok(Classification::NotApplicable);
    }

    flag_overlapping_parts(target, engine);

    // 1. Containment removal. A removal is never combined with any other
    //    edit in the same gesture.
    let mut removed = Vec::new();
    for (part_index, part) in target.parts().iter().enumerate() {
        if engine.contains_ring(drawn.polygon(), part.exterior()) {
            removed.push(RingRef {
                part: part_index,
                ring: RingIndex::Exterior,
            });
            // The whole part goes; its holes go with it
            continue;
        }
        for (ring_index, interior) in part.interiors().iter().enumerate() {
            if engine.contains_ring(drawn.polygon(), interior) {
                removed.push(RingRef {
                    part: part_index,
                    ring: RingIndex::Interior(ring_index),
                });
            }
        }
    }
    if !removed.is_empty() {
        return Ok(Classification::Edit(TopologyDecision::RemoveContained {
            rings: removed,
        }));
    }

    // 2. Disjoint new part: neither intersecting nor circumventing (a
    //    circumvented ring would have triggered removal above).
    let crossed_parts: Vec<usize> = target
        .parts()
        .iter()
        .enumerate()
        .filter(|(_, part)| engine.intersects(part, drawn.polygon()))
        .map(|(index, _)| index)
        .collect();
    if crossed_parts.is_empty() {
        return Ok(Classification::Edit(TopologyDecision::AddPart));
    }

    // 3. New hole: some part fully contains the drawn ring
    let containing: Vec<usize> = target
        .parts()
        .iter()
        .enumerate()
        .filter(|(_, part)| engine.contains_polygon(part, drawn.polygon()))
        .map(|(index, _)| index)
        .collect();
    match containing.len() {
        0 => {}
        1 => {
            return Ok(Classification::Edit(TopologyDecision::AddHole {
                part: containing[0],
            }))
        }
        candidates => return Err(EditError::AmbiguousPart { candidates }),
    }

    // 4. Boundary reshape: the drawn line crosses the boundary of the first
    //    intersecting part in storage order
    Ok(Classification::Edit(TopologyDecision::Reshape {
        part: crossed_parts[0],
    }))
}

/// Warn about targets that violate the no-overlapping-parts precondition
fn flag_overlapping_parts(target: &FeatureGeometry, engine: &dyn GeometryEngine) {
    let parts = target.parts();
    for i in 0..parts.len() {
        for j in (i + 1)..parts.len() {
            if engine.overlap_area(&parts[i], &parts[j]) > OVERLAP_EPSILON {
                log::warn!(
                    "target parts {} and {} overlap; classification follows storage order",
                    i,
                    j
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_engine::GeoEngine;
    use geo::{Coord, LineString, MultiPolygon, Polygon};
    use kurbo::Point;

    fn square(min: f64, max: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::new(vec![
                Coord { x: min, y: min },
                Coord { x: max, y: min },
                Coord { x: max, y: max },
                Coord { x: min, y: max },
                Coord { x: min, y: min },
            ]),
            Vec::new(),
        )
    }

    fn square_points(min: f64, max: f64) -> Vec<Point> {
        vec![
            Point::new(min, min),
            Point::new(max, min),
            Point::new(max, max),
            Point::new(min, max),
        ]
    }

    fn drawn(points: &[Point]) -> DrawnRing {
        DrawnRing::close(points, ToolMode::Reshape, &GeoEngine::new()).unwrap()
    }

    fn square_with_hole() -> FeatureGeometry {
        FeatureGeometry::Single(Polygon::new(
            square(0.0, 10.0).exterior().clone(),
            vec![square(4.0, 6.0).exterior().clone()],
        ))
    }

    fn decision(classification: Classification) -> TopologyDecision {
        match classification {
            Classification::Edit(decision) => decision,
            Classification::NotApplicable => panic!("expected an edit decision"),
        }
    }

    #[test]
    fn test_ring_containing_a_hole_removes_it() {
        let engine = GeoEngine::new();
        let target = square_with_hole();
        let ring = drawn(&square_points(3.0, 7.0));

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(
            result,
            TopologyDecision::RemoveContained {
                rings: vec![RingRef {
                    part: 0,
                    ring: RingIndex::Interior(0)
                }],
            }
        );
    }

    #[test]
    fn test_removal_outranks_reshape() {
        let engine = GeoEngine::new();
        let target = square_with_hole();
        // Contains the hole AND crosses the exterior boundary at x = 10
        let ring = drawn(&[
            Point::new(3.0, 3.0),
            Point::new(12.0, 3.0),
            Point::new(12.0, 7.0),
            Point::new(3.0, 7.0),
        ]);

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert!(matches!(result, TopologyDecision::RemoveContained { .. }));
    }

    #[test]
    fn test_ring_containing_a_part_removes_the_part() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Multi(MultiPolygon::new(vec![
            square(0.0, 10.0),
            square(20.0, 25.0),
        ]));
        let ring = drawn(&square_points(19.0, 26.0));

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(
            result,
            TopologyDecision::RemoveContained {
                rings: vec![RingRef {
                    part: 1,
                    ring: RingIndex::Exterior
                }],
            }
        );
    }

    #[test]
    fn test_disjoint_ring_adds_a_part() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Single(square(0.0, 10.0));
        let ring = drawn(&square_points(20.0, 25.0));

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(result, TopologyDecision::AddPart);
    }

    #[test]
    fn test_contained_ring_adds_a_hole() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Single(square(0.0, 10.0));
        let ring = drawn(&square_points(4.0, 6.0));

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(result, TopologyDecision::AddHole { part: 0 });
    }

    #[test]
    fn test_hole_resolves_the_containing_part() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Multi(MultiPolygon::new(vec![
            square(0.0, 10.0),
            square(20.0, 40.0),
        ]));
        let ring = drawn(&square_points(25.0, 30.0));

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(result, TopologyDecision::AddHole { part: 1 });
    }

    #[test]
    fn test_crossing_line_reshapes() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Single(square(0.0, 10.0));
        let ring = drawn(&[Point::new(-2.0, 3.0), Point::new(12.0, 3.0)]);

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(result, TopologyDecision::Reshape { part: 0 });
    }

    #[test]
    fn test_reshape_resolves_the_crossed_part() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Multi(MultiPolygon::new(vec![
            square(0.0, 10.0),
            square(20.0, 30.0),
        ]));
        let ring = drawn(&[Point::new(19.0, 25.0), Point::new(31.0, 25.0)]);

        let result = decision(classify(&ring, &target, ToolMode::Reshape, &engine).unwrap());
        assert_eq!(result, TopologyDecision::Reshape { part: 1 });
    }

    #[test]
    fn test_overlapping_parts_make_holes_ambiguous() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Multi(MultiPolygon::new(vec![
            square(0.0, 10.0),
            square(0.0, 10.0),
        ]));
        let ring = drawn(&square_points(4.0, 6.0));

        assert_eq!(
            classify(&ring, &target, ToolMode::Reshape, &engine),
            Err(EditError::AmbiguousPart { candidates: 2 })
        );
    }

    #[test]
    fn test_draw_mode_is_not_classified() {
        let engine = GeoEngine::new();
        let target = FeatureGeometry::Single(square(0.0, 10.0));
        let ring = drawn(&square_points(4.0, 6.0));

        assert_eq!(
            classify(&ring, &target, ToolMode::Draw, &engine).unwrap(),
            Classification::NotApplicable
        );
    }
}
