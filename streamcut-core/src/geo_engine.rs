//! Geo-backed geometry engine
//!
//! Default `GeometryEngine` implementation on the geo ecosystem: predicates
//! and boolean operations from `geo`, buffering from `geo-buf`, plus the
//! boundary-reshape primitive (split the crossed ring at the first and last
//! crossing of the drawn line and splice the line in).

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::algorithm::orient::{Direction, Orient};
use geo::algorithm::validation::Validation;
use geo::{
    Area, BooleanOps, Contains, Coord, Intersects, Line, LineString, MultiLineString,
    MultiPolygon, Polygon,
};
use geo_buf::buffer_multi_polygon;

use crate::engine::{GeometryEngine, ReshapeError};
use crate::feature::FeatureGeometry;

/// Tolerance for coincident-point deduplication and zero-area tests
const EPSILON: f64 = 1e-9;

/// `GeometryEngine` backed by geo and geo-buf
#[derive(Debug, Clone, Copy, Default)]
pub struct GeoEngine;

impl GeoEngine {
    pub fn new() -> Self {
        Self
    }
}

impl GeometryEngine for GeoEngine {
    fn boundary(&self, geometry: &FeatureGeometry) -> MultiLineString<f64> {
        let mut rings = Vec::new();
        for part in geometry.parts() {
            rings.push(part.exterior().clone());
            rings.extend(part.interiors().iter().cloned());
        }
        MultiLineString::new(rings)
    }

    fn crossings(
        &self,
        boundary: &MultiLineString<f64>,
        probe: &LineString<f64>,
    ) -> Vec<Coord<f64>> {
        let mut points: Vec<Coord<f64>> = Vec::new();
        for ring in &boundary.0 {
            for segment in ring.lines() {
                for probe_segment in probe.lines() {
                    if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                        line_intersection(segment, probe_segment)
                    {
                        if !points.iter().any(|point| coincident(*point, intersection)) {
                            points.push(intersection);
                        }
                    }
                }
            }
        }
        points
    }

    fn ring_area(&self, ring: &LineString<f64>) -> f64 {
        Polygon::new(ring.clone(), Vec::new()).unsigned_area()
    }

    fn contains_ring(&self, polygon: &Polygon<f64>, ring: &LineString<f64>) -> bool {
        polygon.contains(ring)
    }

    fn contains_polygon(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
        a.contains(b)
    }

    fn intersects(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> bool {
        a.intersects(b)
    }

    fn overlap_area(&self, a: &Polygon<f64>, b: &Polygon<f64>) -> f64 {
        if !a.intersects(b) {
            return 0.0;
        }
        a.intersection(b).unsigned_area()
    }

    fn is_valid(&self, geometry: &MultiPolygon<f64>) -> bool {
        geometry.is_valid()
    }

    fn buffer_zero(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        buffer_multi_polygon(geometry, 0.0)
    }

    fn make_valid(&self, geometry: &MultiPolygon<f64>) -> MultiPolygon<f64> {
        // Bounded-effort repair: drop area-less rings, re-orient, self-union
        // each part to renode self-intersections, then dissolve the parts
        // together. Cannot fix every exotic input.
        let mut dissolved: Option<MultiPolygon<f64>> = None;
        for part in &geometry.0 {
            if self.ring_area(part.exterior()) <= EPSILON {
                continue;
            }
            let interiors: Vec<LineString<f64>> = part
                .interiors()
                .iter()
                .filter(|ring| self.ring_area(ring) > EPSILON)
                .cloned()
                .collect();
            let cleaned =
                Polygon::new(part.exterior().clone(), interiors).orient(Direction::Default);
            let renoded = cleaned.union(&cleaned);
            dissolved = Some(match dissolved {
                Some(accumulated) => accumulated.union(&renoded),
                None => renoded,
            });
        }
        dissolved.unwrap_or_else(|| MultiPolygon::new(Vec::new()))
    }

    fn reshape(
        &self,
        polygon: &Polygon<f64>,
        line: &LineString<f64>,
    ) -> Result<Polygon<f64>, ReshapeError> {
        let exterior = polygon.exterior();
        let crossings = ring_crossings(exterior, line);
        if crossings.len() < 2 {
            return Err(ReshapeError::NotEnoughCrossings);
        }
        let first = &crossings[0];
        let last = &crossings[crossings.len() - 1];

        // The drawn section between the outermost crossings replaces one of
        // the two boundary arcs connecting those crossings.
        let section = trim_line(line, first, last);
        let forward = ring_arc(exterior, first, last);
        let backward = ring_arc(exterior, last, first);

        let mut candidates = Vec::new();
        for arc in [backward, reversed(forward)] {
            let ring = splice(&section, &arc);
            let shell = Polygon::new(ring, Vec::new());
            if shell.unsigned_area() <= EPSILON {
                continue;
            }
            candidates.push(rebuild_with_holes(shell, polygon));
        }
        if candidates.is_empty() {
            return Err(ReshapeError::NoCandidate);
        }

        // Prefer valid candidates; the repair chain downstream handles the
        // rest. The larger-area candidate wins: a corner cut keeps the body
        // and loses the corner, an outside bulge grows the body.
        let valid: Vec<Polygon<f64>> = candidates
            .iter()
            .filter(|candidate| candidate.is_valid())
            .cloned()
            .collect();
        let pool = if valid.is_empty() { candidates } else { valid };
        pool.into_iter()
            .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .ok_or(ReshapeError::NoCandidate)
    }
}

/// A boundary crossing located on both the ring and the drawn line
#[derive(Debug, Clone, Copy)]
struct Crossing {
    point: Coord<f64>,
    /// Segment index and parameter along the drawn line
    line_seg: usize,
    line_t: f64,
    /// Segment index and parameter along the ring
    ring_seg: usize,
    ring_t: f64,
}

impl Crossing {
    fn line_position(&self) -> f64 {
        self.line_seg as f64 + self.line_t
    }
}

fn coincident(a: Coord<f64>, b: Coord<f64>) -> bool {
    (a.x - b.x).abs() <= EPSILON && (a.y - b.y).abs() <= EPSILON
}

fn reversed(mut arc: Vec<Coord<f64>>) -> Vec<Coord<f64>> {
    arc.reverse();
    arc
}

/// Parameter of `point` along `segment`, assuming the point lies on it
fn segment_param(segment: Line<f64>, point: Coord<f64>) -> f64 {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    let length_sq = dx * dx + dy * dy;
    if length_sq == 0.0 {
        return 0.0;
    }
    ((point.x - segment.start.x) * dx + (point.y - segment.start.y) * dy) / length_sq
}

/// All crossings of `line` with `ring`, ordered along the line
fn ring_crossings(ring: &LineString<f64>, line: &LineString<f64>) -> Vec<Crossing> {
    let mut crossings: Vec<Crossing> = Vec::new();
    for (ring_seg, ring_segment) in ring.lines().enumerate() {
        for (line_seg, line_segment) in line.lines().enumerate() {
            if let Some(LineIntersection::SinglePoint { intersection, .. }) =
                line_intersection(ring_segment, line_segment)
            {
                // A crossing at a shared ring vertex shows up once per
                // adjacent segment; keep the first occurrence only.
                if crossings
                    .iter()
                    .any(|crossing| coincident(crossing.point, intersection))
                {
                    continue;
                }
                crossings.push(Crossing {
                    point: intersection,
                    line_seg,
                    line_t: segment_param(line_segment, intersection),
                    ring_seg,
                    ring_t: segment_param(ring_segment, intersection),
                });
            }
        }
    }
    crossings.sort_by(|a, b| a.line_position().total_cmp(&b.line_position()));
    crossings
}

/// Drawn-line coordinates between two crossings, crossing points included
fn trim_line(line: &LineString<f64>, first: &Crossing, last: &Crossing) -> Vec<Coord<f64>> {
    let start = first.line_position();
    let end = last.line_position();
    let mut section = vec![first.point];
    for (index, &coord) in line.0.iter().enumerate() {
        let position = index as f64;
        if position > start + EPSILON && position < end - EPSILON {
            section.push(coord);
        }
    }
    section.push(last.point);
    section
}

/// Ring vertices strictly between two crossings, walking the ring forward
/// from `from` to `to`
fn ring_arc(ring: &LineString<f64>, from: &Crossing, to: &Crossing) -> Vec<Coord<f64>> {
    let coords = &ring.0;
    let segments = coords.len() - 1;
    let n = segments as f64;
    let start = from.ring_seg as f64 + from.ring_t;
    let end = to.ring_seg as f64 + to.ring_t;
    let span = ((end - start) % n + n) % n;

    let mut arc = Vec::new();
    for step in 1..=segments {
        let index = (from.ring_seg + step) % segments;
        let offset = ((index as f64 - start) % n + n) % n;
        if offset >= span - EPSILON {
            break;
        }
        if offset > EPSILON {
            arc.push(coords[index]);
        }
    }
    arc
}

/// Close the drawn section against a boundary arc into a candidate ring
fn splice(section: &[Coord<f64>], arc: &[Coord<f64>]) -> LineString<f64> {
    let mut coords = section.to_vec();
    coords.extend_from_slice(arc);
    if coords.first() != coords.last() {
        let first = coords[0];
        coords.push(first);
    }
    LineString::new(coords)
}

/// Carry the original holes into the reshaped shell where they still fit
fn rebuild_with_holes(shell: Polygon<f64>, original: &Polygon<f64>) -> Polygon<f64> {
    let mut interiors = Vec::new();
    for hole in original.interiors() {
        if shell.contains(hole) {
            interiors.push(hole.clone());
        } else {
            log::warn!("dropping hole left outside the reshaped boundary");
        }
    }
    Polygon::new(shell.exterior().clone(), interiors)
}
