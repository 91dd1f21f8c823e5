//! Edit applier
//!
//! Executes a topology decision against the target geometry, producing a
//! replacement candidate. The candidate always passes through the validity
//! repair chain before anything is written; the applier itself never
//! mutates the target in place.

use geo::{MultiPolygon, Polygon};

use crate::classify::{RingIndex, RingRef, TopologyDecision};
use crate::engine::GeometryEngine;
use crate::error::EditError;
use crate::feature::FeatureGeometry;
use crate::ring::DrawnRing;

/// Apply `decision` to `target`, returning the raw replacement candidate
pub fn apply_decision(
    decision: &TopologyDecision,
    target: &FeatureGeometry,
    drawn: &DrawnRing,
    engine: &dyn GeometryEngine,
) -> Result<FeatureGeometry, EditError> {
    match decision {
        TopologyDecision::RemoveContained { rings } => remove_contained(target, rings),
        TopologyDecision::AddPart => Ok(add_part(target, drawn)),
        TopologyDecision::AddHole { part } => add_hole(target, drawn, *part),
        TopologyDecision::Reshape { part } => reshape_part(target, drawn, *part, engine),
    }
}

/// Rebuild every part, keeping only rings not flagged for removal
fn remove_contained(
    target: &FeatureGeometry,
    rings: &[RingRef],
) -> Result<FeatureGeometry, EditError> {
    let mut parts = Vec::new();
    for (part_index, part) in target.parts().iter().enumerate() {
        let part_removed = rings
            .iter()
            .any(|flagged| flagged.part == part_index && flagged.ring == RingIndex::Exterior);
        if part_removed {
            continue;
        }
        let interiors: Vec<_> = part
            .interiors()
            .iter()
            .enumerate()
            .filter(|(ring_index, _)| {
                !rings.iter().any(|flagged| {
                    flagged.part == part_index && flagged.ring == RingIndex::Interior(*ring_index)
                })
            })
            .map(|(_, ring)| ring.clone())
            .collect();
        parts.push(Polygon::new(part.exterior().clone(), interiors));
    }
    FeatureGeometry::from_parts(parts)
}

/// Append the drawn ring as a new hole-free part, promoting to multi
fn add_part(target: &FeatureGeometry, drawn: &DrawnRing) -> FeatureGeometry {
    let mut parts: Vec<Polygon<f64>> = target.parts().to_vec();
    parts.push(Polygon::new(drawn.ring().clone(), Vec::new()));
    FeatureGeometry::Multi(MultiPolygon::new(parts))
}

/// Append the drawn ring to the identified part's interiors
fn add_hole(
    target: &FeatureGeometry,
    drawn: &DrawnRing,
    part: usize,
) -> Result<FeatureGeometry, EditError> {
    let mut parts: Vec<Polygon<f64>> = target.parts().to_vec();
    let Some(host) = parts.get_mut(part) else {
        return Err(EditError::AmbiguousPart { candidates: 0 });
    };
    let mut interiors: Vec<_> = host.interiors().to_vec();
    interiors.push(drawn.ring().clone());
    *host = Polygon::new(host.exterior().clone(), interiors);
    Ok(rebuild(target, parts))
}

/// Reshape the identified part's boundary with the drawn line
fn reshape_part(
    target: &FeatureGeometry,
    drawn: &DrawnRing,
    part: usize,
    engine: &dyn GeometryEngine,
) -> Result<FeatureGeometry, EditError> {
    let mut parts: Vec<Polygon<f64>> = target.parts().to_vec();
    let Some(host) = parts.get_mut(part) else {
        return Err(EditError::ReshapeNotApplicable);
    };
    let reshaped = engine
        .reshape(host, drawn.reshape_line())
        .map_err(|error| {
            log::warn!("reshape primitive failed: {:?}", error);
            EditError::ReshapeNotApplicable
        })?;
    *host = reshaped;
    Ok(rebuild(target, parts))
}

/// Repackage edited parts, preserving the target's single/multi form
fn rebuild(target: &FeatureGeometry, mut parts: Vec<Polygon<f64>>) -> FeatureGeometry {
    if target.is_multi() || parts.len() > 1 {
        FeatureGeometry::Multi(MultiPolygon::new(parts))
    } else {
        FeatureGeometry::Single(parts.remove(0))
    }
}
