//! Validity repair chain
//!
//! Reshape and part-addition edits can legally produce self-touching or
//! overlapping results that are sound in intent but not simple-feature
//! valid. The chain is a bounded best-effort recovery: zero-distance
//! buffer, then a generic repair, then give up. Exactly two repair
//! attempts, never a loop.

use geo::MultiPolygon;

use crate::engine::GeometryEngine;
use crate::error::EditError;
use crate::feature::FeatureGeometry;

/// Validate `candidate`, repairing it if needed
///
/// Already-valid geometry is returned unchanged, so running the chain twice
/// is a no-op.
pub fn ensure_valid(
    candidate: FeatureGeometry,
    engine: &dyn GeometryEngine,
) -> Result<FeatureGeometry, EditError> {
    let multi = candidate.to_multi();
    if engine.is_valid(&multi) {
        return Ok(candidate);
    }

    log::info!("edit produced invalid geometry; trying a zero-distance buffer");
    let buffered = engine.buffer_zero(&multi);
    if engine.is_valid(&buffered) {
        return Ok(repackage(&candidate, buffered));
    }

    log::info!("zero-distance buffer did not help; trying a generic repair");
    let repaired = engine.make_valid(&multi);
    if engine.is_valid(&repaired) {
        return Ok(repackage(&candidate, repaired));
    }

    log::warn!("geometry is unrepairable; abandoning the edit");
    Err(EditError::UnrepairableGeometry)
}

/// Keep the candidate's single/multi form where the repaired part count
/// still allows it
fn repackage(original: &FeatureGeometry, repaired: MultiPolygon<f64>) -> FeatureGeometry {
    if !original.is_multi() && repaired.0.len() == 1 {
        let mut parts = repaired.0;
        FeatureGeometry::Single(parts.remove(0))
    } else {
        FeatureGeometry::Multi(repaired)
    }
}
