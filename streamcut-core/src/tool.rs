//! Digitizing state machine
//!
//! The top-level controller: owns the vertex stream, mode and config, and
//! sequences ring building, classification, edit application and the store
//! write for each finish gesture. Collaborators are passed in per call and
//! never stored, so every gesture's intermediate data is an explicit value
//! moving between stages.

use std::collections::BTreeMap;

use kurbo::Point;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::apply::apply_decision;
use crate::classify::{classify, Classification, TopologyDecision};
use crate::config::DigitizeConfig;
use crate::engine::GeometryEngine;
use crate::error::EditError;
use crate::feature::{Feature, FeatureGeometry};
use crate::preview::{build_preview, Preview};
use crate::repair::ensure_valid;
use crate::ring::DrawnRing;
use crate::store::FeatureStore;
use crate::vertex_stream::VertexStream;

/// Digitizing modes
///
/// Orthogonal to the gesture state: the mode may change at any time,
/// including mid-stream, and takes effect on the next acquisition call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolMode {
    /// Edit the selected feature's topology
    Reshape,
    /// Draw a freestanding outline as a new feature
    Draw,
}

/// Gesture states of the digitizing tool
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ToolState {
    /// No active line
    #[default]
    Idle,
    /// At least one vertex captured
    Streaming,
}

/// Discrete input events advancing the state machine
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ToolEvent {
    /// Primary button press at a map-space point
    Press(Point),
    /// Secondary button press: appends the point, then finishes
    SecondaryPress(Point),
    /// Cursor motion
    Move(Point),
    /// Manual vertex append from the tracked cursor
    AddVertex,
    /// Close the gesture and run the edit pipeline
    Finish,
    /// Discard the in-progress line
    Cancel,
}

/// Successful outcomes of a finish gesture
#[derive(Clone, Debug, PartialEq)]
pub enum FinishOutcome {
    /// Draw mode added a standalone feature
    FeatureAdded(Uuid),
    /// Reshape mode replaced a feature's geometry
    GeometryChanged {
        fid: Uuid,
        decision: TopologyDecision,
    },
}

/// What an event did, for hosts that need to react
#[derive(Clone, Debug, PartialEq)]
pub enum EventOutcome {
    /// State advanced; nothing to report
    Continued,
    /// A finish gesture ran successfully
    Finished(FinishOutcome),
    /// Cancel arrived while idle: the host may exit the tool
    ExitRequested,
}

/// The digitizing tool: an explicit state value advanced by input events
///
/// One instance per map view; instances share nothing.
#[derive(Debug, Clone)]
pub struct DigitizeTool {
    config: DigitizeConfig,
    mode: ToolMode,
    state: ToolState,
    stream: VertexStream,
}

impl DigitizeTool {
    pub fn new(config: DigitizeConfig) -> Self {
        Self {
            config,
            mode: ToolMode::Reshape,
            state: ToolState::Idle,
            stream: VertexStream::new(),
        }
    }

    pub fn state(&self) -> ToolState {
        self.state
    }

    pub fn mode(&self) -> ToolMode {
        self.mode
    }

    pub fn config(&self) -> &DigitizeConfig {
        &self.config
    }

    pub fn stream(&self) -> &VertexStream {
        &self.stream
    }

    /// Activate the tool: reset transient state and check the reshape
    /// selection precondition up front
    pub fn activate(&mut self, store: &dyn FeatureStore) -> Result<(), EditError> {
        self.reset();
        if self.mode == ToolMode::Reshape {
            let selected = store.selected_features().len();
            if selected != 1 {
                log::warn!(
                    "select exactly one polygon feature to reshape ({} selected)",
                    selected
                );
                return Err(EditError::NoSelection { selected });
            }
        }
        Ok(())
    }

    /// Deactivate the tool, discarding any in-progress line
    pub fn deactivate(&mut self) {
        self.reset();
    }

    /// Toggle automatic stream acquisition
    pub fn toggle_stream(&mut self) {
        self.config.stream_enabled = !self.config.stream_enabled;
        if self.config.stream_enabled {
            log::info!(
                "stream acquisition on: a vertex every {} map units",
                self.config.stream_tolerance
            );
        } else {
            log::info!("stream acquisition off: append vertices manually");
        }
    }

    /// Toggle between reshape and draw mode
    pub fn toggle_mode(&mut self) {
        self.set_mode(match self.mode {
            ToolMode::Reshape => ToolMode::Draw,
            ToolMode::Draw => ToolMode::Reshape,
        });
    }

    pub fn set_mode(&mut self, mode: ToolMode) {
        self.mode = mode;
        log::info!("digitizing mode: {:?}", self.mode);
    }

    /// Advance the state machine by one input event
    pub fn handle_event(
        &mut self,
        event: ToolEvent,
        engine: &dyn GeometryEngine,
        store: &mut dyn FeatureStore,
    ) -> Result<EventOutcome, EditError> {
        match event {
            ToolEvent::Press(point) => {
                self.press(point);
                Ok(EventOutcome::Continued)
            }
            ToolEvent::Move(point) => {
                self.cursor_moved(point);
                Ok(EventOutcome::Continued)
            }
            ToolEvent::AddVertex => {
                self.add_vertex_from_cursor();
                Ok(EventOutcome::Continued)
            }
            ToolEvent::SecondaryPress(point) => {
                self.press(point);
                Ok(EventOutcome::Finished(self.finish(engine, store)?))
            }
            ToolEvent::Finish => Ok(EventOutcome::Finished(self.finish(engine, store)?)),
            ToolEvent::Cancel => Ok(self.cancel()),
        }
    }

    /// Record a primary press
    pub fn press(&mut self, point: Point) {
        self.stream.press(point);
        self.state = ToolState::Streaming;
    }

    /// Record cursor motion
    pub fn cursor_moved(&mut self, point: Point) {
        self.stream.cursor_moved(point, &self.config);
    }

    /// Manually append the tracked cursor position
    pub fn add_vertex_from_cursor(&mut self) {
        self.stream.add_from_cursor();
    }

    /// Discard the in-progress line; while idle, request tool exit instead
    pub fn cancel(&mut self) -> EventOutcome {
        if self.state == ToolState::Idle {
            log::info!("no line in progress; requesting tool exit");
            return EventOutcome::ExitRequested;
        }
        log::info!("drawing canceled");
        self.reset();
        EventOutcome::Continued
    }

    /// Compute the render-surface preview for the current state
    pub fn preview(&self, engine: &dyn GeometryEngine, store: &dyn FeatureStore) -> Preview {
        let target = match self.mode {
            ToolMode::Reshape => single_selection(store).map(|feature| feature.geometry),
            ToolMode::Draw => None,
        };
        build_preview(&self.stream, self.mode, target.as_ref(), engine)
    }

    /// Run the finish gesture: close the line, classify, apply, validate,
    /// write. The drawn sequence is cleared whatever the outcome, so a
    /// failed finish never leaves a dangling line.
    pub fn finish(
        &mut self,
        engine: &dyn GeometryEngine,
        store: &mut dyn FeatureStore,
    ) -> Result<FinishOutcome, EditError> {
        let result = self.finish_inner(engine, store);
        self.reset();
        if let Err(error) = &result {
            log::warn!("finish gesture failed: {}", error);
        }
        result
    }

    fn finish_inner(
        &mut self,
        engine: &dyn GeometryEngine,
        store: &mut dyn FeatureStore,
    ) -> Result<FinishOutcome, EditError> {
        if self.state != ToolState::Streaming || self.stream.len() < 2 {
            return Err(EditError::InsufficientVertices {
                required: 2,
                actual: self.stream.len(),
            });
        }

        store.begin_edit_command("Stream edit");
        let result = self.run_edit(engine, store);
        match &result {
            Ok(FinishOutcome::FeatureAdded(_)) => {
                store.commit_edit_command();
                log::info!("polygon feature added");
            }
            Ok(FinishOutcome::GeometryChanged { decision, .. }) => {
                store.commit_edit_command();
                log::info!("polygon edited: {:?}", decision);
            }
            Err(_) => store.abandon_edit_command(),
        }
        result
    }

    fn run_edit(
        &self,
        engine: &dyn GeometryEngine,
        store: &mut dyn FeatureStore,
    ) -> Result<FinishOutcome, EditError> {
        match self.mode {
            ToolMode::Draw => {
                let drawn = DrawnRing::close(self.stream.points(), ToolMode::Draw, engine)?;
                let geometry =
                    ensure_valid(FeatureGeometry::Single(drawn.polygon().clone()), engine)?;
                let fid = store
                    .add_feature(geometry, BTreeMap::new())
                    .map_err(|error| EditError::StoreWriteFailed(error.to_string()))?;
                Ok(FinishOutcome::FeatureAdded(fid))
            }
            ToolMode::Reshape => {
                let selected = store.selected_features();
                if selected.len() != 1 {
                    return Err(EditError::NoSelection {
                        selected: selected.len(),
                    });
                }
                let feature = &selected[0];
                let target = &feature.geometry;

                if !engine.is_valid(&target.to_multi()) {
                    log::warn!("target geometry is invalid; classification may be unreliable");
                }

                let drawn = DrawnRing::close(self.stream.points(), ToolMode::Reshape, engine)?;
                let decision = match classify(&drawn, target, self.mode, engine)? {
                    Classification::Edit(decision) => decision,
                    // classify only reports this in draw mode, which never
                    // reaches here
                    Classification::NotApplicable => return Err(EditError::ReshapeNotApplicable),
                };

                let candidate = apply_decision(&decision, target, &drawn, engine)?;
                let validated = ensure_valid(candidate, engine)?;
                store
                    .change_geometry(feature.id, validated)
                    .map_err(|error| EditError::StoreWriteFailed(error.to_string()))?;
                Ok(FinishOutcome::GeometryChanged {
                    fid: feature.id,
                    decision,
                })
            }
        }
    }

    fn reset(&mut self) {
        self.stream.begin();
        self.state = ToolState::Idle;
    }
}

impl Default for DigitizeTool {
    fn default() -> Self {
        Self::new(DigitizeConfig::default())
    }
}

fn single_selection(store: &dyn FeatureStore) -> Option<Feature> {
    let mut selected = store.selected_features();
    if selected.len() == 1 {
        Some(selected.remove(0))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_engine::GeoEngine;
    use crate::store::{MemoryStore, StoreError};
    use geo::{Area, Coord, LineString, Polygon};

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

    fn store_with_square() -> (MemoryStore, Uuid) {
        let mut store = MemoryStore::new();
        let id = store.insert(Feature::new(
            FeatureGeometry::Single(square(0.0, 10.0)),
            BTreeMap::new(),
        ));
        store.select(&[id]);
        (store, id)
    }

    #[test]
    fn test_reshape_gesture_end_to_end() {
        let engine = GeoEngine::new();
        let (mut store, id) = store_with_square();
        let mut tool = DigitizeTool::default();
        tool.activate(&store).unwrap();

        tool.press(Point::new(-2.0, 3.0));
        tool.press(Point::new(12.0, 3.0));
        let outcome = tool.finish(&engine, &mut store).unwrap();

        match outcome {
            FinishOutcome::GeometryChanged { fid, decision } => {
                assert_eq!(fid, id);
                assert_eq!(decision, TopologyDecision::Reshape { part: 0 });
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        // The band below y = 3 was cut away
        let edited = store.feature(id).unwrap().geometry.to_multi();
        assert!((edited.unsigned_area() - 70.0).abs() < 1e-6);

        assert_eq!(tool.state(), ToolState::Idle);
        assert!(tool.stream().is_empty());
    }

    #[test]
    fn test_draw_gesture_adds_a_feature() {
        let engine = GeoEngine::new();
        let mut store = MemoryStore::new();
        let mut tool = DigitizeTool::default();
        tool.set_mode(ToolMode::Draw);
        tool.activate(&store).unwrap();

        tool.press(Point::new(0.0, 0.0));
        tool.press(Point::new(10.0, 0.0));
        tool.press(Point::new(5.0, 8.0));
        let outcome = tool.finish(&engine, &mut store).unwrap();

        let fid = match outcome {
            FinishOutcome::FeatureAdded(fid) => fid,
            other => panic!("unexpected outcome: {:?}", other),
        };
        let added = store.feature(fid).unwrap();
        assert!(!added.geometry.is_multi());
        assert!(added.geometry.to_multi().unsigned_area() > 0.0);
    }

    #[test]
    fn test_secondary_press_appends_then_finishes() {
        let engine = GeoEngine::new();
        let mut store = MemoryStore::new();
        let mut tool = DigitizeTool::default();
        tool.set_mode(ToolMode::Draw);

        tool.press(Point::new(0.0, 0.0));
        tool.press(Point::new(10.0, 0.0));
        let outcome = tool
            .handle_event(
                ToolEvent::SecondaryPress(Point::new(5.0, 8.0)),
                &engine,
                &mut store,
            )
            .unwrap();

        assert!(matches!(
            outcome,
            EventOutcome::Finished(FinishOutcome::FeatureAdded(_))
        ));
        assert_eq!(store.features().len(), 1);
    }

    #[test]
    fn test_cancel_discards_then_requests_exit() {
        let mut tool = DigitizeTool::default();
        tool.press(Point::new(1.0, 1.0));

        assert_eq!(tool.cancel(), EventOutcome::Continued);
        assert_eq!(tool.state(), ToolState::Idle);
        assert!(tool.stream().is_empty());

        assert_eq!(tool.cancel(), EventOutcome::ExitRequested);
    }

    #[test]
    fn test_finish_without_points_fails_cleanly() {
        let engine = GeoEngine::new();
        let (mut store, _) = store_with_square();
        let mut tool = DigitizeTool::default();

        let result = tool.finish(&engine, &mut store);
        assert_eq!(
            result,
            Err(EditError::InsufficientVertices {
                required: 2,
                actual: 0
            })
        );
        assert_eq!(tool.state(), ToolState::Idle);
    }

    #[test]
    fn test_failed_finish_clears_the_line_and_store() {
        let engine = GeoEngine::new();
        let mut store = MemoryStore::new(); // nothing selected
        let mut tool = DigitizeTool::default();

        tool.press(Point::new(-2.0, 3.0));
        tool.press(Point::new(12.0, 3.0));
        let result = tool.finish(&engine, &mut store);

        assert_eq!(result, Err(EditError::NoSelection { selected: 0 }));
        assert_eq!(tool.state(), ToolState::Idle);
        assert!(tool.stream().is_empty());
        assert!(store.features().is_empty());

        // The tool stays usable for the next gesture
        tool.press(Point::new(0.0, 0.0));
        assert_eq!(tool.state(), ToolState::Streaming);
    }

    #[test]
    fn test_activation_requires_a_selection_in_reshape_mode() {
        let store = MemoryStore::new();
        let mut tool = DigitizeTool::default();

        assert_eq!(
            tool.activate(&store),
            Err(EditError::NoSelection { selected: 0 })
        );

        tool.set_mode(ToolMode::Draw);
        assert!(tool.activate(&store).is_ok());
    }

    #[test]
    fn test_store_write_failure_abandons_the_edit() {
        // Store wrapper whose geometry writes always fail
        struct ReadOnlyStore(MemoryStore);

        impl FeatureStore for ReadOnlyStore {
            fn selected_features(&self) -> Vec<Feature> {
                self.0.selected_features()
            }
            fn feature(&self, id: Uuid) -> Option<Feature> {
                self.0.feature(id)
            }
            fn add_feature(
                &mut self,
                geometry: FeatureGeometry,
                attributes: BTreeMap<String, String>,
            ) -> Result<Uuid, StoreError> {
                self.0.add_feature(geometry, attributes)
            }
            fn change_geometry(
                &mut self,
                _id: Uuid,
                _geometry: FeatureGeometry,
            ) -> Result<(), StoreError> {
                Err(StoreError("layer is not editable".to_string()))
            }
            fn begin_edit_command(&mut self, name: &str) {
                self.0.begin_edit_command(name);
            }
            fn commit_edit_command(&mut self) {
                self.0.commit_edit_command();
            }
            fn abandon_edit_command(&mut self) {
                self.0.abandon_edit_command();
            }
        }

        let engine = GeoEngine::new();
        let (inner, id) = store_with_square();
        let before = inner.feature(id).unwrap();
        let mut store = ReadOnlyStore(inner);
        let mut tool = DigitizeTool::default();

        tool.press(Point::new(-2.0, 3.0));
        tool.press(Point::new(12.0, 3.0));
        let result = tool.finish(&engine, &mut store);

        assert!(matches!(result, Err(EditError::StoreWriteFailed(_))));
        assert_eq!(store.0.feature(id).unwrap(), before);
    }

    #[test]
    fn test_mode_and_stream_toggles_are_orthogonal_to_state() {
        let mut tool = DigitizeTool::default();
        tool.press(Point::new(0.0, 0.0));

        tool.toggle_stream();
        assert!(tool.config().stream_enabled);
        tool.toggle_mode();
        assert_eq!(tool.mode(), ToolMode::Draw);

        // Mid-stream toggles leave the captured line alone
        assert_eq!(tool.state(), ToolState::Streaming);
        assert_eq!(tool.stream().len(), 1);
    }

    #[test]
    fn test_hole_gesture_end_to_end() {
        let engine = GeoEngine::new();
        let (mut store, id) = store_with_square();
        let mut tool = DigitizeTool::default();

        for point in [
            Point::new(4.0, 4.0),
            Point::new(6.0, 4.0),
            Point::new(6.0, 6.0),
            Point::new(4.0, 6.0),
        ] {
            tool.press(point);
        }
        let outcome = tool.finish(&engine, &mut store).unwrap();

        assert!(matches!(
            outcome,
            FinishOutcome::GeometryChanged {
                decision: TopologyDecision::AddHole { part: 0 },
                ..
            }
        ));
        let edited = store.feature(id).unwrap().geometry;
        assert!(!edited.is_multi());
        assert_eq!(edited.parts()[0].interiors().len(), 1);
    }
}
