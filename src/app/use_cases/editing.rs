//! Use-Case-Funktionen für das Bearbeiten des Gleisplans.
//!
//! Lokale Graph-Operationen ohne Neugruppierung; die Gruppierung wird
//! nur als veraltet markiert und erst beim Commit neu gebildet.

use crate::app::AppState;
use crate::core::{ConnectOutcome, Endpoint, Pose, SegmentId, SegmentKind};
use anyhow::{Context, Result};

/// Platziert ein neues, unverbundenes Segment.
pub fn add_segment(state: &mut AppState, kind: SegmentKind, pose: Pose) -> SegmentId {
    let id = state.layout.add_segment(kind, pose);
    log::info!("Segment {} ({}) hinzugefügt", id, kind);
    state.status_message = Some(format!("Segment {} hinzugefügt", id));
    id
}

/// Entfernt ein Segment inkl. aller Verbindungen.
pub fn remove_segment(state: &mut AppState, id: SegmentId) -> Result<()> {
    state.layout.remove_segment(id)?;
    state.status_message = Some(format!("Segment {} entfernt", id));
    Ok(())
}

/// Verschiebt ein Segment.
pub fn move_segment(state: &mut AppState, id: SegmentId, position: glam::Vec2) -> Result<()> {
    state.layout.move_segment(id, position)?;
    Ok(())
}

/// Dreht ein Segment.
pub fn rotate_segment(state: &mut AppState, id: SegmentId, rotation: f32) -> Result<()> {
    state.layout.rotate_segment(id, rotation)?;
    Ok(())
}

/// Verbindet zwei Endpunkte; Konsistenzwarnungen landen im State.
pub fn connect(
    state: &mut AppState,
    a: SegmentId,
    point_a: Endpoint,
    b: SegmentId,
    point_b: Endpoint,
) -> Result<()> {
    let outcome = state.layout.connect(a, point_a, b, point_b)?;
    remember_outcome(state, &outcome);
    log::info!(
        "Verbindung {}.{} ↔ {}.{} erstellt ({:?})",
        a,
        point_a,
        b,
        point_b,
        outcome.orientation
    );
    Ok(())
}

/// Verbindet einen Endpunkt mit dem nächsten freien Endpunkt eines anderen Segments.
///
/// `max_distance <= 0` nutzt den Fangradius aus den Optionen.
pub fn snap_endpoint(
    state: &mut AppState,
    segment: SegmentId,
    endpoint: Endpoint,
    max_distance: f32,
) -> Result<()> {
    let position = state
        .layout
        .segment(segment)
        .with_context(|| format!("Segment {} existiert nicht", segment))?
        .endpoint_position(endpoint)
        .with_context(|| format!("Segment {} hat keinen Endpunkt '{}'", segment, endpoint))?;

    let radius = if max_distance > 0.0 {
        max_distance
    } else {
        state.options.snap_radius
    };
    let target = state
        .layout
        .nearest_free_endpoint(position, radius, Some(segment))
        .with_context(|| {
            format!(
                "Kein freier Endpunkt innerhalb von {} um {}.{}",
                radius, segment, endpoint
            )
        })?;

    connect(state, segment, endpoint, target.segment, target.endpoint)
}

/// Trennt die Verbindung an einem Endpunkt.
pub fn disconnect(state: &mut AppState, segment: SegmentId, endpoint: Endpoint) -> Result<()> {
    let outcome = state.layout.disconnect(segment, endpoint)?;
    state.last_warnings = outcome.warnings;
    log::info!(
        "Verbindung {}.{} ↔ {}.{} getrennt",
        segment,
        endpoint,
        outcome.peer.peer,
        outcome.peer.peer_endpoint
    );
    Ok(())
}

/// Leert den Gleisplan und die Statustabelle.
pub fn clear_layout(state: &mut AppState) {
    state.layout.clear();
    state.status.register_ids(std::iter::empty::<String>());
    state.last_report = None;
    state.last_warnings.clear();
    state.status_message = Some("Gleisplan geleert".to_string());
}

fn remember_outcome(state: &mut AppState, outcome: &ConnectOutcome) {
    state.last_warnings = outcome.warnings.clone();
    if !outcome.warnings.is_empty() {
        state.status_message = Some(format!(
            "Verbunden mit {} Konsistenzwarnung(en)",
            outcome.warnings.len()
        ));
    }
}
