use glam::Vec2;
use rail_layout_editor::core::{Pose, SegmentStatus};
use rail_layout_editor::{AppCommand, AppController, AppState, Endpoint, SegmentKind};

fn add(controller: &mut AppController, state: &mut AppState, kind: SegmentKind, x: f32) {
    controller
        .handle_command(
            state,
            AppCommand::AddSegment {
                kind,
                pose: Pose::at(Vec2::new(x, 0.0)),
            },
        )
        .expect("AddSegment sollte ohne Fehler durchlaufen");
}

fn connect(
    controller: &mut AppController,
    state: &mut AppState,
    a: u64,
    point_a: Endpoint,
    b: u64,
    point_b: Endpoint,
) {
    controller
        .handle_command(
            state,
            AppCommand::ConnectEndpoints {
                a,
                point_a,
                b,
                point_b,
            },
        )
        .expect("ConnectEndpoints sollte ohne Fehler durchlaufen");
}

/// Straight(1) → Straight(2) → Weiche(3) → Straight(4)
fn build_line_with_switch(controller: &mut AppController, state: &mut AppState) {
    add(controller, state, SegmentKind::Straight, 0.0);
    add(controller, state, SegmentKind::Straight, 100.0);
    add(controller, state, SegmentKind::SwitchLeft, 200.0);
    add(controller, state, SegmentKind::Straight, 300.0);
    connect(controller, state, 1, Endpoint::End, 2, Endpoint::Start);
    connect(controller, state, 2, Endpoint::End, 3, Endpoint::Start);
    connect(controller, state, 3, Endpoint::End, 4, Endpoint::Start);
}

#[test]
fn test_commands_are_logged_in_order() {
    let mut controller = AppController::new();
    let mut state = AppState::new();

    add(&mut controller, &mut state, SegmentKind::Straight, 0.0);
    controller
        .handle_command(&mut state, AppCommand::ClearLayout)
        .expect("ClearLayout sollte ohne Fehler durchlaufen");

    let entries = state.command_log.entries();
    assert_eq!(entries.len(), 2);
    assert!(matches!(entries[0], AppCommand::AddSegment { .. }));
    assert_eq!(entries[1], AppCommand::ClearLayout);
    assert_eq!(state.segment_count(), 0);
}

#[test]
fn test_commit_groups_registers_block_ids_for_status() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    build_line_with_switch(&mut controller, &mut state);

    controller
        .handle_command(&mut state, AppCommand::CommitGroups)
        .expect("Commit sollte gelingen");

    assert_eq!(state.group_count(), 2);
    assert!(state.last_report.is_none());
    assert_eq!(state.status.len(), 3);
    assert_eq!(
        state.status.status_of("BL001001"),
        Some(SegmentStatus::Unknown)
    );

    controller
        .handle_command(
            &mut state,
            AppCommand::ApplyStatus {
                external_id: "BL001002".into(),
                status: "blocked".into(),
            },
        )
        .expect("Status sollte gesetzt werden");
    assert_eq!(
        state.status.status_of("BL001002"),
        Some(SegmentStatus::Blocked)
    );
}

#[test]
fn test_failed_commit_keeps_previous_grouping_and_stores_report() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    build_line_with_switch(&mut controller, &mut state);
    controller
        .handle_command(&mut state, AppCommand::CommitGroups)
        .expect("Commit sollte gelingen");
    let before = state
        .layout
        .grouping()
        .expect("Gruppierung erwartet")
        .clone();

    // Isoliertes Segment ist mit Standardoptionen unzulässig
    add(&mut controller, &mut state, SegmentKind::Straight, 900.0);
    let result = controller.handle_command(&mut state, AppCommand::CommitGroups);

    assert!(result.is_err());
    let report = state.last_report.as_ref().expect("Bericht erwartet");
    assert!(!report.is_empty());
    assert_eq!(state.layout.grouping(), Some(&before));
    assert!(state.layout.segment(5).and_then(|s| s.group_id()).is_none());
}

#[test]
fn test_unknown_status_is_rejected_without_side_effects() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    build_line_with_switch(&mut controller, &mut state);
    controller
        .handle_command(&mut state, AppCommand::CommitGroups)
        .expect("Commit sollte gelingen");

    let unknown_id = controller.handle_command(
        &mut state,
        AppCommand::ApplyStatus {
            external_id: "BL099001".into(),
            status: "free".into(),
        },
    );
    let bad_status = controller.handle_command(
        &mut state,
        AppCommand::ApplyStatus {
            external_id: "BL001001".into(),
            status: "green".into(),
        },
    );

    assert!(unknown_id.is_err());
    assert!(bad_status.is_err());
    assert_eq!(
        state.status.status_of("BL001001"),
        Some(SegmentStatus::Unknown)
    );
}

#[test]
fn test_status_batch_applies_valid_entries_and_reset() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    build_line_with_switch(&mut controller, &mut state);
    controller
        .handle_command(&mut state, AppCommand::CommitGroups)
        .expect("Commit sollte gelingen");

    controller
        .handle_command(
            &mut state,
            AppCommand::ApplyStatusBatch {
                updates: vec![
                    ("BL001001".into(), "free".into()),
                    ("BL001002".into(), "reserved".into()),
                    ("BL123123".into(), "free".into()),
                ],
            },
        )
        .expect("Sammelmeldung sollte durchlaufen");

    let batch = state.last_batch.as_ref().expect("Ergebnis erwartet");
    assert_eq!(batch.applied.len(), 2);
    assert_eq!(batch.rejected.len(), 1);
    assert_eq!(
        state.status.status_of("BL001002"),
        Some(SegmentStatus::Reserved)
    );

    controller
        .handle_command(&mut state, AppCommand::ResetStatuses)
        .expect("Reset sollte durchlaufen");
    assert_eq!(
        state.status.status_of("BL001002"),
        Some(SegmentStatus::Unknown)
    );
}

#[test]
fn test_snap_endpoint_connects_nearest_free_endpoint() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    add(&mut controller, &mut state, SegmentKind::Straight, 0.0);
    add(&mut controller, &mut state, SegmentKind::Straight, 100.0);

    controller
        .handle_command(
            &mut state,
            AppCommand::SnapEndpoint {
                segment: 1,
                endpoint: Endpoint::End,
                max_distance: 20.0,
            },
        )
        .expect("Einrasten sollte gelingen");

    let first = state.layout.segment(1).expect("Segment 1 erwartet");
    assert!(first.next().contains(&2));
    assert_eq!(state.connection_count(), 1);
}

#[test]
fn test_save_without_path_fails() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    add(&mut controller, &mut state, SegmentKind::Straight, 0.0);

    let result = controller.handle_command(&mut state, AppCommand::SaveFile { path: None });
    assert!(result.is_err());
}

#[test]
fn test_invalid_load_drops_previous_block_ids() {
    let mut controller = AppController::new();
    let mut state = AppState::new();
    build_line_with_switch(&mut controller, &mut state);
    controller
        .handle_command(&mut state, AppCommand::CommitGroups)
        .expect("Commit sollte gelingen");
    assert_eq!(state.status.len(), 3);

    let dir = tempfile::tempdir().expect("Temp-Verzeichnis erwartet");
    let path = dir.path().join("single.json");
    std::fs::write(
        &path,
        r#"{"blocks": {"rail_0001": {"id": "rail_0001", "type": "straight", "x": 0.0, "y": 0.0}}}"#,
    )
    .expect("Schreiben erwartet");

    controller
        .handle_command(
            &mut state,
            AppCommand::LoadFile {
                path: path.to_string_lossy().to_string(),
            },
        )
        .expect("Ungültiger Plan bleibt geladen");

    assert!(state.last_report.is_some());
    assert_eq!(state.segment_count(), 1);
    assert!(state.status.is_empty());
    assert!(state.layout.find_by_external_id("BL001002").is_none());

    let result = controller.handle_command(
        &mut state,
        AppCommand::ApplyStatus {
            external_id: "BL001002".into(),
            status: "blocked".into(),
        },
    );
    assert!(result.is_err());
    assert_eq!(state.status.status_of("BL001002"), None);
}
