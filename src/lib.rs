//! Gleisplan-Editor Library.
//! Core-Funktionalität als Library exportiert für Tests und Wiederverwendung.

pub mod app;
pub mod core;
pub mod json;
pub mod net;
pub mod shared;

pub use app::{AppCommand, AppController, AppState};
pub use core::{
    Endpoint, Grouping, GroupingPolicy, Layout, LayoutError, Pose, Segment, SegmentId,
    SegmentKind, SegmentStatus, StatusBoard, ValidationIssue, ValidationReport,
};
pub use json::{parse_layout, write_block_groups, write_flat_layout};
pub use shared::EditorOptions;
