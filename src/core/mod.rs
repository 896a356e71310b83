//! Core-Domänentypen: Segmente, Verbindungsgraph, Gruppierung, Validierung, Status.

pub mod connection;
pub mod grouping;
pub mod ids;
/// Der Gleisplan als Aggregat
///
/// Alle Änderungen an Adjazenz und Endpunkt-Tabelle laufen hierüber:
/// - connect/disconnect mit Orientierungsfall
/// - Segmente anlegen, entfernen (kaskadierend), verschieben
/// - transaktionales Festschreiben der Gruppierung
pub mod layout;
pub mod segment;
pub mod status;
pub mod validation;

pub use connection::{AdjacencyList, ConsistencyWarning, EndpointRole, Orientation};
pub use grouping::{Group, Grouping, Turnout};
pub use layout::{ConnectOutcome, DisconnectOutcome, EndpointMatch, Layout, LayoutError};
pub use segment::{
    format_internal_id, parse_internal_id, DerivedIds, Endpoint, Link, Pose, Segment, SegmentId,
    SegmentKind,
};
pub use status::{
    BatchOutcome, SegmentStatus, StatusBoard, StatusChange, StatusError, StatusPalette,
};
pub use validation::{GroupingPolicy, SegmentAdjacency, ValidationIssue, ValidationReport};
