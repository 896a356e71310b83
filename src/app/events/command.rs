use crate::core::{Endpoint, Pose, SegmentId, SegmentKind};
use crate::shared::EditorOptions;

/// Commands sind mutierende Schritte, die zentral ausgeführt werden.
#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// Neues Segment platzieren
    AddSegment { kind: SegmentKind, pose: Pose },
    /// Segment entfernen (trennt vorher alle Verbindungen)
    RemoveSegment { id: SegmentId },
    /// Segment verschieben
    MoveSegment { id: SegmentId, position: glam::Vec2 },
    /// Segment drehen (Grad)
    RotateSegment { id: SegmentId, rotation: f32 },
    /// Zwei Endpunkte verbinden
    ConnectEndpoints {
        a: SegmentId,
        point_a: Endpoint,
        b: SegmentId,
        point_b: Endpoint,
    },
    /// Endpunkt mit dem nächsten freien Endpunkt eines anderen Segments verbinden
    SnapEndpoint {
        segment: SegmentId,
        endpoint: Endpoint,
        max_distance: f32,
    },
    /// Verbindung an einem Endpunkt trennen
    DisconnectEndpoint {
        segment: SegmentId,
        endpoint: Endpoint,
    },
    /// Gleisplan leeren
    ClearLayout,
    /// Gruppen neu bilden, prüfen und festschreiben
    CommitGroups,
    /// Datei laden
    LoadFile { path: String },
    /// Speichern (None = aktueller Pfad)
    SaveFile { path: Option<String> },
    /// Flaches Format exportieren (ohne Gruppierungspflicht)
    ExportFlatLayout { path: String },
    /// Einzelne Statusmeldung anwenden
    ApplyStatus { external_id: String, status: String },
    /// Sammelmeldung anwenden
    ApplyStatusBatch { updates: Vec<(String, String)> },
    /// Alle Statuswerte auf `unknown`
    ResetStatuses,
    /// Optionen übernehmen und speichern
    ApplyOptions { options: Box<EditorOptions> },
}
