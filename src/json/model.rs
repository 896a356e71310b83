//! Serde-Abbildung der beiden Dateiformate.
//!
//! - Block-Gruppen-Format (`blockGroups`, `turnouts`, `metadata`)
//! - flaches Altformat (`blocks` nach interner ID, optional `groups`)

use crate::core::SegmentKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Formatversion des Block-Gruppen-Formats
pub const BLOCK_GROUPS_VERSION: &str = "1.0.0";
/// Formatversion des flachen Formats
pub const FLAT_VERSION: &str = "1.0";
/// Gruppenrichtung (wird immer so geschrieben)
pub const GROUP_DIRECTION: &str = "Forward";

// ── Block-Gruppen-Format ────────────────────────────────────────────

/// Wurzel des Block-Gruppen-Formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGroupsDocument {
    /// Gruppen nach Gruppen-ID
    #[serde(rename = "blockGroups")]
    pub block_groups: IndexMap<String, BlockGroupRecord>,
    /// Weichengruppen
    #[serde(default)]
    pub turnouts: TurnoutSection,
    /// Zähler, Version, Zeitstempel und flache Kopie
    #[serde(default)]
    pub metadata: Metadata,
}

/// Eine Gruppe im Export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGroupRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
    #[serde(default = "default_direction")]
    pub direction: String,
    #[serde(default)]
    pub start_block_id: Option<String>,
    #[serde(default)]
    pub end_block_id: Option<String>,
    #[serde(rename = "last_block_axleCounter", default)]
    pub last_block_axle_counter: Option<String>,
}

/// Ein Block (= gruppiertes Segment) im Export
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "axleCounter", default)]
    pub axle_counter: Option<String>,
    #[serde(default)]
    pub signals: Vec<SignalRecord>,
    pub grid_pos: [i64; 2],
    /// Segmentdaten für die verlustfreie Rekonstruktion
    #[serde(rename = "_original", default, skip_serializing_if = "Option::is_none")]
    pub original: Option<OriginalSegment>,
}

/// Signal eines Blocks (`direction`: 0 = vorwärts, 1 = rückwärts)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalRecord {
    pub id: String,
    pub direction: u8,
}

/// Eingebetteter Segment-Datensatz eines Blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginalSegment {
    pub rail_id: String,
    #[serde(rename = "type", default)]
    pub kind: SegmentKind,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_length")]
    pub length: f32,
}

/// `turnouts`-Abschnitt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoutSection {
    #[serde(default)]
    pub groups: Vec<TurnoutRecord>,
}

/// Eine Weichengruppe
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnoutRecord {
    pub id: String,
    #[serde(default)]
    pub heads: Vec<BlockRef>,
    #[serde(default)]
    pub tails: Vec<BlockRef>,
    #[serde(rename = "_switch_rail_id", default, skip_serializing_if = "Option::is_none")]
    pub switch_rail_id: Option<String>,
}

/// Verweis auf einen Block per ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRef {
    pub id: String,
}

/// `metadata`-Abschnitt
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub next_block_id: Option<String>,
    #[serde(default)]
    pub next_group_id: Option<String>,
    #[serde(default)]
    pub next_segment_id: Option<u64>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    /// Vollständige flache Kopie inkl. Weichen und Verbindungen
    #[serde(rename = "_legacy_data", default, skip_serializing_if = "Option::is_none")]
    pub legacy_data: Option<FlatLayout>,
}

// ── Flaches Format ──────────────────────────────────────────────────

/// Wurzel des flachen Formats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatLayout {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub next_id: Option<u64>,
    #[serde(default)]
    pub next_group_id: Option<u64>,
    pub blocks: IndexMap<String, FlatSegment>,
    #[serde(default)]
    pub groups: IndexMap<String, FlatGroup>,
}

/// Segment im flachen Format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatSegment {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: SegmentKind,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub rotation: f32,
    #[serde(default = "default_length")]
    pub length: f32,
    /// Endpunktname → `[peer_id, peer_endpunkt]` oder `null`
    #[serde(default)]
    pub connections: IndexMap<String, Option<(String, String)>>,
    /// Wird beim Laden ignoriert und neu berechnet
    #[serde(default)]
    pub next_rails: Vec<String>,
    /// Wird beim Laden ignoriert und neu berechnet
    #[serde(default)]
    pub prev_rails: Vec<String>,
    #[serde(default)]
    pub group_id: Option<String>,
}

/// Gruppe im flachen Format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatGroup {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rail_ids: Vec<String>,
}

fn default_direction() -> String {
    GROUP_DIRECTION.to_string()
}

fn default_length() -> f32 {
    crate::core::segment::DEFAULT_SEGMENT_LENGTH
}
