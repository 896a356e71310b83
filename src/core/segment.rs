//! Gleissegment: Art, Endpunkte, Pose und abgeleitete Kennungen.

use glam::Vec2;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interne Segment-ID (stabil für die Lebensdauer des Prozesses).
pub type SegmentId = u64;

/// Abzweigwinkel von Kurven und Weichen (Grad).
pub const DIVERGING_ANGLE_DEG: f32 = 30.0;

/// Standardlänge neuer Segmente in Welteinheiten.
pub const DEFAULT_SEGMENT_LENGTH: f32 = 100.0;

/// Art eines Gleissegments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentKind {
    /// Gerades Gleis
    #[default]
    Straight,
    /// Gebogenes Gleis (30°-Bogen)
    Curved,
    /// Linksweiche
    SwitchLeft,
    /// Rechtsweiche
    SwitchRight,
}

impl SegmentKind {
    /// Alle Segmentarten in fester Reihenfolge
    pub const ALL: [SegmentKind; 4] = [
        SegmentKind::Straight,
        SegmentKind::Curved,
        SegmentKind::SwitchLeft,
        SegmentKind::SwitchRight,
    ];

    /// Weichen sind die einzigen Abschnittsgrenzen.
    pub fn is_switch(self) -> bool {
        matches!(self, SegmentKind::SwitchLeft | SegmentKind::SwitchRight)
    }

    /// Endpunkte, die diese Segmentart besitzt.
    pub fn endpoints(self) -> &'static [Endpoint] {
        if self.is_switch() {
            &[Endpoint::Start, Endpoint::End, Endpoint::Branch]
        } else {
            &[Endpoint::Start, Endpoint::End]
        }
    }

    /// Prüft ob die Segmentart den Endpunkt besitzt.
    pub fn has_endpoint(self, endpoint: Endpoint) -> bool {
        self.endpoints().contains(&endpoint)
    }

    /// Name im Dateiformat (`straight`, `curved`, `switch_left`, `switch_right`)
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentKind::Straight => "straight",
            SegmentKind::Curved => "curved",
            SegmentKind::SwitchLeft => "switch_left",
            SegmentKind::SwitchRight => "switch_right",
        }
    }
}

impl fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SegmentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("Unbekannte Segmentart '{}'", s))
    }
}

/// Benannter Anschlusspunkt eines Segments.
///
/// Gerade und Bogen haben `Start`/`End`, Weichen zusätzlich `Branch`
/// (abzweigender Strang). Im Altformat heißen die Weichenenden `end1`/`end2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endpoint {
    /// Anfang des Segments
    Start,
    /// Ende (bei Weichen: Stammgleis)
    #[serde(alias = "end1")]
    End,
    /// Abzweig einer Weiche
    #[serde(alias = "end2")]
    Branch,
}

impl Endpoint {
    /// Name im Dateiformat
    pub fn as_str(self) -> &'static str {
        match self {
            Endpoint::Start => "start",
            Endpoint::End => "end",
            Endpoint::Branch => "branch",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(Endpoint::Start),
            "end" | "end1" => Ok(Endpoint::End),
            "branch" | "end2" => Ok(Endpoint::Branch),
            other => Err(format!("Unbekannter Endpunkt '{}'", other)),
        }
    }
}

/// Lage eines Segments auf der Zeichenfläche
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position des Start-Endpunkts
    pub position: Vec2,
    /// Drehung in Grad (im Uhrzeigersinn, Bildschirmkoordinaten)
    pub rotation: f32,
    /// Länge in Welteinheiten
    pub length: f32,
}

impl Pose {
    /// Erstellt eine neue Pose
    pub fn new(position: Vec2, rotation: f32, length: f32) -> Self {
        Self {
            position,
            rotation,
            length,
        }
    }

    /// Pose an Position ohne Drehung mit Standardlänge
    pub fn at(position: Vec2) -> Self {
        Self::new(position, 0.0, DEFAULT_SEGMENT_LENGTH)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec2::ZERO)
    }
}

/// Gegenstelle eines verbundenen Endpunkts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    /// Segment auf der anderen Seite
    pub peer: SegmentId,
    /// Endpunkt auf der anderen Seite
    pub peer_endpoint: Endpoint,
}

/// Bei der Gruppierung vergebene Kennungen eines Segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedIds {
    /// Externe Block-ID (z.B. `BL001002`)
    pub block_id: String,
    /// Achszähler-ID (z.B. `AC001002`)
    pub axle_counter: String,
    /// Signal in Fahrtrichtung (z.B. `SG001002_F`)
    pub signal_forward: String,
    /// Signal gegen die Fahrtrichtung (z.B. `SG001002_B`)
    pub signal_backward: String,
}

/// Ein einzelnes Gleisstück, der Basisknoten des Verbindungsgraphen.
///
/// Adjazenz und Endpunkt-Tabelle sind nur über [`crate::core::Layout`]
/// veränderbar, damit die Spiegel-Invarianten zentral gepflegt werden.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    /// Interne ID
    pub id: SegmentId,
    /// Segmentart
    pub kind: SegmentKind,
    /// Geometrische Lage
    pub pose: Pose,
    pub(crate) connections: IndexMap<Endpoint, Link>,
    pub(crate) next: IndexSet<SegmentId>,
    pub(crate) prev: IndexSet<SegmentId>,
    pub(crate) group_id: Option<String>,
    pub(crate) derived: Option<DerivedIds>,
}

impl Segment {
    /// Erstellt ein unverbundenes Segment
    pub fn new(id: SegmentId, kind: SegmentKind, pose: Pose) -> Self {
        Self {
            id,
            kind,
            pose,
            connections: IndexMap::new(),
            next: IndexSet::new(),
            prev: IndexSet::new(),
            group_id: None,
            derived: None,
        }
    }

    /// Anzeigename der internen ID (`rail_0001`)
    pub fn display_id(&self) -> String {
        format_internal_id(self.id)
    }

    /// Gegenstelle eines Endpunkts (None = frei oder nicht vorhanden)
    pub fn link(&self, endpoint: Endpoint) -> Option<Link> {
        self.connections.get(&endpoint).copied()
    }

    /// Alle belegten Endpunkte mit Gegenstelle
    pub fn links(&self) -> impl Iterator<Item = (Endpoint, Link)> + '_ {
        self.connections.iter().map(|(&ep, &link)| (ep, link))
    }

    /// Freie Endpunkte dieses Segments
    pub fn free_endpoints(&self) -> impl Iterator<Item = Endpoint> + '_ {
        self.kind
            .endpoints()
            .iter()
            .copied()
            .filter(|ep| !self.connections.contains_key(ep))
    }

    /// Segmente, auf die dieses Segment zeigt
    pub fn next(&self) -> &IndexSet<SegmentId> {
        &self.next
    }

    /// Segmente, die auf dieses Segment zeigen
    pub fn prev(&self) -> &IndexSet<SegmentId> {
        &self.prev
    }

    /// Anzahl der Adjazenz-Einträge (`|next| + |prev|`)
    pub fn adjacency_count(&self) -> usize {
        self.next.len() + self.prev.len()
    }

    /// Prüft ob das Segment in next oder prev auf `other` verweist
    pub fn is_adjacent_to(&self, other: SegmentId) -> bool {
        self.next.contains(&other) || self.prev.contains(&other)
    }

    /// Externe Gruppen-ID des letzten erfolgreichen Commits
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Abgeleitete Kennungen des letzten erfolgreichen Commits
    pub fn derived(&self) -> Option<&DerivedIds> {
        self.derived.as_ref()
    }

    /// Externe Block-ID (falls gruppiert)
    pub fn external_id(&self) -> Option<&str> {
        self.derived.as_ref().map(|d| d.block_id.as_str())
    }

    /// Weltposition eines Endpunkts.
    ///
    /// Lokale Koordinaten: Start bei (0,0), Ende entlang der X-Achse; Bogen
    /// und Weichenabzweig liegen 30° daneben (Linksweiche nach oben,
    /// Rechtsweiche und Bogen nach unten in Bildschirmkoordinaten).
    pub fn endpoint_position(&self, endpoint: Endpoint) -> Option<Vec2> {
        if !self.kind.has_endpoint(endpoint) {
            return None;
        }
        let length = self.pose.length;
        let (sin, cos) = DIVERGING_ANGLE_DEG.to_radians().sin_cos();
        let local = match (self.kind, endpoint) {
            (_, Endpoint::Start) => Vec2::ZERO,
            (SegmentKind::Curved, Endpoint::End) => Vec2::new(length * cos, length * sin),
            (_, Endpoint::End) => Vec2::new(length, 0.0),
            (SegmentKind::SwitchLeft, Endpoint::Branch) => Vec2::new(length * cos, -length * sin),
            (_, Endpoint::Branch) => Vec2::new(length * cos, length * sin),
        };
        let rotation = Vec2::from_angle(self.pose.rotation.to_radians());
        Some(self.pose.position + rotation.rotate(local))
    }
}

/// Formatiert eine interne ID wie im Dateiformat (`rail_0007`).
pub fn format_internal_id(id: SegmentId) -> String {
    format!("rail_{:04}", id)
}

/// Liest eine interne ID aus `rail_0007` oder `7`.
pub fn parse_internal_id(text: &str) -> Option<SegmentId> {
    let digits = text.strip_prefix("rail_").unwrap_or(text);
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_switch_has_branch_endpoint() {
        assert!(SegmentKind::SwitchLeft.has_endpoint(Endpoint::Branch));
        assert!(SegmentKind::SwitchRight.has_endpoint(Endpoint::Branch));
        assert!(!SegmentKind::Straight.has_endpoint(Endpoint::Branch));
        assert!(!SegmentKind::Curved.has_endpoint(Endpoint::Branch));
    }

    #[test]
    fn test_endpoint_legacy_names() {
        assert_eq!("end1".parse::<Endpoint>(), Ok(Endpoint::End));
        assert_eq!("end2".parse::<Endpoint>(), Ok(Endpoint::Branch));
        let ep: Endpoint = serde_json::from_str("\"end2\"").expect("Alias erwartet");
        assert_eq!(ep, Endpoint::Branch);
        assert!("middle".parse::<Endpoint>().is_err());
    }

    #[test]
    fn test_kind_roundtrip_names() {
        for kind in SegmentKind::ALL {
            assert_eq!(kind.as_str().parse::<SegmentKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_internal_id_format() {
        assert_eq!(format_internal_id(7), "rail_0007");
        assert_eq!(parse_internal_id("rail_0007"), Some(7));
        assert_eq!(parse_internal_id("12"), Some(12));
        assert_eq!(parse_internal_id("rail_x"), None);
    }

    #[test]
    fn test_endpoint_position_straight_rotated() {
        let seg = Segment::new(
            1,
            SegmentKind::Straight,
            Pose::new(Vec2::new(10.0, 20.0), 90.0, 100.0),
        );
        let end = seg.endpoint_position(Endpoint::End).expect("End erwartet");
        assert_relative_eq!(end.x, 10.0, epsilon = 1e-3);
        assert_relative_eq!(end.y, 120.0, epsilon = 1e-3);
        assert!(seg.endpoint_position(Endpoint::Branch).is_none());
    }

    #[test]
    fn test_switch_branch_sides() {
        let left = Segment::new(1, SegmentKind::SwitchLeft, Pose::at(Vec2::ZERO));
        let right = Segment::new(2, SegmentKind::SwitchRight, Pose::at(Vec2::ZERO));
        let l = left.endpoint_position(Endpoint::Branch).expect("Abzweig erwartet");
        let r = right.endpoint_position(Endpoint::Branch).expect("Abzweig erwartet");
        assert!(l.y < 0.0);
        assert!(r.y > 0.0);
        assert_relative_eq!(l.x, r.x, epsilon = 1e-4);
    }
}
