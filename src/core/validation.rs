//! Vollständige Graph-Validierung vor jedem Festschreiben einer Gruppierung.
//!
//! Alle Befunde werden gesammelt (kein Abbruch beim ersten Fehler). Jeder
//! Befund trägt die betroffenen Segmente samt aktueller `next`/`prev`-Listen.

use super::connection::AdjacencyList;
use super::grouping::Grouping;
use super::ids;
use super::layout::Layout;
use super::segment::{Link, Segment, SegmentId, SegmentKind};
use indexmap::IndexMap;
use std::fmt;

/// Konfigurierbare Regeln der Validierung
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroupingPolicy {
    /// Einzelnes, völlig unverbundenes Segment als eigene Gruppe zulassen
    pub allow_isolated_segments: bool,
}

impl GroupingPolicy {
    /// Policy, die isolierte Einzelsegmente zulässt
    pub fn permissive() -> Self {
        Self {
            allow_isolated_segments: true,
        }
    }
}

/// Momentaufnahme der Adjazenz eines Segments für Diagnosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentAdjacency {
    /// Segment
    pub id: SegmentId,
    /// Segmentart
    pub kind: SegmentKind,
    /// Aktuelle Nachfolger
    pub next: Vec<SegmentId>,
    /// Aktuelle Vorgänger
    pub prev: Vec<SegmentId>,
}

impl SegmentAdjacency {
    fn of(segment: &Segment) -> Self {
        Self {
            id: segment.id,
            kind: segment.kind,
            next: segment.next().iter().copied().collect(),
            prev: segment.prev().iter().copied().collect(),
        }
    }
}

impl fmt::Display for SegmentAdjacency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, next={:?}, prev={:?})",
            self.id, self.kind, self.next, self.prev
        )
    }
}

/// Ein einzelner Validierungsbefund.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// Nicht-Weichen-Segment gehört zu keiner Gruppe
    Ungrouped(SegmentAdjacency),
    /// Segment steht in mehreren Gruppen
    MultipleGroups {
        /// Segment
        segment: SegmentAdjacency,
        /// Gruppen-IDs
        groups: Vec<String>,
    },
    /// Segment ohne jede Verbindung
    Isolated {
        /// Segment
        segment: SegmentAdjacency,
        /// Gruppe (None bei Weichen)
        group: Option<String>,
    },
    /// Mindestens zwei Verbindungen, aber next oder prev leer
    BrokenStructure(SegmentAdjacency),
    /// Nicht-Weichen-Segment mit mehr als einem Nachfolger oder Vorgänger
    ExcessAdjacency(SegmentAdjacency),
    /// Gruppenmitglied ohne Verbindung zu einem anderen Mitglied
    DetachedInGroup {
        /// Segment
        segment: SegmentAdjacency,
        /// Gruppe
        group: String,
    },
    /// `peer` steht in `list` von `segment`, verweist aber nicht zurück
    MirrorMismatch {
        /// Segment mit dem Vorwärts-Eintrag
        segment: SegmentAdjacency,
        /// Gegenstelle ohne Rückverweis
        peer: SegmentAdjacency,
        /// Liste, in der `peer` steht
        list: AdjacencyList,
    },
    /// Verweis auf ein nicht existierendes Segment
    DanglingReference {
        /// Segment mit dem Verweis
        segment: SegmentAdjacency,
        /// Fehlende ID
        missing: SegmentId,
    },
    /// Gruppennummer oder Mitgliederzahl sprengt die dreistelligen ID-Felder
    IdRangeExceeded {
        /// Startsegment der Gruppe
        segment: SegmentAdjacency,
        /// Gruppen-ID
        group: String,
        /// Anzahl Mitglieder
        members: usize,
    },
    /// Endpunkt-Tabelle nicht gespiegelt
    EndpointMismatch {
        /// Segment
        segment: SegmentAdjacency,
        /// Eintrag, dessen Gegenstelle nicht zurückzeigt
        link: Link,
    },
}

impl ValidationIssue {
    /// Alle betroffenen Segment-IDs
    pub fn segments(&self) -> Vec<SegmentId> {
        match self {
            ValidationIssue::Ungrouped(s)
            | ValidationIssue::BrokenStructure(s)
            | ValidationIssue::ExcessAdjacency(s) => vec![s.id],
            ValidationIssue::MultipleGroups { segment, .. }
            | ValidationIssue::Isolated { segment, .. }
            | ValidationIssue::DetachedInGroup { segment, .. }
            | ValidationIssue::IdRangeExceeded { segment, .. } => vec![segment.id],
            ValidationIssue::MirrorMismatch { segment, peer, .. } => vec![segment.id, peer.id],
            ValidationIssue::DanglingReference { segment, missing } => {
                vec![segment.id, *missing]
            }
            ValidationIssue::EndpointMismatch { segment, link } => vec![segment.id, link.peer],
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::Ungrouped(s) => write!(f, "Segment ohne Gruppe: {}", s),
            ValidationIssue::MultipleGroups { segment, groups } => {
                write!(f, "Segment in mehreren Gruppen {:?}: {}", groups, segment)
            }
            ValidationIssue::Isolated { segment, group } => match group {
                Some(group) => write!(f, "Segment hat keine Verbindungen ({}): {}", group, segment),
                None => write!(f, "Weiche hat keine Verbindungen: {}", segment),
            },
            ValidationIssue::BrokenStructure(s) => {
                write!(f, "Defekte next/prev-Struktur: {}", s)
            }
            ValidationIssue::ExcessAdjacency(s) => {
                write!(f, "Mehr als ein Nachfolger/Vorgänger: {}", s)
            }
            ValidationIssue::DetachedInGroup { segment, group } => write!(
                f,
                "Segment ohne Verbindung zu anderem Mitglied von {}: {}",
                group, segment
            ),
            ValidationIssue::MirrorMismatch {
                segment,
                peer,
                list,
            } => write!(
                f,
                "Verbindungsinkonsistenz: {} steht in {} von {}, aber {} fehlt in next/prev von {}",
                peer.id, list, segment, segment.id, peer
            ),
            ValidationIssue::DanglingReference { segment, missing } => write!(
                f,
                "Verweis auf fehlendes Segment {}: {}",
                missing, segment
            ),
            ValidationIssue::IdRangeExceeded {
                segment,
                group,
                members,
            } => write!(
                f,
                "Gruppe {} mit {} Segmenten passt nicht in die ID-Felder (max. {}): {}",
                group,
                members,
                ids::MAX_FIELD_VALUE,
                segment
            ),
            ValidationIssue::EndpointMismatch { segment, link } => write!(
                f,
                "Endpunkt-Verbindung zu {}.{} nicht gespiegelt: {}",
                link.peer, link.peer_endpoint, segment
            ),
        }
    }
}

/// Gesammelte Befunde einer Validierung (leer = gültig)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Alle Befunde in Prüfreihenfolge
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Keine Befunde
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// Anzahl Befunde
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// Befunde als Textzeilen (für UI/CLI)
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Validierungsfehler", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "\n  - {}", issue)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationReport {}

/// Prüft Gleisplan und Gruppierungsvorschlag vollständig.
///
/// Stufen 1-4 (Abdeckung, Isolation, Struktur, Gruppen-Zusammenhang) gelten
/// für Nicht-Weichen-Segmente, Stufe 5 (Spiegelung) für alle Segmente.
/// Eine Weiche ohne jede Verbindung ist immer ein Fehler.
pub fn validate(layout: &Layout, proposal: &Grouping, policy: &GroupingPolicy) -> ValidationReport {
    let mut issues = Vec::new();

    let mut membership: IndexMap<SegmentId, Vec<usize>> = IndexMap::new();
    for (index, group) in proposal.groups.iter().enumerate() {
        for &member in &group.members {
            membership.entry(member).or_default().push(index);
        }
    }

    for segment in layout.segments() {
        let no_connections = segment.next().is_empty() && segment.prev().is_empty();

        if segment.kind.is_switch() {
            if no_connections {
                issues.push(ValidationIssue::Isolated {
                    segment: SegmentAdjacency::of(segment),
                    group: None,
                });
            }
            continue;
        }

        // Stufe 1: Abdeckung
        let groups = membership.get(&segment.id).map(Vec::as_slice).unwrap_or(&[]);
        match groups {
            [] => issues.push(ValidationIssue::Ungrouped(SegmentAdjacency::of(segment))),
            [_] => {}
            many => issues.push(ValidationIssue::MultipleGroups {
                segment: SegmentAdjacency::of(segment),
                groups: many
                    .iter()
                    .filter_map(|&i| proposal.groups.get(i).map(|g| g.id.clone()))
                    .collect(),
            }),
        }
        let group = groups.first().and_then(|&i| proposal.groups.get(i));

        // Stufe 2: Isolation
        if no_connections {
            let single = group.is_some_and(|g| g.members.len() == 1);
            if !(single && policy.allow_isolated_segments) {
                issues.push(ValidationIssue::Isolated {
                    segment: SegmentAdjacency::of(segment),
                    group: group.map(|g| g.id.clone()),
                });
            }
        }

        // Stufe 3: Struktur
        if segment.adjacency_count() >= 2 && (segment.next().is_empty() || segment.prev().is_empty())
        {
            issues.push(ValidationIssue::BrokenStructure(SegmentAdjacency::of(segment)));
        }
        if segment.next().len() > 1 || segment.prev().len() > 1 {
            issues.push(ValidationIssue::ExcessAdjacency(SegmentAdjacency::of(segment)));
        }

        // Stufe 4: Zusammenhang innerhalb der Gruppe
        if let Some(group) = group {
            let linked = segment
                .next()
                .iter()
                .chain(segment.prev())
                .any(|&n| n != segment.id && group.contains(n));
            if group.members.len() > 1 && !linked {
                issues.push(ValidationIssue::DetachedInGroup {
                    segment: SegmentAdjacency::of(segment),
                    group: group.id.clone(),
                });
            }
        }
    }

    // Feste Feldbreite der abgeleiteten IDs
    for group in &proposal.groups {
        if ids::fits_fields(group.number, group.members.len()) {
            continue;
        }
        if let Some(start) = layout.segment(group.start) {
            issues.push(ValidationIssue::IdRangeExceeded {
                segment: SegmentAdjacency::of(start),
                group: group.id.clone(),
                members: group.members.len(),
            });
        }
    }

    // Stufe 5: Spiegelung für alle Segmente
    for segment in layout.segments() {
        check_mirror(layout, segment, &mut issues);
    }

    if issues.is_empty() {
        log::debug!(
            "Validierung ok: {} Segmente, {} Gruppen",
            layout.segment_count(),
            proposal.groups.len()
        );
    }
    ValidationReport { issues }
}

fn check_mirror(layout: &Layout, segment: &Segment, issues: &mut Vec<ValidationIssue>) {
    for (list, entries) in [
        (AdjacencyList::Next, segment.next()),
        (AdjacencyList::Prev, segment.prev()),
    ] {
        for &peer_id in entries {
            match layout.segment(peer_id) {
                None => issues.push(ValidationIssue::DanglingReference {
                    segment: SegmentAdjacency::of(segment),
                    missing: peer_id,
                }),
                Some(peer) if !peer.is_adjacent_to(segment.id) => {
                    issues.push(ValidationIssue::MirrorMismatch {
                        segment: SegmentAdjacency::of(segment),
                        peer: SegmentAdjacency::of(peer),
                        list,
                    })
                }
                Some(_) => {}
            }
        }
    }

    for (endpoint, link) in segment.links() {
        let Some(peer) = layout.segment(link.peer) else {
            issues.push(ValidationIssue::DanglingReference {
                segment: SegmentAdjacency::of(segment),
                missing: link.peer,
            });
            continue;
        };
        let expected = Link {
            peer: segment.id,
            peer_endpoint: endpoint,
        };
        if peer.link(link.peer_endpoint) != Some(expected) {
            issues.push(ValidationIssue::EndpointMismatch {
                segment: SegmentAdjacency::of(segment),
                link,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grouping::Group;
    use crate::core::{grouping, ids, Endpoint, Pose};
    use glam::Vec2;

    fn straights(layout: &mut Layout, count: usize) -> Vec<SegmentId> {
        (0..count)
            .map(|i| {
                layout.add_segment(
                    SegmentKind::Straight,
                    Pose::at(Vec2::new(i as f32 * 100.0, 0.0)),
                )
            })
            .collect()
    }

    fn link(layout: &mut Layout, a: SegmentId, b: SegmentId) {
        layout
            .connect(a, Endpoint::End, b, Endpoint::Start)
            .expect("Verbindung erwartet");
    }

    fn group(number: u32, members: &[SegmentId]) -> Group {
        Group {
            number,
            id: ids::group_id(number),
            description: format!("Section {}", number),
            members: members.to_vec(),
            start: members[0],
            end: members[members.len() - 1],
            last_axle_counter: ids::axle_counter_id(number, members.len() as u32 + 1),
            degenerate: false,
        }
    }

    fn proposal_of(groups: Vec<Group>) -> Grouping {
        let mut proposal = Grouping::default();
        proposal.groups = groups;
        proposal
    }

    #[test]
    fn test_isolated_segment_depends_on_policy() {
        let mut layout = Layout::new();
        layout.add_segment(SegmentKind::Straight, Pose::at(Vec2::ZERO));
        let proposal = grouping::partition(&layout);

        let strict = validate(&layout, &proposal, &GroupingPolicy::default());
        assert_eq!(strict.len(), 1);
        assert!(matches!(strict.issues[0], ValidationIssue::Isolated { .. }));

        let lenient = validate(&layout, &proposal, &GroupingPolicy::permissive());
        assert!(lenient.is_empty());
    }

    #[test]
    fn test_isolated_switch_is_always_reported() {
        let mut layout = Layout::new();
        layout.add_segment(SegmentKind::SwitchLeft, Pose::at(Vec2::ZERO));
        let proposal = grouping::partition(&layout);
        let report = validate(&layout, &proposal, &GroupingPolicy::permissive());
        assert_eq!(report.len(), 1);
        assert!(matches!(
            report.issues[0],
            ValidationIssue::Isolated { group: None, .. }
        ));
    }

    #[test]
    fn test_missing_back_reference_is_collected_with_other_issues() {
        let mut layout = Layout::new();
        let a = layout.add_segment(SegmentKind::Straight, Pose::at(Vec2::ZERO));
        let b = layout.add_segment(SegmentKind::Straight, Pose::at(Vec2::new(100.0, 0.0)));
        let c = layout.add_segment(SegmentKind::Straight, Pose::at(Vec2::new(500.0, 0.0)));
        layout
            .connect(a, Endpoint::End, b, Endpoint::Start)
            .expect("Verbindung erwartet");
        // Rückverweis von b manuell entfernen
        layout
            .segment_mut_for_test(b)
            .expect("Segment b erwartet")
            .prev
            .clear();

        let proposal = grouping::partition(&layout);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert!(report.issues.iter().any(|i| matches!(
            i,
            ValidationIssue::MirrorMismatch { segment, peer, list: AdjacencyList::Next }
                if segment.id == a && peer.id == b
        )));
        assert!(report
            .issues
            .iter()
            .any(|i| matches!(i, ValidationIssue::Isolated { segment, .. } if segment.id == c)));
        let text = report.to_string();
        assert!(text.starts_with(&format!("{} Validierungsfehler", report.len())));
    }

    #[test]
    fn test_ungrouped_segments_are_all_reported() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 3);
        link(&mut layout, seg[0], seg[1]);
        link(&mut layout, seg[1], seg[2]);

        let report = validate(&layout, &Grouping::default(), &GroupingPolicy::default());

        assert_eq!(report.len(), 3);
        let ungrouped: Vec<SegmentId> = report
            .issues
            .iter()
            .filter_map(|i| match i {
                ValidationIssue::Ungrouped(s) => Some(s.id),
                _ => None,
            })
            .collect();
        assert_eq!(ungrouped, seg);
    }

    #[test]
    fn test_two_successors_break_structure_and_exceed_adjacency() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 3);
        let (a, b, c) = (seg[0], seg[1], seg[2]);
        link(&mut layout, a, b);
        // c als zweiter Nachfolger von a, gespiegelt in c.prev
        layout.segment_mut_for_test(a).expect("a erwartet").next.insert(c);
        layout.segment_mut_for_test(c).expect("c erwartet").prev.insert(a);

        let proposal = grouping::partition(&layout);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert_eq!(report.len(), 2, "{}", report);
        assert!(matches!(
            &report.issues[0],
            ValidationIssue::BrokenStructure(s) if s.id == a && s.next == vec![b, c] && s.prev.is_empty()
        ));
        assert!(matches!(
            &report.issues[1],
            ValidationIssue::ExcessAdjacency(s) if s.id == a
        ));
    }

    #[test]
    fn test_members_without_link_into_own_group_are_detached() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 4);
        let (a, b, c, d) = (seg[0], seg[1], seg[2], seg[3]);
        link(&mut layout, a, b);
        link(&mut layout, c, d);

        // a und c teilen sich eine Gruppe, ihre Nachbarn liegen woanders
        let proposal = proposal_of(vec![group(1, &[a, c]), group(2, &[b]), group(3, &[d])]);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert_eq!(report.len(), 2, "{}", report);
        for (issue, expected) in report.issues.iter().zip([a, c]) {
            assert!(matches!(
                issue,
                ValidationIssue::DetachedInGroup { segment, group } if segment.id == expected && group == "BG001"
            ));
        }
    }

    #[test]
    fn test_segment_in_two_groups_is_reported_once() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 2);
        let (a, b) = (seg[0], seg[1]);
        link(&mut layout, a, b);

        let proposal = proposal_of(vec![group(1, &[a, b]), group(2, &[b])]);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert_eq!(report.len(), 1, "{}", report);
        assert!(matches!(
            &report.issues[0],
            ValidationIssue::MultipleGroups { segment, groups }
                if segment.id == b && groups == &vec!["BG001".to_string(), "BG002".to_string()]
        ));
    }

    #[test]
    fn test_one_sided_endpoint_and_missing_peer_are_collected() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 2);
        let (a, b) = (seg[0], seg[1]);
        link(&mut layout, a, b);
        {
            let first = layout.segment_mut_for_test(a).expect("a erwartet");
            // Eintrag ohne Gegenstück bei b
            first.connections.insert(
                Endpoint::Start,
                Link {
                    peer: b,
                    peer_endpoint: Endpoint::End,
                },
            );
            first.prev.insert(99);
        }

        let proposal = grouping::partition(&layout);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert_eq!(report.len(), 2, "{}", report);
        assert!(matches!(
            &report.issues[0],
            ValidationIssue::DanglingReference { segment, missing: 99 } if segment.id == a
        ));
        assert!(matches!(
            &report.issues[1],
            ValidationIssue::EndpointMismatch { segment, link }
                if segment.id == a && link.peer == b && link.peer_endpoint == Endpoint::End
        ));
        assert_eq!(report.issues[1].segments(), vec![a, b]);
    }

    #[test]
    fn test_group_beyond_id_fields_is_rejected() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 999);
        for pair in seg.windows(2) {
            link(&mut layout, pair[0], pair[1]);
        }

        let proposal = grouping::partition(&layout);
        assert_eq!(proposal.groups.len(), 1);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert_eq!(report.len(), 1, "{}", report);
        assert!(matches!(
            &report.issues[0],
            ValidationIssue::IdRangeExceeded { segment, group, members: 999 }
                if segment.id == seg[0] && group == "BG001"
        ));
    }

    #[test]
    fn test_group_number_beyond_id_fields_is_rejected() {
        let mut layout = Layout::new();
        let seg = straights(&mut layout, 2);
        link(&mut layout, seg[0], seg[1]);

        let proposal = proposal_of(vec![group(1000, &seg)]);
        let report = validate(&layout, &proposal, &GroupingPolicy::default());

        assert_eq!(report.len(), 1, "{}", report);
        assert!(matches!(
            &report.issues[0],
            ValidationIssue::IdRangeExceeded { members: 2, .. }
        ));
    }
}
