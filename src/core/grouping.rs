//! Abschnittsbildung: Zerlegung aller Nicht-Weichen-Segmente in maximale
//! zusammenhängende Gruppen. Nur Weichen bilden Grenzen.

use super::ids;
use super::layout::Layout;
use super::segment::{DerivedIds, Endpoint, SegmentId};
use indexmap::{IndexMap, IndexSet};
use std::collections::VecDeque;

/// Ein Gleisabschnitt (Weichen sind nie Mitglied)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    /// Laufende Gruppennummer (1-basiert, Entdeckungsreihenfolge)
    pub number: u32,
    /// Externe Gruppen-ID (`BG001`)
    pub id: String,
    /// Beschreibung (`Section 1`)
    pub description: String,
    /// Mitglieder in Nummerierungsreihenfolge (ab `start`)
    pub members: Vec<SegmentId>,
    /// Segment ohne eingehenden Nachbarn innerhalb der Gruppe
    pub start: SegmentId,
    /// Segment ohne ausgehenden Nachbarn innerhalb der Gruppe
    pub end: SegmentId,
    /// Achszähler hinter dem letzten Segment
    pub last_axle_counter: String,
    /// Start oder Ende per Ersatzregel bestimmt (z.B. Ring)
    pub degenerate: bool,
}

impl Group {
    /// Prüft die Mitgliedschaft
    pub fn contains(&self, id: SegmentId) -> bool {
        self.members.contains(&id)
    }
}

/// Weichengruppe für den Export: Nachbarabschnitte einer Weiche.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turnout {
    /// Externe ID (`TG000001`)
    pub id: String,
    /// Das Weichensegment
    pub switch: SegmentId,
    /// Gruppierte Nachbarn am Start-Endpunkt
    pub heads: Vec<SegmentId>,
    /// Gruppierte Nachbarn an End/Abzweig
    pub tails: Vec<SegmentId>,
}

/// Ergebnis einer Abschnittsbildung.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Grouping {
    /// Gruppen in Entdeckungsreihenfolge
    pub groups: Vec<Group>,
    /// Weichengruppen
    pub turnouts: Vec<Turnout>,
    /// Segment → (Gruppenindex, abgeleitete IDs)
    assignments: IndexMap<SegmentId, (usize, DerivedIds)>,
}

impl Grouping {
    /// Gruppe eines Segments
    pub fn group_of(&self, id: SegmentId) -> Option<&Group> {
        self.assignments
            .get(&id)
            .and_then(|(index, _)| self.groups.get(*index))
    }

    /// Abgeleitete IDs eines Segments
    pub fn derived_for(&self, id: SegmentId) -> Option<&DerivedIds> {
        self.assignments.get(&id).map(|(_, derived)| derived)
    }

    /// Alle vergebenen Block-IDs in Gruppen- und Nummerierungsreihenfolge
    pub fn external_ids(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().flat_map(move |g| {
            g.members
                .iter()
                .filter_map(move |id| self.derived_for(*id).map(|d| d.block_id.as_str()))
        })
    }

    /// Anzahl gruppierter Segmente
    pub fn assigned_count(&self) -> usize {
        self.assignments.len()
    }

    /// Gruppeninhalte als sortierte Mengen (unabhängig von Nummerierung)
    pub fn partition(&self) -> Vec<Vec<SegmentId>> {
        let mut sets: Vec<Vec<SegmentId>> = self
            .groups
            .iter()
            .map(|g| {
                let mut members = g.members.clone();
                members.sort_unstable();
                members
            })
            .collect();
        sets.sort();
        sets
    }
}

/// Zerlegt den aktuellen Verbindungsgraphen in Gruppen.
///
/// 1. Weichen sind von vornherein ausgeschlossen.
/// 2. Für jedes unbesuchte Nicht-Weichen-Segment (ID-Reihenfolge) startet
///    eine Breitensuche über `next` und `prev`; Weichen-Nachbarn werden
///    nicht betreten.
/// 3. Start/Ende nach der Regel "kein Vorgänger/Nachfolger in der Gruppe",
///    sonst deterministische Ersatzwahl (siehe [`find_terminals`]).
/// 4. Nummerierung der Mitglieder per Breitensuche ab dem Start.
///
/// Verändert den Gleisplan nicht.
pub fn partition(layout: &Layout) -> Grouping {
    let mut visited: IndexSet<SegmentId> = IndexSet::new();
    let mut grouping = Grouping::default();

    for seed in layout.segments() {
        if seed.kind.is_switch() || visited.contains(&seed.id) {
            continue;
        }

        let members = collect_component(layout, seed.id, &mut visited);
        let number = grouping.groups.len() as u32 + 1;
        let (start, end_candidates, start_degenerate) = find_terminals(layout, &members);
        let ordered = number_members(layout, &members, start);
        let (end, end_degenerate) = pick_end(&ordered, &end_candidates);

        let index = grouping.groups.len();
        for (position, &member) in ordered.iter().enumerate() {
            let derived = ids::derive(number, position as u32 + 1);
            grouping.assignments.insert(member, (index, derived));
        }

        if start_degenerate || end_degenerate {
            log::debug!(
                "Gruppe {}: kein eindeutiger Start/Ende (Ring?), Ersatzwahl {} → {}",
                number,
                start,
                end
            );
        }

        grouping.groups.push(Group {
            number,
            id: ids::group_id(number),
            description: format!("Section {}", number),
            last_axle_counter: ids::axle_counter_id(number, ordered.len() as u32 + 1),
            members: ordered,
            start,
            end,
            degenerate: start_degenerate || end_degenerate,
        });
    }

    grouping.turnouts = collect_turnouts(layout, &grouping);
    grouping
}

/// Breitensuche über next/prev ohne Weichen zu betreten.
fn collect_component(
    layout: &Layout,
    seed: SegmentId,
    visited: &mut IndexSet<SegmentId>,
) -> IndexSet<SegmentId> {
    let mut members = IndexSet::new();
    let mut queue = VecDeque::from([seed]);
    visited.insert(seed);

    while let Some(current) = queue.pop_front() {
        members.insert(current);
        let Some(segment) = layout.segment(current) else {
            continue;
        };
        for &neighbor in segment.next().iter().chain(segment.prev()) {
            let Some(neighbor_segment) = layout.segment(neighbor) else {
                continue;
            };
            if neighbor_segment.kind.is_switch() {
                continue;
            }
            if visited.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    members
}

/// Start = kleinste ID ohne Vorgänger in der Gruppe (Ersatz: kleinste ID).
/// Liefert zusätzlich alle End-Kandidaten (kein Nachfolger in der Gruppe).
fn find_terminals(
    layout: &Layout,
    members: &IndexSet<SegmentId>,
) -> (SegmentId, Vec<SegmentId>, bool) {
    let mut sorted: Vec<SegmentId> = members.iter().copied().collect();
    sorted.sort_unstable();

    let has_member_in = |id: SegmentId, next: bool| {
        layout.segment(id).is_some_and(|s| {
            let list = if next { s.next() } else { s.prev() };
            list.iter().any(|n| members.contains(n))
        })
    };

    let start_candidate = sorted.iter().copied().find(|&id| !has_member_in(id, false));
    let end_candidates: Vec<SegmentId> = sorted
        .iter()
        .copied()
        .filter(|&id| !has_member_in(id, true))
        .collect();

    match start_candidate {
        Some(start) => (start, end_candidates, false),
        // `members` enthält immer mindestens den Startknoten der Suche
        None => (sorted.first().copied().unwrap_or_default(), end_candidates, true),
    }
}

/// Ende = der End-Kandidat, der in der Nummerierung zuletzt kommt
/// (Ersatz: letztes Mitglied der Nummerierung).
fn pick_end(ordered: &[SegmentId], candidates: &[SegmentId]) -> (SegmentId, bool) {
    let last_candidate = ordered
        .iter()
        .rev()
        .copied()
        .find(|id| candidates.contains(id));
    match last_candidate {
        Some(end) => (end, false),
        None => (ordered.last().copied().unwrap_or_default(), true),
    }
}

/// Breitensuche ab `start` (next vor prev) nur über Gruppenmitglieder;
/// nicht erreichte Mitglieder folgen in ID-Reihenfolge.
fn number_members(
    layout: &Layout,
    members: &IndexSet<SegmentId>,
    start: SegmentId,
) -> Vec<SegmentId> {
    let mut ordered: IndexSet<SegmentId> = IndexSet::with_capacity(members.len());
    let mut queue = VecDeque::from([start]);
    ordered.insert(start);

    while let Some(current) = queue.pop_front() {
        let Some(segment) = layout.segment(current) else {
            continue;
        };
        for &neighbor in segment.next().iter().chain(segment.prev()) {
            if members.contains(&neighbor) && ordered.insert(neighbor) {
                queue.push_back(neighbor);
            }
        }
    }

    let mut rest: Vec<SegmentId> = members
        .iter()
        .copied()
        .filter(|id| !ordered.contains(id))
        .collect();
    rest.sort_unstable();
    ordered.extend(rest);
    ordered.into_iter().collect()
}

/// Weichen mit mindestens einem gruppierten Nachbarn.
fn collect_turnouts(layout: &Layout, grouping: &Grouping) -> Vec<Turnout> {
    let mut turnouts = Vec::new();
    for switch in layout.segments().filter(|s| s.kind.is_switch()) {
        let mut heads = Vec::new();
        let mut tails = Vec::new();
        for (endpoint, link) in switch.links() {
            if grouping.derived_for(link.peer).is_none() {
                continue;
            }
            match endpoint {
                Endpoint::Start => heads.push(link.peer),
                Endpoint::End | Endpoint::Branch => tails.push(link.peer),
            }
        }
        if heads.is_empty() && tails.is_empty() {
            continue;
        }
        turnouts.push(Turnout {
            id: ids::turnout_id(turnouts.len() as u32 + 1),
            switch: switch.id,
            heads,
            tails,
        });
    }
    turnouts
}
