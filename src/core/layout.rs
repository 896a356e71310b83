//! Der Gleisplan als explizit besessenes Aggregat: Segmente, Verbindungsgraph
//! und die zuletzt erfolgreich festgeschriebene Gruppierung.

use super::connection::{AdjacencyList, ConsistencyWarning, Orientation};
use super::grouping::{self, Grouping};
use super::segment::{Endpoint, Link, Pose, Segment, SegmentId, SegmentKind};
use super::validation::{self, GroupingPolicy, ValidationReport};
use glam::Vec2;
use indexmap::IndexMap;
use thiserror::Error;

/// Fehler lokaler Graph-Operationen. Bei einem Fehler bleibt der Zustand unverändert.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    /// Segment existiert nicht
    #[error("Segment {0} existiert nicht")]
    UnknownSegment(SegmentId),
    /// Segmentart hat diesen Endpunkt nicht
    #[error("Segment {segment} ({kind}) hat keinen Endpunkt '{endpoint}'")]
    UnknownEndpoint {
        /// Segment
        segment: SegmentId,
        /// Segmentart
        kind: SegmentKind,
        /// Angefragter Endpunkt
        endpoint: Endpoint,
    },
    /// Endpunkt ist nicht verbunden
    #[error("Endpunkt '{endpoint}' von Segment {segment} ist nicht verbunden")]
    NotConnected {
        /// Segment
        segment: SegmentId,
        /// Endpunkt
        endpoint: Endpoint,
    },
    /// Verbindung eines Segments mit sich selbst
    #[error("Segment {0} kann nicht mit sich selbst verbunden werden")]
    SelfConnection(SegmentId),
    /// ID bereits vergeben (nur beim Laden)
    #[error("Segment-ID {0} ist bereits vergeben")]
    DuplicateId(SegmentId),
}

/// Ergebnis eines erfolgreichen `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectOutcome {
    /// Erkannter Orientierungsfall
    pub orientation: Orientation,
    /// Diagnosen der lokalen Konsistenzprüfung (inkl. implizitem Trennen)
    pub warnings: Vec<ConsistencyWarning>,
}

/// Ergebnis eines erfolgreichen `disconnect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectOutcome {
    /// Ehemalige Gegenstelle
    pub peer: Link,
    /// Diagnosen beim Abbau der Adjazenz
    pub warnings: Vec<ConsistencyWarning>,
}

/// Freier Endpunkt in der Nähe einer Weltposition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EndpointMatch {
    /// Segment
    pub segment: SegmentId,
    /// Endpunkt
    pub endpoint: Endpoint,
    /// Abstand zur Anfrage-Position
    pub distance: f32,
}

/// Vollständiger Gleisplan
#[derive(Debug, Clone)]
pub struct Layout {
    /// Segmente, aufsteigend nach ID sortiert
    segments: IndexMap<SegmentId, Segment>,
    /// Nächste freie interne ID
    next_id: SegmentId,
    /// Zuletzt festgeschriebene Gruppierung
    grouping: Option<Grouping>,
    /// Strukturelle Änderung seit dem letzten Commit
    stale: bool,
}

impl Layout {
    /// Erstellt einen leeren Gleisplan
    pub fn new() -> Self {
        Self {
            segments: IndexMap::new(),
            next_id: 1,
            grouping: None,
            stale: false,
        }
    }

    // ── Segmente ────────────────────────────────────────────────────

    /// Legt ein unverbundenes Segment an und gibt die neue ID zurück
    pub fn add_segment(&mut self, kind: SegmentKind, pose: Pose) -> SegmentId {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.segments.insert(id, Segment::new(id, kind, pose));
        self.stale = true;
        id
    }

    /// Fügt ein Segment mit vorgegebener ID ein (Laden aus Datei).
    pub fn insert_segment(
        &mut self,
        id: SegmentId,
        kind: SegmentKind,
        pose: Pose,
    ) -> Result<(), LayoutError> {
        if self.segments.contains_key(&id) {
            return Err(LayoutError::DuplicateId(id));
        }
        let out_of_order = self.segments.last().is_some_and(|(&last, _)| last > id);
        self.segments.insert(id, Segment::new(id, kind, pose));
        if out_of_order {
            self.segments.sort_keys();
        }
        self.next_id = self.next_id.max(id + 1);
        self.stale = true;
        Ok(())
    }

    /// Entfernt ein Segment. Alle Verbindungen werden vorher auf beiden Seiten getrennt.
    pub fn remove_segment(&mut self, id: SegmentId) -> Result<Segment, LayoutError> {
        let endpoints: Vec<Endpoint> = self.get(id)?.connections.keys().copied().collect();
        for endpoint in endpoints {
            self.disconnect(id, endpoint)?;
        }

        // Verwaiste Verweise aus früheren Inkonsistenzen aufräumen
        for other in self.segments.values_mut() {
            let stray = other.next.shift_remove(&id) | other.prev.shift_remove(&id);
            if stray {
                log::warn!(
                    "Verwaister Verweis auf Segment {} in Segment {} entfernt",
                    id,
                    other.id
                );
            }
        }

        let removed = self
            .segments
            .shift_remove(&id)
            .ok_or(LayoutError::UnknownSegment(id))?;
        self.stale = true;
        log::info!("Segment {} ({}) entfernt", id, removed.kind);
        Ok(removed)
    }

    /// Verschiebt ein Segment (beeinflusst die Gruppierung nicht)
    pub fn move_segment(&mut self, id: SegmentId, position: Vec2) -> Result<(), LayoutError> {
        self.get_mut(id)?.pose.position = position;
        Ok(())
    }

    /// Dreht ein Segment (Grad)
    pub fn rotate_segment(&mut self, id: SegmentId, rotation: f32) -> Result<(), LayoutError> {
        self.get_mut(id)?.pose.rotation = rotation.rem_euclid(360.0);
        Ok(())
    }

    /// Entfernt alle Segmente und setzt die ID-Zähler zurück
    pub fn clear(&mut self) {
        *self = Self::new();
    }

    /// Segment per ID
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.get(&id)
    }

    /// Prüft ob ein Segment existiert
    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.contains_key(&id)
    }

    /// Alle Segmente in ID-Reihenfolge
    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.segments.values()
    }

    /// Anzahl der Segmente
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Anzahl der Verbindungen (jede Verbindung zählt einmal)
    pub fn connection_count(&self) -> usize {
        self.segments
            .values()
            .map(|s| s.connections.len())
            .sum::<usize>()
            / 2
    }

    /// Nächste freie interne ID
    pub fn next_segment_id(&self) -> SegmentId {
        self.next_id.max(1)
    }

    /// Hebt den ID-Zähler an (z.B. aus Datei-Metadaten); verkleinert ihn nie.
    pub fn reserve_ids_until(&mut self, next_id: SegmentId) {
        self.next_id = self.next_id.max(next_id);
    }

    fn get(&self, id: SegmentId) -> Result<&Segment, LayoutError> {
        self.segments.get(&id).ok_or(LayoutError::UnknownSegment(id))
    }

    fn get_mut(&mut self, id: SegmentId) -> Result<&mut Segment, LayoutError> {
        self.segments
            .get_mut(&id)
            .ok_or(LayoutError::UnknownSegment(id))
    }

    fn check_endpoint(&self, id: SegmentId, endpoint: Endpoint) -> Result<(), LayoutError> {
        let segment = self.get(id)?;
        if segment.kind.has_endpoint(endpoint) {
            Ok(())
        } else {
            Err(LayoutError::UnknownEndpoint {
                segment: id,
                kind: segment.kind,
                endpoint,
            })
        }
    }

    // ── Verbindungen ────────────────────────────────────────────────

    /// Verbindet `point_a` von `a` mit `point_b` von `b`.
    ///
    /// Bereits belegte Endpunkte werden vorher getrennt. Danach wird
    /// `next`/`prev` gemäß [`Orientation`] gepflegt und die neue Kante
    /// lokal geprüft; Befunde landen als Warnung im Ergebnis.
    pub fn connect(
        &mut self,
        a: SegmentId,
        point_a: Endpoint,
        b: SegmentId,
        point_b: Endpoint,
    ) -> Result<ConnectOutcome, LayoutError> {
        self.check_endpoint(a, point_a)?;
        self.check_endpoint(b, point_b)?;
        if a == b {
            return Err(LayoutError::SelfConnection(a));
        }

        let mut warnings = Vec::new();
        for (id, endpoint) in [(a, point_a), (b, point_b)] {
            if self.get(id)?.connections.contains_key(&endpoint) {
                log::debug!(
                    "Endpunkt {} von Segment {} bereits belegt, wird zuerst getrennt",
                    endpoint,
                    id
                );
                warnings.extend(self.disconnect(id, endpoint)?.warnings);
            }
        }

        self.get_mut(a)?.connections.insert(
            point_a,
            Link {
                peer: b,
                peer_endpoint: point_b,
            },
        );
        self.get_mut(b)?.connections.insert(
            point_b,
            Link {
                peer: a,
                peer_endpoint: point_a,
            },
        );

        let orientation = Orientation::classify(point_a, point_b);
        let (list_a, list_b) = orientation.lists();
        adjacency_mut(self.get_mut(a)?, list_a).insert(b);
        adjacency_mut(self.get_mut(b)?, list_b).insert(a);

        let probe = self.probe_edge(a, b);
        for warning in &probe {
            log::warn!("Inkonsistenz direkt nach connect: {}", warning);
        }
        warnings.extend(probe);

        self.stale = true;
        log::debug!(
            "Verbunden: {}.{} ↔ {}.{} ({:?})",
            a,
            point_a,
            b,
            point_b,
            orientation
        );
        Ok(ConnectOutcome {
            orientation,
            warnings,
        })
    }

    /// Trennt die Verbindung an `point` von `segment` auf beiden Seiten.
    ///
    /// Der Peer wird aus den Listen entfernt, die der gespeicherte
    /// Orientierungsfall vorgibt. Steht er dort nicht, wird er aus der
    /// anderen Liste entfernt und eine Warnung erzeugt.
    pub fn disconnect(
        &mut self,
        segment: SegmentId,
        point: Endpoint,
    ) -> Result<DisconnectOutcome, LayoutError> {
        self.check_endpoint(segment, point)?;
        let link = self
            .get(segment)?
            .link(point)
            .ok_or(LayoutError::NotConnected {
                segment,
                endpoint: point,
            })?;

        self.get_mut(segment)?.connections.shift_remove(&point);
        if let Some(peer) = self.segments.get_mut(&link.peer) {
            let mirrored = peer.link(link.peer_endpoint)
                == Some(Link {
                    peer: segment,
                    peer_endpoint: point,
                });
            if mirrored {
                peer.connections.shift_remove(&link.peer_endpoint);
            } else {
                log::warn!(
                    "Endpunkt {}.{} war nicht gespiegelt mit {}.{}",
                    link.peer,
                    link.peer_endpoint,
                    segment,
                    point
                );
            }
        }

        let (list_a, list_b) = Orientation::classify(point, link.peer_endpoint).lists();
        let mut warnings = Vec::new();
        warnings.extend(self.unlink(segment, link.peer, list_a));
        warnings.extend(self.unlink(link.peer, segment, list_b));
        for warning in &warnings {
            log::warn!("Inkonsistenz beim Trennen: {}", warning);
        }

        self.stale = true;
        log::debug!(
            "Getrennt: {}.{} ↔ {}.{}",
            segment,
            point,
            link.peer,
            link.peer_endpoint
        );
        Ok(DisconnectOutcome {
            peer: link,
            warnings,
        })
    }

    /// Entfernt `peer` aus der Liste `expected` von `id`, sofern keine
    /// verbleibende Verbindung zwischen beiden den Eintrag noch begründet.
    fn unlink(
        &mut self,
        id: SegmentId,
        peer: SegmentId,
        expected: AdjacencyList,
    ) -> Vec<ConsistencyWarning> {
        let Some(segment) = self.segments.get_mut(&id) else {
            return Vec::new();
        };

        let still_required = |list: AdjacencyList| {
            segment
                .connections
                .iter()
                .filter(|(_, link)| link.peer == peer)
                .any(|(&ep, link)| Orientation::classify(ep, link.peer_endpoint).lists().0 == list)
        };
        let other = match expected {
            AdjacencyList::Next => AdjacencyList::Prev,
            AdjacencyList::Prev => AdjacencyList::Next,
        };
        if still_required(expected) {
            return Vec::new();
        }
        let other_required = still_required(other);

        if adjacency_mut(segment, expected).shift_remove(&peer) {
            Vec::new()
        } else if !other_required && adjacency_mut(segment, other).shift_remove(&peer) {
            vec![ConsistencyWarning::UnexpectedList {
                segment: id,
                peer,
                expected,
            }]
        } else if other_required {
            Vec::new()
        } else {
            vec![ConsistencyWarning::NotAdjacent { segment: id, peer }]
        }
    }

    /// Lokale Prüfung einer frischen Kante: jeder Vorwärtsverweis braucht
    /// einen Rückverweis in next oder prev der Gegenstelle.
    fn probe_edge(&self, a: SegmentId, b: SegmentId) -> Vec<ConsistencyWarning> {
        let (Some(seg_a), Some(seg_b)) = (self.segments.get(&a), self.segments.get(&b)) else {
            return Vec::new();
        };
        let mut warnings = Vec::new();
        for (from, to) in [(seg_a, seg_b), (seg_b, seg_a)] {
            for (list, entries) in [(AdjacencyList::Next, &from.next), (AdjacencyList::Prev, &from.prev)]
            {
                if entries.contains(&to.id) && !to.is_adjacent_to(from.id) {
                    warnings.push(ConsistencyWarning::MissingBackReference {
                        segment: from.id,
                        peer: to.id,
                        list,
                    });
                }
            }
        }
        warnings
    }

    /// Nächster freier Endpunkt innerhalb von `radius` um `point`.
    pub fn nearest_free_endpoint(
        &self,
        point: Vec2,
        radius: f32,
        exclude: Option<SegmentId>,
    ) -> Option<EndpointMatch> {
        self.segments
            .values()
            .filter(|s| Some(s.id) != exclude)
            .flat_map(|s| {
                s.free_endpoints().filter_map(move |ep| {
                    let pos = s.endpoint_position(ep)?;
                    Some(EndpointMatch {
                        segment: s.id,
                        endpoint: ep,
                        distance: pos.distance(point),
                    })
                })
            })
            .filter(|m| m.distance <= radius)
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
    }

    // ── Gruppierung ─────────────────────────────────────────────────

    /// Baut die Gruppen neu auf, prüft den gesamten Graphen und schreibt
    /// das Ergebnis nur bei Erfolg fest.
    ///
    /// Bei einem Fehler bleiben Gruppen-IDs und abgeleitete IDs aller
    /// Segmente exakt wie vor dem Aufruf; der Verbindungsgraph wird nie verändert.
    pub fn commit_groups(&mut self, policy: &GroupingPolicy) -> Result<&Grouping, ValidationReport> {
        let proposal = grouping::partition(self);
        let report = validation::validate(self, &proposal, policy);
        if !report.is_empty() {
            log::warn!(
                "Gruppierung verworfen: {} Validierungsfehler",
                report.issues.len()
            );
            return Err(report);
        }

        for segment in self.segments.values_mut() {
            segment.group_id = None;
            segment.derived = None;
        }
        for (index, group) in proposal.groups.iter().enumerate() {
            for &member in &group.members {
                if let Some(segment) = self.segments.get_mut(&member) {
                    segment.group_id = Some(group.id.clone());
                    segment.derived = proposal.derived_for(member).cloned();
                }
            }
            log::debug!(
                "Gruppe {} ({}): {} Segmente, Start {}, Ende {}",
                index + 1,
                group.id,
                group.members.len(),
                group.start,
                group.end
            );
        }

        log::info!(
            "Gruppierung festgeschrieben: {} Gruppen, {} Weichengruppen",
            proposal.groups.len(),
            proposal.turnouts.len()
        );
        self.stale = false;
        let committed: &Grouping = self.grouping.insert(proposal);
        Ok(committed)
    }

    /// Zuletzt festgeschriebene Gruppierung
    pub fn grouping(&self) -> Option<&Grouping> {
        self.grouping.as_ref()
    }

    /// Struktur wurde seit dem letzten Commit verändert
    pub fn is_grouping_stale(&self) -> bool {
        self.stale || self.grouping.is_none()
    }

    /// Sucht ein Segment über seine externe Block-ID
    pub fn find_by_external_id(&self, external_id: &str) -> Option<&Segment> {
        self.segments
            .values()
            .find(|s| s.external_id() == Some(external_id))
    }

    #[cfg(test)]
    pub(crate) fn segment_mut_for_test(&mut self, id: SegmentId) -> Option<&mut Segment> {
        self.segments.get_mut(&id)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::new()
    }
}

fn adjacency_mut(segment: &mut Segment, list: AdjacencyList) -> &mut indexmap::IndexSet<SegmentId> {
    match list {
        AdjacencyList::Next => &mut segment.next,
        AdjacencyList::Prev => &mut segment.prev,
    }
}
