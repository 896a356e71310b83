//! Orientierungsfälle einer Verbindung und lokale Konsistenzprüfung.

use super::segment::{Endpoint, SegmentId};
use std::fmt;

/// Rolle eines Endpunkts für die Orientierungs-Klassifikation.
///
/// Weichenabzweige zählen als `End`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointRole {
    /// Segment beginnt am Stoß
    Start,
    /// Segment endet am Stoß
    End,
}

impl From<Endpoint> for EndpointRole {
    fn from(endpoint: Endpoint) -> Self {
        match endpoint {
            Endpoint::Start => EndpointRole::Start,
            Endpoint::End | Endpoint::Branch => EndpointRole::End,
        }
    }
}

/// Adjazenzliste eines Segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdjacencyList {
    /// `next`
    Next,
    /// `prev`
    Prev,
}

impl fmt::Display for AdjacencyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjacencyList::Next => f.write_str("next"),
            AdjacencyList::Prev => f.write_str("prev"),
        }
    }
}

/// Einer der vier Orientierungsfälle (A = anfragendes Segment, B = Gegenstelle).
///
/// | A      | B      | A erhält   | B erhält   |
/// |--------|--------|-------------|-------------|
/// | end    | start  | next += B   | prev += A   |
/// | start  | end    | prev += B   | next += A   |
/// | start  | start  | prev += B   | prev += A   |
/// | end    | end    | next += B   | next += A   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// A führt vorwärts in B
    EndToStart,
    /// B führt vorwärts in A
    StartToEnd,
    /// Beide beginnen am Stoß
    StartToStart,
    /// Beide enden am Stoß
    EndToEnd,
}

impl Orientation {
    /// Klassifiziert ein Endpunkt-Paar.
    pub fn classify(point_a: Endpoint, point_b: Endpoint) -> Self {
        match (EndpointRole::from(point_a), EndpointRole::from(point_b)) {
            (EndpointRole::End, EndpointRole::Start) => Orientation::EndToStart,
            (EndpointRole::Start, EndpointRole::End) => Orientation::StartToEnd,
            (EndpointRole::Start, EndpointRole::Start) => Orientation::StartToStart,
            (EndpointRole::End, EndpointRole::End) => Orientation::EndToEnd,
        }
    }

    /// Liste von A, in die B eingetragen wird, und Liste von B, in die A eingetragen wird.
    pub fn lists(self) -> (AdjacencyList, AdjacencyList) {
        match self {
            Orientation::EndToStart => (AdjacencyList::Next, AdjacencyList::Prev),
            Orientation::StartToEnd => (AdjacencyList::Prev, AdjacencyList::Next),
            Orientation::StartToStart => (AdjacencyList::Prev, AdjacencyList::Prev),
            Orientation::EndToEnd => (AdjacencyList::Next, AdjacencyList::Next),
        }
    }
}

/// Nicht-fatale Diagnose aus connect/disconnect.
///
/// Deutet auf einen Fehler in der Klassifikation oder auf bereits
/// inkonsistente Adjazenz hin, nicht auf einen Bedienfehler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyWarning {
    /// `segment` verweist in `list` auf `peer`, aber `peer` verweist nicht zurück
    MissingBackReference {
        /// Segment mit dem Vorwärts-Eintrag
        segment: SegmentId,
        /// Gegenstelle ohne Rückverweis
        peer: SegmentId,
        /// Liste, in der `peer` bei `segment` steht
        list: AdjacencyList,
    },
    /// Beim Trennen stand `peer` nicht in der erwarteten Liste von `segment`
    UnexpectedList {
        /// Getrenntes Segment
        segment: SegmentId,
        /// Gegenstelle
        peer: SegmentId,
        /// Erwartete Liste
        expected: AdjacencyList,
    },
    /// Beim Trennen stand `peer` in keiner Liste von `segment`
    NotAdjacent {
        /// Getrenntes Segment
        segment: SegmentId,
        /// Gegenstelle
        peer: SegmentId,
    },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyWarning::MissingBackReference {
                segment,
                peer,
                list,
            } => write!(
                f,
                "Segment {} hat {} in {}, aber {} verweist weder per next noch per prev zurück",
                segment, peer, list, peer
            ),
            ConsistencyWarning::UnexpectedList {
                segment,
                peer,
                expected,
            } => write!(
                f,
                "Segment {}: {} stand nicht in {} (aus anderer Liste entfernt)",
                segment, peer, expected
            ),
            ConsistencyWarning::NotAdjacent { segment, peer } => write!(
                f,
                "Segment {}: {} stand in keiner Adjazenzliste",
                segment, peer
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_all_four_cases() {
        assert_eq!(
            Orientation::classify(Endpoint::End, Endpoint::Start),
            Orientation::EndToStart
        );
        assert_eq!(
            Orientation::classify(Endpoint::Start, Endpoint::End),
            Orientation::StartToEnd
        );
        assert_eq!(
            Orientation::classify(Endpoint::Start, Endpoint::Start),
            Orientation::StartToStart
        );
        assert_eq!(
            Orientation::classify(Endpoint::End, Endpoint::End),
            Orientation::EndToEnd
        );
    }

    #[test]
    fn test_branch_counts_as_end() {
        assert_eq!(
            Orientation::classify(Endpoint::Branch, Endpoint::Start),
            Orientation::EndToStart
        );
        assert_eq!(
            Orientation::classify(Endpoint::Start, Endpoint::Branch),
            Orientation::StartToEnd
        );
        assert_eq!(
            Orientation::classify(Endpoint::Branch, Endpoint::End),
            Orientation::EndToEnd
        );
    }

    #[test]
    fn test_lists_are_mirrored() {
        assert_eq!(
            Orientation::EndToStart.lists(),
            (AdjacencyList::Next, AdjacencyList::Prev)
        );
        assert_eq!(
            Orientation::StartToStart.lists(),
            (AdjacencyList::Prev, AdjacencyList::Prev)
        );
    }
}
