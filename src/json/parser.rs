//! Parser für Gleisplan-Dateien.
//!
//! Erkennt das Format anhand der Wurzelschlüssel und baut daraus einen
//! ungruppierten [`Layout`]. Verbindungen werden über `connect` neu
//! eingespielt, gespeicherte `next_rails`/`prev_rails` werden ignoriert.
//! Die Gruppierung übernimmt der Aufrufer per `commit_groups`.

use super::model::{BlockGroupsDocument, FlatLayout};
use crate::core::{parse_internal_id, Endpoint, Layout, Pose, SegmentId, SegmentKind};
use anyhow::{bail, Context, Result};
use glam::Vec2;
use indexmap::IndexMap;

/// Erkanntes Dateiformat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// `blockGroups` + `turnouts` + `metadata`
    BlockGroups,
    /// `blocks` nach interner ID
    Flat,
}

/// Ergebnis des Einlesens
#[derive(Debug, Clone)]
pub struct ParsedLayout {
    /// Rekonstruierter, noch ungruppierter Gleisplan
    pub layout: Layout,
    /// Quellformat
    pub format: SourceFormat,
    /// In der Datei gespeicherte Block-IDs je Segment (nur Block-Gruppen-Format)
    pub stored_block_ids: IndexMap<SegmentId, String>,
    /// Übersprungene Verbindungen (unbekannte Segmente oder Endpunkte)
    pub skipped_connections: usize,
}

/// Parsed eine Gleisplan-Datei aus einem JSON-String
pub fn parse_layout(json: &str) -> Result<ParsedLayout> {
    let value: serde_json::Value =
        serde_json::from_str(json).context("Datei ist kein gültiges JSON")?;

    if value.get("blockGroups").is_some() {
        let document: BlockGroupsDocument =
            serde_json::from_value(value).context("Ungültiges Block-Gruppen-Format")?;
        parse_block_groups(&document)
    } else if value.get("blocks").is_some() {
        let flat: FlatLayout =
            serde_json::from_value(value).context("Ungültiges flaches Format")?;
        let (layout, skipped_connections) = rebuild_flat(&flat)?;
        log::info!(
            "Flaches Format geladen: {} Segmente, {} Verbindungen",
            layout.segment_count(),
            layout.connection_count()
        );
        Ok(ParsedLayout {
            layout,
            format: SourceFormat::Flat,
            stored_block_ids: IndexMap::new(),
            skipped_connections,
        })
    } else {
        bail!("Unbekanntes Dateiformat: weder 'blockGroups' noch 'blocks' vorhanden")
    }
}

fn parse_block_groups(document: &BlockGroupsDocument) -> Result<ParsedLayout> {
    let (mut layout, skipped_connections) = match &document.metadata.legacy_data {
        Some(flat) => rebuild_flat(flat)?,
        None => (rebuild_from_blocks(document)?, 0),
    };
    if let Some(next_id) = document.metadata.next_segment_id {
        layout.reserve_ids_until(next_id);
    }

    let mut stored_block_ids = IndexMap::new();
    for group in document.block_groups.values() {
        for block in &group.blocks {
            let Some(original) = &block.original else {
                continue;
            };
            if let Some(id) = parse_internal_id(&original.rail_id) {
                stored_block_ids.insert(id, block.id.clone());
            }
        }
    }

    log::info!(
        "Block-Gruppen-Format geladen: {} Gruppen, {} Segmente, {} Verbindungen",
        document.block_groups.len(),
        layout.segment_count(),
        layout.connection_count()
    );
    Ok(ParsedLayout {
        layout,
        format: SourceFormat::BlockGroups,
        stored_block_ids,
        skipped_connections,
    })
}

/// Rekonstruktion nur aus den Blöcken (ohne flache Kopie): keine Verbindungen.
fn rebuild_from_blocks(document: &BlockGroupsDocument) -> Result<Layout> {
    log::warn!("Keine flache Kopie in den Metadaten, Verbindungen gehen verloren");
    let mut layout = Layout::new();
    for group in document.block_groups.values() {
        for block in &group.blocks {
            match &block.original {
                Some(original) => {
                    let id = parse_internal_id(&original.rail_id).with_context(|| {
                        format!("Ungültige Segment-ID '{}'", original.rail_id)
                    })?;
                    layout.insert_segment(
                        id,
                        original.kind,
                        Pose::new(
                            Vec2::new(original.x, original.y),
                            original.rotation,
                            original.length,
                        ),
                    )?;
                }
                None => {
                    let position = Vec2::new(
                        block.grid_pos[0] as f32 * crate::shared::GRID_SIZE,
                        block.grid_pos[1] as f32 * crate::shared::GRID_SIZE,
                    );
                    layout.add_segment(SegmentKind::Straight, Pose::at(position));
                }
            }
        }
    }
    Ok(layout)
}

/// Baut Segmente mit ihren IDs auf und spielt alle Verbindungen neu ein.
fn rebuild_flat(flat: &FlatLayout) -> Result<(Layout, usize)> {
    let mut layout = Layout::new();
    let mut ids: IndexMap<&str, SegmentId> = IndexMap::with_capacity(flat.blocks.len());

    for (key, record) in &flat.blocks {
        let id = parse_internal_id(&record.id)
            .or_else(|| parse_internal_id(key))
            .with_context(|| format!("Ungültige Segment-ID '{}'", record.id))?;
        layout
            .insert_segment(
                id,
                record.kind,
                Pose::new(Vec2::new(record.x, record.y), record.rotation, record.length),
            )
            .with_context(|| format!("Segment '{}' doppelt vorhanden", record.id))?;
        ids.insert(key.as_str(), id);
        ids.insert(record.id.as_str(), id);
    }
    if let Some(next_id) = flat.next_id {
        layout.reserve_ids_until(next_id);
    }

    let mut skipped = 0;
    for (key, record) in &flat.blocks {
        let Some(&id) = ids.get(key.as_str()) else {
            continue;
        };
        for (point, target) in &record.connections {
            let Some((peer_key, peer_point)) = target else {
                continue;
            };
            let (Ok(point), Ok(peer_point)) =
                (point.parse::<Endpoint>(), peer_point.parse::<Endpoint>())
            else {
                log::warn!(
                    "Verbindung {}.{} → {}.{}: unbekannter Endpunkt, übersprungen",
                    record.id,
                    point,
                    peer_key,
                    peer_point
                );
                skipped += 1;
                continue;
            };
            let peer = ids
                .get(peer_key.as_str())
                .copied()
                .or_else(|| parse_internal_id(peer_key).filter(|&p| layout.contains(p)));
            let Some(peer) = peer else {
                log::warn!(
                    "Verbindung {}.{}: Segment '{}' fehlt, übersprungen",
                    record.id,
                    point,
                    peer_key
                );
                skipped += 1;
                continue;
            };

            // Gegenseite wurde bereits eingespielt
            let already = layout
                .segment(id)
                .and_then(|s| s.link(point))
                .is_some_and(|link| link.peer == peer && link.peer_endpoint == peer_point);
            if already {
                continue;
            }

            if let Err(e) = layout.connect(id, point, peer, peer_point) {
                log::warn!("Verbindung {}.{} übersprungen: {}", record.id, point, e);
                skipped += 1;
            }
        }
    }

    Ok((layout, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEGACY: &str = r##"{
        "version": "1.0",
        "next_id": 4,
        "next_group_id": 1,
        "blocks": {
            "rail_0001": {
                "id": "rail_0001", "type": "straight", "x": 0.0, "y": 0.0,
                "rotation": 0, "length": 100, "color": "#888888",
                "connections": {"start": null, "end": ["rail_0002", "start"]},
                "next_rails": ["rail_0002"], "prev_rails": [], "group_id": null
            },
            "rail_0002": {
                "id": "rail_0002", "type": "switch_left", "x": 100.0, "y": 0.0,
                "connections": {
                    "start": ["rail_0001", "end"],
                    "end1": ["rail_0003", "start"],
                    "end2": null
                },
                "next_rails": ["bogus"], "prev_rails": []
            },
            "rail_0003": {
                "id": "rail_0003", "type": "curved", "x": 200.0, "y": 0.0,
                "connections": {"start": ["rail_0002", "end1"], "end": null}
            }
        },
        "groups": {}
    }"##;

    #[test]
    fn test_parse_legacy_replays_connections() {
        let parsed = parse_layout(LEGACY).expect("Altformat erwartet");
        assert_eq!(parsed.format, SourceFormat::Flat);
        assert_eq!(parsed.skipped_connections, 0);

        let layout = parsed.layout;
        assert_eq!(layout.segment_count(), 3);
        assert_eq!(layout.connection_count(), 2);
        assert_eq!(layout.next_segment_id(), 4);

        let switch = layout.segment(2).expect("Weiche erwartet");
        assert_eq!(switch.kind, SegmentKind::SwitchLeft);
        // gespeicherte next_rails werden ignoriert
        assert_eq!(switch.next().iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(switch.prev().iter().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(switch.link(Endpoint::End).map(|l| l.peer), Some(3));
    }

    #[test]
    fn test_unknown_peer_is_skipped() {
        let json = r#"{"blocks": {"rail_0001": {"id": "rail_0001", "type": "straight",
            "x": 0, "y": 0, "connections": {"end": ["rail_0099", "start"]}}}}"#;
        let parsed = parse_layout(json).expect("Datei erwartet");
        assert_eq!(parsed.skipped_connections, 1);
        assert_eq!(parsed.layout.connection_count(), 0);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        assert!(parse_layout(r#"{"foo": 1}"#).is_err());
        assert!(parse_layout("kein json").is_err());
    }
}
