//! Writer für Gleisplan-Dateien (Block-Gruppen-Format und flaches Format).

use super::model::{
    BlockGroupRecord, BlockGroupsDocument, BlockRecord, BlockRef, FlatGroup, FlatLayout,
    FlatSegment, Metadata, OriginalSegment, SignalRecord, TurnoutRecord, TurnoutSection,
    BLOCK_GROUPS_VERSION, FLAT_VERSION, GROUP_DIRECTION,
};
use crate::core::{ids, format_internal_id, Endpoint, Layout, Segment, SegmentId, SegmentKind};
use anyhow::{bail, Context, Result};
use indexmap::IndexMap;

/// Schreibt den Gleisplan im Block-Gruppen-Format.
///
/// Setzt eine aktuelle, festgeschriebene Gruppierung voraus
/// (siehe [`Layout::commit_groups`]).
pub fn write_block_groups(layout: &Layout, grid_size: f32) -> Result<String> {
    let timestamp = chrono::Utc::now().to_rfc3339();
    let document = build_block_groups(layout, grid_size, &timestamp)?;
    serde_json::to_string_pretty(&document).context("Block-Gruppen konnten nicht serialisiert werden")
}

/// Baut das Dokument des Block-Gruppen-Formats mit festem Zeitstempel.
pub fn build_block_groups(
    layout: &Layout,
    grid_size: f32,
    last_updated: &str,
) -> Result<BlockGroupsDocument> {
    let Some(grouping) = layout.grouping() else {
        bail!("Keine festgeschriebene Gruppierung vorhanden");
    };
    if layout.is_grouping_stale() {
        bail!("Gruppierung ist veraltet, zuerst neu gruppieren");
    }
    if grid_size <= 0.0 {
        bail!("Ungültige Rasterweite: {}", grid_size);
    }

    let block_id_of = |id: SegmentId| -> Option<String> {
        grouping.derived_for(id).map(|d| d.block_id.clone())
    };

    let mut block_groups = IndexMap::with_capacity(grouping.groups.len());
    for group in &grouping.groups {
        let mut blocks = Vec::with_capacity(group.members.len());
        for &member in &group.members {
            let segment = layout
                .segment(member)
                .with_context(|| format!("Gruppenmitglied {} fehlt im Gleisplan", member))?;
            let derived = grouping
                .derived_for(member)
                .with_context(|| format!("Segment {} ohne abgeleitete IDs", member))?;

            blocks.push(BlockRecord {
                id: derived.block_id.clone(),
                description: format!("Block {} ({})", derived.block_id, segment.kind),
                axle_counter: Some(derived.axle_counter.clone()),
                signals: vec![
                    SignalRecord {
                        id: derived.signal_forward.clone(),
                        direction: 0,
                    },
                    SignalRecord {
                        id: derived.signal_backward.clone(),
                        direction: 1,
                    },
                ],
                grid_pos: [
                    (segment.pose.position.x / grid_size).floor() as i64,
                    (segment.pose.position.y / grid_size).floor() as i64,
                ],
                original: Some(original_of(segment)),
            });
        }

        block_groups.insert(
            group.id.clone(),
            BlockGroupRecord {
                id: group.id.clone(),
                description: group.description.clone(),
                blocks,
                direction: GROUP_DIRECTION.to_string(),
                start_block_id: block_id_of(group.start),
                end_block_id: block_id_of(group.end),
                last_block_axle_counter: Some(group.last_axle_counter.clone()),
            },
        );
    }

    let turnouts = grouping
        .turnouts
        .iter()
        .map(|t| TurnoutRecord {
            id: t.id.clone(),
            heads: t
                .heads
                .iter()
                .filter_map(|&id| block_id_of(id).map(|id| BlockRef { id }))
                .collect(),
            tails: t
                .tails
                .iter()
                .filter_map(|&id| block_id_of(id).map(|id| BlockRef { id }))
                .collect(),
            switch_rail_id: Some(format_internal_id(t.switch)),
        })
        .collect();

    let next_group = grouping.groups.len() as u32 + 1;
    log::info!(
        "Block-Gruppen-Export: {} Gruppen, {} Weichengruppen",
        grouping.groups.len(),
        grouping.turnouts.len()
    );

    Ok(BlockGroupsDocument {
        block_groups,
        turnouts: TurnoutSection { groups: turnouts },
        metadata: Metadata {
            next_block_id: Some(ids::block_id(next_group, 1)),
            next_group_id: Some(ids::group_id(next_group)),
            next_segment_id: Some(layout.next_segment_id()),
            version: Some(BLOCK_GROUPS_VERSION.to_string()),
            last_updated: Some(last_updated.to_string()),
            legacy_data: Some(build_flat_layout(layout)),
        },
    })
}

/// Schreibt den Gleisplan im flachen Format (ohne Gruppierungspflicht).
pub fn write_flat_layout(layout: &Layout) -> Result<String> {
    serde_json::to_string_pretty(&build_flat_layout(layout))
        .context("Flaches Format konnte nicht serialisiert werden")
}

/// Baut die flache Abbildung aller Segmente inkl. Weichen und Verbindungen.
pub fn build_flat_layout(layout: &Layout) -> FlatLayout {
    let blocks = layout
        .segments()
        .map(|segment| (format_internal_id(segment.id), flat_segment(layout, segment)))
        .collect();

    let groups = layout
        .grouping()
        .filter(|_| !layout.is_grouping_stale())
        .map(|grouping| {
            grouping
                .groups
                .iter()
                .map(|g| {
                    (
                        g.id.clone(),
                        FlatGroup {
                            id: g.id.clone(),
                            name: g.description.clone(),
                            rail_ids: g.members.iter().map(|&m| format_internal_id(m)).collect(),
                        },
                    )
                })
                .collect()
        })
        .unwrap_or_default();

    let next_group_id = layout
        .grouping()
        .map(|g| g.groups.len() as u64 + 1)
        .unwrap_or(1);

    FlatLayout {
        version: Some(FLAT_VERSION.to_string()),
        next_id: Some(layout.next_segment_id()),
        next_group_id: Some(next_group_id),
        blocks,
        groups,
    }
}

/// Endpunktname im Dateiformat: Weichen nutzen `end1`/`end2`.
pub fn file_endpoint_name(kind: SegmentKind, endpoint: Endpoint) -> String {
    match (kind.is_switch(), endpoint) {
        (true, Endpoint::End) => "end1".to_string(),
        (true, Endpoint::Branch) => "end2".to_string(),
        _ => endpoint.as_str().to_string(),
    }
}

fn flat_segment(layout: &Layout, segment: &Segment) -> FlatSegment {
    let connections = segment
        .kind
        .endpoints()
        .iter()
        .map(|&endpoint| {
            let peer = segment.link(endpoint).map(|link| {
                let peer_kind = layout
                    .segment(link.peer)
                    .map(|p| p.kind)
                    .unwrap_or_default();
                (
                    format_internal_id(link.peer),
                    file_endpoint_name(peer_kind, link.peer_endpoint),
                )
            });
            (file_endpoint_name(segment.kind, endpoint), peer)
        })
        .collect();

    FlatSegment {
        id: format_internal_id(segment.id),
        kind: segment.kind,
        x: segment.pose.position.x,
        y: segment.pose.position.y,
        rotation: segment.pose.rotation,
        length: segment.pose.length,
        connections,
        next_rails: segment.next().iter().map(|&id| format_internal_id(id)).collect(),
        prev_rails: segment.prev().iter().map(|&id| format_internal_id(id)).collect(),
        group_id: segment.group_id().map(str::to_string),
    }
}

fn original_of(segment: &Segment) -> OriginalSegment {
    OriginalSegment {
        rail_id: format_internal_id(segment.id),
        kind: segment.kind,
        x: segment.pose.position.x,
        y: segment.pose.position.y,
        rotation: segment.pose.rotation,
        length: segment.pose.length,
    }
}
