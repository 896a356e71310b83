//! Use-Case-Funktionen für Dateiaktionen.
//! Alle Dateisystem-Operationen (I/O) sind hier zentralisiert.

use super::grouping;
use crate::app::AppState;
use crate::core::ValidationReport;
use anyhow::{bail, Context, Result};

/// Lädt eine Gleisplan-Datei (Block-Gruppen- oder flaches Format).
///
/// Danach wird immer neu gruppiert. Scheitert die Validierung, bleibt der
/// Plan geladen und der Bericht liegt in `state.last_report`.
pub fn load_file(state: &mut AppState, path: String) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Datei konnte nicht gelesen werden: {}", path))?;
    let parsed = crate::json::parse_layout(&content)
        .with_context(|| format!("Datei konnte nicht geparst werden: {}", path))?;

    log::info!(
        "Gleisplan geladen ({:?}): {} Segmente, {} Verbindungen",
        parsed.format,
        parsed.layout.segment_count(),
        parsed.layout.connection_count()
    );
    if parsed.skipped_connections > 0 {
        log::warn!(
            "{} Verbindungen beim Laden übersprungen",
            parsed.skipped_connections
        );
    }

    state.layout = parsed.layout;
    state.current_file_path = Some(path);
    state.last_warnings.clear();

    match grouping::commit_groups(state) {
        Ok(()) => {
            let changed = parsed
                .stored_block_ids
                .iter()
                .filter(|(id, stored)| {
                    state
                        .layout
                        .segment(**id)
                        .and_then(|s| s.external_id())
                        != Some(stored.as_str())
                })
                .count();
            if changed > 0 {
                log::warn!(
                    "{} Block-IDs weichen nach dem Neugruppieren von der Datei ab",
                    changed
                );
            }
        }
        Err(e) => match e.downcast_ref::<ValidationReport>() {
            Some(report) => {
                log::warn!("Geladener Gleisplan ist ungültig: {}", report);
                // Der neue Plan hat noch keine externen IDs
                state.status.register_ids(std::iter::empty::<String>());
            }
            None => return Err(e),
        },
    }
    Ok(())
}

/// Speichert im Block-Gruppen-Format (mit vorherigem Commit).
///
/// `None` speichert unter dem aktuell bekannten Pfad.
pub fn save_file(state: &mut AppState, path: Option<String>) -> Result<()> {
    let Some(path) = path.or_else(|| state.current_file_path.clone()) else {
        bail!("Kein Speicherpfad bekannt");
    };
    if state.layout.segment_count() == 0 {
        bail!("Leerer Gleisplan kann nicht gespeichert werden");
    }

    grouping::commit_groups(state)?;
    let json = crate::json::write_block_groups(&state.layout, state.options.grid_size)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Datei konnte nicht geschrieben werden: {}", path))?;

    log::info!("Gleisplan gespeichert: {}", path);
    state.status_message = Some(format!("Gespeichert: {}", path));
    state.current_file_path = Some(path);
    Ok(())
}

/// Exportiert das flache Format (auch ohne gültige Gruppierung).
pub fn export_flat_layout(state: &mut AppState, path: String) -> Result<()> {
    let json = crate::json::write_flat_layout(&state.layout)?;
    std::fs::write(&path, json)
        .with_context(|| format!("Datei konnte nicht geschrieben werden: {}", path))?;
    log::info!("Flaches Format exportiert: {}", path);
    state.status_message = Some(format!("Exportiert: {}", path));
    Ok(())
}

/// Übernimmt neue Optionen und speichert sie neben der Binary.
pub fn apply_options(state: &mut AppState, options: crate::shared::EditorOptions) -> Result<()> {
    options.save_to_file(&crate::shared::EditorOptions::config_path())?;
    state.status.set_palette(options.status_palette());
    state.options = options;
    Ok(())
}
