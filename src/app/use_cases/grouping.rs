//! Use-Case: Gruppen bilden, prüfen und festschreiben.

use crate::app::AppState;
use anyhow::Result;

/// Bildet die Gruppen neu und schreibt sie bei Erfolg fest.
///
/// Bei Validierungsfehlern bleibt der vorherige Zustand erhalten, der
/// Bericht liegt in `state.last_report` und wird als Fehler zurückgegeben
/// (per `downcast_ref::<ValidationReport>()` abrufbar).
pub fn commit_groups(state: &mut AppState) -> Result<()> {
    let policy = state.options.grouping_policy();
    let external_ids: Vec<String> = match state.layout.commit_groups(&policy) {
        Ok(grouping) => grouping.external_ids().map(str::to_string).collect(),
        Err(report) => {
            state.status_message = Some(format!(
                "Gruppierung fehlgeschlagen: {} Fehler",
                report.len()
            ));
            state.last_report = Some(report.clone());
            return Err(report.into());
        }
    };

    state.status.register_ids(external_ids);
    state.last_report = None;
    state.status_message = Some(format!(
        "{} Gruppen gebildet, {} Blöcke",
        state.group_count(),
        state.status.len()
    ));
    Ok(())
}
