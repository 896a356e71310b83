//! Use-Case-Funktionen für Live-Statusmeldungen.

use crate::app::AppState;
use crate::core::{BatchOutcome, StatusError};
use crate::net::{RejectedItem, Request, Response, StatusItem};
use anyhow::Result;

/// Quittungstext in `ack`-Antworten
const ACK_RECEIVED: &str = "received";

/// Setzt einen einzelnen Status.
pub fn apply_status(state: &mut AppState, external_id: &str, status: &str) -> Result<()> {
    state.status.set_status_str(external_id, status)?;
    Ok(())
}

/// Wendet eine Sammelmeldung an; das Ergebnis liegt in `state.last_batch`.
pub fn apply_batch(state: &mut AppState, updates: &[(String, String)]) {
    let outcome = state
        .status
        .apply_batch(updates.iter().map(|(id, status)| (id.as_str(), status.as_str())));
    log::debug!(
        "Sammelmeldung: {} angewendet, {} abgelehnt",
        outcome.applied.len(),
        outcome.rejected.len()
    );
    state.last_batch = Some(outcome);
}

/// Setzt alle Statuswerte zurück.
pub fn reset_statuses(state: &mut AppState) {
    state.status.reset_all();
    state.status_message = Some("Statusfarben zurückgesetzt".to_string());
}

/// Registriert einen neuen Client.
pub fn client_connected(state: &mut AppState, client_id: String) {
    log::info!("Client verbunden: {}", client_id);
    state.connected_clients.push(client_id);
}

/// Entfernt einen Client.
pub fn client_disconnected(state: &mut AppState, client_id: &str) {
    log::info!("Client getrennt: {}", client_id);
    state.connected_clients.retain(|c| c != client_id);
}

/// Beantwortet eine dekodierte Protokoll-Anfrage.
pub fn answer_request(state: &mut AppState, client_id: &str, request: Request) -> Response {
    match request {
        Request::Ping { timestamp } => Response::Pong { timestamp },
        Request::StatusUpdate(item) => {
            let segment_id = item.segment_id.clone();
            let (updates, mut rejected) = split_items(vec![item]);
            apply_batch(state, &updates);
            rejected.extend(rejected_from(state.last_batch.clone()));
            log::debug!(
                "{}: Statusmeldung {:?} ({} abgelehnt)",
                client_id,
                segment_id,
                rejected.len()
            );
            Response::Ack {
                segment_id,
                updates_received: None,
                status: ACK_RECEIVED.to_string(),
                rejected,
            }
        }
        Request::BatchUpdate(items) => {
            let (updates, mut rejected) = split_items(items);
            apply_batch(state, &updates);
            let batch = state.last_batch.clone();
            let received = batch.as_ref().map_or(0, |b| b.applied.len());
            rejected.extend(rejected_from(batch));
            log::info!(
                "{}: Sammelmeldung mit {} Einträgen, {} abgelehnt",
                client_id,
                received + rejected.len(),
                rejected.len()
            );
            Response::Ack {
                segment_id: None,
                updates_received: Some(received),
                status: ACK_RECEIVED.to_string(),
                rejected,
            }
        }
    }
}

/// Trennt vollständige Einträge von solchen mit fehlenden Feldern.
fn split_items(items: Vec<StatusItem>) -> (Vec<(String, String)>, Vec<RejectedItem>) {
    let mut updates = Vec::with_capacity(items.len());
    let mut rejected = Vec::new();
    for item in items {
        match (item.segment_id, item.status) {
            (Some(id), Some(status)) => updates.push((id, status)),
            (None, _) => rejected.push(RejectedItem {
                segment_id: String::new(),
                reason: "segment_id fehlt".to_string(),
            }),
            (Some(id), None) => rejected.push(RejectedItem {
                segment_id: id,
                reason: "status fehlt".to_string(),
            }),
        }
    }
    (updates, rejected)
}

fn rejected_from(batch: Option<BatchOutcome>) -> Vec<RejectedItem> {
    batch
        .map(|b| b.rejected)
        .unwrap_or_default()
        .into_iter()
        .map(|(segment_id, error): (String, StatusError)| RejectedItem {
            segment_id,
            reason: error.to_string(),
        })
        .collect()
}
