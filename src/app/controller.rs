//! Application Controller für zentrale Command-Verarbeitung.

use super::use_cases;
use super::{AppCommand, AppState};
use crate::net::ServerEvent;

/// Orchestriert Commands und Server-Ereignisse auf den AppState.
///
/// Alle Mutationen laufen über diesen einen Kontrollfluss.
#[derive(Default)]
pub struct AppController;

impl AppController {
    /// Erstellt einen neuen Controller.
    pub fn new() -> Self {
        Self
    }

    /// Führt mutierende Commands auf dem AppState aus.
    pub fn handle_command(
        &mut self,
        state: &mut AppState,
        command: AppCommand,
    ) -> anyhow::Result<()> {
        state.command_log.record(&command);

        match command {
            // === Editing ===
            AppCommand::AddSegment { kind, pose } => {
                use_cases::editing::add_segment(state, kind, pose);
            }
            AppCommand::RemoveSegment { id } => use_cases::editing::remove_segment(state, id)?,
            AppCommand::MoveSegment { id, position } => {
                use_cases::editing::move_segment(state, id, position)?
            }
            AppCommand::RotateSegment { id, rotation } => {
                use_cases::editing::rotate_segment(state, id, rotation)?
            }
            AppCommand::ConnectEndpoints {
                a,
                point_a,
                b,
                point_b,
            } => use_cases::editing::connect(state, a, point_a, b, point_b)?,
            AppCommand::SnapEndpoint {
                segment,
                endpoint,
                max_distance,
            } => use_cases::editing::snap_endpoint(state, segment, endpoint, max_distance)?,
            AppCommand::DisconnectEndpoint { segment, endpoint } => {
                use_cases::editing::disconnect(state, segment, endpoint)?
            }
            AppCommand::ClearLayout => use_cases::editing::clear_layout(state),

            // === Gruppierung ===
            AppCommand::CommitGroups => use_cases::grouping::commit_groups(state)?,

            // === Datei-I/O ===
            AppCommand::LoadFile { path } => use_cases::file_io::load_file(state, path)?,
            AppCommand::SaveFile { path } => use_cases::file_io::save_file(state, path)?,
            AppCommand::ExportFlatLayout { path } => {
                use_cases::file_io::export_flat_layout(state, path)?
            }
            AppCommand::ApplyOptions { options } => {
                use_cases::file_io::apply_options(state, *options)?
            }

            // === Status ===
            AppCommand::ApplyStatus {
                external_id,
                status,
            } => use_cases::monitoring::apply_status(state, &external_id, &status)?,
            AppCommand::ApplyStatusBatch { updates } => {
                use_cases::monitoring::apply_batch(state, &updates)
            }
            AppCommand::ResetStatuses => use_cases::monitoring::reset_statuses(state),
        }

        Ok(())
    }

    /// Verarbeitet ein Ereignis des Status-Servers und beantwortet Anfragen.
    pub fn handle_server_event(&mut self, state: &mut AppState, event: ServerEvent) {
        match event {
            ServerEvent::ClientConnected { client_id, peer } => {
                log::debug!("{} verbunden von {}", client_id, peer);
                use_cases::monitoring::client_connected(state, client_id);
            }
            ServerEvent::ClientDisconnected { client_id } => {
                use_cases::monitoring::client_disconnected(state, &client_id);
            }
            ServerEvent::Request {
                client_id,
                request,
                reply,
            } => {
                let response = use_cases::monitoring::answer_request(state, &client_id, request);
                if reply.send(response).is_err() {
                    log::warn!("Antwort an {} nicht zustellbar", client_id);
                }
            }
        }
    }
}
