//! Hauptzustand der Anwendung.

use crate::app::CommandLog;
use crate::core::{BatchOutcome, ConsistencyWarning, Layout, StatusBoard, ValidationReport};
use crate::shared::EditorOptions;

/// Hauptzustand der Anwendung
pub struct AppState {
    /// Aktueller Gleisplan
    pub layout: Layout,
    /// Statustabelle (externe Block-ID → Zustand)
    pub status: StatusBoard,
    /// Laufzeit-Optionen
    pub options: EditorOptions,
    /// Verlauf ausgeführter Commands
    pub command_log: CommandLog,
    /// Pfad der zuletzt geladenen oder gespeicherten Datei
    pub current_file_path: Option<String>,
    /// Befunde des letzten fehlgeschlagenen Commits (None = letzter Commit ok)
    pub last_report: Option<ValidationReport>,
    /// Warnungen der letzten connect/disconnect-Operation
    pub last_warnings: Vec<ConsistencyWarning>,
    /// Ergebnis der letzten Sammelaktualisierung
    pub last_batch: Option<BatchOutcome>,
    /// Verbundene Status-Clients
    pub connected_clients: Vec<String>,
    /// Kurze Statuszeile für UI/CLI
    pub status_message: Option<String>,
}

impl AppState {
    /// Erstellt einen neuen, leeren App-State
    pub fn new() -> Self {
        Self::with_options(EditorOptions::default())
    }

    /// Erstellt einen leeren App-State mit vorgegebenen Optionen
    pub fn with_options(options: EditorOptions) -> Self {
        Self {
            layout: Layout::new(),
            status: StatusBoard::with_palette(options.status_palette()),
            options,
            command_log: CommandLog::new(),
            current_file_path: None,
            last_report: None,
            last_warnings: Vec::new(),
            last_batch: None,
            connected_clients: Vec::new(),
            status_message: None,
        }
    }

    /// Anzahl der Segmente (für UI-Anzeige)
    pub fn segment_count(&self) -> usize {
        self.layout.segment_count()
    }

    /// Anzahl der Verbindungen (für UI-Anzeige)
    pub fn connection_count(&self) -> usize {
        self.layout.connection_count()
    }

    /// Anzahl der festgeschriebenen Gruppen
    pub fn group_count(&self) -> usize {
        self.layout.grouping().map_or(0, |g| g.groups.len())
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
