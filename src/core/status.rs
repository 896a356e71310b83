//! Statusanzeige: externe Block-ID → Belegungszustand samt Anzeigefarbe.
//!
//! Unabhängig vom Verbindungsgraphen. Änderungen werden an Abonnenten
//! über `std::sync::mpsc` gemeldet; die Korrektheit hängt nicht davon ab,
//! ob jemand zuhört.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

/// Geschlossene Menge der Belegungszustände
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentStatus {
    /// Frei
    Free,
    /// Fahrstraße reserviert
    Reserved,
    /// Belegt
    Blocked,
    /// Kein Status bekannt
    #[default]
    Unknown,
}

impl SegmentStatus {
    /// Alle Zustände
    pub const ALL: [SegmentStatus; 4] = [
        SegmentStatus::Free,
        SegmentStatus::Reserved,
        SegmentStatus::Blocked,
        SegmentStatus::Unknown,
    ];

    /// Name im Protokoll
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentStatus::Free => "free",
            SegmentStatus::Reserved => "reserved",
            SegmentStatus::Blocked => "blocked",
            SegmentStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SegmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SegmentStatus {
    type Err = StatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SegmentStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StatusError::InvalidStatus(s.to_string()))
    }
}

/// Fehler beim Setzen eines Status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StatusError {
    /// Externe ID ist nicht registriert
    #[error("Segment '{0}' nicht gefunden")]
    UnknownSegment(String),
    /// Statuswert außerhalb der geschlossenen Menge
    #[error("Ungültiger Status '{0}'")]
    InvalidStatus(String),
}

/// Anzeigefarben je Zustand (RGBA)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusPalette {
    /// Farbe für `free`
    pub free: [f32; 4],
    /// Farbe für `reserved`
    pub reserved: [f32; 4],
    /// Farbe für `blocked`
    pub blocked: [f32; 4],
    /// Farbe für `unknown`
    pub unknown: [f32; 4],
}

/// #48BB78
pub const COLOR_FREE: [f32; 4] = [0.282, 0.733, 0.471, 1.0];
/// #FFA500
pub const COLOR_RESERVED: [f32; 4] = [1.0, 0.647, 0.0, 1.0];
/// #E53E3E
pub const COLOR_BLOCKED: [f32; 4] = [0.898, 0.243, 0.243, 1.0];
/// #888888
pub const COLOR_UNKNOWN: [f32; 4] = [0.533, 0.533, 0.533, 1.0];

impl Default for StatusPalette {
    fn default() -> Self {
        Self {
            free: COLOR_FREE,
            reserved: COLOR_RESERVED,
            blocked: COLOR_BLOCKED,
            unknown: COLOR_UNKNOWN,
        }
    }
}

impl StatusPalette {
    /// Farbe eines Zustands
    pub fn color(&self, status: SegmentStatus) -> [f32; 4] {
        match status {
            SegmentStatus::Free => self.free,
            SegmentStatus::Reserved => self.reserved,
            SegmentStatus::Blocked => self.blocked,
            SegmentStatus::Unknown => self.unknown,
        }
    }

    /// Farbe als `#RRGGBB`
    pub fn hex(&self, status: SegmentStatus) -> String {
        let [r, g, b, _] = self.color(status);
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!("#{:02X}{:02X}{:02X}", channel(r), channel(g), channel(b))
    }
}

/// Gemeldete Statusänderung
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    /// Externe Block-ID
    pub external_id: String,
    /// Vorheriger Zustand
    pub old: SegmentStatus,
    /// Neuer Zustand
    pub new: SegmentStatus,
}

/// Ergebnis einer Sammelaktualisierung
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Erfolgreich angewendete IDs (in Eingangsreihenfolge)
    pub applied: Vec<String>,
    /// Abgelehnte Einträge mit Grund
    pub rejected: Vec<(String, StatusError)>,
}

/// Statustabelle aller bekannten externen IDs.
#[derive(Debug, Default)]
pub struct StatusBoard {
    statuses: IndexMap<String, SegmentStatus>,
    palette: StatusPalette,
    subscribers: Vec<Sender<StatusChange>>,
}

impl StatusBoard {
    /// Leere Tabelle mit Standardfarben
    pub fn new() -> Self {
        Self::default()
    }

    /// Leere Tabelle mit eigener Palette
    pub fn with_palette(palette: StatusPalette) -> Self {
        Self {
            palette,
            ..Self::default()
        }
    }

    /// Setzt die registrierten IDs. Bestehende IDs behalten ihren Status,
    /// neue starten mit `unknown`, nicht mehr vorhandene entfallen.
    pub fn register_ids<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let previous = std::mem::take(&mut self.statuses);
        for id in ids {
            let id = id.into();
            let status = previous.get(&id).copied().unwrap_or_default();
            self.statuses.insert(id, status);
        }
        log::debug!(
            "Statustabelle neu registriert: {} IDs ({} vorher)",
            self.statuses.len(),
            previous.len()
        );
    }

    /// Setzt den Status einer externen ID
    pub fn set_status(
        &mut self,
        external_id: &str,
        status: SegmentStatus,
    ) -> Result<(), StatusError> {
        let Some(current) = self.statuses.get_mut(external_id) else {
            log::warn!("Status für unbekanntes Segment '{}' ignoriert", external_id);
            return Err(StatusError::UnknownSegment(external_id.to_string()));
        };
        let old = *current;
        *current = status;
        log::debug!("Status {}: {} → {}", external_id, old, status);
        if old != status {
            self.notify(StatusChange {
                external_id: external_id.to_string(),
                old,
                new: status,
            });
        }
        Ok(())
    }

    /// Setzt einen Status aus einem Protokoll-String
    pub fn set_status_str(&mut self, external_id: &str, status: &str) -> Result<(), StatusError> {
        let status = status.parse::<SegmentStatus>()?;
        self.set_status(external_id, status)
    }

    /// Wendet alle Einträge unabhängig voneinander an; Fehler brechen nicht ab.
    pub fn apply_batch<'a, I>(&mut self, updates: I) -> BatchOutcome
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut outcome = BatchOutcome::default();
        for (external_id, status) in updates {
            match self.set_status_str(external_id, status) {
                Ok(()) => outcome.applied.push(external_id.to_string()),
                Err(e) => outcome.rejected.push((external_id.to_string(), e)),
            }
        }
        if !outcome.rejected.is_empty() {
            log::warn!(
                "Sammelaktualisierung: {} angewendet, {} abgelehnt",
                outcome.applied.len(),
                outcome.rejected.len()
            );
        }
        outcome
    }

    /// Setzt alle bekannten IDs auf `unknown`
    pub fn reset_all(&mut self) {
        let ids: Vec<String> = self.statuses.keys().cloned().collect();
        for id in ids {
            // IDs stammen aus der Tabelle selbst
            let _ = self.set_status(&id, SegmentStatus::Unknown);
        }
    }

    /// Aktueller Status (None = nicht registriert)
    pub fn status_of(&self, external_id: &str) -> Option<SegmentStatus> {
        self.statuses.get(external_id).copied()
    }

    /// Anzeigefarbe (unregistrierte IDs erhalten die `unknown`-Farbe)
    pub fn color_of(&self, external_id: &str) -> [f32; 4] {
        self.palette
            .color(self.status_of(external_id).unwrap_or_default())
    }

    /// Palette
    pub fn palette(&self) -> &StatusPalette {
        &self.palette
    }

    /// Ersetzt die Palette (Statuswerte bleiben erhalten)
    pub fn set_palette(&mut self, palette: StatusPalette) {
        self.palette = palette;
    }

    /// Alle registrierten IDs in Registrierungsreihenfolge
    pub fn known_ids(&self) -> impl Iterator<Item = &str> {
        self.statuses.keys().map(String::as_str)
    }

    /// Anzahl registrierter IDs
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    /// Keine IDs registriert
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    /// Neuer Abonnent für Änderungsmeldungen
    pub fn subscribe(&mut self) -> Receiver<StatusChange> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, change: StatusChange) {
        self.subscribers
            .retain(|subscriber| subscriber.send(change.clone()).is_ok());
    }
}
