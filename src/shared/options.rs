//! Zentrale Konfiguration für den Gleisplan-Editor.
//!
//! `EditorOptions` enthält alle zur Laufzeit änderbaren Werte.
//! Die `const`-Werte bleiben als Fallback/Default erhalten.

use crate::core::{GroupingPolicy, StatusPalette};
use serde::{Deserialize, Serialize};

// ── Gruppierung ─────────────────────────────────────────────────────

/// Einzelne unverbundene Segmente als eigene Gruppe zulassen.
pub const ALLOW_ISOLATED_SEGMENTS: bool = false;

// ── Export ──────────────────────────────────────────────────────────

/// Rasterweite für `grid_pos` im Block-Export (Welteinheiten).
pub const GRID_SIZE: f32 = 100.0;
/// Fangradius für freie Endpunkte (Welteinheiten).
pub const SNAP_RADIUS: f32 = 20.0;

// ── Status-Server ───────────────────────────────────────────────────

/// Standard-Bindeadresse des Status-Servers.
pub const SERVER_HOST: &str = "0.0.0.0";
/// Standard-Port des Status-Servers.
pub const SERVER_PORT: u16 = 5555;

// ── Laufzeit-Optionen (serialisierbar) ─────────────────────────────

/// Alle zur Laufzeit änderbaren Editor-Optionen.
/// Wird als `rail_layout_editor.toml` neben der Binary gespeichert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditorOptions {
    // ── Gruppierung ─────────────────────────────────────────────
    /// Einzelnes Segment ohne Verbindungen gilt als gültige Gruppe
    #[serde(default)]
    pub allow_isolated_segments: bool,

    // ── Export / Canvas ─────────────────────────────────────────
    /// Rasterweite für `grid_pos`
    #[serde(default = "default_grid_size")]
    pub grid_size: f32,
    /// Fangradius beim Verbinden per Position
    #[serde(default = "default_snap_radius")]
    pub snap_radius: f32,

    // ── Status-Server ───────────────────────────────────────────
    /// Bindeadresse
    #[serde(default = "default_server_host")]
    pub server_host: String,
    /// Port
    #[serde(default = "default_server_port")]
    pub server_port: u16,

    // ── Statusfarben ────────────────────────────────────────────
    /// Farbe für `free` (RGBA)
    #[serde(default = "default_color_free")]
    pub status_color_free: [f32; 4],
    /// Farbe für `reserved`
    #[serde(default = "default_color_reserved")]
    pub status_color_reserved: [f32; 4],
    /// Farbe für `blocked`
    #[serde(default = "default_color_blocked")]
    pub status_color_blocked: [f32; 4],
    /// Farbe für `unknown`
    #[serde(default = "default_color_unknown")]
    pub status_color_unknown: [f32; 4],
}

impl Default for EditorOptions {
    fn default() -> Self {
        Self {
            allow_isolated_segments: ALLOW_ISOLATED_SEGMENTS,

            grid_size: GRID_SIZE,
            snap_radius: SNAP_RADIUS,

            server_host: SERVER_HOST.to_string(),
            server_port: SERVER_PORT,

            status_color_free: crate::core::status::COLOR_FREE,
            status_color_reserved: crate::core::status::COLOR_RESERVED,
            status_color_blocked: crate::core::status::COLOR_BLOCKED,
            status_color_unknown: crate::core::status::COLOR_UNKNOWN,
        }
    }
}

fn default_grid_size() -> f32 {
    GRID_SIZE
}

fn default_snap_radius() -> f32 {
    SNAP_RADIUS
}

fn default_server_host() -> String {
    SERVER_HOST.to_string()
}

fn default_server_port() -> u16 {
    SERVER_PORT
}

fn default_color_free() -> [f32; 4] {
    crate::core::status::COLOR_FREE
}

fn default_color_reserved() -> [f32; 4] {
    crate::core::status::COLOR_RESERVED
}

fn default_color_blocked() -> [f32; 4] {
    crate::core::status::COLOR_BLOCKED
}

fn default_color_unknown() -> [f32; 4] {
    crate::core::status::COLOR_UNKNOWN
}

impl EditorOptions {
    /// Lädt Optionen aus einer TOML-Datei. Bei Fehler: Standardwerte.
    pub fn load_from_file(path: &std::path::Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(opts) => {
                    log::info!("Optionen geladen aus: {}", path.display());
                    opts
                }
                Err(e) => {
                    log::warn!("Optionen-Datei fehlerhaft, verwende Standardwerte: {}", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Keine Optionen-Datei gefunden, verwende Standardwerte");
                Self::default()
            }
        }
    }

    /// Speichert Optionen als TOML-Datei.
    pub fn save_to_file(&self, path: &std::path::Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Optionen gespeichert nach: {}", path.display());
        Ok(())
    }

    /// Ermittelt den Pfad zur Optionen-Datei neben der Binary.
    pub fn config_path() -> std::path::PathBuf {
        std::env::current_exe()
            .unwrap_or_else(|_| std::path::PathBuf::from("rail-layout-editor"))
            .parent()
            .unwrap_or_else(|| std::path::Path::new("."))
            .join("rail_layout_editor.toml")
    }

    /// Validierungsregeln aus den Optionen.
    pub fn grouping_policy(&self) -> GroupingPolicy {
        GroupingPolicy {
            allow_isolated_segments: self.allow_isolated_segments,
        }
    }

    /// Statusfarben aus den Optionen.
    pub fn status_palette(&self) -> StatusPalette {
        StatusPalette {
            free: self.status_color_free,
            reserved: self.status_color_reserved,
            blocked: self.status_color_blocked,
            unknown: self.status_color_unknown,
        }
    }

    /// `host:port` für den Status-Server.
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let opts: EditorOptions =
            toml::from_str("allow_isolated_segments = true\nserver_port = 6000\n")
                .expect("TOML erwartet");
        assert!(opts.allow_isolated_segments);
        assert_eq!(opts.server_port, 6000);
        assert_eq!(opts.server_host, SERVER_HOST);
        assert_eq!(opts.grid_size, GRID_SIZE);
        assert!(opts.grouping_policy().allow_isolated_segments);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().expect("Temp-Verzeichnis erwartet");
        let path = dir.path().join("rail_layout_editor.toml");
        let opts = EditorOptions {
            grid_size: 50.0,
            server_port: 7000,
            ..EditorOptions::default()
        };
        opts.save_to_file(&path).expect("Speichern erwartet");
        assert_eq!(EditorOptions::load_from_file(&path), opts);
        assert_eq!(
            EditorOptions::load_from_file(&dir.path().join("fehlt.toml")),
            EditorOptions::default()
        );
    }
}
