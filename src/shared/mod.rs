//! Geteilte Typen für layer-übergreifende Verträge.
//!
//! Enthält die Laufzeit-Konfiguration, die `app`, `json` und `net`
//! gemeinsam nutzen.

pub mod options;

pub use options::EditorOptions;
pub use options::{GRID_SIZE, SNAP_RADIUS};
