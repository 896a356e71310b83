//! JSON Import/Export für Gleispläne.
//!
//! Zwei Formate: das Block-Gruppen-Format (Gruppen, Weichengruppen,
//! Metadaten mit flacher Kopie) und das ältere flache Format.

pub mod model;
pub mod parser;
pub mod writer;

pub use parser::{parse_layout, ParsedLayout, SourceFormat};
pub use writer::{build_block_groups, build_flat_layout, write_block_groups, write_flat_layout};
