//! Externe Kennungen mit festen, nullgefüllten Zahlenfeldern.
//!
//! Gruppe `BG001`, Block `BL001002` (Gruppe 1, Position 2), Achszähler
//! `AC001002`, Signale `SG001002_F`/`SG001002_B`, Weichengruppe `TG000001`.

use super::segment::DerivedIds;

/// Präfix für Gruppen-IDs
pub const GROUP_PREFIX: &str = "BG";
/// Präfix für Block-IDs
pub const BLOCK_PREFIX: &str = "BL";
/// Präfix für Achszähler-IDs
pub const AXLE_COUNTER_PREFIX: &str = "AC";
/// Präfix für Signal-IDs
pub const SIGNAL_PREFIX: &str = "SG";
/// Präfix für Weichengruppen-IDs
pub const TURNOUT_PREFIX: &str = "TG";

/// Größter Wert eines dreistelligen Zahlenfelds
pub const MAX_FIELD_VALUE: u32 = 999;

/// Prüft, ob Gruppennummer und Mitgliederzahl in die Zahlenfelder passen.
///
/// Der Achszähler hinter dem letzten Segment belegt Position `members + 1`.
pub fn fits_fields(group: u32, members: usize) -> bool {
    group <= MAX_FIELD_VALUE && members < MAX_FIELD_VALUE as usize
}

/// `BG001`
pub fn group_id(group: u32) -> String {
    format!("{}{:03}", GROUP_PREFIX, group)
}

/// `BL001002`
pub fn block_id(group: u32, sequence: u32) -> String {
    format!("{}{:03}{:03}", BLOCK_PREFIX, group, sequence)
}

/// `AC001002`
pub fn axle_counter_id(group: u32, sequence: u32) -> String {
    format!("{}{:03}{:03}", AXLE_COUNTER_PREFIX, group, sequence)
}

/// `SG001002_F` bzw. `SG001002_B`
pub fn signal_id(group: u32, sequence: u32, forward: bool) -> String {
    let suffix = if forward { "F" } else { "B" };
    format!("{}{:03}{:03}_{}", SIGNAL_PREFIX, group, sequence, suffix)
}

/// `TG000001`
pub fn turnout_id(turnout: u32) -> String {
    format!("{}{:06}", TURNOUT_PREFIX, turnout)
}

/// Alle abgeleiteten Kennungen eines Segments an Position `sequence` (1-basiert).
pub fn derive(group: u32, sequence: u32) -> DerivedIds {
    DerivedIds {
        block_id: block_id(group, sequence),
        axle_counter: axle_counter_id(group, sequence),
        signal_forward: signal_id(group, sequence, true),
        signal_backward: signal_id(group, sequence, false),
    }
}

/// Liest die Gruppennummer aus einer Gruppen-ID (`BG012` → 12).
pub fn parse_group_number(id: &str) -> Option<u32> {
    id.strip_prefix(GROUP_PREFIX)?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width_ids() {
        assert_eq!(group_id(1), "BG001");
        assert_eq!(block_id(2, 15), "BL002015");
        assert_eq!(axle_counter_id(3, 4), "AC003004");
        assert_eq!(signal_id(1, 2, true), "SG001002_F");
        assert_eq!(signal_id(1, 2, false), "SG001002_B");
        assert_eq!(turnout_id(7), "TG000007");
    }

    #[test]
    fn test_parse_group_number() {
        assert_eq!(parse_group_number("BG012"), Some(12));
        assert_eq!(parse_group_number("XX012"), None);
    }

    #[test]
    fn test_fits_fields_limits() {
        assert!(fits_fields(1, 1));
        assert!(fits_fields(999, 998));
        assert!(!fits_fields(999, 999));
        assert!(!fits_fields(1000, 1));
        // ohne Prüfung würden sich diese IDs gleichen
        assert_eq!(block_id(100, 1001), block_id(1001, 1));
    }
}
