//! Netzwerk-Anbindung für Live-Statusmeldungen.

pub mod protocol;
pub mod server;

pub use protocol::{decode_request, ProtocolError, RejectedItem, Request, Response, StatusItem};
pub use server::{ServerEvent, StatusServer, MAX_LINE_BYTES};
