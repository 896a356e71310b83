//! Zeilenbasiertes JSON-Protokoll für Statusmeldungen.
//!
//! Jede Zeile ist ein JSON-Objekt. Fehlt `type`, gilt `status_update`.
//! Unbekannte IDs oder Statuswerte werden pro Eintrag zurückgemeldet,
//! die Verbindung bleibt offen.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Protokollversion im Begrüßungstelegramm
pub const PROTOCOL_VERSION: &str = "1.0";
/// Begrüßungstext
pub const WELCOME_MESSAGE: &str = "Connected to rail layout status server";

/// Ein Eintrag einer Statusmeldung (`block_id` wird als Alias akzeptiert)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusItem {
    /// Externe Block-ID
    #[serde(alias = "block_id", default)]
    pub segment_id: Option<String>,
    /// Statuswert (`free`, `reserved`, `blocked`, `unknown`)
    #[serde(default)]
    pub status: Option<String>,
}

/// Dekodierte Anfrage eines Clients
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Einzelne Statusmeldung
    StatusUpdate(StatusItem),
    /// Sammelmeldung
    BatchUpdate(Vec<StatusItem>),
    /// Verbindungstest
    Ping {
        /// Wird unverändert zurückgeschickt
        timestamp: Option<Value>,
    },
}

/// Antwort an einen Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Begrüßung direkt nach dem Verbindungsaufbau
    Welcome {
        message: String,
        client_id: String,
        protocol_version: String,
    },
    /// Bestätigung einer Status- oder Sammelmeldung
    Ack {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        segment_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        updates_received: Option<usize>,
        status: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        rejected: Vec<RejectedItem>,
    },
    /// Antwort auf `ping`
    Pong {
        #[serde(default)]
        timestamp: Option<Value>,
    },
    /// Nicht verarbeitbare Zeile
    Error { message: String },
}

/// Abgelehnter Eintrag mit Grund
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedItem {
    /// Gemeldete ID (leer, falls sie fehlte)
    pub segment_id: String,
    /// Klartext-Grund
    pub reason: String,
}

/// Fehler beim Dekodieren einer Zeile
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// Kein gültiges JSON-Objekt
    #[error("Ungültiges JSON: {0}")]
    InvalidJson(String),
    /// Unbekannter Nachrichtentyp
    #[error("Unbekannter Nachrichtentyp '{0}'")]
    UnknownType(String),
    /// Pflichtfeld fehlt oder hat falschen Typ
    #[error("Feld '{0}' fehlt oder ist ungültig")]
    InvalidField(&'static str),
    /// Sammelmeldung ohne Einträge
    #[error("Sammelmeldung ohne Einträge")]
    EmptyBatch,
}

impl Response {
    /// Begrüßung für einen neuen Client
    pub fn welcome(client_id: &str) -> Self {
        Response::Welcome {
            message: WELCOME_MESSAGE.to_string(),
            client_id: client_id.to_string(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }

    /// Fehlermeldung
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }

    /// Kodiert die Antwort als eine Zeile inkl. `\n`
    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"type":"error","message":"{}"}}"#, e));
        line.push('\n');
        line
    }
}

/// Dekodiert eine Zeile in eine Anfrage.
pub fn decode_request(line: &str) -> Result<Request, ProtocolError> {
    let value: Value =
        serde_json::from_str(line.trim()).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;
    let Value::Object(ref object) = value else {
        return Err(ProtocolError::InvalidJson("kein JSON-Objekt".into()));
    };

    let kind = match object.get("type") {
        None => "status_update",
        Some(Value::String(kind)) => kind.as_str(),
        Some(_) => return Err(ProtocolError::InvalidField("type")),
    };

    match kind {
        "status_update" => {
            let item: StatusItem = serde_json::from_value(value.clone())
                .map_err(|_| ProtocolError::InvalidField("segment_id"))?;
            Ok(Request::StatusUpdate(item))
        }
        "batch_update" => {
            let updates = object
                .get("updates")
                .cloned()
                .ok_or(ProtocolError::InvalidField("updates"))?;
            let updates: Vec<StatusItem> = serde_json::from_value(updates)
                .map_err(|_| ProtocolError::InvalidField("updates"))?;
            if updates.is_empty() {
                return Err(ProtocolError::EmptyBatch);
            }
            Ok(Request::BatchUpdate(updates))
        }
        "ping" => Ok(Request::Ping {
            timestamp: object.get("timestamp").cloned(),
        }),
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_type_means_status_update() {
        let request = decode_request(r#"{"block_id": "BL001001", "status": "free"}"#)
            .expect("Anfrage erwartet");
        assert_eq!(
            request,
            Request::StatusUpdate(StatusItem {
                segment_id: Some("BL001001".into()),
                status: Some("free".into()),
            })
        );
    }

    #[test]
    fn test_batch_and_ping() {
        let batch = decode_request(
            r#"{"type":"batch_update","updates":[{"segment_id":"BL001001","status":"blocked"},{"status":"free"}]}"#,
        )
        .expect("Sammelmeldung erwartet");
        let Request::BatchUpdate(items) = batch else {
            panic!("Sammelmeldung erwartet");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].segment_id, None);

        let ping = decode_request(r#"{"type":"ping","timestamp":12.5}"#).expect("Ping erwartet");
        assert_eq!(
            ping,
            Request::Ping {
                timestamp: Some(serde_json::json!(12.5))
            }
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_request("{nope"),
            Err(ProtocolError::InvalidJson(_))
        ));
        assert_eq!(
            decode_request(r#"{"type":"reboot"}"#),
            Err(ProtocolError::UnknownType("reboot".into()))
        );
        assert_eq!(
            decode_request(r#"{"type":"batch_update","updates":[]}"#),
            Err(ProtocolError::EmptyBatch)
        );
    }

    #[test]
    fn test_response_lines() {
        let line = Response::welcome("client_1").to_line();
        assert!(line.ends_with('\n'));
        let value: Value = serde_json::from_str(line.trim()).expect("JSON erwartet");
        assert_eq!(value["type"], "welcome");
        assert_eq!(value["client_id"], "client_1");
        assert_eq!(value["protocol_version"], PROTOCOL_VERSION);

        let ack = Response::Ack {
            segment_id: None,
            updates_received: Some(2),
            status: "received".into(),
            rejected: vec![],
        };
        let value: Value = serde_json::from_str(ack.to_line().trim()).expect("JSON erwartet");
        assert_eq!(value["updates_received"], 2);
        assert!(value.get("rejected").is_none());
    }
}
