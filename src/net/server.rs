//! TCP-Server für Statusmeldungen.
//!
//! Ein Accept-Thread nimmt Verbindungen an, pro Client läuft ein
//! Lese-Thread. Dekodierte Anfragen gehen als [`ServerEvent`] über einen
//! `mpsc`-Kanal an die Steuerschleife, die sie nacheinander anwendet und
//! über den mitgegebenen Antwortkanal beantwortet.

use super::protocol::{decode_request, Request, Response};
use anyhow::{Context, Result};
use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Wartezeit zwischen Accept-Versuchen und Lese-Timeout der Clients
const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Maximale Wartezeit auf die Antwort der Steuerschleife
const REPLY_TIMEOUT: Duration = Duration::from_secs(5);
/// Längste zulässige Nachrichtenzeile (ohne Zeilenumbruch)
pub const MAX_LINE_BYTES: usize = 64 * 1024;

/// Ereignis für die Steuerschleife
#[derive(Debug)]
pub enum ServerEvent {
    /// Neuer Client verbunden
    ClientConnected {
        /// Vergebene Client-ID (`client_<n>`)
        client_id: String,
        /// Gegenstelle
        peer: SocketAddr,
    },
    /// Client hat die Verbindung beendet
    ClientDisconnected {
        /// Client-ID
        client_id: String,
    },
    /// Dekodierte Anfrage, Antwort über `reply`
    Request {
        /// Absender
        client_id: String,
        /// Anfrage
        request: Request,
        /// Rückkanal zum Client-Thread
        reply: Sender<Response>,
    },
}

/// Laufender Status-Server
pub struct StatusServer {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
}

impl StatusServer {
    /// Bindet an `address` und startet den Accept-Thread.
    pub fn start(address: &str, events: Sender<ServerEvent>) -> Result<Self> {
        let listener = TcpListener::bind(address)
            .with_context(|| format!("Status-Server konnte nicht an {} binden", address))?;
        listener
            .set_nonblocking(true)
            .context("Listener konnte nicht auf nonblocking gesetzt werden")?;
        let local_addr = listener.local_addr()?;
        let stop = Arc::new(AtomicBool::new(false));

        let stop_flag = Arc::clone(&stop);
        let accept_thread = thread::Builder::new()
            .name("status-accept".into())
            .spawn(move || accept_loop(listener, events, stop_flag))
            .context("Accept-Thread konnte nicht gestartet werden")?;

        log::info!("Status-Server lauscht auf {}", local_addr);
        Ok(Self {
            local_addr,
            stop,
            accept_thread: Some(accept_thread),
        })
    }

    /// Tatsächlich gebundene Adresse (relevant bei Port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stoppt Accept- und Client-Threads und wartet auf den Accept-Thread.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                log::error!("Accept-Thread des Status-Servers ist abgestürzt");
            }
            log::info!("Status-Server gestoppt");
        }
    }
}

impl Drop for StatusServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn accept_loop(listener: TcpListener, events: Sender<ServerEvent>, stop: Arc<AtomicBool>) {
    let mut next_client: u64 = 1;
    while !stop.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                let client_id = format!("client_{}", next_client);
                next_client += 1;
                log::info!("Neue Verbindung: {} von {}", client_id, peer);
                let events = events.clone();
                let stop = Arc::clone(&stop);
                let name = format!("status-{}", client_id);
                let spawned = thread::Builder::new().name(name).spawn(move || {
                    if let Err(e) = serve_client(stream, peer, &client_id, &events, &stop) {
                        log::warn!("Verbindung {} beendet mit Fehler: {:#}", client_id, e);
                    }
                    let _ = events.send(ServerEvent::ClientDisconnected { client_id });
                });
                if let Err(e) = spawned {
                    log::error!("Client-Thread konnte nicht gestartet werden: {}", e);
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(POLL_INTERVAL),
            Err(e) => {
                log::error!("Accept fehlgeschlagen, Status-Server beendet: {}", e);
                break;
            }
        }
    }
}

fn serve_client(
    stream: TcpStream,
    peer: SocketAddr,
    client_id: &str,
    events: &Sender<ServerEvent>,
    stop: &AtomicBool,
) -> Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(POLL_INTERVAL))?;
    let mut writer = stream.try_clone()?;
    let mut reader = BufReader::new(stream);

    send(&mut writer, &Response::welcome(client_id))?;
    if events
        .send(ServerEvent::ClientConnected {
            client_id: client_id.to_string(),
            peer,
        })
        .is_err()
    {
        return Ok(());
    }

    let mut buffer = Vec::new();
    while !stop.load(Ordering::SeqCst) {
        let remaining = (MAX_LINE_BYTES + 1).saturating_sub(buffer.len()) as u64;
        match (&mut reader).take(remaining).read_until(b'\n', &mut buffer) {
            Ok(0) => break,
            Ok(_) if buffer.last() != Some(&b'\n') => {
                if buffer.len() > MAX_LINE_BYTES {
                    log::warn!(
                        "{}: Zeile länger als {} Bytes, Verbindung wird getrennt",
                        client_id,
                        MAX_LINE_BYTES
                    );
                    send(
                        &mut writer,
                        &Response::error(format!(
                            "Nachricht länger als {} Bytes",
                            MAX_LINE_BYTES
                        )),
                    )?;
                }
                break;
            }
            Ok(_) => {
                let line = String::from_utf8_lossy(&buffer).trim().to_string();
                buffer.clear();
                if line.is_empty() {
                    continue;
                }
                let Some(response) = handle_line(&line, client_id, events) else {
                    break;
                };
                send(&mut writer, &response)?;
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// `None` = Steuerschleife beendet, Verbindung schließen.
fn handle_line(line: &str, client_id: &str, events: &Sender<ServerEvent>) -> Option<Response> {
    let request = match decode_request(line) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Ungültige Nachricht von {}: {}", client_id, e);
            return Some(Response::error(e.to_string()));
        }
    };

    let (reply_tx, reply_rx) = mpsc::channel();
    events
        .send(ServerEvent::Request {
            client_id: client_id.to_string(),
            request,
            reply: reply_tx,
        })
        .ok()?;
    match reply_rx.recv_timeout(REPLY_TIMEOUT) {
        Ok(response) => Some(response),
        Err(mpsc::RecvTimeoutError::Timeout) => {
            Some(Response::error("Zeitüberschreitung bei der Verarbeitung"))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Some(Response::error("Anfrage wurde nicht beantwortet"))
        }
    }
}

fn send(writer: &mut TcpStream, response: &Response) -> Result<()> {
    writer.write_all(response.to_line().as_bytes())?;
    writer.flush()?;
    Ok(())
}
