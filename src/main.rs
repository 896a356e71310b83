//! Gleisplan-Editor (Kommandozeile).
//!
//! Prüft Gleispläne, exportiert sie im Blockgruppen- oder Flachformat und
//! betreibt den Status-Server für Live-Meldungen.

use anyhow::{bail, Context, Result};
use rail_layout_editor::net::StatusServer;
use rail_layout_editor::{AppCommand, AppController, AppState, EditorOptions};
use std::sync::mpsc;

const USAGE: &str = "\
Verwendung:
  rail-layout-editor validate <datei>
  rail-layout-editor export <eingabe> <ausgabe>
  rail-layout-editor export-flat <eingabe> <ausgabe>
  rail-layout-editor monitor <datei>";

fn main() -> Result<()> {
    // Logger initialisieren
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!(
        "Gleisplan-Editor v{} startet...",
        env!("CARGO_PKG_VERSION")
    );

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config_path = EditorOptions::config_path();
    let options = EditorOptions::load_from_file(&config_path);

    let mut state = AppState::with_options(options);
    let mut controller = AppController::new();

    match args.as_slice() {
        [cmd, file] if cmd == "validate" => run_validate(&mut controller, &mut state, file),
        [cmd, input, output] if cmd == "export" => {
            load(&mut controller, &mut state, input)?;
            controller.handle_command(
                &mut state,
                AppCommand::SaveFile {
                    path: Some(output.clone()),
                },
            )
        }
        [cmd, input, output] if cmd == "export-flat" => {
            load(&mut controller, &mut state, input)?;
            controller.handle_command(
                &mut state,
                AppCommand::ExportFlatLayout {
                    path: output.clone(),
                },
            )
        }
        [cmd, file] if cmd == "monitor" => run_monitor(&mut controller, &mut state, file),
        _ => {
            eprintln!("{}", USAGE);
            bail!("Ungültige Argumente: {:?}", args)
        }
    }
}

fn load(controller: &mut AppController, state: &mut AppState, path: &str) -> Result<()> {
    controller
        .handle_command(
            state,
            AppCommand::LoadFile {
                path: path.to_string(),
            },
        )
        .with_context(|| format!("Datei {} konnte nicht geladen werden", path))
}

fn run_validate(controller: &mut AppController, state: &mut AppState, path: &str) -> Result<()> {
    load(controller, state, path)?;

    if let Some(report) = &state.last_report {
        for message in report.messages() {
            println!("{}", message);
        }
        bail!("{}", report);
    }

    let groups = state.layout.grouping().map_or(0, |g| g.groups.len());
    println!(
        "OK: {} Segmente, {} Verbindungen, {} Gruppen",
        state.segment_count(),
        state.connection_count(),
        groups
    );
    Ok(())
}

fn run_monitor(controller: &mut AppController, state: &mut AppState, path: &str) -> Result<()> {
    load(controller, state, path)?;
    if let Some(report) = &state.last_report {
        bail!("Gleisplan ist nicht gültig gruppiert: {}", report);
    }

    let changes = state.status.subscribe();
    let (tx, rx) = mpsc::channel();
    let mut server = StatusServer::start(&state.options.server_address(), tx)?;
    log::info!(
        "Überwache {} Blöcke, Server auf {}",
        state.status.len(),
        server.local_addr()
    );

    // Läuft bis der Prozess beendet wird
    for event in rx {
        controller.handle_server_event(state, event);
        for change in changes.try_iter() {
            log::info!(
                "{}: {} → {} ({})",
                change.external_id,
                change.old.as_str(),
                change.new.as_str(),
                state.status.palette().hex(change.new)
            );
        }
    }

    server.stop();
    Ok(())
}
