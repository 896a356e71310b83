//! Application-Layer: Controller, State, Commands und Use-Cases.

pub mod command_log;
pub mod controller;
pub mod events;
/// Application State
///
/// Gleisplan, Statustabelle, Optionen und die Ergebnisse der letzten Aktion.
pub mod state;
pub mod use_cases;

pub use command_log::CommandLog;
pub use controller::AppController;
pub use events::AppCommand;
pub use state::AppState;
