//! AppCommand-Enum für den Command-Datenfluss.

mod command;

pub use command::AppCommand;
