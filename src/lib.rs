#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::uninlined_format_args
)]

pub mod config;
pub mod cooldown;
pub mod probe;
pub mod publish;
pub mod report;
pub mod roster;
pub mod state;
pub mod telegram;
pub mod watcher;

pub use config::Config;
