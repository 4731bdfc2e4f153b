//! Subcommand implementations for the steelqa binary.

pub mod capture;
pub mod layout;
pub mod login;
pub mod output;
pub mod pack;
