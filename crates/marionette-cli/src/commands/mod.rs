//! Subcommand implementations

pub mod classes;
pub mod inspect;
pub mod run;
