//! `sessionctl` subcommand implementations

pub mod add;
pub mod read;
pub mod update;
