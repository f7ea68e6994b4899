//! `wl-cli` subcommand implementations.

pub mod check;
pub mod clients;
pub mod contacts;
pub mod migrate;
pub mod seed;
