//! domreplay-cli library, exposed so the command helpers can be unit tested.

pub mod commands;
pub mod error;
pub mod logging;
