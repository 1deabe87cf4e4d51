//! Small terminal tracker for hours spent practicing skills.
//! Skills and completed sessions are kept in a local key-value store, while a one second ticker
//! drives the running stopwatch.
//!

pub mod cli;
pub mod storage;
pub mod tracker;
pub mod utils;
