//! Persistence is organized through [kv_store::KeyValueStore].
//!  - Two slots exist: one for the skill list and one for the session list.
//!  - A slot is loaded once on startup and overwritten in full whenever its list changes.
//!  - Values are JSON arrays of [entities::Skill] and [entities::Session].

pub mod entities;
pub mod kv_store;
pub mod tracker_storage;
