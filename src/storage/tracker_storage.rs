use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::{
    entities::{Session, Skill},
    kv_store::KeyValueStore,
};

pub const SKILLS_KEY: &str = "work-tracker-skills";
pub const SESSIONS_KEY: &str = "work-tracker-sessions";

/// Maps the skill and session lists onto their slots of a [KeyValueStore].
pub struct TrackerStorage<S> {
    store: S,
}

impl<S: KeyValueStore> TrackerStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn load_skills(&self) -> Vec<Skill> {
        self.load_list(SKILLS_KEY).await
    }

    pub async fn load_sessions(&self) -> Vec<Session> {
        self.load_list(SESSIONS_KEY).await
    }

    pub async fn save_skills(&self, skills: &[Skill]) -> Result<()> {
        self.store
            .set(SKILLS_KEY, serde_json::to_string(skills)?)
            .await
    }

    pub async fn save_sessions(&self, sessions: &[Session]) -> Result<()> {
        self.store
            .set(SESSIONS_KEY, serde_json::to_string(sessions)?)
            .await
    }

    /// Missing, unreadable or malformed data all mean "nothing stored yet".
    async fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let raw = match self.store.get(key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("Nothing stored under {key}");
                return vec![];
            }
            Err(e) => {
                warn!("Failed to read {key}, starting empty: {e:?}");
                return vec![];
            }
        };

        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(values) => values,
            Err(e) => {
                warn!("Stored value of {key} is malformed, starting empty: {e}");
                vec![]
            }
        }
    }
}
