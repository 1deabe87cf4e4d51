use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, error, info, trace};

use crate::{
    storage::{entities::Session, kv_store::KeyValueStore, tracker_storage::TrackerStorage},
    utils::clock::Clock,
};

use super::{
    state::TrackerState,
    ticker::{Tick, TickHandle},
};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// User actions accepted by [TrackerManager::run].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    AddSkill(String),
    SelectSkill(String),
    ClearSelection,
    Start,
    Pause,
    Resume,
    TogglePause,
    Stop,
    /// Ends the loop. A running session is dropped, not recorded.
    Quit,
}

/// Glue between [TrackerState], its storage and the ticker. Lists are loaded once in
/// [TrackerManager::load] and every change is written back right away. The ticker only runs
/// while a session is running and not paused.
pub struct TrackerManager<S> {
    state: TrackerState,
    storage: TrackerStorage<S>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    tick_sender: mpsc::Sender<Tick>,
    tick_receiver: mpsc::Receiver<Tick>,
    ticker: Option<TickHandle>,
    generation: u64,
}

impl<S: KeyValueStore> TrackerManager<S> {
    pub async fn load(storage: TrackerStorage<S>, clock: Arc<dyn Clock>) -> Self {
        let skills = storage.load_skills().await;
        let sessions = storage.load_sessions().await;
        info!(
            "Loaded {} skills and {} sessions",
            skills.len(),
            sessions.len()
        );

        let (tick_sender, tick_receiver) = mpsc::channel(8);
        Self {
            state: TrackerState::new(skills, sessions),
            storage,
            clock,
            tick_interval: DEFAULT_TICK_INTERVAL,
            tick_sender,
            tick_receiver,
            ticker: None,
            generation: 0,
        }
    }

    pub fn with_tick_interval(self, tick_interval: Duration) -> Self {
        Self {
            tick_interval,
            ..self
        }
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub async fn add_skill(&mut self, name: &str) -> Result<()> {
        if self.state.add_skill(name) {
            self.storage.save_skills(self.state.skills()).await?;
        }
        Ok(())
    }

    pub fn select_skill(&mut self, name: &str) -> bool {
        self.state.select_skill(name)
    }

    pub fn clear_selection(&mut self) {
        self.state.clear_selection();
    }

    pub fn start(&mut self) -> bool {
        let started = self.state.start(self.clock.time());
        if started {
            self.spawn_ticker();
        }
        started
    }

    pub fn pause(&mut self) -> bool {
        let paused = self.state.pause();
        if paused {
            self.ticker = None;
        }
        paused
    }

    pub fn resume(&mut self) -> bool {
        let resumed = self.state.resume();
        if resumed {
            self.spawn_ticker();
        }
        resumed
    }

    pub fn toggle_pause(&mut self) -> bool {
        if self.state.timer().paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    /// Records the running session and persists both lists, since the session log and the skill
    /// total change together.
    pub async fn stop(&mut self) -> Result<Option<Session>> {
        let Some(session) = self.state.stop(self.clock.time()) else {
            return Ok(None);
        };
        self.ticker = None;

        // Both writes are attempted, a failing session slot must not keep the totals unsaved.
        let sessions_saved = self.storage.save_sessions(self.state.sessions()).await;
        let skills_saved = self.storage.save_skills(self.state.skills()).await;
        sessions_saved?;
        skills_saved?;
        Ok(Some(session))
    }

    /// Applies a tick coming from the ticker. Ticks of a cancelled ticker are ignored.
    pub fn tick(&mut self, tick: Tick) -> bool {
        let current = self.ticker.as_ref().map(TickHandle::generation);
        if current != Some(tick.generation) {
            trace!("Ignoring stale tick {tick:?}, current ticker {current:?}");
            return false;
        }
        self.state.tick()
    }

    /// Waits for the next tick of any ticker.
    pub async fn next_tick(&mut self) -> Option<Tick> {
        self.tick_receiver.recv().await
    }

    /// Applies a command. Returns `false` once the loop should end.
    pub async fn apply(&mut self, command: TrackerCommand) -> Result<bool> {
        debug!("Applying {command:?}");
        match command {
            TrackerCommand::AddSkill(name) => self.add_skill(&name).await?,
            TrackerCommand::SelectSkill(name) => {
                self.select_skill(&name);
            }
            TrackerCommand::ClearSelection => self.clear_selection(),
            TrackerCommand::Start => {
                self.start();
            }
            TrackerCommand::Pause => {
                self.pause();
            }
            TrackerCommand::Resume => {
                self.resume();
            }
            TrackerCommand::TogglePause => {
                self.toggle_pause();
            }
            TrackerCommand::Stop => {
                self.stop().await?;
            }
            TrackerCommand::Quit => return Ok(false),
        }
        Ok(true)
    }

    /// Processes commands and ticks one at a time until `commands` closes or a
    /// [TrackerCommand::Quit] arrives. `observer` sees the state after every change.
    ///
    /// A failed save doesn't end the loop, but it is returned once the loop is over, since the
    /// changes it was meant to persist may only exist in memory.
    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<TrackerCommand>,
        mut observer: impl FnMut(&TrackerState),
    ) -> Result<Self> {
        let mut save_error = None;
        loop {
            tokio::select! {
                command = commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    match self.apply(command.clone()).await {
                        Ok(true) => observer(&self.state),
                        Ok(false) => break,
                        Err(e) => {
                            error!("Failed to apply {command:?}: {e:?}");
                            observer(&self.state);
                            save_error = Some(e);
                        }
                    }
                }
                Some(tick) = self.tick_receiver.recv() => {
                    if self.tick(tick) {
                        observer(&self.state);
                    }
                }
            }
        }

        self.ticker = None;
        commands.close();
        match save_error {
            Some(e) => Err(e.context("Some changes could not be saved")),
            None => Ok(self),
        }
    }

    fn spawn_ticker(&mut self) {
        self.generation += 1;
        self.ticker = Some(TickHandle::spawn(
            self.generation,
            self.tick_sender.clone(),
            self.tick_interval,
            self.clock.clone(),
        ));
    }
}
