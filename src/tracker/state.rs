use chrono::{DateTime, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::{
    storage::entities::{Session, Skill},
    utils::time::is_same_day,
};

/// Transient state of the stopwatch. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimerState {
    /// Skill future sessions will be tracked against.
    pub selected_skill: Option<String>,
    /// Skill captured when the running session started. Changing the selection afterwards does
    /// not move the session to another skill.
    pub tracked_skill: Option<String>,
    pub running: bool,
    pub paused: bool,
    pub elapsed_seconds: u64,
    pub started_at: Option<DateTime<Utc>>,
}

impl TimerState {
    /// Whether ticks should currently accumulate time.
    pub fn is_ticking(&self) -> bool {
        self.running && !self.paused
    }

    fn reset(&mut self) {
        *self = TimerState {
            selected_skill: self.selected_skill.take(),
            ..TimerState::default()
        };
    }
}

/// Skills, the session log (most recent first) and the timer. All operations are synchronous and
/// invalid input is ignored; each mutating operation reports whether anything changed so that
/// the caller knows what to persist.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    skills: Vec<Skill>,
    sessions: Vec<Session>,
    timer: TimerState,
}

impl TrackerState {
    pub fn new(skills: Vec<Skill>, sessions: Vec<Session>) -> Self {
        Self {
            skills,
            sessions,
            timer: TimerState::default(),
        }
    }

    pub fn skills(&self) -> &[Skill] {
        &self.skills
    }

    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    pub fn timer(&self) -> &TimerState {
        &self.timer
    }

    pub fn skill(&self, name: &str) -> Option<&Skill> {
        self.skills.iter().find(|skill| skill.name == name)
    }

    pub fn add_skill(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            debug!("Ignoring blank skill name");
            return false;
        }
        if self.skill(name).is_some() {
            debug!("Skill {name} already exists");
            return false;
        }
        info!("Adding skill {name}");
        self.skills.push(Skill::new(name));
        true
    }

    /// Only known skills can be selected, which keeps every recorded session pointing at an
    /// existing skill.
    pub fn select_skill(&mut self, name: &str) -> bool {
        if self.skill(name).is_none() {
            debug!("Ignoring selection of unknown skill {name}");
            return false;
        }
        self.timer.selected_skill = Some(name.to_string());
        true
    }

    pub fn clear_selection(&mut self) {
        if self.timer.running {
            warn!(
                "Selection cleared while {:?} is being tracked, stop is ignored until a skill is selected",
                self.timer.tracked_skill
            );
        }
        self.timer.selected_skill = None;
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> bool {
        let Some(skill) = self.timer.selected_skill.clone() else {
            debug!("Start ignored, no skill selected");
            return false;
        };
        if self.timer.running {
            debug!("Start ignored, already tracking");
            return false;
        }
        info!("Started tracking {skill}");
        self.timer = TimerState {
            selected_skill: Some(skill.clone()),
            tracked_skill: Some(skill),
            running: true,
            paused: false,
            elapsed_seconds: 0,
            started_at: Some(now),
        };
        true
    }

    pub fn pause(&mut self) -> bool {
        if !self.timer.is_ticking() {
            return false;
        }
        self.timer.paused = true;
        true
    }

    pub fn resume(&mut self) -> bool {
        if !(self.timer.running && self.timer.paused) {
            return false;
        }
        self.timer.paused = false;
        true
    }

    pub fn toggle_pause(&mut self) -> bool {
        if self.timer.paused {
            self.resume()
        } else {
            self.pause()
        }
    }

    pub fn tick(&mut self) -> bool {
        if !self.timer.is_ticking() {
            return false;
        }
        self.timer.elapsed_seconds += 1;
        true
    }

    /// Finishes the running session. The new session is put at the front of the log and its
    /// duration is added to the skill total. Without a selected skill nothing happens and the
    /// timer keeps running.
    pub fn stop(&mut self, now: DateTime<Utc>) -> Option<Session> {
        if !self.timer.running {
            debug!("Stop ignored, nothing is tracked");
            return None;
        }
        if self.timer.selected_skill.is_none() {
            warn!(
                "Stop ignored, no skill selected while {:?} is being tracked",
                self.timer.tracked_skill
            );
            return None;
        }
        let (Some(skill), Some(start_time)) =
            (self.timer.tracked_skill.clone(), self.timer.started_at)
        else {
            debug!("Stop ignored, timer has no skill");
            return None;
        };

        let duration = self.timer.elapsed_seconds;
        let session = Session {
            id: self.next_session_id(now),
            skill,
            duration,
            start_time,
            end_time: now,
        };

        match self.skills.iter_mut().find(|v| v.name == session.skill) {
            Some(skill) => skill.total_time += duration,
            None => warn!("Skill {} disappeared while tracking", session.skill),
        }
        self.sessions.insert(0, session.clone());
        self.timer.reset();

        info!(
            "Recorded {} seconds of {} as session {}",
            session.duration, session.skill, session.id
        );
        Some(session)
    }

    /// Sessions that started on the calendar day of `now`, in log order. Passing a local time
    /// gives the local calendar day.
    pub fn todays_sessions<'a, Tz: TimeZone + 'a>(
        &'a self,
        now: &'a DateTime<Tz>,
    ) -> impl Iterator<Item = &'a Session> + 'a {
        self.sessions
            .iter()
            .filter(move |session| is_same_day(session.start_time, now))
    }

    pub fn todays_total<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> u64 {
        self.todays_sessions(now).map(|session| session.duration).sum()
    }

    /// Millisecond timestamp of the stop moment, bumped until it no longer collides.
    fn next_session_id(&self, now: DateTime<Utc>) -> String {
        let mut id = now.timestamp_millis();
        while self.sessions.iter().any(|v| v.id == id.to_string()) {
            id += 1;
        }
        id.to_string()
    }
}
