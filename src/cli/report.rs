use std::fmt::Display;

use chrono::{DateTime, TimeZone};

use crate::{
    tracker::state::TrackerState,
    utils::time::{format_clock_time, format_duration},
};

const TOTAL_LABEL: &str = "Total Today";

/// One line per skill with its total time, in the order skills were added.
pub fn render_skills(state: &TrackerState) -> String {
    if state.skills().is_empty() {
        return "No skills yet. Add one with `worklog skill add <NAME>`\n".into();
    }

    let width = name_width(state.skills().iter().map(|v| v.name.as_str()));
    let selected = state.timer().selected_skill.as_deref();
    state
        .skills()
        .iter()
        .map(|skill| {
            let marker = if selected == Some(skill.name.as_str()) {
                '*'
            } else {
                ' '
            };
            format!(
                "{marker} {:<width$}  {}\n",
                skill.name,
                format_duration(skill.total_time)
            )
        })
        .collect()
}

/// Today's session log followed by the total of the day. `now` decides both which day is today
/// and the time zone of the printed times.
pub fn render_today<Tz: TimeZone>(state: &TrackerState, now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    let sessions = state.todays_sessions(now).collect::<Vec<_>>();
    if sessions.is_empty() {
        return "No sessions today\n".into();
    }

    let tz = now.timezone();
    let width = name_width(
        sessions
            .iter()
            .map(|v| v.skill.as_str())
            .chain([TOTAL_LABEL]),
    );
    let mut out = sessions
        .iter()
        .map(|session| {
            format!(
                "{:<width$}  {} - {}  {}\n",
                session.skill,
                format_clock_time(session.start_time, &tz),
                format_clock_time(session.end_time, &tz),
                format_duration(session.duration)
            )
        })
        .collect::<String>();
    out.push_str(&format!(
        "{:<width$}  {:13}  {}\n",
        TOTAL_LABEL,
        "",
        format_duration(state.todays_total(now))
    ));
    out
}

/// Status line of the running timer.
pub fn render_timer(state: &TrackerState) -> String {
    let timer = state.timer();
    let skill = timer
        .tracked_skill
        .as_deref()
        .or(timer.selected_skill.as_deref())
        .unwrap_or_default()
        .to_uppercase();
    let status = match (timer.running, timer.paused) {
        (true, true) => "paused",
        (true, false) => "running",
        (false, _) => "stopped",
    };
    format!(
        "{skill}  {}  [{status}]",
        format_duration(timer.elapsed_seconds)
    )
}

fn name_width<'a>(names: impl Iterator<Item = &'a str>) -> usize {
    names.map(|v| v.chars().count()).max().unwrap_or_default()
}
