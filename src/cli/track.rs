use std::io::Write;

use anyhow::{bail, Context, Result};
use tokio::{
    io::{self, AsyncBufRead, AsyncBufReadExt, BufReader},
    select,
    sync::mpsc,
};
use tracing::{debug, error, info};

use crate::{
    storage::kv_store::KeyValueStore,
    tracker::{
        manager::{TrackerCommand, TrackerManager},
        state::TrackerState,
    },
    utils::time::format_duration,
};

use super::report::render_timer;

const HELP: &str = "p: pause/resume   s: stop and save   q: quit without saving";

/// Runs an interactive tracking session for `skill`. Input is read line by line from stdin and
/// the timer is redrawn on every tick.
pub async fn process_track_command<S: KeyValueStore>(
    mut manager: TrackerManager<S>,
    skill: &str,
) -> Result<()> {
    if !manager.select_skill(skill) {
        bail!("Unknown skill {skill}. Add it with `worklog skill add {skill}`");
    }
    let recorded_before = manager.state().sessions().len();

    let (sender, receiver) = mpsc::channel::<TrackerCommand>(8);
    tokio::spawn(read_commands(BufReader::new(io::stdin()), sender.clone()));
    tokio::spawn(detect_interrupt(sender.clone()));
    sender.send(TrackerCommand::Start).await?;
    drop(sender);

    println!("{HELP}");
    let outcome = manager.run(receiver, draw_timer).await;
    println!();

    println!("{}", summarize(recorded_before, outcome)?);
    Ok(())
}

fn draw_timer(state: &TrackerState) {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "\r{:<60}", render_timer(state));
    let _ = stdout.flush();
}

/// Describes what the session left on disk. A failed save is an error even though the session
/// is still in memory, since it is lost once the process exits.
fn summarize<S: KeyValueStore>(
    recorded_before: usize,
    outcome: Result<TrackerManager<S>>,
) -> Result<String> {
    let manager = outcome.context("Session was not saved")?;
    let state = manager.state();
    if state.sessions().len() <= recorded_before {
        return Ok("Nothing saved".into());
    }

    let session = &state.sessions()[0];
    info!("Session {} saved", session.id);
    Ok(format!(
        "Saved {} of {}. Total {}",
        format_duration(session.duration),
        session.skill,
        state
            .skill(&session.skill)
            .map(|v| format_duration(v.total_time))
            .unwrap_or_default()
    ))
}

fn parse_command(line: &str) -> Option<Vec<TrackerCommand>> {
    match line.trim() {
        "p" | "pause" | "resume" => Some(vec![TrackerCommand::TogglePause]),
        "s" | "stop" => Some(vec![TrackerCommand::Stop, TrackerCommand::Quit]),
        "q" | "quit" => Some(vec![TrackerCommand::Quit]),
        _ => None,
    }
}

/// Forwards commands read from `input`. Once input ends, or can't be read anymore, the running
/// session is stopped and saved.
async fn read_commands(
    input: impl AsyncBufRead + Unpin,
    sender: mpsc::Sender<TrackerCommand>,
) {
    match forward_lines(input, &sender).await {
        Ok(()) => debug!("Command input finished"),
        Err(e) => error!("Failed to read commands {e:?}"),
    }
    send_all(&sender, [TrackerCommand::Stop, TrackerCommand::Quit]).await;
}

async fn forward_lines(
    input: impl AsyncBufRead + Unpin,
    sender: &mpsc::Sender<TrackerCommand>,
) -> Result<()> {
    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        let Some(commands) = parse_command(&line) else {
            println!("{HELP}");
            continue;
        };
        if !send_all(sender, commands).await {
            break;
        }
    }
    Ok(())
}

/// Returns `false` once the tracker stopped accepting commands.
async fn send_all(
    sender: &mpsc::Sender<TrackerCommand>,
    commands: impl IntoIterator<Item = TrackerCommand>,
) -> bool {
    for command in commands {
        if sender.send(command).await.is_err() {
            return false;
        }
    }
    true
}

/// Ctrl-C saves the running session instead of losing it.
async fn detect_interrupt(sender: mpsc::Sender<TrackerCommand>) {
    select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                error!("Failed to listen for Ctrl-C {e:?}");
                return;
            }
            send_all(&sender, [TrackerCommand::Stop, TrackerCommand::Quit]).await;
        },
        _ = sender.closed() => (),
    };
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{anyhow, Result};
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;

    use crate::{
        storage::{
            kv_store::MockKeyValueStore,
            tracker_storage::{TrackerStorage, SKILLS_KEY},
        },
        tracker::manager::{TrackerCommand, TrackerManager},
        utils::{clock::FixedClock, logging::TEST_LOGGING},
    };

    use super::{parse_command, read_commands, summarize};

    async fn stopped_session(
        store: MockKeyValueStore,
    ) -> Result<TrackerManager<MockKeyValueStore>> {
        let mut manager = TrackerManager::load(
            TrackerStorage::new(store),
            Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap())),
        )
        .await;
        manager.select_skill("Guitar");
        let (sender, receiver) = mpsc::channel(8);
        for command in [
            TrackerCommand::Start,
            TrackerCommand::Stop,
            TrackerCommand::Quit,
        ] {
            sender.send(command).await.unwrap();
        }
        manager.run(receiver, |_| ()).await
    }

    fn guitar_store() -> MockKeyValueStore {
        let mut store = MockKeyValueStore::new();
        store.expect_get().returning(|key| {
            Ok((key == SKILLS_KEY).then(|| r#"[{"name":"Guitar","totalTime":60}]"#.to_string()))
        });
        store
    }

    #[test]
    fn test_parse_command() {
        assert_eq!(
            parse_command(" p "),
            Some(vec![TrackerCommand::TogglePause])
        );
        assert_eq!(
            parse_command("s"),
            Some(vec![TrackerCommand::Stop, TrackerCommand::Quit])
        );
        assert_eq!(parse_command("q"), Some(vec![TrackerCommand::Quit]));
        assert_eq!(parse_command("hello"), None);
    }

    async fn received(mut receiver: mpsc::Receiver<TrackerCommand>) -> Vec<TrackerCommand> {
        let mut commands = vec![];
        while let Some(command) = receiver.recv().await {
            commands.push(command);
        }
        commands
    }

    #[tokio::test]
    async fn test_end_of_input_stops_session() {
        let (sender, receiver) = mpsc::channel(8);

        read_commands(&b"p\nhello\n"[..], sender).await;

        assert_eq!(
            received(receiver).await,
            vec![
                TrackerCommand::TogglePause,
                TrackerCommand::Stop,
                TrackerCommand::Quit
            ]
        );
    }

    #[tokio::test]
    async fn test_unreadable_input_stops_session() {
        *TEST_LOGGING;
        let (sender, receiver) = mpsc::channel(8);

        // Invalid UTF-8 makes reading the line fail.
        read_commands(&[0xff, 0xfe, b'\n'][..], sender).await;

        assert_eq!(
            received(receiver).await,
            vec![TrackerCommand::Stop, TrackerCommand::Quit]
        );
    }

    #[tokio::test]
    async fn test_saved_session_is_summarized() -> Result<()> {
        *TEST_LOGGING;
        let mut store = guitar_store();
        store.expect_set().returning(|_, _| Ok(()));

        let summary = summarize(0, stopped_session(store).await)?;

        assert_eq!(summary, "Saved 00:00:00 of Guitar. Total 00:01:00");
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_save_is_not_reported_as_saved() {
        *TEST_LOGGING;
        let mut store = guitar_store();
        store
            .expect_set()
            .returning(|_, _| Err(anyhow!("disk full")));

        let summary = summarize(0, stopped_session(store).await);

        let error = summary.unwrap_err();
        assert!(format!("{error:#}").contains("disk full"));
    }

    #[tokio::test]
    async fn test_nothing_saved_after_quit() -> Result<()> {
        *TEST_LOGGING;
        let manager = TrackerManager::load(
            TrackerStorage::new(guitar_store()),
            Arc::new(FixedClock(Utc::now())),
        )
        .await;
        let (sender, receiver) = mpsc::channel(8);
        sender.send(TrackerCommand::Start).await?;
        sender.send(TrackerCommand::Quit).await?;

        let summary = summarize(0, manager.run(receiver, |_| ()).await)?;

        assert_eq!(summary, "Nothing saved");
        Ok(())
    }
}
