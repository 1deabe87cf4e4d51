pub mod report;
pub mod track;

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use chrono::Local;
use clap::{Parser, Subcommand};
use track::process_track_command;
use tracing::level_filters::LevelFilter;

use crate::{
    storage::{kv_store::FileKeyValueStore, tracker_storage::TrackerStorage},
    tracker::manager::TrackerManager,
    utils::{
        clock::{Clock, DefaultClock},
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "worklog", version, long_about = None)]
#[command(about = "Track hours spent on your skills", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_STATE_HOME/worklog or $HOME/.local/state/worklog"
    )]
    dir: Option<PathBuf>,
    #[arg(long, global = true, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Manage skills")]
    Skill {
        #[command(subcommand)]
        command: SkillCommand,
    },
    #[command(about = "List skills with the total time spent on each")]
    Skills,
    #[command(about = "Show today's sessions")]
    Today,
    #[command(about = "Start tracking time against a skill")]
    Track {
        #[arg(help = "Name of an existing skill")]
        skill: String,
    },
}

#[derive(Subcommand, Debug)]
enum SkillCommand {
    #[command(about = "Add a new skill. Blank and duplicate names are ignored")]
    Add {
        #[arg(num_args = 1.., help = "Name of the skill")]
        name: Vec<String>,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = args
        .dir
        .map_or_else(create_application_default_path, ensure_dir)?;

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(CLI_PREFIX, &app_dir.join("logs"), logging_level, args.log)?;

    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let storage = TrackerStorage::new(FileKeyValueStore::new(app_dir.join("storage"))?);
    let mut manager = TrackerManager::load(storage, clock.clone()).await;

    match args.commands {
        Commands::Skill {
            command: SkillCommand::Add { name },
        } => {
            manager.add_skill(&name.join(" ")).await?;
            print!("{}", report::render_skills(manager.state()));
            Ok(())
        }
        Commands::Skills => {
            print!("{}", report::render_skills(manager.state()));
            Ok(())
        }
        Commands::Today => {
            let now = clock.time().with_timezone(&Local);
            print!("{}", report::render_today(manager.state(), &now));
            Ok(())
        }
        Commands::Track { skill } => process_track_command(manager, &skill).await,
    }
}
