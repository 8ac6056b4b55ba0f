//! heavybag - Heavy bag boxing workout timer
//!
//! Builds round-based workouts, times them, rings the bell and calls out
//! each combination.

use std::io::Read;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing::info;

use heavybag::api;
use heavybag::audio::{
    BellSignaler, EspeakEngine, MutedEngine, Narrator, Silent, SoundSink, SpeechEngine, TerminalBell,
    VoicePreference,
};
use heavybag::db::Database;
use heavybag::generator::{Goal, Intensity, generate_workout};
use heavybag::library::Library;
use heavybag::moves::MoveCatalog;
use heavybag::tui::App;
use heavybag::workout::WorkoutRound;

#[derive(Parser)]
#[command(name = "heavybag")]
#[command(author, version, about = "Heavy bag boxing workout timer")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "HEAVYBAG_DB", default_value = "heavybag.db")]
    db: String,

    /// Preferred narrator accent
    #[arg(long, global = true, env = "HEAVYBAG_VOICE_LANG", default_value = "en-GB")]
    voice_lang: String,

    /// Preferred narrator voice name
    #[arg(long, global = true, env = "HEAVYBAG_VOICE_NAME", default_value = "arthur")]
    voice_name: String,

    /// No bell and no narration
    #[arg(long, global = true, env = "HEAVYBAG_MUTE")]
    mute: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI dashboard
    Tui,

    /// Play a saved workout
    Play {
        /// Saved workout id
        workout_id: String,
    },

    /// List the move catalog
    Moves,

    /// Generate a workout
    Generate {
        #[arg(short, long, value_enum, default_value = "balanced")]
        goal: Goal,

        /// Length in minutes, 3 per round
        #[arg(short, long, default_value = "15", value_parser = clap::value_parser!(u32).range(1..=90))]
        duration: u32,

        #[arg(short, long, value_enum, default_value = "medium")]
        intensity: Intensity,

        /// Save under this name
        #[arg(short, long)]
        save: Option<String>,
    },

    /// Manage saved workouts
    Workouts {
        #[command(subcommand)]
        action: WorkoutAction,
    },

    /// Manage favorite rounds
    Favorites {
        #[command(subcommand)]
        action: FavoriteAction,
    },

    /// Run the generation endpoint once, body from stdin
    Handle {
        #[arg(short, long, default_value = "POST")]
        method: String,
    },
}

#[derive(Subcommand)]
enum WorkoutAction {
    List,
    Show { id: String },
    /// Build a workout with one round per favorite
    New {
        name: String,
        /// Favorite round id, repeat for each round
        #[arg(short, long = "round", required = true)]
        rounds: Vec<String>,
    },
    /// Put a favorite's combinations into a round (appends by default)
    AddRound {
        id: String,
        favorite_id: String,
        #[arg(short, long)]
        round: Option<u32>,
    },
    Rename { id: String, name: String },
    Delete { id: String },
    /// Remove a round and renumber the rest
    ClearRound { id: String, round: u32 },
    /// Move a round from one position to another (0-based)
    Reorder { id: String, from: usize, to: usize },
    /// Move a combination within a round (0-based positions)
    ReorderCombos {
        id: String,
        round: u32,
        from: usize,
        to: usize,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    List,
    /// Save a new favorite round
    New {
        name: String,
        /// `Name=Move,Move,...` or just `Move,Move,...`; up to 4
        #[arg(short, long = "combo", required = true)]
        combos: Vec<String>,
    },
    Rename { id: String, name: String },
    Delete { id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let db = Database::open(&cli.db).with_context(|| format!("Failed to open {}", cli.db))?;

    match cli.command {
        Some(Commands::Play { ref workout_id }) => {
            let mut app = build_app(&cli, db)?;
            app.play(workout_id)?;
            app.run()?;
        }

        Some(Commands::Moves) => {
            for m in db.get_moves()? {
                println!("{}", m.name);
            }
        }

        Some(Commands::Generate {
            goal,
            duration,
            intensity,
            ref save,
        }) => {
            let catalog = MoveCatalog::new(db.get_moves()?);
            let rounds = generate_workout(goal, duration, intensity, &catalog, &mut rand::thread_rng());
            println!("{}", goal.description());
            print_rounds(&rounds, &catalog);

            if let Some(name) = save {
                let saved = db.add_workout(name, &rounds)?;
                println!("Saved: {} (id: {})", saved.name, saved.id);
            }
        }

        Some(Commands::Workouts { ref action }) => run_workouts(&db, action)?,

        Some(Commands::Favorites { ref action }) => run_favorites(&db, action)?,

        Some(Commands::Handle { ref method }) => {
            let mut body = String::new();
            std::io::stdin()
                .read_to_string(&mut body)
                .context("Failed to read request body")?;
            let catalog = MoveCatalog::new(db.get_moves().unwrap_or_default());
            let response = api::handle(method, &body, &catalog, &mut rand::thread_rng());

            println!("{}", response.status);
            for (name, value) in &response.headers {
                println!("{}: {}", name, value);
            }
            if let Some(body) = response.body {
                println!();
                println!("{}", body);
            }
        }

        Some(Commands::Tui) | None => {
            let mut app = build_app(&cli, db)?;
            app.run()?;
        }
    }

    Ok(())
}

fn build_app(cli: &Cli, db: Database) -> Result<App> {
    let sink: Arc<dyn SoundSink> = if cli.mute {
        Arc::new(Silent)
    } else {
        Arc::new(TerminalBell)
    };
    let bell = BellSignaler::new(sink, Handle::current());
    bell.mark_ready();

    let engine: Box<dyn SpeechEngine> = if cli.mute {
        Box::new(MutedEngine)
    } else {
        Box::new(EspeakEngine::new())
    };
    let preference = VoicePreference {
        lang: cli.voice_lang.clone(),
        name: cli.voice_name.clone(),
    };
    let narrator = Narrator::new(engine, preference);
    if !narrator.is_ready() {
        info!("No speech voices available, combinations will not be called out");
    }

    App::new(db, bell, narrator)
}

fn print_rounds(rounds: &[WorkoutRound], catalog: &MoveCatalog) {
    for round in rounds {
        println!("Round {}", round.round_number);
        for combo in &round.combinations {
            println!("  {:16} {}", combo.name, combo.move_names(catalog).join(", "));
        }
    }
}

fn run_workouts(db: &Database, action: &WorkoutAction) -> Result<()> {
    let mut library = Library::load(db);

    match action {
        WorkoutAction::List => {
            println!("Saved workouts:");
            println!("{:-<70}", "");
            for w in &library.workouts {
                println!(
                    "{} | {:24} | {} rounds | {}",
                    w.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    w.name,
                    w.rounds.len(),
                    w.id
                );
            }
        }
        WorkoutAction::Show { id } => {
            let workout = db
                .get_workout(id)?
                .with_context(|| format!("no workout with id {}", id))?;
            println!("{}", workout.name);
            print_rounds(&workout.rounds, &library.catalog);
        }
        WorkoutAction::New { name, rounds } => {
            let favorite_ids: Vec<&str> = rounds.iter().map(String::as_str).collect();
            let id = library.save_workout_from_favorites(db, name, &favorite_ids)?;
            println!("Saved: {} (id: {})", name, id);
            print_rounds(&library.rounds, &library.catalog);
        }
        WorkoutAction::AddRound { id, favorite_id, round } => {
            load_or_bail(&mut library, id)?;
            let round = round.unwrap_or(library.rounds.len() as u32 + 1);
            library.update_workout_round(db, round, favorite_id)?;
            print_rounds(&library.rounds, &library.catalog);
        }
        WorkoutAction::Rename { id, name } => {
            library.rename_workout(db, id, name)?;
            println!("Renamed {} to {}", id, name);
        }
        WorkoutAction::Delete { id } => {
            library.delete_workout(db, id)?;
            println!("Deleted {}", id);
        }
        WorkoutAction::ClearRound { id, round } => {
            load_or_bail(&mut library, id)?;
            library.clear_workout_round(db, *round)?;
            print_rounds(&library.rounds, &library.catalog);
        }
        WorkoutAction::Reorder { id, from, to } => {
            load_or_bail(&mut library, id)?;
            library.reorder_workout_rounds(db, *from, *to)?;
            print_rounds(&library.rounds, &library.catalog);
        }
        WorkoutAction::ReorderCombos { id, round, from, to } => {
            load_or_bail(&mut library, id)?;
            let index = library
                .rounds
                .iter()
                .position(|r| r.round_number == *round)
                .with_context(|| format!("no round {}", round))?;
            library.reorder_round_combinations(db, index, *from, *to)?;
            print_rounds(&library.rounds, &library.catalog);
        }
    }

    Ok(())
}

fn load_or_bail(library: &mut Library, id: &str) -> Result<()> {
    if !library.load_workout(id) {
        anyhow::bail!("no workout with id {}", id);
    }
    Ok(())
}

fn run_favorites(db: &Database, action: &FavoriteAction) -> Result<()> {
    let mut library = Library::load(db);

    match action {
        FavoriteAction::List => {
            for f in &library.favorites {
                println!("{:24} | {} combinations | {}", f.name, f.combinations.len(), f.id);
                for combo in &f.combinations {
                    println!("    {}: {}", combo.name, combo.move_names(&library.catalog).join(", "));
                }
            }
        }
        FavoriteAction::New { name, combos } => {
            for combo in combos {
                let (label, moves) = match combo.split_once('=') {
                    Some((label, moves)) => (Some(label.trim()), moves),
                    None => (None, combo.as_str()),
                };
                let move_names: Vec<&str> = moves.split(',').filter(|m| !m.trim().is_empty()).collect();
                library.add_named_combination(label, &move_names)?;
            }
            let favorite = library.save_to_favorites(db, name)?;
            println!("Saved: {} (id: {})", favorite.name, favorite.id);
        }
        FavoriteAction::Rename { id, name } => {
            library.rename_favorite(db, id, name)?;
            println!("Renamed {} to {}", id, name);
        }
        FavoriteAction::Delete { id } => {
            library.remove_favorite(db, id)?;
            println!("Deleted {}", id);
        }
    }

    Ok(())
}
