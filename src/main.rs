mod common;
mod config;
mod error;
mod mood;
mod network;
mod storage;
mod streaming;
mod ui;

use std::error::Error;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use network::ChatBackend;
use tokio::sync::mpsc;
use ui::ChatApp;

use config::AppConfig;
use mood::{MoodQueue, MoodTrends};
use storage::ChatDatabase;

#[derive(Parser)]
#[command(
    name = "mood_companion",
    version,
    about = "Mental health companion chat with mood tracking"
)]
struct Cli {
    /// Path to JSON config file
    #[arg(long, default_value = config::DEFAULT_CONFIG_PATH, value_name = "FILE")]
    config: String,
    #[command(subcommand)]
    mode: Option<Mode>,
}

#[derive(Subcommand, Clone, PartialEq, Eq)]
enum Mode {
    /// Print mood trends and exit (no UI)
    Trends,
    /// List stored conversations and exit (no UI)
    Sessions {
        /// Only sessions whose title or messages contain this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Write the effective configuration to the config path and exit
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    // Khởi tạo Logger để debug
    env_logger::init();

    let cli = Cli::parse();
    let mut app_config = config::load_config(&cli.config);
    app_config.apply_env_overrides();

    if cli.mode == Some(Mode::InitConfig) {
        config::save_config(&cli.config, &app_config)?;
        log::info!("Wrote configuration to {}", cli.config);
        return Ok(());
    }

    storage::ensure_parent_dir(&app_config.database_path)?;
    let db = Arc::new(ChatDatabase::with_path(&app_config.database_path)?);

    match cli.mode {
        Some(Mode::Trends) => print_trends(&db),
        Some(Mode::Sessions { search }) => print_sessions(&db, search.as_deref().unwrap_or("")),
        Some(Mode::InitConfig) | None => run_full_client(app_config, db).await,
    }
}

fn print_trends(db: &ChatDatabase) -> Result<(), Box<dyn Error>> {
    let trends = MoodTrends::from_entries(&db.mood_entries()?);
    if trends.is_empty() {
        println!("No mood entries yet");
        return Ok(());
    }

    println!("Entries: {}", trends.total);
    println!("Average intensity: {:.1}", trends.average_intensity);
    for (mood, count) in &trends.top_moods {
        println!("  {mood}: {count}");
    }
    for point in &trends.points {
        println!("{:>7}  {:<10} {}", point.label, point.mood, point.intensity);
    }
    println!("Recent:");
    for entry in &trends.recent {
        println!(
            "  {}  {} {}/10 {}",
            mood::trends::entry_time_label(entry.created_at),
            entry.mood,
            entry.intensity,
            entry.note.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn print_sessions(db: &ChatDatabase, query: &str) -> Result<(), Box<dyn Error>> {
    for session in db.search_sessions(query)? {
        println!("{}  {}", session.id, session.title);
    }
    Ok(())
}

async fn run_full_client(app_config: AppConfig, db: Arc<ChatDatabase>) -> Result<(), Box<dyn Error>> {
    // 1. Tạo các kênh giao tiếp (Channels)
    // UI -> Backend
    let (cmd_tx, cmd_rx) = mpsc::channel(100);
    // Backend -> UI
    let (event_tx, event_rx) = mpsc::channel(100);

    // 2. Khởi chạy backend (chạy ngầm)
    let (moods, _mood_worker) = MoodQueue::spawn(Arc::clone(&db), Some(event_tx.clone()));
    let backend = ChatBackend::new(event_tx, cmd_rx, &app_config, db, moods)?;
    tokio::spawn(async move {
        if let Err(err) = backend.run().await {
            log::error!("Chat backend terminated: {err}");
        }
    });

    log::info!("Using chat endpoint {}", app_config.chat_endpoint);

    // 3. Khởi chạy UI (Chạy trên Main Thread)
    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Mood Companion",
        options,
        Box::new(move |cc| Ok(Box::new(ChatApp::new(cc, cmd_tx, event_rx)))),
    )?;
    Ok(())
}
