mod app;
mod config;
mod journal_entry;
mod journal_state;
mod logging;
mod markup;
mod remote;
mod storage;
mod ui;
mod view;

use app::App;
use chrono::Local;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use config::{Cli, Command, Config};
use journal_entry::Origin;
use journal_state::JournalState;
use remote::FetchCoordinator;
use std::time::Instant;
use storage::{FileStore, Persistence};
use ui::UI;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = Config::from_cli(&cli).wrap_err("failed to load configuration")?;
    logging::init(&config.log_file)
        .wrap_err_with(|| format!("failed to open log file {}", config.log_file.display()))?;

    match cli.command {
        None | Some(Command::Tui) => {
            // The key loop blocks on terminal polling; fetches keep running on
            // the runtime's workers.
            tokio::task::spawn_blocking(move || run_tui(&config))
                .await
                .wrap_err("interactive journal stopped unexpectedly")?
        }
        Some(Command::Render(args)) => {
            let state = load_journal(&config).await;
            let html = markup::render_page(&state).into_string();
            match args.out {
                Some(path) => std::fs::write(&path, html)
                    .wrap_err_with(|| format!("failed to write {}", path.display()))?,
                None => println!("{html}"),
            }
            Ok(())
        }
        Some(Command::Export(args)) => {
            let reflections = config
                .remote_source()
                .try_fetch(&reqwest::Client::new())
                .await
                .wrap_err("error fetching JSON reflections")?;
            let dir = args.dir.unwrap_or_else(|| config.export_dir.clone());
            let path = remote::export_snapshot(&reflections, &dir)?;
            println!("Exported {} reflections to {}", reflections.len(), path.display());
            Ok(())
        }
        Some(Command::Stats) => {
            let stats = load_journal(&config).await.stats();
            println!("Total Entries:  {}", stats.total);
            println!("Static Entries: {}", stats.static_entries);
            println!("Local Entries:  {}", stats.local_entries);
            println!("JSON Entries:   {}", stats.json_entries);
            Ok(())
        }
    }
}

/// Builds the journal the same way the interactive view does at start-up.
async fn load_journal(config: &Config) -> JournalState {
    let persistence = Persistence::new(
        Box::new(FileStore::open(&config.store_path)),
        config.default_theme,
    );
    let mut state = JournalState::new(config.static_journal());
    state.hydrate(Origin::Local, persistence.load_local());
    let reflections = config
        .remote_source()
        .fetch(&reqwest::Client::new())
        .await;
    state.hydrate_reflections(&reflections);
    state
}

fn run_tui(config: &Config) -> Result<()> {
    let persistence = Persistence::new(
        Box::new(FileStore::open(&config.store_path)),
        config.default_theme,
    );
    let mut app = App::new(
        config.static_journal(),
        persistence,
        FetchCoordinator::new(config.remote_source()),
        config.export_dir.clone(),
        config.timings(),
    );
    app.start_initial_fetch();

    let mut ui = UI::new()?;

    loop {
        app.tick(Instant::now());
        ui.display(&app)?;

        if let Some(action) = ui.handle_input(&app)? {
            app.apply(action, Instant::now(), Local::now());
        }
        if app.should_quit() {
            break;
        }
    }

    Ok(())
}
