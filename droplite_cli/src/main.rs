use std::{path::PathBuf, sync::Arc};

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use droplite_cli::{
    api::ApiClient,
    config::DashboardConfig,
    files::FileCollection,
    theme::ThemeStore,
    ui::{AssumeYes, Confirm, LogNotifier, StdinConfirm},
};
use droplite_core::{
    api::FileId,
    models::theme::{parse_hex_color, Gradient},
    ThemeMode,
};
use log::info;

/// Manage the files and theme stored on a droplite server
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Server base URL, overrides DROPLITE_API_BASE and droplite.toml
    #[arg(long, global = true)]
    api_base: Option<String>,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every stored file
    List,
    /// Upload a single file
    Upload { path: PathBuf },
    /// Download a stored file
    Download {
        id: i64,
        /// Where to write the file, defaults to its original name
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
    /// Delete a stored file
    Delete {
        id: i64,
        /// Do not ask for confirmation
        #[arg(short = 'y', long)]
        yes: bool,
    },
    /// Show or change the dashboard theme
    #[command(subcommand)]
    Theme(ThemeCommand),
}

#[derive(Subcommand)]
enum ThemeCommand {
    /// Print the persisted theme
    Show,
    /// Switch between dark and light mode
    Mode { mode: ModeArg },
    /// Turn the background gradient on or off
    GradientOn { state: Switch },
    /// Set both gradient colours (#rrggbb)
    Gradient {
        #[arg(value_parser = parse_hex_color)]
        from: String,
        #[arg(value_parser = parse_hex_color)]
        to: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Dark,
    Light,
    Toggle,
}

#[derive(Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info")
    }
    pretty_env_logger::init();

    let args = Args::parse();
    let config = DashboardConfig::load(args.api_base)?;
    let api = ApiClient::new(config.api_base);

    match args.commands {
        Commands::List => run_list(api).await,
        Commands::Upload { path } => run_upload(api, path).await,
        Commands::Download { id, output } => run_download(api, FileId(id), output).await,
        Commands::Delete { id, yes } => run_delete(api, FileId(id), yes).await,
        Commands::Theme(command) => run_theme(api, command).await,
    }
}

async fn run_list(api: ApiClient) -> anyhow::Result<()> {
    let collection = FileCollection::new(api, Arc::new(LogNotifier));
    let result = collection.list().await;
    print!("{}", collection.render());
    Ok(result?)
}

async fn run_upload(api: ApiClient, path: PathBuf) -> anyhow::Result<()> {
    let collection = FileCollection::new(api, Arc::new(LogNotifier));
    collection.upload(&path).await?;
    print!("{}", collection.render());
    Ok(())
}

async fn run_download(api: ApiClient, id: FileId, output: Option<PathBuf>) -> anyhow::Result<()> {
    let collection = FileCollection::new(api, Arc::new(LogNotifier));
    // Only used to name the output file.
    let _ = collection.list().await;
    info!("Downloading {}...", collection.download_url(id).blue());
    let target = collection.download(id, output.as_deref()).await?;
    info!("Saved to {}", target.display().to_string().green());
    Ok(())
}

async fn run_delete(api: ApiClient, id: FileId, yes: bool) -> anyhow::Result<()> {
    let collection = FileCollection::new(api, Arc::new(LogNotifier));
    let confirm: &dyn Confirm = if yes { &AssumeYes } else { &StdinConfirm };
    if collection.delete_by_id(id, confirm).await? {
        print!("{}", collection.render());
    } else {
        info!("Kept file {}", id);
    }
    Ok(())
}

async fn run_theme(api: ApiClient, command: ThemeCommand) -> anyhow::Result<()> {
    let store = ThemeStore::load(api).await;

    match command {
        ThemeCommand::Show => {}
        ThemeCommand::Mode { mode } => {
            let mode = match mode {
                ModeArg::Dark => ThemeMode::Dark,
                ModeArg::Light => ThemeMode::Light,
                ModeArg::Toggle => store.mode().toggled(),
            };
            store.set_mode(mode);
        }
        ThemeCommand::GradientOn { state } => {
            store.set_gradient_enabled(matches!(state, Switch::On));
        }
        ThemeCommand::Gradient { from, to } => {
            store.set_gradient(Gradient::new(from, to));
        }
    }
    store.settle().await;

    let gradient = store.gradient();
    println!("{} {}", format!("{:<10}", "Mode").bold(), store.mode());
    println!(
        "{} {} → {} ({})",
        format!("{:<10}", "Gradient").bold(),
        gradient.from,
        gradient.to,
        if store.gradient_enabled() { "on" } else { "off" }
    );
    println!(
        "{} {}",
        format!("{:<10}", "Background").bold(),
        store.background()
    );

    Ok(())
}
