mod platform;

use std::path::PathBuf;

use clap::Parser;
use grabber_core::FormState;
use grabber_engine::EngineHandle;
use grabber_logging::{grab_error, grab_info};

use platform::app::AppController;
use platform::effects::EffectRunner;
use platform::logging::{self, LogDestination};
use platform::settings::{self, SettingsStore};

/// Download media from a URL, one item or a whole playlist.
#[derive(Debug, Parser)]
#[command(name = "grabber", version, about)]
struct Cli {
    /// Use the terminal front-end instead of the window.
    #[arg(long)]
    console: bool,
    /// Also log to the terminal.
    #[arg(short, long)]
    verbose: bool,
    /// Output folder for this session.
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,
    /// URL to put in the form.
    url: Option<String>,
}

fn build_controller(cli: &Cli) -> AppController {
    let mut store = SettingsStore::open(settings::settings_dir());
    let overridden = store
        .settings()
        .clone()
        .with_env_overrides(|key| std::env::var(key).ok());
    *store.settings_mut() = overridden;

    let mut form: FormState = store.settings().form_state();
    if let Some(dir) = &cli.output {
        form.output_dir = dir.display().to_string();
    }
    if let Some(url) = &cli.url {
        form.url = url.trim().to_string();
    }

    let engine = EngineHandle::new(store.settings().engine_config());
    AppController::new(EffectRunner::new(engine), store, form)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::initialize(LogDestination::from_verbose(cli.verbose));
    grab_info!("grabber {} starting", env!("CARGO_PKG_VERSION"));

    if !cli.console {
        match platform::ui::gui::run(build_controller(&cli)) {
            Ok(()) => return Ok(()),
            Err(err) => {
                grab_error!("window front-end unavailable: {}", err);
                eprintln!("Could not open a window ({err}); using the terminal instead.");
            }
        }
    }

    platform::ui::console::run(build_controller(&cli))?;
    Ok(())
}
