//! Replays an input script against a blank page and prints the page as JSON.
//!
//! Usage: `inkpage-replay <script.json> [settings.json]`

mod replay;
mod script;

use std::path::PathBuf;
use std::process::ExitCode;

use inkpage_core::Settings;

use crate::script::{ReplayResult, Script};

fn run(script_path: PathBuf, settings_path: Option<PathBuf>) -> ReplayResult<String> {
    let settings = match settings_path {
        Some(path) => Settings::load(&path)?,
        None => Settings::default(),
    };
    let script = Script::load(&script_path)?;
    log::info!("Replaying {} events from {}", script.events.len(), script_path.display());

    let view = replay::run(&script, settings)?;
    log::info!(
        "{} undo steps, {} rasters, {} overlays",
        view.history().len(),
        view.renderer().rasters,
        view.renderer().overlays
    );
    Ok(view.page().to_json()?)
}

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let Some(script_path) = args.next() else {
        eprintln!("usage: inkpage-replay <script.json> [settings.json]");
        return ExitCode::FAILURE;
    };

    match run(script_path, args.next()) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Replay failed: {e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
