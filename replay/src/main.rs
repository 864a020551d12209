use std::fs;
use std::process::ExitCode;

use log::{error, info};
use stitchpath::command::CommandEnvelope;
use stitchpath::{canonical_signature, Command, GameStateStore, Level, LevelPack};

// usage: replay <level.json> <commands.json>
// commands.json holds an array of {type, payload} envelopes; level index 0 is loaded first.
fn main() -> ExitCode {
    env_logger::init();

    let args = std::env::args().collect::<Vec<_>>();
    let [_, level_path, commands_path] = args.as_slice() else {
        error!("usage: replay <level.json> <commands.json>");
        return ExitCode::FAILURE;
    };

    let level: Level = match fs::read_to_string(level_path).map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string())) {
        Ok(level) => level,
        Err(e) => {
            error!("could not read level {}: {}", level_path, e);
            return ExitCode::FAILURE;
        }
    };

    let envelopes: Vec<CommandEnvelope> = match fs::read_to_string(commands_path).map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string())) {
        Ok(envelopes) => envelopes,
        Err(e) => {
            error!("could not read commands {}: {}", commands_path, e);
            return ExitCode::FAILURE;
        }
    };

    let mut store = GameStateStore::new(LevelPack(vec![level]));
    if let Err(e) = store.load_level(0) {
        error!("{}", e);
        return ExitCode::FAILURE;
    }

    for envelope in envelopes {
        let command = Command::try_from(envelope).unwrap_or_else(|_| Command::Unknown(String::new()));
        match store.dispatch(command) {
            Ok(transition) => info!("{} changed={}", transition.command, transition.changed),
            Err(e) => {
                error!("{}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    let snapshot = store.snapshot();
    println!("path: {}", snapshot.path().iter().map(|loc| format!("({})", loc)).collect::<Vec<_>>().join(" "));
    println!("signature: {}", canonical_signature(&snapshot));
    ExitCode::SUCCESS
}
