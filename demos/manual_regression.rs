use std::error::Error;
use std::sync::Arc;

use firebase_manual_regression::config::RegressionConfig;
use firebase_manual_regression::panel::{Action, ActionPanel};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() -> Result<(), Box<dyn Error>> {
    // Usage: cargo run --example manual_regression -- regression.json
    // The config points at a Firebase web config and the folder holding
    // `credentials.json` ({"email": ..., "password": ...}).
    let config = match std::env::args().nth(1) {
        Some(path) => RegressionConfig::from_json_file(path)?,
        None => RegressionConfig::default(),
    };
    config.apply_log_level()?;

    let panel = Arc::new(ActionPanel::from_config(&config)?);
    panel.start();

    let names: Vec<&str> = Action::ALL.iter().map(|action| action.name()).collect();
    println!("Actions: {} (quit to exit)", names.join(", "));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "exit" {
            break;
        }
        // Like a button press: start the action and go straight back to reading.
        match line.parse::<Action>() {
            Ok(action) => {
                panel.trigger(action);
            }
            Err(err) => eprintln!("{err}"),
        }
    }

    Ok(())
}
