mod client;
mod config;
mod dates;
mod dispatcher;
mod grouping;
mod labeler;
mod organizer;
mod parser;
mod types;

use client::ModelClient;
use config::Config;
use dispatcher::{ConfirmFn, Dispatcher};
use std::io::{self, BufRead, Write};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() {
    let config = Config::parse_args();

    // Setup logging
    let log_level = if config.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    info!("filewise - natural-language file management assistant");
    if config.offline {
        info!("Mode: OFFLINE (bracket commands only, no model)");
    } else {
        info!("Model: {} @ {}", config.model, config.url);
        info!("Retries: {}", config.retries);
    }
    if config.yes {
        info!("Confirmations: auto-accepted (--yes)");
    }

    let model = if config.offline {
        None
    } else {
        Some(ModelClient::new(
            &config.url,
            &config.api_key,
            &config.model,
            config.retries,
        ))
    };

    let confirm: ConfirmFn = if config.yes {
        Box::new(|_| true)
    } else {
        Box::new(ask_confirmation)
    };

    let labeler = model
        .clone()
        .map(|m| Box::new(m) as Box<dyn labeler::ImageLabeler>);
    let mut dispatcher = Dispatcher::new(labeler, confirm);

    if let Some(request) = &config.command {
        let result = run_turn(&mut dispatcher, model.as_ref(), request).await;
        println!("{}", result);
        return;
    }

    // One command per turn, to completion, until EOF or quit.
    let stdin = io::stdin();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                error!("Could not read input: {}", e);
                break;
            }
        }

        let request = line.trim();
        if request.is_empty() {
            continue;
        }
        if request.eq_ignore_ascii_case("quit") || request.eq_ignore_ascii_case("exit") {
            break;
        }

        let result = run_turn(&mut dispatcher, model.as_ref(), request).await;
        println!("{}", result);
    }
}

/// Lines that already start with a bracket tag bypass the model; free text
/// goes through interpretation first.
async fn run_turn(
    dispatcher: &mut Dispatcher,
    model: Option<&ModelClient>,
    request: &str,
) -> String {
    let raw = if request.starts_with('[') {
        request.to_string()
    } else {
        match model {
            Some(client) => match client.interpret(request).await {
                Ok(response) => response,
                Err(e) => {
                    error!("Model call failed: {}", e);
                    return format!("Could not reach the model: {}", e);
                }
            },
            None => request.to_string(),
        }
    };

    dispatcher.handle(&raw).await
}

fn ask_confirmation(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    let _ = io::stdout().flush();
    let mut answer = String::new();
    if io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
