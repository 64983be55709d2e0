use std::sync::Arc;

use anyhow::{Context, Result};
use sustainabite::api_connection::ApiClient;
use sustainabite::cli::{parse_args, Command};
use sustainabite::config::ClientConfig;
use sustainabite::console::{self, ConsoleCommand, HELP_TEXT};
use sustainabite::recipes::{self, UtensilSelection};
use sustainabite::session::Session;
use sustainabite::speech::{SpeechService, TerminalAnnouncer};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "sustainabite=info";

/// Token that is cancelled when the user presses Ctrl-C while a request runs.
fn ctrl_c_token() -> (CancellationToken, JoinHandle<()>) {
    let token = CancellationToken::new();
    let watcher = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };
    (token, watcher)
}

async fn run_detect(client: ApiClient, speech: SpeechService, images: &[std::path::PathBuf]) -> Result<()> {
    let mut session = Session::new(client, speech);
    let accepted = session.stage_paths(images).await?;
    if accepted == 0 {
        println!("None of the given files look like images.");
        return Ok(());
    }
    println!("{}", console::render_images(session.staging()));

    let (token, watcher) = ctrl_c_token();
    let result = session.detect_ingredients(&token).await;
    watcher.abort();

    result.context("Ingredient detection failed")?;
    println!("{}", console::render_ingredients(session.ingredients()));
    Ok(())
}

async fn run_recipes(
    client: ApiClient,
    ingredients: &[String],
    utensils: UtensilSelection,
    budget: f64,
    preference: &str,
) -> Result<()> {
    let request = recipes::compose(ingredients, &utensils, preference, budget);
    let (token, watcher) = ctrl_c_token();
    let result = client.request_recipes(&request, &token).await;
    watcher.abort();

    let suggestions = result.context("Recipe request failed")?;
    match (suggestions.title, suggestions.recipes) {
        (Some(title), Some(recipes)) => {
            println!("{}", title);
            for recipe in &recipes {
                println!("\n{}", console::render_recipe_detail(recipe));
            }
        }
        _ => println!("The recipe service returned an incomplete response."),
    }
    Ok(())
}

async fn run_health(client: ApiClient) -> Result<()> {
    let (token, watcher) = ctrl_c_token();
    let result = client.health(&token).await;
    watcher.abort();

    let health = result.context("Health check failed")?;
    println!(
        "status: {}  model: {}  gemini available: {}",
        health.status,
        health.model.as_deref().unwrap_or("unknown"),
        health.gemini_available
    );
    Ok(())
}

/// Returns `false` when the user asked to leave.
async fn handle_command(session: &mut Session, command: ConsoleCommand) -> bool {
    match command {
        ConsoleCommand::StageImages(paths) => match session.stage_paths(&paths).await {
            Ok(accepted) => {
                session.speech().speak("Image");
                println!("Staged {} of {} file(s).", accepted, paths.len());
                println!("{}", console::render_images(session.staging()));
            }
            Err(e) => println!("Could not stage images: {:#}", e),
        },
        ConsoleCommand::ListImages => println!("{}", console::render_images(session.staging())),
        ConsoleCommand::Unstage(index) => {
            if !session.remove_image(index) {
                println!("No staged image at position {}.", index + 1);
            }
            println!("{}", console::render_images(session.staging()));
        }
        ConsoleCommand::Detect => {
            let (token, watcher) = ctrl_c_token();
            println!("Detecting...");
            let result = session.detect_ingredients(&token).await;
            watcher.abort();
            match result {
                Ok(None) => println!("Stage some images first with /image."),
                Ok(Some(report)) => {
                    println!("Detected {} ingredient(s), {} new.", report.detected, report.added);
                    println!("{}", console::render_ingredients(session.ingredients()));
                }
                Err(e) => println!("{}", e),
            }
        }
        ConsoleCommand::AddIngredient(label) => {
            if !session.add_ingredient(&label) {
                println!("Not added (empty, duplicate, or the list is full).");
            }
            println!("{}", console::render_ingredients(session.ingredients()));
        }
        ConsoleCommand::RemoveIngredient(index) => {
            if session.remove_ingredient(index).is_none() {
                println!("No ingredient at position {}.", index + 1);
            }
            println!("{}", console::render_ingredients(session.ingredients()));
        }
        ConsoleCommand::ListIngredients => println!("{}", console::render_ingredients(session.ingredients())),
        ConsoleCommand::ToggleUtensil(utensil) => {
            let selected = session.toggle_utensil(utensil);
            println!("{} {}.", utensil, if selected { "selected" } else { "removed" });
        }
        ConsoleCommand::ListUtensils => {
            println!("{}", console::render_utensils(session.utensils(), session.budget()))
        }
        ConsoleCommand::SetBudget(value) => println!("Budget set to {}.", session.set_budget(value)),
        ConsoleCommand::ShowRecipe(index) => {
            match session.transcript().latest_recipes().and_then(|r| r.get(index)) {
                Some(recipe) => println!("{}", console::render_recipe_detail(recipe)),
                None => println!("No recipe at position {}.", index + 1),
            }
        }
        ConsoleCommand::SavePantry => {
            let (token, watcher) = ctrl_c_token();
            let result = session.save_pantry(&token).await;
            watcher.abort();
            match result {
                Ok(receipt) => println!("{}", receipt.message),
                Err(e) => println!("Could not save pantry: {}", e),
            }
        }
        ConsoleCommand::ToggleSpeech => {
            let enabled = session.speech().toggle();
            println!("Spoken cues {}.", if enabled { "on" } else { "off" });
        }
        ConsoleCommand::Reset => {
            session.reset_upload();
            println!("Cleared staged images and ingredients.");
        }
        ConsoleCommand::ClearChat => session.clear_chat(),
        ConsoleCommand::Help => println!("{}", HELP_TEXT),
        ConsoleCommand::Quit => return false,
        ConsoleCommand::Send(preference) => {
            let (token, watcher) = ctrl_c_token();
            let _ = session.send(&preference, &token).await;
            watcher.abort();
            let messages = session.transcript().messages();
            for message in messages.iter().rev().take(2).rev() {
                println!("{}", console::render_message(message));
            }
        }
    }
    true
}

async fn run_chat(client: ApiClient, speech: SpeechService) -> Result<()> {
    let mut session = Session::new(client, speech);
    println!("Sustainabite chat. Type /help for commands.");

    let mut lines = console::spawn_line_reader(std::io::BufReader::new(std::io::stdin()));
    loop {
        let line = tokio::select! {
            line = lines.recv() => line.transpose().context("Failed to read from stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        match ConsoleCommand::parse(&line) {
            Ok(command) => {
                if !handle_command(&mut session, command).await {
                    break;
                }
            }
            Err(message) => println!("{}", message),
        }
    }

    session.reset_upload();
    println!("Bye!");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let cli_args = parse_args();
    let config = ClientConfig::from_env()
        .with_overrides(cli_args.base_url.as_deref(), cli_args.timeout_secs);
    tracing::info!("Using Sustainabite service at {}", config.base_url);

    let client = ApiClient::new(config).context("Failed to build HTTP client")?;
    let speech = SpeechService::new(Arc::new(TerminalAnnouncer));
    speech.set_enabled(!cli_args.mute);

    match cli_args.command.unwrap_or(Command::Chat) {
        Command::Chat => run_chat(client, speech).await,
        Command::Detect { images } => run_detect(client, speech, &images).await,
        Command::Recipes {
            ingredients,
            utensils,
            budget,
            preference,
        } => {
            run_recipes(
                client,
                &ingredients,
                utensils.into_iter().collect(),
                budget,
                &preference,
            )
            .await
        }
        Command::Health => run_health(client).await,
    }
}
