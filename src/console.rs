//! Terminal front end: chat command parsing and plain-text rendering of the
//! session state.

use std::fmt::Write as _;
use std::io::BufRead;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::api_connection::endpoints::Recipe;
use crate::chat::ChatMessage;
use crate::ingredients::{IngredientStore, MAX_INGREDIENTS};
use crate::recipes::{Budget, Utensil, UtensilSelection};
use crate::staging::ImageStagingBuffer;

pub const HELP_TEXT: &str = "\
Commands:
  /image <path>...   stage image files for detection
  /images            list staged images
  /unstage <n>       remove staged image n
  /detect            upload staged images and detect ingredients
  /add <ingredient>  add an ingredient by hand
  /remove <n>        remove ingredient n
  /ingredients       list ingredients
  /utensil <name>    toggle a utensil
  /utensils          list utensils
  /budget <amount>   set the budget (0-100)
  /recipe <n>        show recipe n from the latest suggestions
  /pantry            save ingredients, utensils and budget to the service
  /speak             toggle spoken cues
  /reset             drop staged images and ingredients
  /clear             clear the chat
  /help              show this help
  /quit              leave
Anything else is sent as your recipe preference.";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    StageImages(Vec<PathBuf>),
    ListImages,
    Unstage(usize),
    Detect,
    AddIngredient(String),
    RemoveIngredient(usize),
    ListIngredients,
    ToggleUtensil(Utensil),
    ListUtensils,
    SetBudget(f64),
    ShowRecipe(usize),
    SavePantry,
    ToggleSpeech,
    Reset,
    ClearChat,
    Help,
    Quit,
    Send(String),
}

impl ConsoleCommand {
    /// Parses one input line. Indices are typed 1-based and returned 0-based.
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(ConsoleCommand::Send(line.to_string()));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        match name.to_lowercase().as_str() {
            "image" | "images" if !arg.is_empty() => split_paths(arg).map(ConsoleCommand::StageImages),
            "images" => Ok(ConsoleCommand::ListImages),
            "image" => Err("Usage: /image <path>...".to_string()),
            "unstage" => parse_index(arg).map(ConsoleCommand::Unstage),
            "detect" => Ok(ConsoleCommand::Detect),
            "add" if arg.is_empty() => Err("Usage: /add <ingredient>".to_string()),
            "add" => Ok(ConsoleCommand::AddIngredient(arg.to_string())),
            "remove" => parse_index(arg).map(ConsoleCommand::RemoveIngredient),
            "ingredients" => Ok(ConsoleCommand::ListIngredients),
            "utensil" => arg.parse().map(ConsoleCommand::ToggleUtensil),
            "utensils" => Ok(ConsoleCommand::ListUtensils),
            "budget" => arg
                .trim_start_matches('$')
                .parse::<f64>()
                .map(ConsoleCommand::SetBudget)
                .map_err(|_| format!("Invalid budget: {}", arg)),
            "recipe" => parse_index(arg).map(ConsoleCommand::ShowRecipe),
            "pantry" => Ok(ConsoleCommand::SavePantry),
            "speak" => Ok(ConsoleCommand::ToggleSpeech),
            "reset" => Ok(ConsoleCommand::Reset),
            "clear" => Ok(ConsoleCommand::ClearChat),
            "help" | "?" => Ok(ConsoleCommand::Help),
            "quit" | "exit" | "q" => Ok(ConsoleCommand::Quit),
            other => Err(format!("Unknown command: /{}", other)),
        }
    }
}

/// Splits on whitespace; single or double quotes keep spaces inside a path.
fn split_paths(arg: &str) -> Result<Vec<PathBuf>, String> {
    let mut paths = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quote: Option<char> = None;

    for c in arg.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_token = true;
            }
            None if c.is_whitespace() => {
                if in_token {
                    paths.push(PathBuf::from(std::mem::take(&mut current)));
                    in_token = false;
                }
            }
            None => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("Unclosed {} in path list", q));
    }
    if in_token {
        paths.push(PathBuf::from(current));
    }
    Ok(paths)
}

/// Reads lines from `reader` on a dedicated thread and forwards them.
///
/// A blocking read cannot be cancelled, so it must not run on the runtime's
/// blocking pool: the runtime would wait for it on shutdown. The thread is
/// detached and ends with the process.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(16);
    std::thread::spawn(move || {
        for line in reader.lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn parse_index(arg: &str) -> Result<usize, String> {
    match arg.parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n - 1),
        _ => Err(format!("Expected a position starting at 1, got '{}'", arg)),
    }
}

pub fn render_images(staging: &ImageStagingBuffer) -> String {
    if staging.is_empty() {
        return "No images staged.".to_string();
    }
    let mut out = format!("Selected Images ({})\n", staging.len());
    for (i, (image, preview)) in staging.images().iter().zip(staging.previews()).enumerate() {
        let _ = writeln!(
            out,
            "  {}. {} [{}, {} bytes] {}",
            i + 1,
            image.file_name(),
            image.content_type(),
            image.size(),
            preview
        );
    }
    out.trim_end().to_string()
}

pub fn render_ingredients(store: &IngredientStore) -> String {
    let mut out = format!("Ingredients ({}/{})", store.len(), MAX_INGREDIENTS);
    if store.is_empty() {
        out.push_str("\n  No ingredients yet. Upload images or add manually.");
    }
    for (i, label) in store.as_slice().iter().enumerate() {
        let _ = write!(out, "\n  {}. {}", i + 1, label);
    }
    out
}

pub fn render_utensils(selection: &UtensilSelection, budget: Budget) -> String {
    let mut out = format!("Budget: {}\nUtensils:", budget);
    for utensil in Utensil::ALL {
        let mark = if selection.contains(utensil) { "x" } else { " " };
        let _ = write!(out, "\n  [{}] {}", mark, utensil);
    }
    out
}

/// Compact card, one per recipe in a reply.
pub fn render_recipe_card(index: usize, recipe: &Recipe) -> String {
    format!(
        "  {}. {} | {} | carbon {:.2}",
        index + 1,
        recipe.name,
        recipe.cooking_time,
        recipe.carbon_score
    )
}

pub fn render_recipe_detail(recipe: &Recipe) -> String {
    let mut out = format!(
        "{}\n  Time: {}   Carbon Score: {:.2}\n  Ingredients:",
        recipe.name, recipe.cooking_time, recipe.carbon_score
    );
    for ingredient in &recipe.ingredients {
        let _ = write!(out, "\n    - {}", ingredient);
    }
    out.push_str("\n  Utensils:");
    for utensil in &recipe.utensils_used {
        let _ = write!(out, "\n    - {}", utensil);
    }
    out.push_str("\n  Steps:");
    for (i, step) in recipe.steps.iter().enumerate() {
        let _ = write!(out, "\n    {}. {}", i + 1, step);
    }
    out
}

pub fn render_message(message: &ChatMessage) -> String {
    let who = if message.is_user { "you" } else { "sustainabite" };
    let mut out = format!("[{}] {}: {}", message.timestamp.format("%H:%M"), who, message.text);
    if let Some(recipes) = &message.recipes {
        for (i, recipe) in recipes.iter().enumerate() {
            out.push('\n');
            out.push_str(&render_recipe_card(i, recipe));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::staging::SelectedFile;

    fn omelette() -> Recipe {
        Recipe {
            name: "Simple Onion Omelette".into(),
            ingredients: vec!["eggs".into(), "onion".into()],
            cooking_time: "10 minutes".into(),
            utensils_used: vec!["pan".into(), "bowl".into()],
            steps: vec!["Chop onion.".into(), "Beat eggs.".into(), "Fry in pan.".into()],
            carbon_score: 0.3,
        }
    }

    #[test]
    fn test_parse_plain_text_is_send() {
        assert_eq!(
            ConsoleCommand::parse("  something vegetarian "),
            Ok(ConsoleCommand::Send("something vegetarian".into()))
        );
        assert_eq!(ConsoleCommand::parse(""), Ok(ConsoleCommand::Send(String::new())));
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            ConsoleCommand::parse("/image a.png b.jpg"),
            Ok(ConsoleCommand::StageImages(vec!["a.png".into(), "b.jpg".into()]))
        );
        assert_eq!(ConsoleCommand::parse("/images"), Ok(ConsoleCommand::ListImages));
        assert_eq!(ConsoleCommand::parse("/remove 2"), Ok(ConsoleCommand::RemoveIngredient(1)));
        assert_eq!(
            ConsoleCommand::parse("/add  green pepper "),
            Ok(ConsoleCommand::AddIngredient("green pepper".into()))
        );
        assert_eq!(
            ConsoleCommand::parse("/utensil cutting board"),
            Ok(ConsoleCommand::ToggleUtensil(Utensil::CuttingBoard))
        );
        assert_eq!(ConsoleCommand::parse("/budget $7.5"), Ok(ConsoleCommand::SetBudget(7.5)));
        assert_eq!(ConsoleCommand::parse("/QUIT"), Ok(ConsoleCommand::Quit));
    }

    #[test]
    fn test_parse_image_paths_with_spaces() {
        assert_eq!(
            ConsoleCommand::parse(r#"/image "my photos/fridge door.jpg" shelf.png 'old pics/pantry.jpg'"#),
            Ok(ConsoleCommand::StageImages(vec![
                "my photos/fridge door.jpg".into(),
                "shelf.png".into(),
                "old pics/pantry.jpg".into(),
            ]))
        );
        assert!(ConsoleCommand::parse("/image \"unterminated.jpg").is_err());
    }

    #[tokio::test]
    async fn test_line_reader_forwards_lines_then_closes() {
        let input = std::io::Cursor::new(b"/add Egg\nsomething quick\n".to_vec());
        let mut lines = spawn_line_reader(input);
        assert_eq!(lines.recv().await.unwrap().unwrap(), "/add Egg");
        assert_eq!(lines.recv().await.unwrap().unwrap(), "something quick");
        assert!(lines.recv().await.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_arguments() {
        assert!(ConsoleCommand::parse("/remove 0").is_err());
        assert!(ConsoleCommand::parse("/unstage x").is_err());
        assert!(ConsoleCommand::parse("/add").is_err());
        assert!(ConsoleCommand::parse("/budget lots").is_err());
        assert!(ConsoleCommand::parse("/utensil spork").is_err());
        assert!(ConsoleCommand::parse("/dance").is_err());
    }

    #[test]
    fn test_render_ingredients_shows_capacity() {
        let mut store = IngredientStore::new();
        assert!(render_ingredients(&store).contains("No ingredients yet"));
        store.add("Egg");
        let text = render_ingredients(&store);
        assert!(text.starts_with("Ingredients (1/15)"));
        assert!(text.contains("1. Egg"));
    }

    #[test]
    fn test_render_images_lists_previews() {
        let mut staging = ImageStagingBuffer::new();
        assert_eq!(render_images(&staging), "No images staged.");
        staging.select(vec![SelectedFile::new("fridge.png", "image/png", vec![0; 4])]);
        let text = render_images(&staging);
        assert!(text.contains("fridge.png [image/png, 4 bytes] preview://"));
    }

    #[test]
    fn test_render_recipe_detail() {
        let text = render_recipe_detail(&omelette());
        assert!(text.starts_with("Simple Onion Omelette"));
        assert!(text.contains("Carbon Score: 0.30"));
        assert!(text.contains("3. Fry in pan."));
        assert_eq!(render_recipe_card(0, &omelette()), "  1. Simple Onion Omelette | 10 minutes | carbon 0.30");
    }

    #[test]
    fn test_render_utensils_marks_selection() {
        let selection: UtensilSelection = [Utensil::Pan].into_iter().collect();
        let text = render_utensils(&selection, Budget::default());
        assert!(text.starts_with("Budget: $5.00"));
        assert!(text.contains("[x] pan"));
        assert!(text.contains("[ ] pot"));
    }
}
