mod assistant;
mod calories;
mod domain;
mod error;
mod formulas;
mod input;
mod report;
mod server;
mod telegram;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::assistant::{
    Assistant, AssistantConfig, Conversation, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, RESET_MESSAGE,
    api_key_from_env,
};
use crate::calories::compute;
use crate::domain::UserData;
use crate::input::{FormFields, collect};
use crate::report::render_text;
use crate::server::AppState;
use crate::telegram::BotState;

/// Daily calorie and macronutrient calculator with a nutrition assistant.
#[derive(Parser, Debug)]
#[command(name = "rashaqa")]
#[command(about = "Calorie targets from the Mifflin-St Jeor equation, plus an AI nutrition assistant")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate daily calorie and macro targets.
    Calc {
        #[command(flatten)]
        profile: ProfileArgs,

        /// Print the results as JSON instead of a text report.
        #[arg(long)]
        json: bool,
    },
    /// Calculate targets, then chat with the assistant on stdin.
    Chat {
        #[command(flatten)]
        profile: ProfileArgs,

        #[command(flatten)]
        assistant: AssistantArgs,
    },
    /// Serve the JSON API.
    Serve {
        /// Port number for the web server.
        #[arg(long, env = "RASHAQA_PORT", default_value = "8080")]
        port: u16,

        /// Directory of static frontend files.
        #[arg(long, env = "RASHAQA_STATIC_DIR")]
        static_dir: Option<PathBuf>,

        #[command(flatten)]
        assistant: AssistantArgs,
    },
    /// Run the Telegram bot. The token is read from TELOXIDE_TOKEN.
    Bot {
        #[command(flatten)]
        assistant: AssistantArgs,
    },
}

/// Biometric input. Values are taken as typed: unparsable numbers become 0.
#[derive(Args, Debug)]
struct ProfileArgs {
    /// Age in years.
    #[arg(long, default_value = "25")]
    age: String,

    /// Weight in kilograms.
    #[arg(long, default_value = "70")]
    weight: String,

    /// Height in centimetres.
    #[arg(long, default_value = "170")]
    height: String,

    /// male or female.
    #[arg(long, default_value = "male")]
    gender: String,

    /// sedentary, light, moderate, very or extra.
    #[arg(long, default_value = "moderate")]
    activity: String,

    /// loss, maintain or gain.
    #[arg(long, default_value = "maintain")]
    goal: String,
}

impl ProfileArgs {
    fn to_user_data(&self) -> Result<UserData> {
        let fields = FormFields {
            age: self.age.clone(),
            weight: self.weight.clone(),
            height: self.height.clone(),
            gender: self.gender.clone(),
            activity_level: self.activity.clone(),
            goal: self.goal.clone(),
        };
        collect(&fields).context("Invalid profile")
    }
}

#[derive(Args, Debug)]
struct AssistantArgs {
    /// Gemini API key. Falls back to the API_KEY environment variable.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model name.
    #[arg(long, env = "RASHAQA_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature.
    #[arg(long, default_value = "0.7")]
    temperature: f32,

    /// Language the assistant answers in.
    #[arg(long, env = "RASHAQA_LANGUAGE", default_value = "English")]
    language: String,

    /// Request timeout in seconds.
    #[arg(long, env = "RASHAQA_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

impl AssistantArgs {
    fn to_config(&self) -> AssistantConfig {
        AssistantConfig {
            api_key: self.api_key.clone().or_else(api_key_from_env),
            model: self.model.clone(),
            temperature: self.temperature,
            language: self.language.clone(),
            timeout: Duration::from_secs(self.timeout),
            ..AssistantConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Calc { profile, json } => {
            let user = profile.to_user_data()?;
            let results = compute(&user);
            if json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                print!("{}", render_text(&user, &results));
            }
        }
        Command::Chat { profile, assistant } => {
            let user = profile.to_user_data()?;
            run_chat(user, Assistant::gemini(&assistant.to_config())).await?;
        }
        Command::Serve {
            port,
            static_dir,
            assistant,
        } => {
            let state = Arc::new(AppState {
                assistant: Assistant::gemini(&assistant.to_config()),
            });
            let static_dir = static_dir.unwrap_or_else(find_static_dir);
            println!("Static files: {}", static_dir.display());
            server::run_server(state, port, static_dir).await?;
        }
        Command::Bot { assistant } => {
            let state = Arc::new(BotState::new(Assistant::gemini(&assistant.to_config())));
            telegram::start_bot(state).await;
        }
    }

    Ok(())
}

/// Prints the report, then relays stdin lines to the assistant until EOF or `/quit`.
async fn run_chat(user: UserData, assistant: Assistant) -> Result<()> {
    let results = compute(&user);
    let mut conversation = Conversation::new(&results);

    print!("{}", render_text(&user, &results));
    println!();
    println!("=== Assistant ===");
    println!("(type /reset to clear the conversation, /quit to exit)");
    println!();
    println!("{}", conversation.messages()[0].text);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .context("Failed to read from stdin")?
    {
        match line.trim() {
            "/quit" => break,
            "/reset" => {
                conversation.reset();
                println!("{}", RESET_MESSAGE);
            }
            _ => {
                if let Some(reply) = assistant
                    .reply(&mut conversation, &user, &results, &line)
                    .await
                {
                    println!();
                    println!("{}", reply.text);
                    println!();
                }
            }
        }
    }

    Ok(())
}

/// Finds the static directory for serving frontend files.
fn find_static_dir() -> PathBuf {
    // Try relative to current working directory
    let cwd_static = PathBuf::from("static");
    if cwd_static.is_dir() {
        return cwd_static;
    }

    // Try relative to executable
    if let Ok(exe_path) = std::env::current_exe()
        && let Some(exe_dir) = exe_path.parent()
    {
        let exe_static = exe_dir.join("static");
        if exe_static.is_dir() {
            return exe_static;
        }
    }

    cwd_static
}
