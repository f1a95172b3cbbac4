//! Telegram bot front end for the calculator and the assistant.
//!
//! Each chat holds one session in memory: the last calculation and its
//! conversation. A new `/calc` replaces the session.

use std::collections::HashMap;
use std::sync::Arc;

use teloxide::{
    dispatching::UpdateFilterExt,
    dptree,
    prelude::*,
    utils::command::{BotCommands, ParseError},
};
use tokio::sync::RwLock;

use crate::assistant::{Assistant, Conversation, RESET_MESSAGE};
use crate::calories::compute;
use crate::domain::{CalorieResults, UserData};
use crate::input::{FormFields, collect};
use crate::report::render_text;

const CALC_USAGE: &str = "Usage: /calc [age] [weight] [height] [gender] [activity] [goal]\n\
     Example: /calc 25 70 170 male moderate maintain";

const NO_SESSION: &str = "Calculate your targets first with /calc, then ask me anything.";

const EMPTY_QUESTION: &str = "Please type a question after /ask.";

/// One chat's calculation and conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserData,
    pub results: CalorieResults,
    pub conversation: Conversation,
}

impl Session {
    pub fn new(user: UserData) -> Self {
        let results = compute(&user);
        Self {
            user,
            results,
            conversation: Conversation::new(&results),
        }
    }
}

/// In-memory sessions keyed by chat.
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<ChatId, Session>>,
}

impl SessionStore {
    /// Starts a new session for `chat`, discarding any previous one.
    pub async fn start(&self, chat: ChatId, user: UserData) -> Session {
        let session = Session::new(user);
        self.sessions.write().await.insert(chat, session.clone());
        session
    }

    pub async fn get(&self, chat: ChatId) -> Option<Session> {
        self.sessions.read().await.get(&chat).cloned()
    }

    /// Removes the session so it can be updated without holding the lock.
    pub async fn take(&self, chat: ChatId) -> Option<Session> {
        self.sessions.write().await.remove(&chat)
    }

    /// Puts a taken session back unless a newer one was started meanwhile.
    pub async fn restore(&self, chat: ChatId, session: Session) {
        self.sessions.write().await.entry(chat).or_insert(session);
    }

    /// Resets the conversation of `chat`. Returns false if there is no session.
    pub async fn reset(&self, chat: ChatId) -> bool {
        match self.sessions.write().await.get_mut(&chat) {
            Some(session) => {
                session.conversation.reset();
                true
            }
            None => false,
        }
    }
}

/// Dependencies shared by the bot handlers.
pub struct BotState {
    pub assistant: Assistant,
    pub sessions: SessionStore,
}

impl BotState {
    pub fn new(assistant: Assistant) -> Self {
        Self {
            assistant,
            sessions: SessionStore::default(),
        }
    }
}

/// Runs the bot until the process is stopped. Reads the token from `TELOXIDE_TOKEN`.
pub async fn start_bot(state: Arc<BotState>) {
    let bot = Bot::from_env();

    log::info!("Starting Telegram bot");

    // Updates from one chat are handled in order, so a session is never
    // taken by two handlers at once.
    Dispatcher::builder(
        bot,
        Update::filter_message()
            .branch(dptree::entry().filter_command::<Command>().endpoint(answer))
            .branch(dptree::filter(|_: Message| true).endpoint(handle_text)),
    )
    .dependencies(dptree::deps![state])
    .build()
    .dispatch()
    .await;
}

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "display this text.")]
    Help,
    #[command(
        description = "[age] [weight] [height] [gender] [activity] [goal] calculate daily targets.",
        parse_with = "split"
    )]
    Calc(String, String, String, String, String, String),
    #[command(description = "show your last results.")]
    Results,
    #[command(description = "[question] ask the nutrition assistant.")]
    Ask(String),
    #[command(description = "clear the conversation.")]
    Reset,
}

async fn answer(bot: Bot, msg: Message, cmd: Command, state: Arc<BotState>) -> ResponseResult<()> {
    let chat = msg.chat.id;
    let reply = match cmd {
        Command::Help => Command::descriptions().to_string(),
        Command::Calc(age, weight, height, gender, activity_level, goal) => {
            let fields = FormFields {
                age,
                weight,
                height,
                gender,
                activity_level,
                goal,
            };
            match collect(&fields) {
                Ok(user) => calc_reply(&state.sessions.start(chat, user).await),
                Err(e) => format!("Invalid input: {e}\n\n{CALC_USAGE}"),
            }
        }
        Command::Results => match state.sessions.get(chat).await {
            Some(session) => render_text(&session.user, &session.results),
            None => NO_SESSION.to_string(),
        },
        Command::Ask(question) => ask(&state, chat, &question).await,
        Command::Reset => {
            if state.sessions.reset(chat).await {
                RESET_MESSAGE.to_string()
            } else {
                NO_SESSION.to_string()
            }
        }
    };

    bot.send_message(chat, reply).await?;
    Ok(())
}

/// Handles messages that are not valid commands.
///
/// Plain text goes to the assistant; malformed commands get a usage hint.
async fn handle_text(bot: Bot, msg: Message, state: Arc<BotState>) -> ResponseResult<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };

    let reply = if text.starts_with('/') {
        match command_error(text) {
            Some(reply) => reply,
            None => return Ok(()),
        }
    } else {
        ask(&state, msg.chat.id, text).await
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

/// Sends `question` to the assistant within the chat's session.
async fn ask(state: &BotState, chat: ChatId, question: &str) -> String {
    let Some(mut session) = state.sessions.take(chat).await else {
        return NO_SESSION.to_string();
    };

    let reply = state
        .assistant
        .reply(
            &mut session.conversation,
            &session.user,
            &session.results,
            question,
        )
        .await
        .map(|m| m.text.clone());

    state.sessions.restore(chat, session).await;
    reply.unwrap_or_else(|| EMPTY_QUESTION.to_string())
}

fn calc_reply(session: &Session) -> String {
    let welcome = session
        .conversation
        .messages()
        .first()
        .map(|m| m.text.as_str())
        .unwrap_or_default();
    format!("{}\n{}", render_text(&session.user, &session.results), welcome)
}

/// Describes why `text` failed to parse as a command, or `None` to stay silent.
fn command_error(text: &str) -> Option<String> {
    let err = Command::parse(text, "").err()?;
    let reply = match err {
        ParseError::TooFewArguments {
            expected,
            found,
            message,
        } => {
            format!("Missing argument. Expected {expected}, got {found}.\nUsage: {message}")
        }
        ParseError::TooManyArguments {
            expected,
            found,
            message,
        } => {
            format!("Too many arguments. Expected {expected}, got {found}.\nUsage: {message}")
        }
        ParseError::IncorrectFormat(err) => {
            format!("Invalid format: {err}")
        }
        ParseError::UnknownCommand(cmd) => {
            format!("Unknown command: {cmd}\n\n{}", Command::descriptions())
        }
        ParseError::WrongBotName(_) => return None,
        ParseError::Custom(err) => format!("Error: {err}"),
    };
    Some(reply)
}
