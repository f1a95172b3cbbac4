//! Web server exposing the calculator and the assistant as a JSON API.
//!
//! The server keeps no session state: clients send their user data and
//! conversation with every chat request. Static files for a frontend are
//! served from a directory as a fallback.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Form, Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::services::ServeDir;

use crate::assistant::{Assistant, Conversation, Message};
use crate::calories::compute;
use crate::domain::{ActivityLevel, CalorieResults, Gender, Goal, UserData};
use crate::input::{FormFields, collect};
use crate::report::ResultsView;

/// Shared application state.
pub struct AppState {
    pub assistant: Assistant,
}

// === JSON Types ===

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationResponse {
    pub user_data: UserData,
    pub results: CalorieResults,
    pub view: ResultsView,
}

#[derive(Serialize)]
pub struct OptionJson {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsResponse {
    pub genders: Vec<OptionJson>,
    pub activity_levels: Vec<OptionJson>,
    pub goals: Vec<OptionJson>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub user_data: UserData,
    #[serde(default)]
    pub history: Vec<Message>,
    pub message: String,
}

#[derive(Serialize)]
pub struct ChatResponse {
    /// The model's reply, or null when the message was blank.
    pub reply: Option<Message>,
    pub history: Vec<Message>,
}

#[derive(Serialize)]
pub struct ConversationResponse {
    pub history: Vec<Message>,
}

// === Router Setup ===

/// Creates the application router.
pub fn create_router(state: Arc<AppState>, static_dir: PathBuf) -> Router {
    Router::new()
        .route("/api/defaults", get(get_defaults))
        .route("/api/options", get(get_options))
        .route("/api/calculate", post(calculate))
        .route("/api/calculate/form", post(calculate_form))
        .route("/api/chat/start", post(start_chat))
        .route("/api/chat/reset", post(reset_chat))
        .route("/api/chat", post(chat))
        .fallback_service(ServeDir::new(static_dir).append_index_html_on_directories(true))
        .with_state(state)
}

/// Runs the web server.
pub async fn run_server(
    state: Arc<AppState>,
    port: u16,
    static_dir: PathBuf,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    println!("Server running at http://localhost:{}", port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// === API Handlers ===

/// GET /api/defaults - Initial form values.
async fn get_defaults() -> Json<UserData> {
    Json(UserData::default())
}

/// GET /api/options - Choices for the enumerated form fields.
async fn get_options() -> Json<OptionsResponse> {
    Json(OptionsResponse {
        genders: Gender::all()
            .iter()
            .map(|g| OptionJson {
                id: g.id(),
                label: g.display_name(),
                multiplier: None,
            })
            .collect(),
        activity_levels: ActivityLevel::all()
            .iter()
            .map(|a| OptionJson {
                id: a.id(),
                label: a.display_name(),
                multiplier: Some(a.multiplier()),
            })
            .collect(),
        goals: Goal::all()
            .iter()
            .map(|g| OptionJson {
                id: g.id(),
                label: g.display_name(),
                multiplier: None,
            })
            .collect(),
    })
}

/// POST /api/calculate - Calculate from typed JSON input.
async fn calculate(Json(user_data): Json<UserData>) -> Json<CalculationResponse> {
    Json(calculation_response(user_data))
}

/// POST /api/calculate/form - Calculate from raw form fields.
async fn calculate_form(
    Form(fields): Form<FormFields>,
) -> Result<Json<CalculationResponse>, (StatusCode, String)> {
    let user_data =
        collect(&fields).map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    Ok(Json(calculation_response(user_data)))
}

/// POST /api/chat/start - Open a conversation with the welcome message.
async fn start_chat(Json(user_data): Json<UserData>) -> Json<ConversationResponse> {
    let results = compute(&user_data);
    Json(ConversationResponse {
        history: Conversation::new(&results).into_messages(),
    })
}

/// POST /api/chat/reset - Replace the conversation with a reset notice.
async fn reset_chat() -> Json<ConversationResponse> {
    let mut conversation = Conversation::from_messages(Vec::new());
    conversation.reset();
    Json(ConversationResponse {
        history: conversation.into_messages(),
    })
}

/// POST /api/chat - Send a message to the assistant.
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let results = compute(&request.user_data);
    let mut conversation = if request.history.is_empty() {
        Conversation::new(&results)
    } else {
        Conversation::from_messages(request.history)
    };

    let reply = state
        .assistant
        .reply(
            &mut conversation,
            &request.user_data,
            &results,
            &request.message,
        )
        .await
        .cloned();

    Json(ChatResponse {
        reply,
        history: conversation.into_messages(),
    })
}

// === Helper Functions ===

fn calculation_response(user_data: UserData) -> CalculationResponse {
    let results = compute(&user_data);
    CalculationResponse {
        view: ResultsView::new(&user_data, &results),
        user_data,
        results,
    }
}
