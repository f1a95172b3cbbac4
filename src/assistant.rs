//! Conversational nutrition assistant backed by the Gemini API.
//!
//! Each user message is sent together with the conversation so far and a
//! system instruction describing the user's data and targets. There is a
//! single request per message, with no retries and no streaming. Any failure
//! is logged and answered with a static fallback message.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CalorieResults, UserData};
use crate::error::AssistantError;

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Base URL of the Generative Language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Upper bound on a single Gemini request, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Environment variables checked for the API key, in order.
const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Reply appended when the model answers with no text.
pub const EMPTY_REPLY_FALLBACK: &str = "Sorry, something went wrong while processing your request.";

/// Reply appended when the request fails.
pub const CONNECTION_FALLBACK: &str =
    "Sorry, I had trouble reaching the assistant. Please try again.";

/// Transcript shown after the user clears the conversation.
pub const RESET_MESSAGE: &str = "The conversation has been reset. How can I help you now?";

/// Configuration for the assistant and its Gemini backend.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    /// API key; requests fail with [`AssistantError::MissingApiKey`] without one.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Sampling temperature (default: 0.7).
    pub temperature: f32,
    /// Language the assistant is asked to answer in.
    pub language: String,
    /// Limit on one request, from connecting until the body is read.
    pub timeout: Duration,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: api_key_from_env(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: 0.7,
            language: "English".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Reads the API key from `GEMINI_API_KEY`, falling back to `API_KEY`.
pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

// === Conversation ===

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A single message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self {
            role: Role::Model,
            text: text.into(),
        }
    }
}

/// Greeting that opens every conversation.
pub fn welcome_message(results: &CalorieResults) -> String {
    format!(
        "Hello! I'm your nutrition assistant. Based on your data (daily need: {} kcal), \
         I can help you plan your meals or answer any health question. Where shall we start?",
        results.target_calories.round() as i64
    )
}

/// Chat transcript for one calculation session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Starts a conversation with the welcome message.
    pub fn new(results: &CalorieResults) -> Self {
        Self {
            messages: vec![Message::model(welcome_message(results))],
        }
    }

    /// Restores a conversation from a transcript held by the client.
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Clears the transcript, leaving only a reset notice.
    pub fn reset(&mut self) {
        self.messages = vec![Message::model(RESET_MESSAGE)];
    }

    /// Returns the messages to send to the model.
    ///
    /// Gemini requires the history to open with a user turn, so a leading
    /// model message (the greeting or reset notice) is dropped.
    pub fn request_history(&self) -> Vec<Message> {
        let skip = usize::from(
            self.messages
                .first()
                .is_some_and(|m| m.role == Role::Model),
        );
        self.messages[skip..].to_vec()
    }
}

/// Builds the context preamble describing the user to the model.
pub fn system_instruction(user: &UserData, results: &CalorieResults, language: &str) -> String {
    format!(
        "You are a professional nutritionist and fitness coach.\n\
         Current user data:\n\
         - Age: {}\n\
         - Weight: {} kg\n\
         - Height: {} cm\n\
         - Gender: {}\n\
         - Goal: {}\n\
         - Daily calorie need: {} kcal.\n\
         - Suggested macros: protein {}g, carbs {}g, fats {}g.\n\
         Give practical advice in {}, and be encouraging and clear. \
         Do not give dangerous medical advice, and always remind the user to \
         consult a doctor when necessary.",
        user.age,
        user.weight_kg,
        user.height_cm,
        user.gender.id(),
        user.goal.id(),
        results.target_calories.round() as i64,
        results.macros.protein,
        results.macros.carbs,
        results.macros.fats,
        language,
    )
}

// === Backend ===

/// A single text generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub contents: Vec<Message>,
    pub temperature: f32,
}

/// Text generation service used by the assistant.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Returns the model's reply text, which may be empty.
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AssistantError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    system_instruction: GeminiContent,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<Role>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

/// [`ChatBackend`] calling Gemini's `generateContent` endpoint.
pub struct GeminiBackend {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(config: &AssistantConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build HTTP client with timeout: {e}");
                reqwest::Client::new()
            });
        Self {
            client,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_request(request: &GenerateRequest) -> GeminiRequest {
        let text_content = |role: Option<Role>, text: &str| GeminiContent {
            role,
            parts: vec![GeminiPart {
                text: Some(text.to_string()),
            }],
        };

        GeminiRequest {
            contents: request
                .contents
                .iter()
                .map(|m| text_content(Some(m.role), &m.text))
                .collect(),
            system_instruction: text_content(None, &request.system_instruction),
            generation_config: GenerationConfig {
                temperature: request.temperature,
            },
        }
    }

    /// Concatenates the text parts of the first candidate.
    fn extract_text(response: &GeminiResponse) -> String {
        response
            .candidates
            .as_ref()
            .and_then(|c| c.first())
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }

    /// Pulls the error message out of an error body, or returns the body.
    fn error_message(body: &str) -> String {
        serde_json::from_str::<GeminiResponse>(body)
            .ok()
            .and_then(|r| r.error)
            .map_or_else(|| body.to_string(), |e| e.message)
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    async fn generate(&self, request: &GenerateRequest) -> Result<String, AssistantError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey)?;
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        log::debug!(
            "Sending {} messages to {}",
            request.contents.len(),
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&Self::build_request(request))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message: Self::error_message(&body),
            });
        }

        let parsed: GeminiResponse = serde_json::from_str(&body)
            .map_err(|e| AssistantError::InvalidResponse(e.to_string()))?;

        if let Some(error) = parsed.error {
            return Err(AssistantError::Api {
                status: status.as_u16(),
                message: error.message,
            });
        }

        Ok(Self::extract_text(&parsed))
    }
}

// === Assistant ===

/// Sends user messages to the backend and records the replies.
#[derive(Clone)]
pub struct Assistant {
    backend: Arc<dyn ChatBackend>,
    temperature: f32,
    language: String,
}

impl Assistant {
    pub fn new(backend: Arc<dyn ChatBackend>, config: &AssistantConfig) -> Self {
        Self {
            backend,
            temperature: config.temperature,
            language: config.language.clone(),
        }
    }

    /// Creates an assistant talking to Gemini.
    pub fn gemini(config: &AssistantConfig) -> Self {
        if config.api_key.is_none() {
            log::warn!("No Gemini API key configured; assistant replies will fail");
        }
        Self::new(Arc::new(GeminiBackend::new(config)), config)
    }

    /// Appends `text` and the model's reply to the conversation.
    ///
    /// Blank input is ignored and returns `None`. Otherwise returns the
    /// appended model message, which is a fallback text if the request failed.
    pub async fn reply<'a>(
        &self,
        conversation: &'a mut Conversation,
        user: &UserData,
        results: &CalorieResults,
        text: &str,
    ) -> Option<&'a Message> {
        if text.trim().is_empty() {
            return None;
        }

        conversation.push(Message::user(text));

        let request = GenerateRequest {
            system_instruction: system_instruction(user, results, &self.language),
            contents: conversation.request_history(),
            temperature: self.temperature,
        };

        let reply = match self.backend.generate(&request).await {
            Ok(generated) if !generated.is_empty() => generated,
            Ok(_) => {
                log::warn!("Assistant returned an empty reply");
                EMPTY_REPLY_FALLBACK.to_string()
            }
            Err(e) => {
                log::error!("Assistant request failed: {}", e);
                CONNECTION_FALLBACK.to_string()
            }
        };

        conversation.push(Message::model(reply));
        conversation.messages().last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calories::compute;

    fn session() -> (UserData, CalorieResults) {
        let user = UserData::default();
        (user, compute(&user))
    }

    fn config() -> AssistantConfig {
        AssistantConfig {
            api_key: None,
            ..AssistantConfig::default()
        }
    }

    fn assistant_with(backend: MockChatBackend) -> Assistant {
        Assistant::new(Arc::new(backend), &config())
    }

    #[test]
    fn test_welcome_mentions_rounded_target() {
        let (_, results) = session();
        let conversation = Conversation::new(&results);

        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].role, Role::Model);
        assert!(conversation.messages()[0].text.contains("2546 kcal"));
    }

    #[test]
    fn test_history_skips_leading_model_message() {
        let (_, results) = session();
        let mut conversation = Conversation::new(&results);
        assert!(conversation.request_history().is_empty());

        conversation.push(Message::user("hi"));
        conversation.push(Message::model("hello"));
        assert_eq!(
            conversation.request_history(),
            vec![Message::user("hi"), Message::model("hello")]
        );
    }

    #[test]
    fn test_history_keeps_leading_user_message() {
        let conversation = Conversation::from_messages(vec![Message::user("hi")]);
        assert_eq!(conversation.request_history(), vec![Message::user("hi")]);
    }

    #[test]
    fn test_reset_leaves_notice() {
        let (_, results) = session();
        let mut conversation = Conversation::new(&results);
        conversation.push(Message::user("hi"));
        conversation.reset();

        assert_eq!(conversation.messages(), &[Message::model(RESET_MESSAGE)]);
        assert!(conversation.request_history().is_empty());
    }

    #[test]
    fn test_system_instruction_describes_user() {
        let (user, results) = session();
        let text = system_instruction(&user, &results, "Arabic");

        assert!(text.contains("- Age: 25"));
        assert!(text.contains("- Weight: 70 kg"));
        assert!(text.contains("- Height: 170 cm"));
        assert!(text.contains("- Gender: male"));
        assert!(text.contains("- Goal: maintain"));
        assert!(text.contains("- Daily calorie need: 2546 kcal."));
        assert!(text.contains("protein 191g, carbs 255g, fats 85g"));
        assert!(text.contains("in Arabic"));
        assert!(text.contains("consult a doctor"));
    }

    #[tokio::test]
    async fn test_reply_appends_model_text() {
        let (user, results) = session();
        let mut backend = MockChatBackend::new();
        backend
            .expect_generate()
            .withf(|request| {
                request.contents == vec![Message::user("What should I eat?")]
                    && request.system_instruction.contains("- Age: 25")
                    && request.temperature == 0.7
            })
            .times(1)
            .returning(|_| Ok("Oats and eggs.".to_string()));

        let assistant = assistant_with(backend);
        let mut conversation = Conversation::new(&results);
        let reply = assistant
            .reply(&mut conversation, &user, &results, "What should I eat?")
            .await
            .cloned();

        assert_eq!(reply, Some(Message::model("Oats and eggs.")));
        assert_eq!(conversation.messages().len(), 3);
    }

    #[tokio::test]
    async fn test_reply_sends_previous_turns() {
        let (user, results) = session();
        let mut backend = MockChatBackend::new();
        backend
            .expect_generate()
            .withf(|request| request.contents.len() == 1)
            .times(1)
            .returning(|_| Ok("first".to_string()));
        backend
            .expect_generate()
            .withf(|request| {
                request.contents.len() == 3 && request.contents[1] == Message::model("first")
            })
            .times(1)
            .returning(|_| Ok("second".to_string()));

        let assistant = assistant_with(backend);
        let mut conversation = Conversation::new(&results);
        assistant
            .reply(&mut conversation, &user, &results, "one")
            .await;
        assistant
            .reply(&mut conversation, &user, &results, "two")
            .await;

        assert_eq!(conversation.messages().len(), 5);
        assert_eq!(conversation.messages()[4], Message::model("second"));
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let (user, results) = session();
        let mut backend = MockChatBackend::new();
        backend.expect_generate().times(0);

        let assistant = assistant_with(backend);
        let mut conversation = Conversation::new(&results);
        let reply = assistant
            .reply(&mut conversation, &user, &results, "   ")
            .await;

        assert!(reply.is_none());
        assert_eq!(conversation.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_uses_connection_fallback() {
        let (user, results) = session();
        let mut backend = MockChatBackend::new();
        backend
            .expect_generate()
            .returning(|_| Err(AssistantError::MissingApiKey));

        let assistant = assistant_with(backend);
        let mut conversation = Conversation::new(&results);
        let reply = assistant
            .reply(&mut conversation, &user, &results, "hello")
            .await
            .cloned();

        assert_eq!(reply, Some(Message::model(CONNECTION_FALLBACK)));
    }

    #[tokio::test]
    async fn test_empty_reply_uses_processing_fallback() {
        let (user, results) = session();
        let mut backend = MockChatBackend::new();
        backend.expect_generate().returning(|_| Ok(String::new()));

        let assistant = assistant_with(backend);
        let mut conversation = Conversation::new(&results);
        let reply = assistant
            .reply(&mut conversation, &user, &results, "hello")
            .await
            .cloned();

        assert_eq!(reply, Some(Message::model(EMPTY_REPLY_FALLBACK)));
    }

    #[tokio::test]
    async fn test_gemini_without_key_fails_fast() {
        let backend = GeminiBackend::new(&config());
        let request = GenerateRequest {
            system_instruction: String::new(),
            contents: vec![Message::user("hi")],
            temperature: 0.7,
        };

        assert!(matches!(
            backend.generate(&request).await,
            Err(AssistantError::MissingApiKey)
        ));
    }

    #[tokio::test]
    async fn test_gemini_stalled_server_times_out() {
        // Accepts the connection but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let backend = GeminiBackend::new(&AssistantConfig {
            api_key: Some("test-key".to_string()),
            base_url: format!("http://{addr}"),
            timeout: Duration::from_millis(200),
            ..config()
        });
        let request = GenerateRequest {
            system_instruction: String::new(),
            contents: vec![Message::user("hi")],
            temperature: 0.7,
        };

        let result = tokio::time::timeout(Duration::from_secs(5), backend.generate(&request))
            .await
            .expect("request was not bounded by the client timeout");
        assert!(matches!(result, Err(AssistantError::Request(_))));
    }

    #[test]
    fn test_default_timeout() {
        assert_eq!(
            AssistantConfig::default().timeout,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        );
    }

    #[test]
    fn test_gemini_request_shape() {
        let request = GenerateRequest {
            system_instruction: "be helpful".to_string(),
            contents: vec![Message::user("hi"), Message::model("hello")],
            temperature: 0.5,
        };
        let json = serde_json::to_value(GeminiBackend::build_request(&request)).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [
                    {"role": "user", "parts": [{"text": "hi"}]},
                    {"role": "model", "parts": [{"text": "hello"}]}
                ],
                "systemInstruction": {"parts": [{"text": "be helpful"}]},
                "generationConfig": {"temperature": 0.5}
            })
        );
    }

    #[test]
    fn test_gemini_extract_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates": [
                {"content": {"role": "model", "parts": [{"text": "Eat "}, {"text": "well."}]}},
                {"content": {"role": "model", "parts": [{"text": "ignored"}]}}
            ]}"#,
        )
        .unwrap();

        assert_eq!(GeminiBackend::extract_text(&response), "Eat well.");
    }

    #[test]
    fn test_gemini_extract_text_without_candidates() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(GeminiBackend::extract_text(&response), "");
    }

    #[test]
    fn test_gemini_error_message() {
        let body = r#"{"error": {"code": 403, "message": "API key not valid", "status": "PERMISSION_DENIED"}}"#;
        assert_eq!(GeminiBackend::error_message(body), "API key not valid");
        assert_eq!(GeminiBackend::error_message("Bad Gateway"), "Bad Gateway");
    }
}
