//! Client for OpenAI-compatible chat completion endpoints, OpenRouter by default.
//!
//! One call to [`OpenRouterClient::analyze`] is one HTTP exchange:
//!
//! 1. the prompt is built with [`PromptBuilder`];
//! 2. a `POST {base_url}/chat/completions` is issued with a bearer token, a fixed model, a
//!    temperature of 0.7 and an output cap, under a short connect timeout and a longer read
//!    timeout;
//! 3. a non-success status becomes [`AnalysisError::Transport`] carrying the status and the error
//!    body;
//! 4. `choices[0].message.content` is extracted, or [`AnalysisError::MalformedResponse`] is
//!    returned if the envelope lacks it;
//! 5. the completion is handed to [`ResponseParser`].
//!
//! Nothing is retried here.

use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};

use super::*;
use crate::{
  config::ModelConfig,
  errors::ScholarError,
  parser::ResponseParser,
  prompt::{Audience, PromptBuilder},
};

/// Name sent to OpenRouter for app attribution.
const APP_TITLE: &str = "scholar";

/// Referer sent to OpenRouter for app attribution.
const APP_REFERER: &str = "https://github.com/autoparallel/scholar";

/// A single chat message in the request body.
#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
  /// Always `user` for analysis prompts
  role:    &'static str,
  /// The prompt text
  content: &'a str,
}

/// Request body of a chat completion.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
  /// Model identifier, e.g. `deepseek/deepseek-chat`
  model:       &'a str,
  /// Conversation, here a single user turn
  messages:    Vec<ChatMessage<'a>>,
  /// Sampling temperature
  temperature: f32,
  /// Cap on generated tokens
  max_tokens:  u32,
}

/// Response envelope of a chat completion, with every level optional so that a missing piece can
/// be reported precisely.
#[derive(Debug, Deserialize)]
struct ChatResponse {
  /// Candidate completions; exactly one is expected
  choices: Option<Vec<Choice>>,
}

/// One candidate completion.
#[derive(Debug, Deserialize)]
struct Choice {
  /// The generated message
  message: Option<ChoiceMessage>,
}

/// The generated message of a choice.
#[derive(Debug, Deserialize)]
struct ChoiceMessage {
  /// The completion text
  content: Option<String>,
}

impl ChatResponse {
  /// Extracts the single completion text.
  fn into_completion(self) -> Result<String, AnalysisError> {
    let choices = self
      .choices
      .ok_or_else(|| AnalysisError::MalformedResponse("Missing 'choices' in API response".into()))?;
    let choice = choices
      .into_iter()
      .next()
      .ok_or_else(|| AnalysisError::MalformedResponse("Empty choices in API response".into()))?;
    let message = choice.message.ok_or_else(|| {
      AnalysisError::MalformedResponse("No message in API response choice".into())
    })?;
    message.content.filter(|content| !content.trim().is_empty()).ok_or_else(|| {
      AnalysisError::MalformedResponse("Empty content in API response message".into())
    })
  }
}

/// Client for the remote analysis model.
///
/// The credential and endpoint are passed in explicitly; the client never reads the environment.
///
/// # Examples
///
/// ```no_run
/// # use scholar::{
/// #   clients::{ModelClient, OpenRouterClient},
/// #   config::ModelConfig,
/// #   prompt::Audience,
/// # };
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ModelConfig { model: "openai/gpt-4o-mini".into(), ..ModelConfig::default() };
/// let client = OpenRouterClient::with_config("sk-or-...", &config)?;
///
/// let rec = client.analyze("We propose ...", "robotics", Audience::Researcher).await?;
/// println!("{}: {}", rec.title, rec.importance);
/// # Ok(())
/// # }
/// ```
pub struct OpenRouterClient {
  /// Internal web client carrying the auth headers and timeouts.
  client:      reqwest::Client,
  /// Endpoint base, e.g. `https://openrouter.ai/api/v1`.
  base_url:    String,
  /// Model identifier sent with every request.
  model:       String,
  /// Sampling temperature sent with every request.
  temperature: f32,
  /// Output length cap sent with every request.
  max_tokens:  u32,
}

impl OpenRouterClient {
  /// Creates a client for the default endpoint and model.
  pub fn new(api_key: &str) -> Result<Self, ScholarError> {
    Self::with_config(api_key, &ModelConfig::default())
  }

  /// Creates a client from explicit model settings.
  ///
  /// # Errors
  ///
  /// Returns [`ScholarError::MissingApiKey`] for a blank key, [`ScholarError::ApiError`] if the
  /// key cannot be used as a header value, and [`ScholarError::Network`] if the HTTP client
  /// cannot be built.
  pub fn with_config(api_key: &str, config: &ModelConfig) -> Result<Self, ScholarError> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
      return Err(ScholarError::MissingApiKey);
    }

    let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
      .map_err(|e| ScholarError::ApiError(format!("Invalid API key: {e}")))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, auth);
    headers.insert(header::REFERER, HeaderValue::from_static(APP_REFERER));
    headers.insert("X-Title", HeaderValue::from_static(APP_TITLE));

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
      .read_timeout(Duration::from_secs(config.read_timeout_secs))
      .build()?;

    Ok(Self {
      client,
      base_url: config.base_url.trim_end_matches('/').to_string(),
      model: config.model.clone(),
      temperature: config.temperature,
      max_tokens: config.max_tokens,
    })
  }

  /// The model identifier requests are sent with.
  pub fn model(&self) -> &str { &self.model }

  /// Sends `prompt` and returns the raw completion text.
  async fn complete(&self, prompt: &str) -> Result<String, AnalysisError> {
    let url = format!("{}/chat/completions", self.base_url);
    let body = ChatRequest {
      model:       &self.model,
      messages:    vec![ChatMessage { role: "user", content: prompt }],
      temperature: self.temperature,
      max_tokens:  self.max_tokens,
    };

    debug!("Requesting analysis from {url} with model {}", self.model);
    let response = self.client.post(&url).json(&body).send().await?;
    let status = response.status();
    let text = response.text().await?;
    trace!("Model response ({status}): {text}");

    if !status.is_success() {
      let details = match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => value.to_string(),
        Err(_) if text.trim().is_empty() => "No error details available".to_string(),
        Err(_) => text,
      };
      warn!("API error for model {}: {status} - {details}", self.model);
      return Err(AnalysisError::Transport { status: Some(status.as_u16()), details });
    }

    let envelope: ChatResponse = serde_json::from_str(&text).map_err(|e| {
      AnalysisError::MalformedResponse(format!("Response body is not a completion: {e}"))
    })?;
    envelope.into_completion()
  }
}

#[async_trait]
impl ModelClient for OpenRouterClient {
  async fn analyze(
    &self,
    content: &str,
    field: &str,
    audience: Audience,
  ) -> Result<Recommendation, AnalysisError> {
    let prompt = PromptBuilder::build(content, field, audience);
    let completion = self.complete(&prompt).await?;
    Ok(ResponseParser::parse(&completion)?)
  }
}

#[cfg(test)]
mod tests {
  use mockito::{Matcher, Server};
  use serde_json::json;

  use super::*;
  use crate::{errors::ParseError, parser::Section};

  const COMPLETION: &str = "Title: Sparse Attention at Scale\nAuthors: A. Researcher, B. \
                            Scientist\nKey Contributions: A sparse attention kernel.\n\
                            Importance: Cuts memory use.\nCitation: Researcher, A. (2024)\n\
                            Reason Chosen: Efficient NLP.";

  fn client_for(server: &Server) -> OpenRouterClient {
    let config = ModelConfig { base_url: server.url(), ..ModelConfig::default() };
    OpenRouterClient::with_config("test-key", &config).unwrap()
  }

  fn completion_body(content: &str) -> String {
    json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] }).to_string()
  }

  #[traced_test]
  #[tokio::test]
  async fn test_analyze_success() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_header("authorization", "Bearer test-key")
      .match_body(Matcher::PartialJson(json!({
        "model": "deepseek/deepseek-chat",
        "temperature": 0.7,
        "max_tokens": 4000,
      })))
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(completion_body(COMPLETION))
      .expect(1)
      .create_async()
      .await;

    let rec = client_for(&server).analyze("An abstract.", "nlp", Audience::General).await?;
    assert_eq!(rec.title, "Sparse Attention at Scale");
    assert_eq!(rec.reason_chosen, "Efficient NLP.");
    assert_eq!(rec.category, "");
    mock.assert_async().await;
    Ok(())
  }

  #[tokio::test]
  async fn test_prompt_is_sent_as_single_user_message() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("POST", "/chat/completions")
      .match_body(Matcher::AllOf(vec![
        Matcher::Regex(r#""messages":\[\{"role":"user""#.to_string()),
        Matcher::Regex(r"Now analyze this paper:\\nUnique abstract 42".to_string()),
      ]))
      .with_status(200)
      .with_body(completion_body(COMPLETION))
      .create_async()
      .await;

    client_for(&server).analyze("Unique abstract 42", "nlp", Audience::General).await.unwrap();
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_non_success_status_is_transport_error() {
    let mut server = Server::new_async().await;
    server
      .mock("POST", "/chat/completions")
      .with_status(429)
      .with_body(r#"{"error":{"message":"Rate limit exceeded"}}"#)
      .create_async()
      .await;

    let err = client_for(&server).analyze("x", "nlp", Audience::General).await.unwrap_err();
    match err {
      AnalysisError::Transport { status, details } => {
        assert_eq!(status, Some(429));
        assert!(details.contains("Rate limit exceeded"));
      },
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[tokio::test]
  async fn test_missing_choices_is_malformed() {
    let mut server = Server::new_async().await;
    server
      .mock("POST", "/chat/completions")
      .with_status(200)
      .with_body(r#"{"id":"gen-1","object":"chat.completion"}"#)
      .create_async()
      .await;

    let err = client_for(&server).analyze("x", "nlp", Audience::General).await.unwrap_err();
    assert!(matches!(err, AnalysisError::MalformedResponse(msg) if msg.contains("choices")));
  }

  #[tokio::test]
  async fn test_empty_choices_and_content_are_malformed() {
    for body in [r#"{"choices":[]}"#.to_string(), completion_body("  ")] {
      let mut server = Server::new_async().await;
      server.mock("POST", "/chat/completions").with_body(body).create_async().await;
      let err = client_for(&server).analyze("x", "nlp", Audience::General).await.unwrap_err();
      assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }
  }

  #[tokio::test]
  async fn test_unparseable_completion_propagates_parse_error() {
    let mut server = Server::new_async().await;
    server
      .mock("POST", "/chat/completions")
      .with_body(completion_body("I cannot help with that."))
      .create_async()
      .await;

    let err = client_for(&server).analyze("x", "nlp", Audience::General).await.unwrap_err();
    assert!(matches!(
      err,
      AnalysisError::Parse(ParseError::MissingSections(ref missing)) if missing.len() == 5
    ));
    assert_eq!(err.stage(), crate::report::FailureStage::ApiResponseParsing);
  }

  #[tokio::test]
  async fn test_sentinel_completion_is_rejected() {
    let mut server = Server::new_async().await;
    let completion = COMPLETION.replace("Sparse Attention at Scale", "[Paper title]");
    server
      .mock("POST", "/chat/completions")
      .with_body(completion_body(&completion))
      .create_async()
      .await;

    let err = client_for(&server).analyze("x", "nlp", Audience::General).await.unwrap_err();
    assert!(matches!(
      err,
      AnalysisError::Parse(ParseError::SentinelValue { section: Section::Title, .. })
    ));
  }

  #[tokio::test]
  async fn test_connection_failure_is_transport_error() {
    let config = ModelConfig { base_url: "http://127.0.0.1:9".into(), ..ModelConfig::default() };
    let client = OpenRouterClient::with_config("test-key", &config).unwrap();
    let err = client.analyze("x", "nlp", Audience::General).await.unwrap_err();
    assert!(matches!(err, AnalysisError::Transport { status: None, .. }));
  }

  #[tokio::test]
  async fn test_read_timeout_is_transport_error() -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    // Accepts the connection and never answers.
    let server = tokio::spawn(async move {
      let (_socket, _) = listener.accept().await?;
      tokio::time::sleep(Duration::from_secs(30)).await;
      Ok::<_, std::io::Error>(())
    });

    let config = ModelConfig {
      base_url: format!("http://{addr}"),
      read_timeout_secs: 1,
      ..ModelConfig::default()
    };
    let client = OpenRouterClient::with_config("test-key", &config)?;
    let err = tokio::time::timeout(
      Duration::from_secs(10),
      client.analyze("x", "nlp", Audience::General),
    )
    .await?
    .unwrap_err();

    assert!(matches!(err, AnalysisError::Transport { status: None, .. }));
    assert_eq!(err.stage(), crate::report::FailureStage::ApiRequest);
    server.abort();
    Ok(())
  }

  #[test]
  fn test_blank_key_is_rejected() {
    assert!(matches!(OpenRouterClient::new("  "), Err(ScholarError::MissingApiKey)));
  }
}
