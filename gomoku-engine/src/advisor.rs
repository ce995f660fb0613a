//! LLM move advisor: an OpenAI-compatible chat call whose free-text reply
//! is parsed with the same extractor as sandbox output.
//!
//! The advisor never validates coordinates against the live board; callers
//! run [`crate::Board::validate_candidate`] before applying a suggestion,
//! and falling back to the heuristic engine on failure is a caller-level
//! decision, not something done here.

use crate::board::{Board, Stone};
use gomoku_common::{AdvisorConfig, Error, Result};
use gomoku_sandbox::{extract, MoveCandidate};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You are a Gomoku master. Analyze the board and choose the best \
next move.\n\n\
Rules:\n\
1. The board is a 15x15 grid, coordinates (0,0) to (14,14).\n\
2. 0 is empty, 1 is a black stone, 2 is a white stone.\n\
3. Five of the same color in a row (horizontal, vertical, or diagonal) wins.\n\
4. Block the opponent from making five in a row.\n\n\
Consider immediate wins, necessary blocks, your own attacking shapes, and \
the opponent's threats.\n\n\
Reply with the coordinate only, in the form (row, col), for example (7, 7) \
or (3, 10). No other text.";

/// Client for the move suggestion service.
pub struct MoveAdvisor {
    client: reqwest::Client,
    api_base: String,
    model: String,
}

impl MoveAdvisor {
    /// Build an advisor from configuration. Fails when no API key is set —
    /// the advisor is an optional collaborator, not a required one.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::Config("Advisor API key is not configured".into()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|_| Error::Config("API key contains invalid characters".into()))?;
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::External(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
        })
    }

    /// Ask for a move. The reply is passed through the shared extractor;
    /// an empty candidate means the model gave no parseable answer, which
    /// is not an error.
    pub async fn suggest(&self, board: &Board, stone: Stone) -> Result<MoveCandidate> {
        let reply = self.chat(&user_prompt(board, stone)).await?;
        let candidate = extract(&reply);
        tracing::debug!(
            model = %self.model,
            found = !candidate.is_empty(),
            "Advisor replied"
        );
        Ok(candidate)
    }

    async fn chat(&self, user_content: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.api_base);
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".into(),
                    content: SYSTEM_PROMPT.into(),
                },
                ChatMessage {
                    role: "user".into(),
                    content: user_content.into(),
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::External(format!("Advisor request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "Advisor API error ({status}): {body}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::External(format!("Failed to parse advisor response: {e}")))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }
}

/// The user-turn prompt: rendered board plus whose move it is.
fn user_prompt(board: &Board, stone: Stone) -> String {
    format!(
        "{}\n\nThis is move {}. It is {}'s turn (player {}).\n\n\
         Give the best next move as (row, col).",
        board.to_text(),
        board.stone_count() + 1,
        stone,
        stone.cell_value()
    )
}

// ============================================================================
// OpenAI-compatible API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_api_key() {
        let config = AdvisorConfig::default();
        assert!(MoveAdvisor::from_config(&config).is_err());

        let configured = AdvisorConfig {
            api_key: "sk-test".into(),
            ..Default::default()
        };
        assert!(MoveAdvisor::from_config(&configured).is_ok());
    }

    #[test]
    fn user_prompt_includes_board_and_turn() {
        let mut board = Board::new();
        board.place(7, 7, Stone::Black).unwrap();
        let prompt = user_prompt(&board, Stone::White);
        assert!(prompt.contains("Current board (15x15):"));
        assert!(prompt.contains("This is move 2."));
        assert!(prompt.contains("white"));
        assert!(prompt.contains("player 2"));
    }

    #[test]
    fn chat_request_serialization() {
        let request = ChatRequest {
            model: "qwen-turbo".into(),
            messages: vec![ChatMessage {
                role: "system".into(),
                content: SYSTEM_PROMPT.into(),
            }],
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("qwen-turbo"));
        assert!(json.contains("Gomoku master"));
    }

    #[test]
    fn response_parsing_takes_first_choice() {
        let body = r#"{"choices": [{"message": {"content": "(7, 7)"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        let content = parsed.choices.into_iter().next().unwrap().message.content;
        assert_eq!(extract(&content).pair, Some((7, 7)));
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let config = AdvisorConfig {
            api_key: "sk-test".into(),
            api_base: "https://example.com/v1/".into(),
            ..Default::default()
        };
        let advisor = MoveAdvisor::from_config(&config).unwrap();
        assert_eq!(advisor.api_base, "https://example.com/v1");
    }
}
