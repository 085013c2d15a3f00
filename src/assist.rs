//! Natural-language to SQL generation through an OpenAI-compatible chat API.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AssistSettings;

#[derive(Debug, Error)]
pub enum AssistError {
    #[error("{0} environment variable not set")]
    NotConfigured(String),

    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("no response from API")]
    EmptyResponse,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// Prompt text sent for `request`, revising `current_sql` when there is any.
pub fn build_prompt(request: &str, current_sql: Option<&str>) -> String {
    match current_sql.map(str::trim).filter(|s| !s.is_empty()) {
        Some(sql) => format!(
            "Modify the following PostgreSQL query based on this request: {request}\n\n\
             Current query:\n{sql}\n\n\
             Please respond with ONLY the modified SQL query, no explanations or markdown formatting."
        ),
        None => format!(
            "Generate a PostgreSQL query for the following request: {request}\n\n\
             Please respond with ONLY the SQL query, no explanations or markdown formatting."
        ),
    }
}

/// Remove a surrounding markdown code fence, with or without a `sql` tag.
pub fn strip_code_fences(text: &str) -> String {
    let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```sql") {
        s = rest;
    } else if let Some(rest) = s.strip_prefix("```") {
        s = rest;
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest;
    }
    s.trim().to_string()
}

/// Client for one configured endpoint. Cheap to clone into spawned tasks.
#[derive(Debug, Clone)]
pub struct SqlAssistant {
    client: reqwest::Client,
    settings: AssistSettings,
    api_key: Option<String>,
}

impl SqlAssistant {
    pub fn new(settings: AssistSettings, api_key: Option<String>) -> Result<Self, AssistError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            settings,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Read the API key from the environment variable named in `settings`.
    pub fn from_env(settings: AssistSettings) -> Result<Self, AssistError> {
        let key = std::env::var(&settings.api_key_env).ok();
        Self::new(settings, key)
    }

    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn generate(
        &self,
        request: &str,
        current_sql: Option<&str>,
    ) -> Result<String, AssistError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(AssistError::NotConfigured(self.settings.api_key_env.clone()));
        };

        let prompt = build_prompt(request, current_sql);
        let body = ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &prompt,
            }],
            temperature: 0.1,
        };

        debug!(model = %self.settings.model, revising = current_sql.is_some(), "sending generation request");
        let response = self
            .client
            .post(&self.settings.endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "generation request rejected");
            return Err(AssistError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| self.classify(e))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(AssistError::EmptyResponse)?;

        Ok(strip_code_fences(&content))
    }

    fn classify(&self, err: reqwest::Error) -> AssistError {
        if err.is_timeout() {
            AssistError::Timeout(self.settings.timeout_secs)
        } else {
            AssistError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn fences_with_sql_tag_are_removed() {
        let raw = "```sql\nSELECT * FROM t WHERE state = 'active'\n```";
        assert_eq!(strip_code_fences(raw), "SELECT * FROM t WHERE state = 'active'");
    }

    #[test]
    fn bare_fences_are_removed() {
        assert_eq!(strip_code_fences("  ```\nSELECT 1;\n```  "), "SELECT 1;");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("\n SELECT 1 \n"), "SELECT 1");
    }

    #[test]
    fn prompt_revises_existing_sql() {
        let prompt = build_prompt("add a where clause for active state", Some("SELECT * FROM t"));
        assert!(prompt.starts_with(
            "Modify the following PostgreSQL query based on this request: add a where clause for active state"
        ));
        assert!(prompt.contains("Current query:\nSELECT * FROM t"));
    }

    #[test]
    fn prompt_generates_without_sql() {
        for sql in [None, Some(""), Some("   ")] {
            let prompt = build_prompt("list tables", sql);
            assert!(prompt.starts_with("Generate a PostgreSQL query for the following request: list tables"));
            assert!(!prompt.contains("Current query"));
        }
    }

    #[test]
    fn response_without_choices_deserializes_empty() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"id":"x"}"#).unwrap();
        assert!(parsed.choices.is_empty());
    }

    #[test]
    fn response_content_is_read() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"SELECT 1"}}]}"#,
        )
        .unwrap();
        assert_eq!(parsed.choices[0].message.content, "SELECT 1");
    }

    #[tokio::test]
    #[serial]
    async fn missing_key_is_not_configured() {
        let settings = AssistSettings {
            api_key_env: "PGMON_TEST_MISSING_KEY".into(),
            ..AssistSettings::default()
        };
        std::env::remove_var("PGMON_TEST_MISSING_KEY");
        let assistant = SqlAssistant::from_env(settings).unwrap();
        assert!(!assistant.is_configured());
        let err = assistant.generate("anything", None).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "PGMON_TEST_MISSING_KEY environment variable not set"
        );
    }

    #[test]
    #[serial]
    fn key_is_read_from_named_variable() {
        std::env::set_var("PGMON_TEST_ASSIST_KEY", "sk-test");
        let settings = AssistSettings {
            api_key_env: "PGMON_TEST_ASSIST_KEY".into(),
            ..AssistSettings::default()
        };
        let assistant = SqlAssistant::from_env(settings).unwrap();
        std::env::remove_var("PGMON_TEST_ASSIST_KEY");
        assert!(assistant.is_configured());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let assistant = SqlAssistant::new(AssistSettings::default(), Some("  ".into())).unwrap();
        assert!(!assistant.is_configured());
    }

    #[test]
    fn api_error_display_includes_status_and_body() {
        let err = AssistError::Api {
            status: 429,
            body: "rate limited".into(),
        };
        assert_eq!(err.to_string(), "API error (status 429): rate limited");
    }
}
