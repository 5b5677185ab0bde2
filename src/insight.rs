//! Insight - Natural-language summaries of query results via a chat model
//!
//! The generator builds a context block from the last query and its result,
//! keeps a bounded conversation, and hands the messages to a
//! [`ChatCompletion`] backend.

use crate::console::ResultSet;
use crate::error::{ConsoleError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Requests between history trims.
const TRIM_EVERY: usize = 10;
/// Messages kept after a trim.
const KEEP_AFTER_TRIM: usize = 2;
/// History messages sent along with each prompt.
const SENT_HISTORY: usize = 4;
/// Rows captured in the context summary.
const CONTEXT_SAMPLE_ROWS: usize = 3;
/// Rows of that sample quoted in the prompt.
const PROMPT_SAMPLE_ROWS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    QueryExplanation,
    QueryGeneration,
    DataInsights,
    General,
}

impl ResponseKind {
    fn system_message(&self) -> &'static str {
        match self {
            ResponseKind::QueryExplanation => {
                "You are a SQL expert assistant. Explain SQL queries in a clear, educational manner.
Focus on:
- What the query does
- Key SQL concepts used
- Potential optimizations
- Expected results"
            }
            ResponseKind::QueryGeneration => {
                "You are a SQL query generator. Create SQL queries based on user requirements.
Always:
- Write syntactically correct SQL
- Use appropriate database-specific syntax
- Include comments for complex logic
- Suggest alternative approaches when relevant"
            }
            ResponseKind::DataInsights => {
                "You are a data analyst. Provide insights about datasets and query results.
Focus on:
- Data patterns and trends
- Potential data quality issues
- Suggested analyses
- Business implications"
            }
            ResponseKind::General => {
                "You are a helpful SQL and data analysis assistant. Provide clear,
actionable responses based on the context provided."
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Summary of a result set handed to the model.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DataSummary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub sample_data: Vec<serde_json::Value>,
}

/// What the model is told about the current session.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct InsightContext {
    pub db_type: Option<String>,
    pub last_query: Option<String>,
    pub data_summary: Option<DataSummary>,
}

impl InsightContext {
    pub fn from_result(query: Option<&str>, result: Option<&ResultSet>, db_type: &str) -> Self {
        let data_summary = result.filter(|r| !r.is_empty()).map(|r| DataSummary {
            row_count: r.row_count(),
            column_count: r.column_count(),
            columns: r.columns().to_vec(),
            sample_data: r.sample_records(CONTEXT_SAMPLE_ROWS),
        });

        Self {
            db_type: Some(db_type.to_string()),
            last_query: query.map(|q| q.to_string()),
            data_summary,
        }
    }

    fn render(&self) -> String {
        let mut out = format!(
            "Current context:\n- Database Type: {}\n- Last Query: {}\n",
            self.db_type.as_deref().unwrap_or("Unknown"),
            self.last_query.as_deref().unwrap_or("None")
        );

        if let Some(ds) = &self.data_summary {
            let sample: Vec<_> = ds.sample_data.iter().take(PROMPT_SAMPLE_ROWS).collect();
            let sample_json =
                serde_json::to_string_pretty(&sample).unwrap_or_else(|_| "[]".to_string());
            out.push_str(&format!(
                "- Dataset Shape: ({}, {}) (rows, columns)\n- Columns: {}\n- Sample Data: {}\n",
                ds.row_count,
                ds.column_count,
                ds.columns.join(", "),
                sample_json
            ));
        }

        out
    }
}

/// Bounded chat history.
#[derive(Clone, Debug, Default)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    counter: usize,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn counter(&self) -> usize {
        self.counter
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.counter = 0;
    }

    /// Counts one request; every `TRIM_EVERY` requests the history is cut
    /// down to its last `KEEP_AFTER_TRIM` messages. Returns whether it trimmed.
    fn tick(&mut self) -> bool {
        self.counter += 1;
        if self.counter >= TRIM_EVERY {
            let keep_from = self.messages.len().saturating_sub(KEEP_AFTER_TRIM);
            self.messages.drain(..keep_from);
            self.counter = 0;
            return true;
        }
        false
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    fn recent(&self, n: usize) -> &[ChatMessage] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }
}

/// A hosted chat-completion endpoint.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiChatClient {
    api_key: String,
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl OpenAiChatClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ChatCompletion for OpenAiChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "temperature": 0.3,
            "max_tokens": 1000
        });

        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ConsoleError::Insight(format!("LLM API call failed: {}", e)))?;

        let status = response.status();
        let response_json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ConsoleError::Insight(format!("Failed to parse LLM response: {}", e)))?;

        if !status.is_success() {
            return Err(ConsoleError::Insight(format!(
                "LLM API returned {}: {}",
                status, response_json
            )));
        }

        let content = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ConsoleError::Insight("No content in LLM response".to_string()))?;

        Ok(content.to_string())
    }
}

/// Insight Generator - Owns the conversation and the current context.
pub struct InsightGenerator<C> {
    client: C,
    context: InsightContext,
    conversation: Conversation,
}

impl<C: ChatCompletion> InsightGenerator<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            context: InsightContext::default(),
            conversation: Conversation::new(),
        }
    }

    pub fn update_context(&mut self, context: InsightContext) {
        self.context = context;
    }

    pub fn context(&self) -> &InsightContext {
        &self.context
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn clear_history(&mut self) {
        self.conversation.clear();
    }

    /// Full prompt for one request: system message, context, then the request.
    pub fn build_prompt(&self, prompt: &str, kind: ResponseKind) -> String {
        format!(
            "{}\n\n{}\nUser Query: {}",
            kind.system_message(),
            self.context.render(),
            prompt
        )
    }

    pub async fn generate_response(&mut self, prompt: &str, kind: ResponseKind) -> Result<String> {
        let full_prompt = self.build_prompt(prompt, kind);

        if self.conversation.tick() {
            info!("chat history trimmed");
        }
        self.conversation.push(ChatMessage::user(prompt));

        let mut messages = vec![ChatMessage::user(full_prompt)];
        messages.extend_from_slice(self.conversation.recent(SENT_HISTORY));
        debug!(messages = messages.len(), kind = ?kind, "sending chat request");

        let reply = self.client.complete(&messages).await?;
        self.conversation.push(ChatMessage::assistant(reply.clone()));
        Ok(reply)
    }

    /// General analysis, or a specific one when `request` is given.
    pub async fn analyze_data(&mut self, request: Option<&str>) -> Result<String> {
        let prompt = match request.map(str::trim).filter(|r| !r.is_empty()) {
            Some(r) => format!("Based on the provided dataset, please: {}", r),
            None => "Please analyze this dataset and provide key insights, patterns, and recommendations.".to_string(),
        };
        self.generate_response(&prompt, ResponseKind::DataInsights).await
    }

    pub async fn suggest_visualizations(&mut self) -> Result<String> {
        let prompt = "Based on the dataset structure and data types, suggest appropriate charts and visualizations that would be most effective for exploring this data.";
        self.generate_response(prompt, ResponseKind::DataInsights).await
    }

    pub async fn explain_query(&mut self, sql: &str) -> Result<String> {
        let prompt = format!("Please explain this SQL query step by step:\n\n{}", sql);
        self.generate_response(&prompt, ResponseKind::QueryExplanation).await
    }

    pub async fn generate_sql(
        &mut self,
        request: &str,
        table_info: Option<&serde_json::Value>,
    ) -> Result<String> {
        let context = table_info
            .map(|info| {
                format!(
                    "Available tables and columns: {}\n\n",
                    serde_json::to_string_pretty(info).unwrap_or_default()
                )
            })
            .unwrap_or_default();
        let prompt = format!(
            "{}Generate a SQL query for: {}\n\nPlease provide:\n1. The SQL query\n2. Brief explanation of what it does",
            context, request
        );
        self.generate_response(&prompt, ResponseKind::QueryGeneration).await
    }
}
