use crate::error::{Error, Result};
use crate::services::tool_service::HrTools;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::{debug, error, info};

pub const MAX_TOOL_ROUNDS: usize = 5;
const SERVICE: &str = "openai";

pub const SYSTEM_PROMPT: &str = r#"You are a specialized AI assistant trained to provide accurate information based on a collection of internal company documents for "میهن" company. Your knowledge is strictly confined to the content within this provided knowledge base.
You are a smart, friendly, professional, and empathetic HR assistant for our company.
Your primary goal is to provide a seamless and helpful experience for candidates, making them feel welcomed and supported.

**Your Persona:**
- **Conversational & Natural:** Speak like a helpful colleague, not a robot. Avoid technical jargon.
- **Proactive:** Anticipate the user's needs. If you provide job details, suggest the next logical step, like applying.
- **Knowledgeable:** Use the knowledge base to answer questions about company culture, benefits, and processes.

**Core Instructions:**
1. **You know the user:** You are speaking to an authenticated user. Never ask for their name, phone number, or ID. Do not mention their internal ID number or phone number in your responses.
2. **Be User-Friendly:** When you use a tool and get information back, summarize it and present it using Markdown. Never show raw data like JSON to the user.
3. **Know your capabilities:** You can find open job positions, provide details about a specific job, apply for a job on the user's behalf, check their application status, and answer general questions about the company.

**Boundaries and Limitations:**
- Only offer actions you can actually perform. You have no tools for leave requests, changing personal data, or anything else beyond the list above.
- If asked to do something you cannot do, state the limitation politely and guide the user to contact the HR department directly."#;

/// One remembered user/assistant turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub user: String,
    pub assistant: String,
}

/// Who the agent is talking to; prefixed to every user turn.
#[derive(Debug, Clone)]
pub struct UserContext {
    pub phone_number: String,
    pub candidate_id: Option<i64>,
}

impl UserContext {
    pub fn frame(&self, text: &str) -> String {
        let candidate_id = self
            .candidate_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "User's phone number is {} and their candidate_id is {}. User's query is: {}",
            self.phone_number, candidate_id, text
        )
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    async fn respond(&self, user: &UserContext, history: &[Exchange], text: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssistantMessage {
    #[serde(default = "assistant_role")]
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

fn assistant_role() -> String {
    "assistant".to_string()
}

fn function_kind() -> String {
    "function".to_string()
}

/// Chat-completions agent that lets the model call [`HrTools`].
#[derive(Clone)]
pub struct OpenAiAgent {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: Option<f32>,
    tools: HrTools,
}

impl OpenAiAgent {
    pub fn new(
        client: Client,
        api_key: String,
        base_url: String,
        model: String,
        temperature: Option<f32>,
        tools: HrTools,
    ) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
            tools,
        }
    }

    fn request(&self, messages: &[JsonValue]) -> JsonValue {
        let mut payload = json!({
            "model": self.model,
            "messages": messages,
            "tools": HrTools::definitions(),
            "tool_choice": "auto",
        });
        if let Some(temperature) = self.temperature {
            payload["temperature"] = json!(temperature);
        }
        payload
    }

    async fn chat_openai(&self, payload: &JsonValue) -> Result<AssistantMessage> {
        let res = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(payload)
            .timeout(Duration::from_secs(120))
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, format!("chat request failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            error!(%status, body = %text, "OpenAI API error");
            return Err(Error::external(SERVICE, format!("OpenAI API error {}", status)));
        }

        let body: ChatCompletion = res
            .json()
            .await
            .map_err(|e| Error::external(SERVICE, format!("Invalid OpenAI response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .ok_or_else(|| Error::external(SERVICE, "OpenAI response had no choices"))
    }
}

#[async_trait]
impl Agent for OpenAiAgent {
    async fn respond(&self, user: &UserContext, history: &[Exchange], text: &str) -> Result<String> {
        let mut messages = vec![json!({ "role": "system", "content": SYSTEM_PROMPT })];
        for exchange in history {
            messages.push(json!({ "role": "user", "content": exchange.user }));
            messages.push(json!({ "role": "assistant", "content": exchange.assistant }));
        }
        messages.push(json!({ "role": "user", "content": user.frame(text) }));

        for round in 1..=MAX_TOOL_ROUNDS {
            let reply = self.chat_openai(&self.request(&messages)).await?;

            if reply.tool_calls.is_empty() {
                let answer = reply.content.unwrap_or_default();
                if answer.trim().is_empty() {
                    return Err(Error::external(SERVICE, "model returned an empty answer"));
                }
                info!(round, "Agent answered");
                return Ok(answer);
            }

            messages.push(serde_json::to_value(&reply)?);
            for call in &reply.tool_calls {
                debug!(tool = %call.function.name, round, "Model requested tool");
                let output = self
                    .tools
                    .dispatch(&call.function.name, &call.function.arguments)
                    .await;
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": output,
                }));
            }
        }

        error!(rounds = MAX_TOOL_ROUNDS, "Agent exhausted tool-call rounds");
        Err(Error::external(SERVICE, "tool-call rounds exhausted without an answer"))
    }
}
