use crate::dto::chat_dto::{ActionButton, ChatResponse, OutboundMessage, Stage};
use crate::error::{Error, Result};
use crate::models::Candidate;
use crate::services::agent_service::{Agent, Exchange, UserContext};
use crate::services::auth_flow::{prompts, AuthFlow, AuthGateway};
use crate::services::tool_service::{messages as tool_messages, HrTools};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value as JsonValue};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};
use uuid::Uuid;

pub const MEMORY_WINDOW: usize = 5;
pub const ASSISTANT: &str = "هوشمند";
pub const USER: &str = "user";

pub const VIEW_JOB_DETAILS: &str = "view_job_details";
pub const APPLY_FOR_JOB: &str = "apply_for_job";
pub const FEEDBACK_GOOD: &str = "feedback_good";
pub const FEEDBACK_BAD: &str = "feedback_bad";

pub mod texts {
    pub const WELCOME: &str = "به سیستم استخدام خوش آمدید. لطفاً ابتدا احراز هویت کنید.";
    pub const AUTH_FAILED: &str =
        "احراز هویت ناموفق بود. لطفاً برای تلاش مجدد، یک گفتگوی جدید را آغاز کنید.";
    pub const INTRO: &str = "شما می‌توانید سوالات خود را در مورد شرکت بپرسید یا برای موقعیت‌های شغلی موجود درخواست دهید. \n\nدر اینجا لیست موقعیت‌های شغلی باز فعلی آمده است:";
    pub const NO_LISTINGS: &str = "در حال حاضر هیچ موقعیت شغلی بازی یافت نشد.";
    pub const VIEW_DETAILS: &str = "مشاهده جزئیات";
    pub const NOT_AUTHENTICATED: &str =
        "سیستم آماده نیست یا احراز هویت انجام نشده. لطفاً ابتدا احراز هویت کنید.";
    pub const AGENT_FAILED: &str =
        "متاسفانه در پردازش درخواست شما مشکلی پیش آمد. لطفاً دوباره تلاش کنید.";
    pub const EMPTY_MESSAGE: &str = "لطفاً پرسش خود را بنویسید.";
    pub const FEEDBACK_MISSING: &str = "خطایی در بازیابی پیام قبلی برای ثبت بازخورد رخ داد.";
    pub const RATE_GOOD: &str = "👍 پاسخ خوب بود";
    pub const RATE_BAD: &str = "👎 پاسخ خوب نبود";

    pub fn greeting(first_name: &str) -> String {
        format!(
            "سلام **{}**! پروفایل شما تکمیل شد. به دستیار هوشمند استخدام خوش آمدید.",
            first_name
        )
    }

    pub fn job_listing(title: &str) -> String {
        format!("**عنوان شغلی:** {}\n", title)
    }
}

pub fn view_details_instruction(job_id: i64) -> String {
    format!("show details for job with ID {}", job_id)
}

/// Everything remembered about one conversation.
#[derive(Debug)]
pub struct Session {
    flow: AuthFlow,
    memory: VecDeque<Exchange>,
    last_exchange: Option<Exchange>,
    last_activity: DateTime<Utc>,
}

impl Session {
    fn new(now: DateTime<Utc>) -> (Self, &'static str) {
        let (flow, prompt) = AuthFlow::start(now);
        let session = Self {
            flow,
            memory: VecDeque::with_capacity(MEMORY_WINDOW),
            last_exchange: None,
            last_activity: now,
        };
        (session, prompt)
    }

    fn stage(&self) -> Stage {
        if self.flow.profile().is_some() {
            Stage::Authenticated
        } else if self.flow.is_failed() {
            Stage::Failed
        } else {
            Stage::Authenticating
        }
    }

    fn remember(&mut self, exchange: Exchange) {
        if self.memory.len() == MEMORY_WINDOW {
            self.memory.pop_front();
        }
        self.memory.push_back(exchange.clone());
        self.last_exchange = Some(exchange);
    }
}

fn assistant(content: impl Into<String>) -> OutboundMessage {
    OutboundMessage {
        author: ASSISTANT.to_string(),
        content: content.into(),
        actions: Vec::new(),
    }
}

fn button(name: &str, label: &str, payload: JsonValue) -> ActionButton {
    ActionButton {
        name: name.to_string(),
        label: label.to_string(),
        payload,
    }
}

/// Owns live sessions and routes each inbound message to the auth flow or
/// the agent. Messages for one session are handled strictly in order.
#[derive(Clone)]
pub struct ChatService {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<Mutex<Session>>>>>,
    gateway: Arc<dyn AuthGateway>,
    agent: Arc<dyn Agent>,
    tools: HrTools,
    idle_timeout: Duration,
}

impl ChatService {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        agent: Arc<dyn Agent>,
        tools: HrTools,
        idle_timeout_secs: u64,
    ) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            gateway,
            agent,
            tools,
            idle_timeout: Duration::seconds(idle_timeout_secs.min(u64::from(u32::MAX)) as i64),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn start(&self) -> ChatResponse {
        let id = Uuid::new_v4();
        let (session, prompt) = Session::new(Utc::now());
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        info!(session_id = %id, "Chat session started");

        ChatResponse {
            session_id: id,
            stage: Stage::Authenticating,
            messages: vec![assistant(texts::WELCOME), assistant(prompt)],
        }
    }

    pub async fn end(&self, id: Uuid) -> Result<()> {
        self.sessions
            .write()
            .await
            .remove(&id)
            .map(|_| info!(session_id = %id, "Chat session ended"))
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))
    }

    async fn session(&self, id: Uuid) -> Result<Arc<Mutex<Session>>> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))
    }

    pub async fn send_message(&self, id: Uuid, text: &str) -> Result<ChatResponse> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        let now = Utc::now();
        session.last_activity = now;

        let messages = match session.stage() {
            Stage::Authenticating => self.advance_auth(&mut session, text, now).await,
            Stage::Authenticated if text.trim().is_empty() => {
                vec![assistant(texts::EMPTY_MESSAGE)]
            }
            Stage::Authenticated => self.agent_turn(&mut session, text).await,
            Stage::Failed => vec![assistant(prompts::CLOSED)],
        };

        Ok(ChatResponse {
            session_id: id,
            stage: session.stage(),
            messages,
        })
    }

    pub async fn handle_action(
        &self,
        id: Uuid,
        name: &str,
        payload: &JsonValue,
    ) -> Result<ChatResponse> {
        let handle = self.session(id).await?;
        let mut session = handle.lock().await;
        session.last_activity = Utc::now();

        let messages = if session.stage() != Stage::Authenticated {
            vec![assistant(texts::NOT_AUTHENTICATED)]
        } else {
            match name {
                VIEW_JOB_DETAILS | APPLY_FOR_JOB => {
                    match payload.get("agent_instruction").and_then(JsonValue::as_str) {
                        Some(instruction) if !instruction.trim().is_empty() => {
                            let mut messages = vec![OutboundMessage {
                                author: USER.to_string(),
                                content: instruction.to_string(),
                                actions: Vec::new(),
                            }];
                            messages.extend(self.agent_turn(&mut session, instruction).await);
                            messages
                        }
                        _ => {
                            warn!(session_id = %id, action = name, "Action clicked without agent_instruction");
                            Vec::new()
                        }
                    }
                }
                FEEDBACK_GOOD | FEEDBACK_BAD => {
                    let rating = if name == FEEDBACK_GOOD { "good" } else { "bad" };
                    vec![self.record_feedback(&session, rating).await]
                }
                other => return Err(Error::Validation(format!("Unknown action: {}", other))),
            }
        };

        Ok(ChatResponse {
            session_id: id,
            stage: session.stage(),
            messages,
        })
    }

    /// Fails flows whose prompt window closed and drops idle sessions.
    /// Sessions busy with a message are skipped this round.
    pub async fn reap(&self, now: DateTime<Utc>) -> usize {
        let sessions: Vec<(Uuid, Arc<Mutex<Session>>)> = self
            .sessions
            .read()
            .await
            .iter()
            .map(|(id, session)| (*id, session.clone()))
            .collect();

        let mut idle = Vec::new();
        for (id, session) in sessions {
            let Ok(mut session) = session.try_lock() else {
                continue;
            };
            if session.flow.expire(now).is_some() {
                info!(session_id = %id, "Authentication timed out");
            }
            if now - session.last_activity > self.idle_timeout {
                idle.push(id);
            }
        }

        if !idle.is_empty() {
            let mut sessions = self.sessions.write().await;
            for id in &idle {
                sessions.remove(id);
            }
            info!(evicted = idle.len(), "Idle chat sessions evicted");
        }
        idle.len()
    }

    async fn advance_auth(
        &self,
        session: &mut Session,
        text: &str,
        now: DateTime<Utc>,
    ) -> Vec<OutboundMessage> {
        let mut messages: Vec<OutboundMessage> = session
            .flow
            .advance(self.gateway.as_ref(), text, now)
            .await
            .into_iter()
            .map(assistant)
            .collect();

        match session.stage() {
            Stage::Authenticated => {
                if let Some(profile) = session.flow.profile().cloned() {
                    messages.extend(self.welcome(&profile).await);
                }
            }
            Stage::Failed => messages.push(assistant(texts::AUTH_FAILED)),
            Stage::Authenticating => {}
        }
        messages
    }

    async fn welcome(&self, profile: &Candidate) -> Vec<OutboundMessage> {
        let first_name = profile
            .first_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("کاربر");
        let mut messages = vec![
            assistant(texts::greeting(first_name)),
            assistant(texts::INTRO),
        ];

        match self.tools.open_jobs().await {
            Ok(jobs) if jobs.is_empty() => messages.push(assistant(texts::NO_LISTINGS)),
            Ok(jobs) => {
                for job in jobs {
                    let mut listing = assistant(texts::job_listing(
                        job.title.as_deref().unwrap_or("N/A"),
                    ));
                    if let Some(job_id) = job.id {
                        listing.actions.push(button(
                            VIEW_JOB_DETAILS,
                            texts::VIEW_DETAILS,
                            json!({ "agent_instruction": view_details_instruction(job_id) }),
                        ));
                    }
                    messages.push(listing);
                }
            }
            Err(e) => {
                error!(error = %e, "Could not load job listings for greeting");
                messages.push(assistant(tool_messages::JOBS_UNAVAILABLE));
            }
        }
        messages
    }

    async fn agent_turn(&self, session: &mut Session, text: &str) -> Vec<OutboundMessage> {
        let Some(profile) = session.flow.profile() else {
            return vec![assistant(texts::NOT_AUTHENTICATED)];
        };
        let user = UserContext {
            phone_number: profile.phone_number.clone().unwrap_or_default(),
            candidate_id: profile.id,
        };
        let history: Vec<Exchange> = session.memory.iter().cloned().collect();

        match self.agent.respond(&user, &history, text).await {
            Ok(answer) => {
                session.remember(Exchange {
                    user: text.to_string(),
                    assistant: answer.clone(),
                });
                let mut reply = assistant(answer);
                reply.actions = vec![
                    button(FEEDBACK_GOOD, texts::RATE_GOOD, json!({})),
                    button(FEEDBACK_BAD, texts::RATE_BAD, json!({})),
                ];
                vec![reply]
            }
            Err(e) => {
                error!(error = %e, "Agent turn failed");
                vec![assistant(texts::AGENT_FAILED)]
            }
        }
    }

    async fn record_feedback(&self, session: &Session, rating: &str) -> OutboundMessage {
        let Some(exchange) = session.last_exchange.as_ref() else {
            return assistant(texts::FEEDBACK_MISSING);
        };
        let phone = session
            .flow
            .profile()
            .and_then(|p| p.phone_number.as_deref())
            .unwrap_or("unknown");
        assistant(
            self.tools
                .record_feedback(phone, &exchange.user, &exchange.assistant, rating)
                .await,
        )
    }
}
