pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::services::{
    agent_service::OpenAiAgent,
    auth_flow::{AuthBackend, AuthGateway},
    chat_service::ChatService,
    embed_service::EmbedService,
    knowledge_service::KnowledgeBase,
    nocodb_service::NocoDbService,
    sms_service::SmsService,
    tool_service::HrTools,
};
use reqwest::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub chat_service: ChatService,
    pub knowledge: Arc<KnowledgeBase>,
}

impl AppState {
    pub fn new(config: &Config) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        let records = NocoDbService::new(
            config.nocodb_base_url.clone(),
            config.nocodb_api_token.clone(),
            config.tables.clone(),
        )?;
        let sms = SmsService::new(config.sms_webhook_url.clone())?;

        let embed_service = EmbedService::new(
            http_client.clone(),
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_embedding_model.clone(),
        );
        let knowledge = Arc::new(KnowledgeBase::new(
            embed_service,
            config.vector_store_path.clone(),
        ));

        let tools = HrTools::new(records.clone(), knowledge.clone());
        let agent = OpenAiAgent::new(
            http_client,
            config.openai_api_key.clone(),
            config.openai_base_url.clone(),
            config.openai_model.clone(),
            config.openai_temperature,
            tools.clone(),
        );
        let gateway: Arc<dyn AuthGateway> = Arc::new(AuthBackend::new(records, sms));

        let chat_service = ChatService::new(
            gateway,
            Arc::new(agent),
            tools,
            config.session_idle_timeout_secs,
        );

        Ok(Self {
            chat_service,
            knowledge,
        })
    }
}
