pub mod agent_service;
pub mod auth_flow;
pub mod chat_service;
pub mod embed_service;
pub mod knowledge_service;
pub mod nocodb_service;
pub mod sms_service;
pub mod tool_service;
