use crate::error::{Error, Result};
use crate::models::Table;
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use url::Url;

/// NocoDB table identifiers, one per entity.
#[derive(Debug, Clone)]
pub struct TableIds {
    pub candidates: String,
    pub job_opportunities: String,
    pub hiring_records: String,
    pub feedbacks: String,
}

impl TableIds {
    pub fn get(&self, table: Table) -> &str {
        match table {
            Table::Candidates => &self.candidates,
            Table::JobOpportunities => &self.job_opportunities,
            Table::HiringRecords => &self.hiring_records,
            Table::Feedbacks => &self.feedbacks,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub nocodb_base_url: String,
    pub nocodb_api_token: String,
    pub tables: TableIds,
    pub sms_webhook_url: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    pub openai_temperature: Option<f32>,
    pub openai_embedding_model: String,
    pub vector_store_path: PathBuf,
    pub document_source_path: PathBuf,
    pub session_idle_timeout_secs: u64,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env_or("SERVER_ADDRESS", "0.0.0.0:8000"),
            nocodb_base_url: get_env_url("NOCODB_BASE_URL", Some("https://mihan-hr.nilva.ir"))?,
            nocodb_api_token: get_env("NOCODB_API_TOKEN")?,
            tables: TableIds {
                candidates: get_env_or("NOCODB_TABLE_CANDIDATES", "mbqi7qv0oe7vfsu"),
                job_opportunities: get_env_or("NOCODB_TABLE_JOB_OPPORTUNITIES", "mnh7jhgpra68t9u"),
                hiring_records: get_env_or("NOCODB_TABLE_HIRING_RECORDS", "m8cfjywwovld9tt"),
                feedbacks: get_env_or("NOCODB_TABLE_FEEDBACKS", "m71yu5bw07ddiz5"),
            },
            sms_webhook_url: get_env_url("N8N_SMS_WEBHOOK_URL", None)?,
            openai_api_key: get_env("OPENAI_API_KEY")?,
            openai_base_url: get_env_url("OPENAI_BASE_URL", Some("https://api.openai.com/v1"))?,
            openai_model: get_env_or("OPENAI_API_MODEL", "gpt-5-nano"),
            openai_temperature: get_env_parse_opt("OPENAI_TEMPERATURE")?,
            openai_embedding_model: get_env_or("OPENAI_EMBEDDING_MODEL", "text-embedding-3-large"),
            vector_store_path: get_env_or("VECTOR_STORE_PATH", "./vectorstore").into(),
            document_source_path: get_env_or("DOCUMENT_SOURCE_PATH", "./data").into(),
            session_idle_timeout_secs: get_env_parse_opt("SESSION_IDLE_TIMEOUT_SECS")?
                .unwrap_or(3600),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("Missing environment variable: {}", name))),
    }
}

fn get_env_or(name: &str, default: &str) -> String {
    get_env(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_url(name: &str, default: Option<&str>) -> Result<String> {
    let raw = match (get_env(name), default) {
        (Ok(value), _) => value,
        (Err(_), Some(default)) => default.to_string(),
        (Err(err), None) => return Err(err),
    };
    Url::parse(&raw).map_err(|e| Error::Config(format!("Invalid URL in {}: {}", name, e)))?;
    Ok(raw.trim_end_matches('/').to_string())
}

fn get_env_parse_opt<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Ok(raw) = get_env(name) else {
        return Ok(None);
    };
    raw.parse()
        .map(Some)
        .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e)))
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUIRED: [&str; 3] = ["OPENAI_API_KEY", "NOCODB_API_TOKEN", "N8N_SMS_WEBHOOK_URL"];

    // Single test so the process-wide environment is not mutated concurrently.
    #[test]
    fn from_env_requires_credentials_and_applies_defaults() {
        for name in REQUIRED {
            env::remove_var(name);
        }
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("NOCODB_API_TOKEN")));

        env::set_var("OPENAI_API_KEY", "sk-test");
        env::set_var("NOCODB_API_TOKEN", "nc-test");
        env::set_var("N8N_SMS_WEBHOOK_URL", "not a url");
        assert!(matches!(Config::from_env(), Err(Error::Config(_))));

        env::set_var("N8N_SMS_WEBHOOK_URL", "http://localhost:5678/webhook/sms/");
        env::remove_var("SESSION_IDLE_TIMEOUT_SECS");
        env::remove_var("OPENAI_TEMPERATURE");
        let config = Config::from_env().expect("config");
        assert_eq!(config.sms_webhook_url, "http://localhost:5678/webhook/sms");
        assert_eq!(config.session_idle_timeout_secs, 3600);
        assert_eq!(config.openai_temperature, None);
        assert_eq!(config.tables.get(Table::Feedbacks), config.tables.feedbacks);

        env::set_var("SESSION_IDLE_TIMEOUT_SECS", "soon");
        assert!(matches!(Config::from_env(), Err(Error::Config(_))));
        env::remove_var("SESSION_IDLE_TIMEOUT_SECS");
    }
}
