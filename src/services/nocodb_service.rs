use crate::config::TableIds;
use crate::error::{Error, Result};
use crate::models::{Entity, Table};
use crate::utils::translator::Record;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, error, info};

/// Upper bound on rows requested from any list endpoint.
pub const MAX_PAGE_SIZE: u32 = 25;

const SERVICE: &str = "nocodb";

/// A list query in internal field names; translated per entity on send.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    filter: Option<(&'a str, String)>,
    fields: Vec<&'a str>,
    limit: u32,
}

impl<'a> Query<'a> {
    pub fn all() -> Self {
        Self {
            filter: None,
            fields: Vec::new(),
            limit: MAX_PAGE_SIZE,
        }
    }

    pub fn eq(field: &'a str, value: impl ToString) -> Self {
        Self {
            filter: Some((field, value.to_string())),
            ..Self::all()
        }
    }

    pub fn fields(mut self, fields: &[&'a str]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, MAX_PAGE_SIZE);
        self
    }

    fn params<E: Entity>(&self) -> Result<Vec<(&'static str, String)>> {
        let column = |field: &str| {
            E::FIELDS.external_key(field).ok_or_else(|| {
                Error::Internal(format!(
                    "Field {} is not mapped for {}",
                    field,
                    E::TABLE.name()
                ))
            })
        };

        let mut params = Vec::with_capacity(3);
        if let Some((field, value)) = &self.filter {
            params.push(("where", format!("({},eq,{})", column(field)?, value)));
        }
        if !self.fields.is_empty() {
            let columns = self
                .fields
                .iter()
                .map(|field| column(field))
                .collect::<Result<Vec<_>>>()?;
            params.push(("fields", columns.join(",")));
        }
        params.push(("limit", self.limit.to_string()));
        Ok(params)
    }
}

#[derive(Deserialize)]
struct ListEnvelope {
    #[serde(default)]
    list: Vec<Record>,
}

/// Typed CRUD over the NocoDB v2 records API. Every payload crosses the
/// entity's field map in both directions.
#[derive(Clone)]
pub struct NocoDbService {
    client: Client,
    base_url: String,
    api_token: String,
    tables: TableIds,
}

impl NocoDbService {
    pub fn new(base_url: String, api_token: String, tables: TableIds) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create NocoDB HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            tables,
        })
    }

    fn records_url(&self, table: Table) -> String {
        format!(
            "{}/api/v2/tables/{}/records",
            self.base_url,
            self.tables.get(table)
        )
    }

    pub async fn find_one<E: Entity>(&self, field: &str, value: &str) -> Result<Option<E>> {
        let query = Query::eq(field, value).limit(1);
        Ok(self.find_many(&query).await?.into_iter().next())
    }

    pub async fn find_many<E: Entity>(&self, query: &Query<'_>) -> Result<Vec<E>> {
        let params = query.params::<E>()?;
        debug!(table = E::TABLE.name(), ?params, "Listing NocoDB records");

        let request = self.client.get(self.records_url(E::TABLE)).query(&params);
        let body = self
            .execute(request, E::TABLE, "list", None)
            .await?
            .ok_or_else(|| {
                Error::external(SERVICE, format!("{} table not found", E::TABLE.name()))
            })?;

        let envelope: ListEnvelope = serde_json::from_value(body).map_err(|e| {
            error!(table = E::TABLE.name(), error = %e, "Malformed NocoDB list response");
            Error::external(SERVICE, format!("Malformed list response: {}", e))
        })?;

        envelope.list.iter().map(decode::<E>).collect()
    }

    pub async fn get_by_id<E: Entity>(&self, id: i64) -> Result<E> {
        let url = format!("{}/{}", self.records_url(E::TABLE), id);
        let not_found = || Error::NotFound(format!("{} record {}", E::TABLE.name(), id));

        let body = self
            .execute(self.client.get(url), E::TABLE, "get", None)
            .await?
            .ok_or_else(not_found)?;

        match body.as_object() {
            Some(external) if !external.is_empty() => decode(external),
            _ => Err(not_found()),
        }
    }

    /// Creates the record and returns the submitted fields overlaid with
    /// whatever the server sent back, so the generated `Id` is included even
    /// when NocoDB only echoes the key.
    pub async fn create<E: Entity>(&self, record: &E) -> Result<E> {
        let internal = match serde_json::to_value(record)? {
            JsonValue::Object(map) => map,
            _ => return Err(Error::Internal("Entity did not serialize to an object".into())),
        };
        let payload = JsonValue::Object(E::FIELDS.to_external(&internal));

        let request = self.client.post(self.records_url(E::TABLE)).json(&payload);
        let body = self
            .execute(request, E::TABLE, "create", Some(&payload))
            .await?
            .ok_or_else(|| {
                Error::external(SERVICE, format!("{} table not found", E::TABLE.name()))
            })?;

        let mut merged = internal;
        if let Some(external) = body.as_object() {
            merged.extend(E::FIELDS.from_external(external));
        }
        info!(table = E::TABLE.name(), id = ?merged.get("Id"), "Created NocoDB record");

        serde_json::from_value(JsonValue::Object(merged)).map_err(|e| {
            Error::external(SERVICE, format!("Malformed create response: {}", e))
        })
    }

    /// Sends the request; `Ok(None)` means HTTP 404.
    async fn execute(
        &self,
        request: RequestBuilder,
        table: Table,
        operation: &'static str,
        payload: Option<&JsonValue>,
    ) -> Result<Option<JsonValue>> {
        let response = request
            .header("xc-token", &self.api_token)
            .send()
            .await
            .map_err(|e| {
                error!(table = table.name(), operation, ?payload, error = %e, "NocoDB request failed");
                Error::external(SERVICE, format!("{} {} failed: {}", operation, table.name(), e))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(
                table = table.name(),
                operation,
                %status,
                %body,
                ?payload,
                "NocoDB returned an error status"
            );
            return Err(Error::external(
                SERVICE,
                format!("{} {} returned {}", operation, table.name(), status),
            ));
        }

        response.json::<JsonValue>().await.map(Some).map_err(|e| {
            error!(table = table.name(), operation, error = %e, "NocoDB response was not JSON");
            Error::external(SERVICE, format!("{} {} returned invalid JSON", operation, table.name()))
        })
    }
}

fn decode<E: Entity>(external: &Record) -> Result<E> {
    let internal = E::FIELDS.from_external(external);
    serde_json::from_value(JsonValue::Object(internal)).map_err(|e| {
        error!(table = E::TABLE.name(), error = %e, "NocoDB record did not match entity");
        Error::external(SERVICE, format!("Malformed {} record: {}", E::TABLE.name(), e))
    })
}
