use crate::error::{Error, Result};
use reqwest::Client;
use tracing::error;

const SERVICE: &str = "embeddings";

#[derive(Clone)]
pub struct EmbedService {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl EmbedService {
    pub fn new(client: Client, api_key: String, base_url: String, model: String) -> Self {
        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(serde::Serialize)]
        struct EmbReq<'a> {
            model: &'a str,
            input: &'a [String],
        }
        #[derive(serde::Deserialize)]
        struct EmbData {
            index: Option<usize>,
            embedding: Vec<f32>,
        }
        #[derive(serde::Deserialize)]
        struct EmbResp {
            data: Vec<EmbData>,
        }

        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let body = EmbReq {
            model: &self.model,
            input: texts,
        };
        let resp = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::external(SERVICE, format!("embeddings request failed: {}", e)))?;

        let status = resp.status();
        let txt = resp.text().await.unwrap_or_default();
        if !status.is_success() {
            error!(%status, body = %txt, "Embeddings request rejected");
            return Err(Error::external(
                SERVICE,
                format!("embeddings status {}", status.as_u16()),
            ));
        }
        let mut parsed: EmbResp = serde_json::from_str(&txt)
            .map_err(|e| Error::external(SERVICE, format!("embeddings parse failed: {}", e)))?;
        if parsed.data.len() != texts.len() {
            return Err(Error::external(
                SERVICE,
                format!(
                    "expected {} embeddings, got {}",
                    texts.len(),
                    parsed.data.len()
                ),
            ));
        }
        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    pub fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
        let mut dot = 0f32;
        let mut na = 0f32;
        let mut nb = 0f32;
        for (x, y) in a.iter().zip(b.iter()) {
            dot += x * y;
            na += x * x;
            nb += y * y;
        }
        if na == 0.0 || nb == 0.0 {
            0.0
        } else {
            dot / (na.sqrt() * nb.sqrt())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_sim_handles_parallel_orthogonal_and_zero_vectors() {
        assert!((EmbedService::cosine_sim(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert_eq!(EmbedService::cosine_sim(&[1.0, 0.0], &[0.0, 3.0]), 0.0);
        assert_eq!(EmbedService::cosine_sim(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }
}
