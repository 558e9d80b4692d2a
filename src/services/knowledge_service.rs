use crate::error::{Error, Result};
use crate::services::embed_service::EmbedService;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub const CHUNK_SIZE: usize = 1000;
pub const CHUNK_OVERLAP: usize = 200;
pub const TOP_K: usize = 3;
const EMBED_BATCH: usize = 64;
const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IndexedChunk {
    source: String,
    text: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct VectorIndex {
    chunks: Vec<IndexedChunk>,
}

/// Company documents, chunked and embedded, persisted as a flat JSON index.
pub struct KnowledgeBase {
    embedder: EmbedService,
    store_path: PathBuf,
    index: RwLock<Option<Arc<VectorIndex>>>,
}

impl KnowledgeBase {
    pub fn new(embedder: EmbedService, store_path: PathBuf) -> Self {
        Self {
            embedder,
            store_path,
            index: RwLock::new(None),
        }
    }

    pub async fn is_loaded(&self) -> bool {
        self.index.read().await.is_some()
    }

    /// Loads the persisted index, or ingests `source_dir` when the store
    /// directory is missing or empty. Returns the number of chunks.
    pub async fn load_or_ingest(&self, source_dir: &Path) -> Result<usize> {
        if store_is_empty(&self.store_path).await? {
            info!(store = %self.store_path.display(), "Vector store is empty, ingesting documents");
            self.ingest(source_dir).await
        } else {
            self.load().await
        }
    }

    pub async fn load(&self) -> Result<usize> {
        let raw = fs::read(self.store_path.join(INDEX_FILE)).await?;
        let index: VectorIndex = serde_json::from_slice(&raw)?;
        let count = index.chunks.len();
        *self.index.write().await = Some(Arc::new(index));
        info!(chunks = count, "Knowledge base loaded");
        Ok(count)
    }

    pub async fn ingest(&self, source_dir: &Path) -> Result<usize> {
        let mut pending = Vec::new();
        for path in collect_files(source_dir).await? {
            let Some(text) = read_document(&path).await? else {
                continue;
            };
            let source = path
                .strip_prefix(source_dir)
                .unwrap_or(&path)
                .display()
                .to_string();
            for chunk in chunk_text(&text, CHUNK_SIZE, CHUNK_OVERLAP) {
                pending.push((source.clone(), chunk));
            }
        }

        if pending.is_empty() {
            warn!(source = %source_dir.display(), "No documents found to ingest");
            return Ok(0);
        }

        let mut chunks = Vec::with_capacity(pending.len());
        for batch in pending.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|(_, text)| text.clone()).collect();
            let embeddings = self.embedder.embed_texts(&texts).await?;
            for ((source, text), embedding) in batch.iter().cloned().zip(embeddings) {
                chunks.push(IndexedChunk {
                    source,
                    text,
                    embedding,
                });
            }
        }

        let index = VectorIndex { chunks };
        fs::create_dir_all(&self.store_path).await?;
        fs::write(
            self.store_path.join(INDEX_FILE),
            serde_json::to_vec(&index)?,
        )
        .await?;

        let count = index.chunks.len();
        *self.index.write().await = Some(Arc::new(index));
        info!(chunks = count, store = %self.store_path.display(), "Knowledge base ingested");
        Ok(count)
    }

    /// The `k` chunks most similar to `query`, best first.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let index = self
            .index
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::NotFound("knowledge base index".to_string()))?;

        let query_embedding = self
            .embedder
            .embed_texts(&[query.to_string()])
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();

        let mut scored: Vec<(f32, &IndexedChunk)> = index
            .chunks
            .iter()
            .map(|chunk| (EmbedService::cosine_sim(&query_embedding, &chunk.embedding), chunk))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(_, chunk)| chunk.text.clone())
            .collect())
    }
}

async fn store_is_empty(path: &Path) -> Result<bool> {
    match fs::read_dir(path).await {
        Ok(mut entries) => Ok(entries.next_entry().await?.is_none()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Text of one document: PDFs go through text extraction, everything else
/// must be UTF-8. Unreadable documents are logged and skipped.
async fn read_document(path: &Path) -> Result<Option<String>> {
    let bytes = fs::read(path).await?;

    if is_pdf(path) {
        let extracted =
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes)).await;
        return Ok(match extracted {
            Ok(Ok(text)) => Some(text),
            Ok(Err(e)) => {
                warn!(file = %path.display(), error = %e, "Skipping unreadable PDF");
                None
            }
            Err(e) => {
                warn!(file = %path.display(), error = %e, "PDF extraction aborted");
                None
            }
        });
    }

    match String::from_utf8(bytes) {
        Ok(text) => Ok(Some(text)),
        Err(_) => {
            warn!(file = %path.display(), "Skipping non UTF-8 document");
            Ok(None)
        }
    }
}

async fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut dirs = vec![root.to_path_buf()];
    while let Some(dir) = dirs.pop() {
        let mut entries = fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                dirs.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Splits on character boundaries into windows of `size` chars that overlap
/// by `overlap`. Whitespace-only windows are dropped.
pub fn chunk_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let step = size.saturating_sub(overlap).max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        let trimmed = chunk.trim();
        if !trimmed.is_empty() {
            chunks.push(trimmed.to_string());
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
