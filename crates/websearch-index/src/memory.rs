use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use websearch_core::error::{Error, Result};
use websearch_core::traits::IndexStore;
use websearch_core::types::{DocumentRecord, SearchResult};

/// In-process `IndexStore` with the same observable contract as the
/// Solr gateway: url-keyed overwrite, term-overlap lexical scoring
/// with a title boost, cosine vector scoring, and a normalized
/// 0.6/0.4 lexical+vector blend standing in for the fused re-ranker.
///
/// Counts calls per operation so tests can assert "zero index calls"
/// on rejected input.
pub struct MemoryIndex {
    docs: Mutex<HashMap<String, DocumentRecord>>,
    title_boost: f32,
    ltr_available: bool,
    upserts: AtomicUsize,
    queries: AtomicUsize,
}

const LEXICAL_WEIGHT: f32 = 0.6;
const VECTOR_WEIGHT: f32 = 0.4;

impl MemoryIndex {
    pub fn new(title_boost: f32, ltr_available: bool) -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            title_boost,
            ltr_available,
            upserts: AtomicUsize::new(0),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn get(&self, url: &str) -> Option<DocumentRecord> {
        self.docs.lock().expect("poisoned").get(url).cloned()
    }

    fn snapshot(&self) -> Vec<DocumentRecord> {
        self.docs.lock().expect("poisoned").values().cloned().collect()
    }

    fn lexical_hits(&self, query: &str, rows: usize) -> Vec<SearchResult> {
        let terms: Vec<String> = query.to_lowercase().split_whitespace().map(String::from).collect();
        let mut hits: Vec<SearchResult> = self
            .snapshot()
            .into_iter()
            .filter_map(|doc| {
                let title = doc.title.to_lowercase();
                let content = doc.content.to_lowercase();
                let mut score = 0.0f32;
                for term in &terms {
                    if title.contains(term.as_str()) {
                        score += self.title_boost;
                    }
                    score += content.matches(term.as_str()).count() as f32;
                }
                (score > 0.0).then(|| SearchResult {
                    url: doc.url,
                    title: doc.title,
                    content: doc.content,
                    score,
                })
            })
            .collect();
        sort_desc(&mut hits);
        hits.truncate(rows);
        hits
    }

    fn vector_hits(&self, vector: &[f32], rows: usize) -> Vec<SearchResult> {
        let mut hits: Vec<SearchResult> = self
            .snapshot()
            .into_iter()
            .map(|doc| {
                let score = cosine(vector, &doc.content_vector);
                SearchResult { url: doc.url, title: doc.title, content: doc.content, score }
            })
            .collect();
        sort_desc(&mut hits);
        hits.truncate(rows);
        hits
    }
}

#[async_trait]
impl IndexStore for MemoryIndex {
    async fn upsert(&self, record: &DocumentRecord) -> Result<()> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.docs
            .lock()
            .expect("poisoned")
            .insert(record.url.clone(), record.clone());
        Ok(())
    }

    async fn search_lexical(&self, query: &str, rows: usize) -> Result<Vec<SearchResult>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.lexical_hits(query, rows))
    }

    async fn search_vector(&self, vector: &[f32], rows: usize) -> Result<Vec<SearchResult>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_hits(vector, rows))
    }

    async fn search_fused(
        &self,
        query: &str,
        vector: &[f32],
        rows: usize,
        rerank_docs: usize,
    ) -> Result<Vec<SearchResult>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.ltr_available {
            return Err(Error::RankingUnavailable("no ranking model deployed".into()));
        }
        // Max-normalize each signal over the candidate pool, then
        // blend. Stand-in for the engine's learned re-ranker.
        let lexical = self.lexical_hits(query, rerank_docs);
        let dense = self.vector_hits(vector, rerank_docs);

        let mut combined: HashMap<String, SearchResult> = HashMap::new();
        let max_lex = lexical.iter().map(|h| h.score).fold(0.0f32, f32::max);
        for mut hit in lexical {
            hit.score = if max_lex > 0.0 { hit.score / max_lex } else { 0.0 } * LEXICAL_WEIGHT;
            combined.insert(hit.url.clone(), hit);
        }
        let max_vec = dense.iter().map(|h| h.score).fold(0.0f32, f32::max);
        for mut hit in dense {
            let normalized = if max_vec > 0.0 { hit.score / max_vec } else { 0.0 };
            match combined.get_mut(&hit.url) {
                Some(existing) => existing.score += normalized * VECTOR_WEIGHT,
                None => {
                    hit.score = normalized * VECTOR_WEIGHT;
                    combined.insert(hit.url.clone(), hit);
                }
            }
        }

        let mut merged: Vec<SearchResult> = combined.into_values().collect();
        sort_desc(&mut merged);
        merged.truncate(rows);
        Ok(merged)
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.docs.lock().expect("poisoned").len() as u64)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

fn sort_desc(hits: &mut [SearchResult]) {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}
