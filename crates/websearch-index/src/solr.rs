use async_trait::async_trait;
use serde::Deserialize;

use websearch_core::error::{Error, Result};
use websearch_core::traits::IndexStore;
use websearch_core::types::{DocumentRecord, SearchResult};

const RESULT_FIELDS: &str = "url,title,content,score";
const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// Gateway to a Solr collection holding the document schema
/// (`url` unique key, analyzed `title`/`content`, 384-dim
/// `content_vector` under HNSW/cosine).
///
/// The connection pool inside `reqwest::Client` makes this safe and
/// cheap to share across request tasks.
pub struct SolrIndex {
    client: reqwest::Client,
    collection_url: String,
    ping_url: String,
    title_boost: f32,
    ltr_model: String,
}

impl SolrIndex {
    /// `base_url` is the Solr root (e.g. `http://solr:8983/solr`),
    /// without a collection suffix.
    pub fn new(base_url: &str, collection: &str, title_boost: f32, ltr_model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to build Solr HTTP client: {e}")))?;
        let base = base_url.trim_end_matches('/');
        Ok(Self {
            client,
            collection_url: format!("{base}/{collection}"),
            ping_url: format!("{base}/admin/ping"),
            title_boost,
            ltr_model: ltr_model.to_string(),
        })
    }

    fn boost_fields(&self) -> String {
        format!("title^{} content", self.title_boost)
    }

    async fn select(&self, params: &[(&str, String)], fused: bool) -> Result<Vec<SearchResult>> {
        let url = format!("{}/select", self.collection_url);
        let resp = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| Error::IndexQuery(format!("solr request failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(self.classify_query_failure(status.as_u16(), &body, fused));
        }
        let body: SelectBody = resp
            .json()
            .await
            .map_err(|e| Error::IndexQuery(format!("unparseable solr response: {e}")))?;
        Ok(body.response.docs.iter().map(parse_doc).collect())
    }

    /// Distinguishes a missing LTR model from a generic engine
    /// failure so callers can choose to degrade to lexical search.
    fn classify_query_failure(&self, status: u16, body: &str, fused: bool) -> Error {
        if fused && status == 400 {
            let lc = body.to_lowercase();
            if lc.contains("cannot find model") || lc.contains("model store") {
                return Error::RankingUnavailable(self.ltr_model.clone());
            }
        }
        Error::IndexQuery(format!("solr returned {status}: {body}"))
    }
}

#[async_trait]
impl IndexStore for SolrIndex {
    async fn upsert(&self, record: &DocumentRecord) -> Result<()> {
        // Single call: url is the schema's unique key, so Solr
        // replaces any prior record in place.
        let url = format!("{}/update", self.collection_url);
        let resp = self
            .client
            .post(&url)
            .query(&[("commit", "true")])
            .json(&[record])
            .send()
            .await
            .map_err(|e| Error::IndexWrite(format!("solr update failed: {e}")))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_else(|_| "<body unavailable>".to_string());
            // Schema mismatches (e.g. wrong vector dimension) land
            // here and are not retryable.
            return Err(Error::IndexWrite(format!("solr returned {status}: {body}")));
        }
        tracing::debug!(url = %record.url, "upserted document");
        Ok(())
    }

    async fn search_lexical(&self, query: &str, rows: usize) -> Result<Vec<SearchResult>> {
        let params = [
            ("q", query.to_string()),
            ("defType", "edismax".to_string()),
            ("qf", self.boost_fields()),
            ("rows", rows.to_string()),
            ("fl", RESULT_FIELDS.to_string()),
        ];
        self.select(&params, false).await
    }

    async fn search_vector(&self, vector: &[f32], rows: usize) -> Result<Vec<SearchResult>> {
        let vector_json = serde_json::to_string(vector)
            .map_err(|e| Error::IndexQuery(format!("unserializable query vector: {e}")))?;
        let params = [
            ("q", format!("{{!knn f=content_vector topK={rows}}}{vector_json}")),
            ("rows", rows.to_string()),
            ("fl", RESULT_FIELDS.to_string()),
        ];
        self.select(&params, false).await
    }

    async fn search_fused(
        &self,
        query: &str,
        vector: &[f32],
        rows: usize,
        rerank_docs: usize,
    ) -> Result<Vec<SearchResult>> {
        let vector_json = serde_json::to_string(vector)
            .map_err(|e| Error::IndexQuery(format!("unserializable query vector: {e}")))?;
        // Lexical candidate retrieval, re-scored by the named LTR
        // model. The query text and vector reach the model's features
        // through efi dereferences.
        let rerank = format!(
            "{{!ltr model={} reRankDocs={} efi.query=$q efi.queryVector=$queryVector}}",
            self.ltr_model, rerank_docs
        );
        let params = [
            ("q", query.to_string()),
            ("defType", "edismax".to_string()),
            ("qf", self.boost_fields()),
            ("rq", rerank),
            ("queryVector", vector_json),
            ("rows", rows.to_string()),
            ("fl", RESULT_FIELDS.to_string()),
        ];
        self.select(&params, true).await
    }

    async fn count(&self) -> Result<u64> {
        let url = format!("{}/select", self.collection_url);
        let resp = self
            .client
            .get(&url)
            .query(&[("q", "*:*"), ("rows", "0")])
            .send()
            .await
            .map_err(|e| Error::IndexQuery(format!("solr request failed: {e}")))?;
        if !resp.status().is_success() {
            return Err(Error::IndexQuery(format!("solr returned {}", resp.status())));
        }
        let body: SelectBody = resp
            .json()
            .await
            .map_err(|e| Error::IndexQuery(format!("unparseable solr response: {e}")))?;
        Ok(body.response.num_found)
    }

    async fn ping(&self) -> Result<()> {
        let resp = self
            .client
            .get(&self.ping_url)
            .send()
            .await
            .map_err(|e| Error::IndexQuery(format!("solr ping failed: {e}")))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::IndexQuery(format!("solr ping returned {}", resp.status())))
        }
    }
}

#[derive(Debug, Deserialize)]
struct SelectBody {
    response: SelectResponse,
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    #[serde(rename = "numFound")]
    num_found: u64,
    #[serde(default)]
    docs: Vec<serde_json::Value>,
}

/// Solr returns analyzed text fields as single-element arrays
/// depending on schema multiValued flags; accept both shapes.
fn field_str(doc: &serde_json::Value, key: &str) -> String {
    match &doc[key] {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Array(items) => items
            .first()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
        _ => String::new(),
    }
}

fn parse_doc(doc: &serde_json::Value) -> SearchResult {
    SearchResult {
        url: field_str(doc, "url"),
        title: field_str(doc, "title"),
        content: field_str(doc, "content"),
        score: doc["score"].as_f64().unwrap_or_default() as f32,
    }
}
