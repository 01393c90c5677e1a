//! Embedding provider: a fixed-dimension sentence embedder behind the
//! `websearch_core::traits::Embedder` trait.
//!
//! The real implementation loads all-MiniLM-L6-v2 from a local model
//! directory; a deterministic hashing fake is available for tests and
//! index-less development via `APP_USE_FAKE_EMBEDDINGS=1`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::anyhow;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;

use websearch_core::config::Settings;
use websearch_core::error::{Error, Result};
use websearch_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

/// Identifier of the sentence-embedding model this crate loads.
pub const MODEL_NAME: &str = "all-MiniLM-L6-v2";

const MAX_TOKENS: usize = 256;

/// all-MiniLM-L6-v2 behind candle. Read-only after load, safe to
/// share across tasks without locking.
pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
}

impl MiniLmEmbedder {
    /// One-time, process-lifetime model load. Failure here is fatal at
    /// startup: vector and hybrid search are unusable without it.
    pub fn load(model_dir: &Path, dim: usize) -> Result<Self> {
        Self::load_inner(model_dir, dim)
            .map_err(|e| Error::Embedding(format!("failed to load model from {}: {e}", model_dir.display())))
    }

    fn load_inner(model_dir: &Path, dim: usize) -> anyhow::Result<Self> {
        let device = device::select_device();
        tracing::info!(dir = %model_dir.display(), "loading sentence-embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;

        let config_path = model_dir.join("config.json");
        let config: BertConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let vb = load_weights(model_dir, &device)?;
        let model = BertModel::load(vb, &config)?;
        tracing::info!(dim, "model loaded");
        Ok(Self { model, tokenizer, device, dim })
    }

    fn embed_inner(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize::tokenize_on_device(&self.tokenizer, text, MAX_TOKENS, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = pool::masked_mean_l2(&hidden, &attention_mask)?;
        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if vector.len() != self.dim {
            return Err(anyhow!("model produced dim {} (expected {})", vector.len(), self.dim));
        }
        Ok(vector)
    }
}

impl Embedder for MiniLmEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_inner(text).map_err(|e| Error::Embedding(e.to_string()))
    }
}

fn load_weights(model_dir: &Path, device: &Device) -> anyhow::Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // mmap is sound here: the model directory is read-only for the
        // process lifetime.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let weights_path = model_dir.join("pytorch_model.bin");
    let weights = candle_core::pickle::read_all(&weights_path)?;
    let weights_map: std::collections::HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// Deterministic token-hashing embedder. Captures no semantics, but
/// produces stable unit vectors of the right dimension, which is all
/// the pipeline invariants need in tests.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = (v.iter().map(|x| x * x).sum::<f32>()).sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Selects the process-wide embedder: the hashing fake when
/// `APP_USE_FAKE_EMBEDDINGS` is set, the real model otherwise.
pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        tracing::warn!("using FakeEmbedder (APP_USE_FAKE_EMBEDDINGS set)");
        return Ok(Arc::new(FakeEmbedder::new(settings.embedding.dim)));
    }
    let dir: PathBuf = settings.model_dir();
    Ok(Arc::new(MiniLmEmbedder::load(&dir, settings.embedding.dim)?))
}
