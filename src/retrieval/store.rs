//! In-process vector store
//!
//! Documents with dense embeddings, searched by cosine similarity.

/// A stored document
#[derive(Debug, Clone)]
pub struct Document {
    /// Caller-assigned identifier
    pub id: String,
    /// Document text
    pub text: String,
}

impl Document {
    /// Create a new document
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

/// In-memory store of documents and their embeddings
#[derive(Debug, Clone, Default)]
pub struct DocStore {
    entries: Vec<(Document, Vec<f32>)>,
}

impl DocStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document with its embedding
    pub fn add(&mut self, document: Document, embedding: Vec<f32>) {
        self.entries.push((document, embedding));
    }

    /// Number of stored documents
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the top-k documents by cosine similarity to the query vector,
    /// best first
    pub fn search(&self, query: &[f32], k: usize) -> Vec<(&Document, f32)> {
        let mut scored: Vec<(&Document, f32)> = self
            .entries
            .iter()
            .map(|(doc, embedding)| (doc, cosine_similarity(query, embedding)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }
}

/// Cosine similarity between two vectors. Zero when either vector has zero
/// magnitude or the dimensions differ.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    dot / (mag_a * mag_b)
}
