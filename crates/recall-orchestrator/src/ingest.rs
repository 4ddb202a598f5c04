use recall_core::Metadata;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One piece of a source document, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Source document name; distinct titles are counted as documents.
    pub title: String,
    #[serde(default)]
    pub section: Option<String>,
    pub text: String,
}

impl Chunk {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            section: None,
            text: text.into(),
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    /// Stored metadata: the content hash as both `id` and `hash`, plus
    /// `title`, `section` and `text`.
    pub fn to_metadata(&self) -> Metadata {
        let hash = content_hash(&self.text);
        Metadata::with_id_and_hash(hash.clone(), hash)
            .with_field("title", self.title.clone())
            .with_field("section", self.section.clone())
            .with_field("text", self.text.clone())
    }
}

/// Outcome of one `ingest_chunks` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Titles not seen in any earlier successful ingest.
    pub new_docs: usize,
    /// Chunks actually inserted, excluding content already stored.
    pub new_chunks: usize,
}

/// Hex SHA-256 of the UTF-8 text.
pub fn content_hash(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}
