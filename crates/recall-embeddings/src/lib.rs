mod hashing;

pub use hashing::HashingEmbeddings;

// Re-export the Embeddings trait from core (forward-declared there).
pub use recall_core::Embeddings;
