pub(crate) mod common;
pub mod chat_completions;
pub mod embeddings;
pub mod models;
