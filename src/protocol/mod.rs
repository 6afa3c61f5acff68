pub mod gemini;
pub mod mapping;
pub mod media;
pub mod openai_chat;
