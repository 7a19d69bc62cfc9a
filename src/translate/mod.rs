pub mod backend;
pub mod cache;
pub mod translator;

pub use backend::{ChatCompletionsBackend, ChatMessage, ChatRequest, TranslationBackend};
pub use cache::TranslationCache;
pub use translator::{PromptKind, Source, Translated, TranslationStats, Translator};
