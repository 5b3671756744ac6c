//! AI DJ: taste analysis and playlist generation through a hosted
//! prompt service (Gemini `generateContent` with JSON output schemas).

pub mod cache;
pub mod client;
pub mod errors;
pub mod prompts;

pub use cache::AnalysisStore;
pub use client::{GeminiClient, PromptService};
pub use errors::PromptError;
