pub mod api;
pub mod commands;
pub mod config;
pub mod document;
pub mod llm;
pub mod notify;
pub mod pipeline;
pub mod providers;

// Re-export commonly used items
pub use config::AppConfig;
pub use pipeline::{Submission, SubmissionError, SubmissionPipeline, SubmissionReport};
