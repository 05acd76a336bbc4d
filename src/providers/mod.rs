pub mod openai;
pub mod slack;
pub mod traits;

pub use openai::openai::OpenAICompletionService;
pub use slack::slack::SlackClient;
pub use slack::webhook::SlackWebhook;
pub use traits::{Channel, CompletionRequest, CompletionService, MessagingError, MessagingService, WebhookSink};
