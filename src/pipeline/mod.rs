use crate::config::{AppConfig, ConfigError, DeliveryMode};
use crate::document::{Document, ExtractionError, PdfTextExtractor, TextExtractor};
use crate::llm::{AnswerGenerator, AnswerSet, QuestionList};
use crate::notify::{Notifier, NotifyOutcome};
use crate::providers::{OpenAICompletionService, SlackClient, SlackWebhook};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Status shown to the user once a submission has gone through.
pub const SUCCESS_STATUS: &str = "Answers posted to Slack!";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please upload a PDF file.")]
    MissingDocument,
    #[error("'{0}' is not a PDF file.")]
    NotPdf(String),
    #[error("Please enter at least one question.")]
    NoQuestions,
}

#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
}

/// One user request: the upload (if any) and the raw questions block.
#[derive(Debug, Clone)]
pub struct Submission {
    pub document: Option<Document>,
    pub questions: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    Extracting,
    Generating,
    Notifying,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Validating => "validating",
            Stage::Extracting => "extracting",
            Stage::Generating => "generating",
            Stage::Notifying => "notifying",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionReport {
    pub id: Uuid,
    pub channel: String,
    pub message: String,
    pub answers: AnswerSet,
    pub notification: NotifyOutcome,
    pub finished_at: DateTime<Utc>,
}

impl SubmissionReport {
    /// The user-facing status. Delivery problems are logged, not shown.
    pub fn status(&self) -> &'static str {
        SUCCESS_STATUS
    }
}

/// Renders one `Q:`/`A:` block per distinct question, in the order asked.
pub fn format_message(questions: &QuestionList, answers: &AnswerSet) -> String {
    questions
        .distinct()
        .into_iter()
        .filter_map(|q| answers.get(q).map(|a| format!("Q: {}\nA: {}", q, a)))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Checks a submission before any work is done.
pub fn validate(submission: Submission) -> Result<(Document, QuestionList), ValidationError> {
    let document = match submission.document {
        Some(document) if !document.is_empty() => document,
        _ => return Err(ValidationError::MissingDocument),
    };
    if !document.has_pdf_extension() {
        return Err(ValidationError::NotPdf(document.filename));
    }

    let questions = QuestionList::parse(&submission.questions);
    if questions.is_empty() {
        return Err(ValidationError::NoQuestions);
    }
    Ok((document, questions))
}

/// Upload -> extract -> answer -> notify, one submission at a time.
pub struct SubmissionPipeline {
    extractor: Arc<dyn TextExtractor>,
    generator: AnswerGenerator,
    notifier: Notifier,
    channel: String,
}

impl SubmissionPipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        generator: AnswerGenerator,
        notifier: Notifier,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            extractor,
            generator,
            notifier,
            channel: channel.into(),
        }
    }

    /// Wires the production collaborators from the startup config.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let timeout = config.request_timeout;

        let completion = OpenAICompletionService::new(&config.openai, timeout)?;
        let generator = AnswerGenerator::from_settings(Arc::new(completion), &config.openai, timeout);

        let notifier = match config.slack.delivery {
            DeliveryMode::Api => {
                if config.slack.webhook_url.is_some() {
                    log::info!("SLACK_WEBHOOK_URL is set but delivery mode is api; the webhook is not used");
                }
                Notifier::api(Arc::new(SlackClient::new(&config.slack, timeout)?))
            }
            DeliveryMode::Webhook => {
                let url = config
                    .slack
                    .webhook_url
                    .clone()
                    .ok_or(ConfigError::Missing("SLACK_WEBHOOK_URL"))?;
                Notifier::webhook(Arc::new(SlackWebhook::new(url, timeout)?))
            }
        };

        Ok(Self::new(
            Arc::new(PdfTextExtractor::new()),
            generator,
            notifier,
            config.slack.channel.clone(),
        ))
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub async fn submit(&self, submission: Submission) -> Result<SubmissionReport, SubmissionError> {
        let id = Uuid::new_v4();
        let mut stage = Stage::Idle;

        advance(id, &mut stage, Stage::Validating);
        let (document, questions) = match validate(submission) {
            Ok(valid) => valid,
            Err(e) => {
                log::warn!("[{}] rejected submission: {}", id, e);
                advance(id, &mut stage, Stage::Failed);
                return Err(e.into());
            }
        };
        log::info!(
            "[{}] received '{}' ({} bytes) with {} question(s)",
            id,
            document.filename,
            document.bytes.len(),
            questions.len()
        );

        advance(id, &mut stage, Stage::Extracting);
        let text = match self.extract(document).await {
            Ok(text) => text,
            Err(e) => {
                log::error!("[{}] {}", id, e);
                advance(id, &mut stage, Stage::Failed);
                return Err(e.into());
            }
        };
        log::debug!("[{}] extracted {} characters", id, text.len());

        advance(id, &mut stage, Stage::Generating);
        let answers = self.generator.generate(&text, &questions).await;
        let failed = answers.failures().count();
        if failed > 0 {
            log::warn!("[{}] {} of {} answer(s) unavailable", id, failed, answers.len());
        }

        advance(id, &mut stage, Stage::Notifying);
        let message = format_message(&questions, &answers);
        let notification = self.notifier.notify(&self.channel, &message).await;

        advance(id, &mut stage, Stage::Done);
        Ok(SubmissionReport {
            id,
            channel: self.channel.clone(),
            message,
            answers,
            notification,
            finished_at: Utc::now(),
        })
    }

    async fn extract(&self, document: Document) -> Result<String, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let bytes = document.bytes;
        tokio::task::spawn_blocking(move || extractor.extract(&bytes))
            .await
            .map_err(ExtractionError::TaskFailed)?
    }
}

fn advance(id: Uuid, stage: &mut Stage, next: Stage) {
    log::debug!("[{}] {} -> {}", id, stage, next);
    *stage = next;
}
