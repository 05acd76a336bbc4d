//! Log output of a submission whose PDF cannot be read.
//!
//! Kept in its own test binary because it installs the global logger.

use async_trait::async_trait;
use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pdf_qa_agent::document::{Document, PdfTextExtractor};
use pdf_qa_agent::llm::AnswerGenerator;
use pdf_qa_agent::notify::Notifier;
use pdf_qa_agent::pipeline::{Submission, SubmissionError, SubmissionPipeline};
use pdf_qa_agent::providers::{CompletionRequest, CompletionService, MessagingError, WebhookSink};

static RECORDS: Mutex<Vec<(Level, String)>> = Mutex::new(Vec::new());

struct Capture;

impl Log for Capture {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.target().starts_with("pdf_qa_agent") {
            RECORDS.lock().unwrap().push((record.level(), record.args().to_string()));
        }
    }

    fn flush(&self) {}
}

struct Unused;

#[async_trait]
impl CompletionService for Unused {
    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<Vec<String>> {
        anyhow::bail!("no completion expected")
    }
}

#[async_trait]
impl WebhookSink for Unused {
    async fn send(&self, _text: &str) -> Result<(), MessagingError> {
        Ok(())
    }
}

#[tokio::test]
async fn unreadable_pdf_is_logged_once_with_submission_id() {
    log::set_boxed_logger(Box::new(Capture)).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let generator = AnswerGenerator::new(Arc::new(Unused), "gpt-3.5-turbo-instruct", 150, Duration::from_secs(5));
    let pipeline = SubmissionPipeline::new(
        Arc::new(PdfTextExtractor::new()),
        generator,
        Notifier::webhook(Arc::new(Unused)),
        "aiagent",
    );

    let result = pipeline
        .submit(Submission {
            document: Some(Document::new("report.pdf", b"this is not a pdf at all".to_vec())),
            questions: "What was the revenue?".into(),
        })
        .await;
    assert!(matches!(result, Err(SubmissionError::Extraction(_))));

    let errors: Vec<String> = RECORDS
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, _)| *level == Level::Error)
        .map(|(_, message)| message.clone())
        .collect();
    assert_eq!(errors.len(), 1, "got {:?}", errors);
    assert!(errors[0].starts_with('['), "missing submission id: {}", errors[0]);
    assert!(errors[0].contains("Error reading PDF"));
}
