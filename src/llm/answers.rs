use crate::config::OpenAISettings;
use crate::providers::traits::{CompletionRequest, CompletionService};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Substituted for any question whose completion failed.
pub const SENTINEL_ANSWER: &str = "Data Not Available";

/// Questions as entered, one per line, blanks dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionList(Vec<String>);

impl QuestionList {
    pub fn parse(input: &str) -> Self {
        Self(
            input
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Questions in first-seen order with repeats removed.
    pub fn distinct(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.iter().filter(|q| seen.insert(*q)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerOutcome {
    Answered(String),
    Unavailable { reason: String },
}

impl AnswerOutcome {
    /// The text shown to readers; failed questions read as the sentinel.
    pub fn text(&self) -> &str {
        match self {
            AnswerOutcome::Answered(text) => text,
            AnswerOutcome::Unavailable { .. } => SENTINEL_ANSWER,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(self, AnswerOutcome::Answered(_))
    }
}

/// Ordered question -> answer map. Keys are unique and keep their first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerSet {
    entries: Vec<(String, AnswerOutcome)>,
}

impl AnswerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the answer for `question`.
    pub fn insert(&mut self, question: impl Into<String>, outcome: AnswerOutcome) {
        let question = question.into();
        match self.entries.iter_mut().find(|(q, _)| *q == question) {
            Some(entry) => entry.1 = outcome,
            None => self.entries.push((question, outcome)),
        }
    }

    pub fn get(&self, question: &str) -> Option<&str> {
        self.outcome(question).map(AnswerOutcome::text)
    }

    pub fn outcome(&self, question: &str) -> Option<&AnswerOutcome> {
        self.entries
            .iter()
            .find(|(q, _)| q == question)
            .map(|(_, outcome)| outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `(question, answer text)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(q, outcome)| (q.as_str(), outcome.text()))
    }

    /// `(question, reason)` for every question that fell back to the sentinel.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().filter_map(|(q, outcome)| match outcome {
            AnswerOutcome::Unavailable { reason } => Some((q.as_str(), reason.as_str())),
            AnswerOutcome::Answered(_) => None,
        })
    }
}

/// Answers each question against the document text, one completion call per
/// distinct question. Individual failures never abort the batch.
pub struct AnswerGenerator {
    service: Arc<dyn CompletionService>,
    model: String,
    max_tokens: u16,
    timeout: Duration,
}

impl AnswerGenerator {
    pub fn new(
        service: Arc<dyn CompletionService>,
        model: impl Into<String>,
        max_tokens: u16,
        timeout: Duration,
    ) -> Self {
        Self {
            service,
            model: model.into(),
            max_tokens,
            timeout,
        }
    }

    pub fn from_settings(service: Arc<dyn CompletionService>, settings: &OpenAISettings, timeout: Duration) -> Self {
        Self::new(service, settings.model.clone(), settings.max_tokens, timeout)
    }

    pub fn build_prompt(text: &str, question: &str) -> String {
        format!(
            "Answer the following question based on the provided text:\n\nText: {}\n\nQuestion: {}",
            text, question
        )
    }

    pub async fn generate(&self, text: &str, questions: &QuestionList) -> AnswerSet {
        let mut answers = AnswerSet::new();
        for question in questions.distinct() {
            let outcome = self.answer(text, question).await;
            if let AnswerOutcome::Unavailable { reason } = &outcome {
                log::error!("Error generating answer for question '{}': {}", question, reason);
            }
            answers.insert(question, outcome);
        }
        answers
    }

    async fn answer(&self, text: &str, question: &str) -> AnswerOutcome {
        let request = CompletionRequest {
            model: self.model.clone(),
            prompt: Self::build_prompt(text, question),
            max_tokens: self.max_tokens,
        };

        match timeout(self.timeout, self.service.complete(&request)).await {
            Ok(Ok(candidates)) => match candidates.into_iter().next() {
                Some(candidate) => AnswerOutcome::Answered(candidate.trim().to_string()),
                None => AnswerOutcome::Unavailable {
                    reason: "completion returned no candidates".to_string(),
                },
            },
            Ok(Err(e)) => AnswerOutcome::Unavailable { reason: e.to_string() },
            Err(_) => AnswerOutcome::Unavailable {
                reason: format!("completion timed out after {:?}", self.timeout),
            },
        }
    }
}
