pub mod answers;

pub use answers::{AnswerGenerator, AnswerOutcome, AnswerSet, QuestionList, SENTINEL_ANSWER};
