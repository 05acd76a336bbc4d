use crate::document::Document;
use crate::pipeline::{Submission, SubmissionPipeline, SubmissionReport};
use colored::Colorize;
use std::path::Path;

/// Runs a single submission from files on disk and prints the outcome.
pub async fn run_once(
    pipeline: &SubmissionPipeline,
    pdf_path: &Path,
    questions_path: &Path,
) -> Result<SubmissionReport, String> {
    let submission = load_submission(pdf_path, questions_path).await?;

    println!("📄 Processing {} for #{}", pdf_path.display().to_string().bright_yellow(), pipeline.channel());

    let report = pipeline
        .submit(submission)
        .await
        .map_err(|e| format!("Error: {}", e))?;

    print_report(&report);
    Ok(report)
}

async fn load_submission(pdf_path: &Path, questions_path: &Path) -> Result<Submission, String> {
    let bytes = tokio::fs::read(pdf_path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", pdf_path.display(), e))?;
    let questions = tokio::fs::read_to_string(questions_path)
        .await
        .map_err(|e| format!("Failed to read {}: {}", questions_path.display(), e))?;

    let filename = pdf_path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(Submission {
        document: Some(Document::new(filename, bytes)),
        questions,
    })
}

fn print_report(report: &SubmissionReport) {
    println!("\n📝 Answers:");
    for (question, answer) in report.answers.iter() {
        println!("{} {}", "Q:".bright_cyan(), question);
        let answer = match report.answers.outcome(question) {
            Some(outcome) if outcome.is_answered() => answer.bright_green(),
            _ => answer.bright_red(),
        };
        println!("{} {}", "A:".bright_cyan(), answer);
    }

    if report.notification.is_delivered() {
        println!("\n✅ {}", report.status().bright_green());
    } else {
        // the submission still counts as done; delivery problems are only reported
        println!("\n⚠️  {}", report.notification.to_string().yellow());
    }
}
