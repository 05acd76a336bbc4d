use pdf_qa_agent::api::{self, ApiLimits};
use pdf_qa_agent::commands;
use pdf_qa_agent::config::AppConfig;
use pdf_qa_agent::pipeline::SubmissionPipeline;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use clap::Parser;
use dotenv::dotenv;
use tokio::net::TcpListener;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Answer questions about a PDF and post them to Slack", long_about = None)]
struct Args {
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    #[arg(long, default_value = "3000")]
    port: u16,

    /// Slack channel to post to (overrides SLACK_CHANNEL)
    #[arg(long)]
    channel: Option<String>,

    /// Run one submission from this PDF instead of serving the web form
    #[arg(long, requires = "questions")]
    pdf: Option<PathBuf>,

    /// File with one question per line, used with --pdf
    #[arg(long, requires = "pdf")]
    questions: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Load environment variables
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = AppConfig::from_env().map_err(|e| {
        log::error!("{}", e);
        e
    })?;
    if let Some(channel) = &args.channel {
        config = config.with_channel(channel.clone());
    }

    let pipeline = SubmissionPipeline::from_config(&config)?;

    match (&args.pdf, &args.questions) {
        (Some(pdf), Some(questions)) => {
            commands::run_once(&pipeline, pdf, questions).await?;
            Ok(())
        }
        _ => run_api_server(&args, pipeline, ApiLimits::from(&config)).await,
    }
}

async fn run_api_server(
    args: &Args,
    pipeline: SubmissionPipeline,
    limits: ApiLimits,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port)
        .parse()
        .map_err(|e| format!("Invalid address {}:{}: {}", args.host, args.port, e))?;

    log::info!("Posting answers to #{}", pipeline.channel());
    let app = api::create_api(Arc::new(pipeline), limits);

    let listener = TcpListener::bind(&addr).await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    log::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| format!("Server error: {}", e))?;

    Ok(())
}
