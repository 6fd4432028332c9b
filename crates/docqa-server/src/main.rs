//! DocQA: ask questions about a single .txt or .pdf document.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docqa_core::DocQaConfig;
use docqa_server::{build_router, repl, AppState};

fn print_usage() {
    println!("DocQA: document question answering");
    println!();
    println!("Usage: docqa [command]");
    println!();
    println!("Commands:");
    println!("  (none) | serve       Start the HTTP server");
    println!("  chat [FILE]          Chat in the terminal, optionally loading FILE");
    println!("  help                 Show this help message");
    println!();
    println!("Environment:");
    println!("  OPENAI_API_KEY            API key (required)");
    println!("  OPENAI_BASE_URL           Endpoint base URL");
    println!("  DOCQA_MODEL               Chat model");
    println!("  DOCQA_TEMPERATURE         Sampling temperature");
    println!("  DOCQA_MAX_CONTEXT_CHARS   Characters of document sent per question");
    println!("  DOCQA_TRUNCATION          head | tail");
    println!("  DOCQA_MAX_UPLOAD_MB       Upload size limit");
    println!("  DOCQA_MAX_SESSIONS        Concurrent session cap");
    println!("  PORT                      HTTP port");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they never interleave with the terminal chat.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str).unwrap_or("serve");

    match command {
        "--help" | "-h" | "help" => {
            print_usage();
            return Ok(());
        }
        "serve" | "chat" => {}
        other => {
            eprintln!("Unknown command: {}. Use 'docqa help' for usage.", other);
            std::process::exit(1);
        }
    }

    let config = match DocQaConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    if command == "chat" {
        return repl::run_stdio(config, args.get(2).map(PathBuf::from)).await;
    }

    let port = config.port;
    info!(
        "Model {} at {} (context cap {} chars, {})",
        config.llm.model, config.llm.base_url, config.context.max_chars, config.context.truncation
    );

    let state = Arc::new(AppState::new(config));
    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("DocQA server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
