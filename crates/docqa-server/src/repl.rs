//! Terminal chat: one session, driven line by line from stdin.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::warn;

use docqa_chat::{LoadedDocument, QueryDispatcher, Session};
use docqa_core::{ContextSettings, DocQaConfig};
use docqa_ingest::UploadedDocument;

const BANNER: &str = "Document Q&A. Load a .txt or .pdf with /load PATH, then ask questions. Type /help for commands.";

const HELP: &str = "\
Commands:
  /load PATH   Load a .txt or .pdf as the active document
  /history     Show the conversation so far
  /reset       Forget the document and the conversation
  /help        Show this help
  /quit        Exit
Anything else is sent as a question about the loaded document.";

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Load(PathBuf),
    History,
    Reset,
    Help,
    Quit,
    Empty,
    Usage(&'static str),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }
        if !trimmed.starts_with('/') {
            return Command::Ask(line.to_string());
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (trimmed, ""),
        };

        match name.to_lowercase().as_str() {
            "/load" if arg.is_empty() => Command::Usage("Usage: /load PATH"),
            "/load" => Command::Load(PathBuf::from(arg)),
            "/history" => Command::History,
            "/reset" => Command::Reset,
            "/help" => Command::Help,
            "/quit" | "/exit" => Command::Quit,
            _ => Command::Unknown(name.to_string()),
        }
    }
}

/// Interactive chat over a single in-memory [`Session`].
pub struct ChatRepl {
    session: Session,
    dispatcher: QueryDispatcher,
    settings: ContextSettings,
}

impl ChatRepl {
    pub fn new(dispatcher: QueryDispatcher, settings: ContextSettings) -> Self {
        Self {
            session: Session::new(),
            dispatcher,
            settings,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Read `path` from disk and make it the active document.
    pub async fn load_path(&mut self, path: &Path) -> anyhow::Result<&LoadedDocument> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let upload = UploadedDocument::new(file_name, bytes);
        Ok(self.session.load_document(&upload, self.settings))
    }

    /// Run until `/quit` or end of input.
    pub async fn run<R, W>(&mut self, input: R, output: &mut W) -> anyhow::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();

        loop {
            output.write_all(b"you> ").await?;
            output.flush().await?;

            let Some(line) = lines.next_line().await? else {
                output.write_all(b"\n").await?;
                break;
            };

            let reply = match Command::parse(&line) {
                Command::Quit => break,
                Command::Empty => continue,
                Command::Help => HELP.to_string(),
                Command::Usage(usage) => usage.to_string(),
                Command::Unknown(name) => {
                    format!("Unknown command {}. Type /help for commands.", name)
                }
                Command::Reset => {
                    self.session.reset();
                    "Session reset.".to_string()
                }
                Command::History => format_history(&self.session),
                Command::Load(path) => self.load_and_describe(&path).await,
                Command::Ask(question) => {
                    let answer = self.session.ask(&question, &self.dispatcher).await;
                    format!("assistant> {}", answer.message())
                }
            };

            output.write_all(reply.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }

        output.flush().await?;
        Ok(())
    }

    async fn load_and_describe(&mut self, path: &Path) -> String {
        match self.load_path(path).await {
            Ok(loaded) => describe(loaded),
            Err(e) => {
                warn!("{:#}", e);
                format!("error: {:#}", e)
            }
        }
    }
}

fn describe(loaded: &LoadedDocument) -> String {
    let mut out = format!(
        "Loaded {} ({}, {} chars)",
        loaded.file_name,
        loaded.format,
        loaded.context.char_count()
    );
    if loaded.context.truncated() {
        out.push_str(&format!(
            ", truncated from {} chars",
            loaded.context.source_chars()
        ));
    }
    if let Some(warning) = &loaded.warning {
        out.push_str(&format!("\nwarning: {}", warning));
    }
    out
}

fn format_history(session: &Session) -> String {
    if session.transcript.is_empty() {
        return "(no messages yet)".to_string();
    }
    session
        .transcript
        .iter()
        .map(|turn| format!("{}> {}", turn.role, turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Terminal chat on stdin/stdout, optionally preloading `file`.
pub async fn run_stdio(config: DocQaConfig, file: Option<PathBuf>) -> anyhow::Result<()> {
    let dispatcher = QueryDispatcher::from_settings(&config.llm);
    let mut repl = ChatRepl::new(dispatcher, config.context);
    let mut stdout = tokio::io::stdout();

    stdout.write_all(BANNER.as_bytes()).await?;
    stdout.write_all(b"\n").await?;

    if let Some(path) = file {
        let status = repl.load_and_describe(&path).await;
        stdout.write_all(status.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    repl.run(BufReader::new(tokio::io::stdin()), &mut stdout).await
}
