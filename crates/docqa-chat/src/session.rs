//! Chat sessions: the active document plus an append-only transcript.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info};

use docqa_core::{ContextSettings, Error, Result};
use docqa_ingest::{extract_upload, DocumentContext, DocumentFormat, UploadedDocument};

use crate::dispatch::{Answer, QueryDispatcher};
use crate::types::{Role, Turn};

/// The document a session is currently answering from.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub file_name: String,
    pub format: DocumentFormat,
    pub context: DocumentContext,
    pub warning: Option<String>,
}

impl LoadedDocument {
    /// Extract and truncate an upload.
    pub fn from_upload(upload: &UploadedDocument, settings: ContextSettings) -> Self {
        let extraction = extract_upload(Some(upload));
        let warning = extraction.warning().map(str::to_string);
        let context = DocumentContext::new(extraction.text(), settings);

        Self {
            file_name: upload.file_name.clone(),
            format: upload.format,
            context,
            warning,
        }
    }

    pub fn summary(&self) -> DocumentSummary {
        DocumentSummary {
            filename: self.file_name.clone(),
            format: self.format,
            extracted_chars: self.context.source_chars(),
            context_chars: self.context.char_count(),
            truncated: self.context.truncated(),
            warning: self.warning.clone(),
        }
    }
}

/// Client-facing view of a loaded document (no text).
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub format: DocumentFormat,
    #[serde(rename = "extractedChars")]
    pub extracted_chars: usize,
    #[serde(rename = "contextChars")]
    pub context_chars: usize,
    pub truncated: bool,
    pub warning: Option<String>,
}

/// One interactive session.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: String,
    pub document: Option<LoadedDocument>,
    pub transcript: Vec<Turn>,
}

impl Session {
    /// A fresh session with no document and an empty transcript.
    pub fn new() -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            document: None,
            transcript: Vec::new(),
        }
    }

    /// Current context text; `""` when no document is loaded.
    pub fn context(&self) -> &str {
        self.document
            .as_ref()
            .map(|d| d.context.as_str())
            .unwrap_or("")
    }

    /// Replace the active document. The transcript is kept.
    pub fn load_document(
        &mut self,
        upload: &UploadedDocument,
        settings: ContextSettings,
    ) -> &LoadedDocument {
        let loaded = LoadedDocument::from_upload(upload, settings);
        log_loaded(&self.id, &loaded);
        self.document.insert(loaded)
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(Turn::new(role, content));
    }

    /// Drop the document and the transcript.
    pub fn reset(&mut self) {
        self.document = None;
        self.transcript.clear();
    }

    /// Record the question, answer it, record the answer.
    pub async fn ask(&mut self, question: &str, dispatcher: &QueryDispatcher) -> Answer {
        self.push(Role::User, question);
        let answer = dispatcher.answer(self.context(), question).await;
        self.push(Role::Assistant, answer.message());
        answer
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

fn log_loaded(session_id: &str, loaded: &LoadedDocument) {
    info!(
        "Session {} loaded {} ({}, {} of {} chars, truncated={})",
        session_id,
        loaded.file_name,
        loaded.format,
        loaded.context.char_count(),
        loaded.context.source_chars(),
        loaded.context.truncated()
    );
}

/// Result of asking through the [`SessionManager`].
#[derive(Debug, Clone)]
pub struct AskResult {
    pub answer: Answer,
    /// Transcript length after the assistant turn was appended.
    pub turns: usize,
}

/// Registry entry: the session plus the state that orders work on it.
struct SessionEntry {
    session: Session,
    /// Creation order; eviction removes the lowest.
    seq: u64,
    /// Bumped by every reset; replies dispatched under an older value are dropped.
    generation: u64,
    /// Held for the whole of an ask so turns stay paired.
    ask_lock: Arc<AsyncMutex<()>>,
}

/// In-memory session registry with oldest-first eviction.
pub struct SessionManager {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    next_seq: AtomicU64,
    max_sessions: usize,
    context_settings: ContextSettings,
}

impl SessionManager {
    pub fn new(max_sessions: usize, context_settings: ContextSettings) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            next_seq: AtomicU64::new(0),
            max_sessions: max_sessions.max(1),
            context_settings,
        }
    }

    pub fn context_settings(&self) -> ContextSettings {
        self.context_settings
    }

    /// Create a session, evicting the oldest one when at capacity.
    pub fn create(&self) -> Session {
        let session = Session::new();
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            if let Some(oldest_id) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(id, _)| id.clone())
            {
                sessions.remove(&oldest_id);
                info!("Evicted oldest session {}", oldest_id);
            }
        }

        sessions.insert(
            session.id.clone(),
            SessionEntry {
                session: session.clone(),
                seq,
                generation: 0,
                ask_lock: Arc::new(AsyncMutex::new(())),
            },
        );
        info!("Session created: {}", session.id);
        session
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.read().contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Session> {
        self.sessions.read().get(id).map(|e| e.session.clone())
    }

    /// Tear a session down.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            info!("Session ended: {}", id);
        }
        removed
    }

    /// Drop the document and the transcript. A reply still in flight is
    /// discarded when it arrives.
    pub fn reset(&self, id: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        entry.session.reset();
        entry.generation += 1;
        info!("Session reset: {}", id);
        Ok(())
    }

    /// Extract `upload` and make it the session's active document.
    pub fn load_document(&self, id: &str, upload: &UploadedDocument) -> Result<LoadedDocument> {
        // Extraction runs outside the lock.
        let loaded = LoadedDocument::from_upload(upload, self.context_settings);

        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        log_loaded(id, &loaded);
        entry.session.document = Some(loaded.clone());
        Ok(loaded)
    }

    pub fn transcript(&self, id: &str) -> Result<Vec<Turn>> {
        self.sessions
            .read()
            .get(id)
            .map(|e| e.session.transcript.clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Ask a question in a session.
    ///
    /// Asks on one session run one at a time. The user turn is recorded
    /// before dispatch and the map lock is released while the completion
    /// call is in flight. If the session is reset meanwhile, the reply is
    /// returned but not recorded.
    pub async fn ask(
        &self,
        id: &str,
        question: &str,
        dispatcher: &QueryDispatcher,
    ) -> Result<AskResult> {
        let ask_lock = self
            .sessions
            .read()
            .get(id)
            .map(|e| e.ask_lock.clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        let _turn = ask_lock.lock().await;

        let (context, generation) = {
            let mut sessions = self.sessions.write();
            let entry = sessions
                .get_mut(id)
                .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
            entry.session.push(Role::User, question);
            (entry.session.context().to_string(), entry.generation)
        };

        let answer = dispatcher.answer(&context, question).await;

        let mut sessions = self.sessions.write();
        let entry = sessions
            .get_mut(id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        if entry.generation == generation {
            entry.session.push(Role::Assistant, answer.message());
        } else {
            debug!("Session {} was reset during ask; reply dropped", id);
        }

        Ok(AskResult {
            answer,
            turns: entry.session.transcript.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }
}
