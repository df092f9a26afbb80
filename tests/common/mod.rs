#![allow(dead_code)]

use sql_insight::InsightResult;
use sql_insight::error::InsightError;
use sql_insight::llm::CompletionService;
use sql_insight::models::ConnectionSettings;
use sql_insight::session::{Session, SessionOptions};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Completion backend that replays canned replies and records every prompt.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|s| s.to_string()).collect()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl CompletionService for ScriptedCompletion {
    async fn complete(&self, prompt: &str) -> InsightResult<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| InsightError::synthesis("completion", "no scripted reply left"))
    }
}

/// A SQLite file with a small music catalogue.
pub async fn music_db() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    let url = format!("sqlite:{}?mode=rwc", file.path().to_str().unwrap());
    let pool = sqlx::SqlitePool::connect(&url).await.unwrap();

    for sql in [
        "CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name NVARCHAR(120))",
        "CREATE TABLE Album (
            AlbumId INTEGER PRIMARY KEY,
            Title NVARCHAR(160) NOT NULL,
            ArtistId INTEGER NOT NULL,
            FOREIGN KEY (ArtistId) REFERENCES Artist (ArtistId)
        )",
        "INSERT INTO Artist (ArtistId, Name) VALUES (1, 'AC/DC'), (2, 'Accept'), (3, 'Aerosmith')",
        "INSERT INTO Album (AlbumId, Title, ArtistId) VALUES
            (1, 'For Those About To Rock We Salute You', 1),
            (2, 'Balls to the Wall', 2)",
    ] {
        sqlx::query(sql).execute(&pool).await.unwrap();
    }

    pool.close().await;
    file
}

pub fn settings_for(file: &NamedTempFile) -> ConnectionSettings {
    ConnectionSettings::sqlite(file.path().to_str().unwrap())
}

/// A session already connected to `file`.
pub async fn connected_session(
    file: &NamedTempFile,
    completion: Arc<ScriptedCompletion>,
    options: SessionOptions,
) -> Session<ScriptedCompletion> {
    let mut session = Session::new(completion, settings_for(file), options);
    session.connect().await.unwrap();
    session
}
