//! Shared application state for the REST layer.
//!
//! One SQLite connection sits behind a `Mutex`; handlers take the lock,
//! run their queries and drop it before any `.await`. Provider handles are
//! trait objects so tests can swap in mocks.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::config::ClinicConfig;
use crate::db::{self, seed};
use crate::patients::{self, NoteError, NoteRequest, PatientSummary, SavedNote};
use crate::summary_cache::SummaryCache;
use crate::voice::{ElevenLabsClient, HttpMailer, Mailer, SpeechSynthesizer, VoiceError};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    db: Mutex<Connection>,
    summaries: Mutex<SummaryCache>,
    pub config: ClinicConfig,
    tts: Arc<dyn SpeechSynthesizer>,
    mailer: Arc<dyn Mailer>,
    started_at: Instant,
}

/// A summary plus whether it came from the cache.
#[derive(Debug, Clone)]
pub struct SummaryLookup {
    pub summary: PatientSummary,
    pub cached: bool,
}

impl CoreState {
    /// Open (and seed, if empty) the store and build the HTTP providers.
    ///
    /// Call this before entering the async runtime: the provider clients
    /// are blocking reqwest clients.
    pub fn from_config(config: ClinicConfig) -> Result<Self, CoreError> {
        let conn = match &config.db_path {
            Some(path) => db::open_database(path)?,
            None => db::open_memory_database()?,
        };
        seed::seed_if_empty(&conn)?;

        let tts = Arc::new(ElevenLabsClient::new(&config.tts)?);
        let mailer = Arc::new(HttpMailer::new(&config.email)?);
        if config.tts.api_key.is_none() {
            tracing::warn!("ELEVENLABS_API_KEY not set, /api/tts will return 500");
        }
        if config.email.api_key.is_none() {
            tracing::warn!("EMAIL_API_KEY not set, follow-up emails will fail");
        }
        Ok(Self::with_providers(conn, config, tts, mailer))
    }

    pub fn with_providers(
        conn: Connection,
        config: ClinicConfig,
        tts: Arc<dyn SpeechSynthesizer>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            db: Mutex::new(conn),
            summaries: Mutex::new(SummaryCache::new(config.summary_ttl)),
            config,
            tts,
            mailer,
            started_at: Instant::now(),
        }
    }

    // ── Store access ────────────────────────────────────────

    /// Lock the store connection. Never hold the guard across `.await`.
    pub fn lock_db(&self) -> Result<MutexGuard<'_, Connection>, CoreError> {
        self.db.lock().map_err(|_| CoreError::LockPoisoned)
    }

    fn lock_summaries(&self) -> Result<MutexGuard<'_, SummaryCache>, CoreError> {
        self.summaries.lock().map_err(|_| CoreError::LockPoisoned)
    }

    // ── Providers ───────────────────────────────────────────

    pub fn tts(&self) -> Arc<dyn SpeechSynthesizer> {
        Arc::clone(&self.tts)
    }

    pub fn mailer(&self) -> Arc<dyn Mailer> {
        Arc::clone(&self.mailer)
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    // ── Summaries ───────────────────────────────────────────
    //
    // Lock order is store, then summaries. Generation and insert happen
    // under the store guard so a note saved in between cannot be missed.

    /// Cached summary for a patient, generating and caching it on a miss.
    /// `None` when the patient does not exist.
    pub fn summarize(
        &self,
        patient_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<SummaryLookup>, CoreError> {
        let conn = self.lock_db()?;
        if let Some(summary) = self.lock_summaries()?.get(patient_id) {
            return Ok(Some(SummaryLookup {
                summary,
                cached: true,
            }));
        }

        let Some(summary) = patients::summarize_patient(&conn, patient_id, now)? else {
            return Ok(None);
        };
        self.lock_summaries()?.insert(patient_id, summary.clone());
        drop(conn);

        tracing::debug!(patient_id, "Summary generated");
        Ok(Some(SummaryLookup {
            summary,
            cached: false,
        }))
    }

    /// Save a SOAP note and drop the patient's cached summary before the
    /// store guard is released.
    pub fn record_note(&self, req: &NoteRequest, now: DateTime<Utc>) -> Result<SavedNote, CoreError> {
        let conn = self.lock_db()?;
        let saved = patients::save_note(&conn, req, now)?;
        if let Some(patient_id) = req.patient_id.as_deref().map(str::trim) {
            self.lock_summaries()?.invalidate(patient_id);
        }
        Ok(saved)
    }
}

// ═══════════════════════════════════════════════════════════
// Errors
// ═══════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Internal lock error")]
    LockPoisoned,
    #[error("Database error: {0}")]
    Database(#[from] db::DatabaseError),
    #[error("Provider setup failed: {0}")]
    Provider(#[from] VoiceError),
    #[error(transparent)]
    Note(#[from] NoteError),
}

// ═══════════════════════════════════════════════════════════
// Test support
// ═══════════════════════════════════════════════════════════

/// Seeded in-memory state with mock providers.
#[cfg(test)]
pub(crate) fn test_state() -> Arc<CoreState> {
    use crate::voice::{MockMailer, MockSpeechSynthesizer};
    test_state_with(
        Arc::new(MockSpeechSynthesizer::new(b"ID3mock")),
        Arc::new(MockMailer::new()),
    )
}

#[cfg(test)]
pub(crate) fn test_state_with(
    tts: Arc<dyn SpeechSynthesizer>,
    mailer: Arc<dyn Mailer>,
) -> Arc<CoreState> {
    let conn = db::open_memory_database().unwrap();
    seed::seed_demo_data(&conn).unwrap();
    Arc::new(CoreState::with_providers(
        conn,
        ClinicConfig::default(),
        tts,
        mailer,
    ))
}
