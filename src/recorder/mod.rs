//! Access Recorder: persists granted accesses and forwards them upstream.
//!
//! Order per call:
//! 1. Check the content exists and is published, and the token is non-empty
//! 2. Scrub client metadata (address anonymized, user-agent capped)
//! 3. Append one record locally
//! 4. Report the access to the authority, best-effort
//!
//! Steps 3 and 4 fail independently: a failed local write does not stop the
//! report, and a failed report never rolls back the local record.

pub mod anonymize;
pub mod stats;
pub mod store;

use crate::client::Authority;
use crate::clock::Clock;
use crate::content::ContentCatalog;
use crate::crypto::digest::{fingerprint, short_fingerprint};
use crate::protocol::models::{ContentId, DateRange};
use crate::GateError;
use anonymize::{anonymize_ip, cap_user_agent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

pub use stats::{ContentViews, LocalStats};
pub use store::{JsonlRecordStore, MemoryRecordStore, RecordStore};

/// One granted access, as stored.
///
/// Holds the token's fingerprint and an anonymized address only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessRecord {
    /// Assigned by the store on append.
    pub id: u64,
    /// Accessed content.
    pub content_id: ContentId,
    /// SHA-256 hex of the token.
    pub token_fingerprint: String,
    /// When the access happened.
    pub access_time: DateTime<Utc>,
    /// Claims returned by the authority at validation time.
    pub claims_snapshot: Map<String, Value>,
    /// Anonymized client address, when one could be parsed.
    pub client_address: Option<String>,
    /// Capped user-agent, possibly empty.
    pub user_agent: String,
}

/// Raw client metadata for one request, before scrubbing.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    /// Client address as seen by the host.
    pub client_address: Option<String>,
    /// User-Agent header.
    pub user_agent: Option<String>,
}

/// What [`AccessRecorder::record`] did.
#[derive(Debug)]
pub enum RecordOutcome {
    /// Stored locally with this id; `reported` tells whether the upstream
    /// report succeeded.
    Stored {
        /// Record id.
        id: u64,
        /// Upstream report accepted.
        reported: bool,
    },
    /// Nothing stored or reported.
    Dropped(GateError),
    /// Local write failed; the report was still attempted.
    Failed {
        /// The local write error.
        error: GateError,
        /// Upstream report accepted.
        reported: bool,
    },
}

impl RecordOutcome {
    /// Id of the stored record, if any.
    pub fn record_id(&self) -> Option<u64> {
        match self {
            RecordOutcome::Stored { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Writes access records and reports accesses upstream.
pub struct AccessRecorder {
    catalog: Arc<dyn ContentCatalog>,
    authority: Arc<dyn Authority>,
    store: Arc<dyn RecordStore>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for AccessRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessRecorder").finish_non_exhaustive()
    }
}

impl AccessRecorder {
    /// Create a recorder.
    pub fn new(
        catalog: Arc<dyn ContentCatalog>,
        authority: Arc<dyn Authority>,
        store: Arc<dyn RecordStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            authority,
            store,
            clock,
        }
    }

    /// Record one granted access. Never fails; see [`RecordOutcome`].
    pub fn record(
        &self,
        content_id: ContentId,
        token: &str,
        claims: &Map<String, Value>,
        metadata: &RequestMetadata,
    ) -> RecordOutcome {
        if let Err(e) = self.check(content_id, token) {
            warn!(error = %e, content_id, "Dropping access record");
            return RecordOutcome::Dropped(e);
        }

        let fp = short_fingerprint(token);
        let record = AccessRecord {
            id: 0,
            content_id,
            token_fingerprint: fingerprint(token),
            access_time: self.clock.now_utc(),
            claims_snapshot: claims.clone(),
            client_address: metadata.client_address.as_deref().and_then(anonymize_ip),
            user_agent: metadata.user_agent.as_deref().map(cap_user_agent).unwrap_or_default(),
        };

        let stored = self.store.append(record);
        if let Err(e) = &stored {
            warn!(error = %e, content_id, fingerprint = %fp, "Failed to store access record");
        }

        let reported = match self.authority.report_access(content_id, token) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, content_id, fingerprint = %fp, "Failed to report access");
                false
            }
        };

        match stored {
            Ok(record) => {
                debug!(content_id, record_id = record.id, reported, "Access recorded");
                RecordOutcome::Stored {
                    id: record.id,
                    reported,
                }
            }
            Err(error) => RecordOutcome::Failed { error, reported },
        }
    }

    /// Totals over locally stored records in a date range.
    pub fn local_stats(&self, range: &DateRange) -> Result<LocalStats, GateError> {
        let records = self.store.records(range)?;
        Ok(LocalStats::from_records(&records))
    }

    fn check(&self, content_id: ContentId, token: &str) -> Result<(), GateError> {
        if token.is_empty() {
            return Err(GateError::MalformedToken("empty".to_string()));
        }
        match self.catalog.get(content_id) {
            None => Err(GateError::ContentNotFound(content_id)),
            Some(meta) if !meta.published => Err(GateError::ContentNotPublished(content_id)),
            Some(_) => Ok(()),
        }
    }
}
