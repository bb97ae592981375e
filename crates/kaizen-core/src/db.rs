//! Persistent storage for opportunities using redb.
//!
//! # Table design
//!
//! ```text
//! opportunities : uuid bytes (16)          -> JSON-encoded Opportunity
//! codes         : "P1/BB/2025-2026/001"   -> uuid bytes
//! sequences     : "P1|Black Belt|2025-2026" -> last issued sequence number
//! ```
//!
//! Creation reads and bumps the scope's sequence, checks the code is free and
//! inserts the document inside one write transaction. redb serializes write
//! transactions, so two concurrent creations can never draw the same number.
//!
//! Saves are compare-and-swap on `Opportunity::version`: the stored version
//! must equal the one the caller loaded, otherwise `VersionConflict`.

use std::path::Path;

use chrono::Utc;
use redb::{Database, ReadableTable, TableDefinition};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{KaizenError, Result};
use crate::identifier::SequenceScope;
use crate::opportunity::Opportunity;

// ---------------------------------------------------------------------------
// Table definitions
// ---------------------------------------------------------------------------

const OPPORTUNITIES: TableDefinition<&[u8], &[u8]> = TableDefinition::new("opportunities");
const CODES: TableDefinition<&str, &[u8]> = TableDefinition::new("codes");
const SEQUENCES: TableDefinition<&str, u64> = TableDefinition::new("sequences");

fn storage(e: impl std::fmt::Display) -> KaizenError {
    KaizenError::Storage(e.to_string())
}

fn uuid_from_bytes(bytes: &[u8]) -> Result<Uuid> {
    Uuid::from_slice(bytes).map_err(storage)
}

/// Just enough of a stored document to check its version.
#[derive(Deserialize)]
struct Head {
    #[serde(default)]
    version: u64,
}

// ---------------------------------------------------------------------------
// OpportunityDb
// ---------------------------------------------------------------------------

pub struct OpportunityDb {
    db: Database,
}

impl OpportunityDb {
    /// Open or create the database at `path`, creating all tables.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(storage)?;
        let wt = db.begin_write().map_err(storage)?;
        wt.open_table(OPPORTUNITIES).map_err(storage)?;
        wt.open_table(CODES).map_err(storage)?;
        wt.open_table(SEQUENCES).map_err(storage)?;
        wt.commit().map_err(storage)?;
        Ok(Self { db })
    }

    /// Reserve the next sequence number in `scope`, build the opportunity
    /// from the resulting code, and insert it, all in one transaction.
    ///
    /// `build` must not touch the database.
    pub fn create_with<F>(&self, scope: &SequenceScope, build: F) -> Result<Opportunity>
    where
        F: FnOnce(String) -> Result<Opportunity>,
    {
        let wt = self.db.begin_write().map_err(storage)?;
        let opp = {
            let mut sequences = wt.open_table(SEQUENCES).map_err(storage)?;
            let mut codes = wt.open_table(CODES).map_err(storage)?;
            let mut opportunities = wt.open_table(OPPORTUNITIES).map_err(storage)?;

            let scope_key = scope.key();
            let last = sequences
                .get(scope_key.as_str())
                .map_err(storage)?
                .map(|g| g.value())
                .unwrap_or(0);
            let seq = last + 1;
            let code = scope.code_for(seq);

            if codes.get(code.as_str()).map_err(storage)?.is_some() {
                return Err(KaizenError::OpportunityExists(code));
            }

            let opp = build(code)?;
            let value = serde_json::to_vec(&opp)?;
            opportunities
                .insert(opp.id.as_bytes().as_slice(), value.as_slice())
                .map_err(storage)?;
            codes
                .insert(opp.opportunity_id.as_str(), opp.id.as_bytes().as_slice())
                .map_err(storage)?;
            sequences
                .insert(scope_key.as_str(), seq)
                .map_err(storage)?;
            opp
        };
        wt.commit().map_err(storage)?;
        tracing::debug!(id = %opp.id, code = %opp.opportunity_id, "opportunity inserted");
        Ok(opp)
    }

    pub fn load(&self, id: Uuid) -> Result<Opportunity> {
        let rt = self.db.begin_read().map_err(storage)?;
        let table = rt.open_table(OPPORTUNITIES).map_err(storage)?;
        let guard = table
            .get(id.as_bytes().as_slice())
            .map_err(storage)?
            .ok_or_else(|| KaizenError::OpportunityNotFound(id.to_string()))?;
        Ok(serde_json::from_slice(guard.value())?)
    }

    pub fn load_by_code(&self, code: &str) -> Result<Opportunity> {
        let id = {
            let rt = self.db.begin_read().map_err(storage)?;
            let table = rt.open_table(CODES).map_err(storage)?;
            let guard = table
                .get(code)
                .map_err(storage)?
                .ok_or_else(|| KaizenError::OpportunityNotFound(code.to_string()))?;
            uuid_from_bytes(guard.value())?
        };
        self.load(id)
    }

    /// Write `opp` back if nobody else saved since it was loaded. Returns the
    /// stored copy with its bumped version and timestamp.
    pub fn save(&self, opp: &Opportunity) -> Result<Opportunity> {
        let wt = self.db.begin_write().map_err(storage)?;
        let next = {
            let mut table = wt.open_table(OPPORTUNITIES).map_err(storage)?;
            let key = opp.id.as_bytes().as_slice();
            let stored_version = {
                let guard = table
                    .get(key)
                    .map_err(storage)?
                    .ok_or_else(|| KaizenError::OpportunityNotFound(opp.id.to_string()))?;
                serde_json::from_slice::<Head>(guard.value())?.version
            };
            if stored_version != opp.version {
                return Err(KaizenError::VersionConflict(opp.id.to_string()));
            }
            let mut next = opp.clone();
            next.version += 1;
            next.updated_at = Utc::now();
            let value = serde_json::to_vec(&next)?;
            table.insert(key, value.as_slice()).map_err(storage)?;
            next
        };
        wt.commit().map_err(storage)?;
        Ok(next)
    }

    /// Remove the opportunity and its code. The scope's sequence is left
    /// alone so codes are never reissued.
    pub fn delete(&self, id: Uuid) -> Result<Opportunity> {
        let wt = self.db.begin_write().map_err(storage)?;
        let removed = {
            let mut table = wt.open_table(OPPORTUNITIES).map_err(storage)?;
            let mut codes = wt.open_table(CODES).map_err(storage)?;
            let opp: Opportunity = {
                let guard = table
                    .remove(id.as_bytes().as_slice())
                    .map_err(storage)?
                    .ok_or_else(|| KaizenError::OpportunityNotFound(id.to_string()))?;
                serde_json::from_slice(guard.value())?
            };
            codes
                .remove(opp.opportunity_id.as_str())
                .map_err(storage)?;
            opp
        };
        wt.commit().map_err(storage)?;
        Ok(removed)
    }

    /// All opportunities, oldest first.
    pub fn list_all(&self) -> Result<Vec<Opportunity>> {
        let rt = self.db.begin_read().map_err(storage)?;
        let table = rt.open_table(OPPORTUNITIES).map_err(storage)?;

        let mut result = Vec::new();
        for entry in table.iter().map_err(storage)? {
            let (_, v) = entry.map_err(storage)?;
            let opp: Opportunity = serde_json::from_slice(v.value())?;
            result.push(opp);
        }
        result.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.opportunity_id.cmp(&b.opportunity_id))
        });
        Ok(result)
    }

    /// Last sequence number issued in `scope` (0 when none).
    #[cfg(test)]
    pub(crate) fn last_sequence(&self, scope: &SequenceScope) -> Result<u64> {
        let rt = self.db.begin_read().map_err(storage)?;
        let table = rt.open_table(SEQUENCES).map_err(storage)?;
        let last = table
            .get(scope.key().as_str())
            .map_err(storage)?
            .map(|g| g.value())
            .unwrap_or(0);
        Ok(last)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
