// Scan history records - the append-only persistence shape of a verdict

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::verdict::Verdict;
use crate::schema::scan_history;

pub const SCAN_TYPE_COMPREHENSIVE: &str = "comprehensive";

/// Stored scan history row
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = scan_history)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ScanRecord {
    pub id: Uuid,
    pub scanned_url: String,
    pub trust_score: i32,
    pub threat_level: String,
    pub is_threat: bool,
    pub scan_type: String,
    pub scan_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// New scan history row for insertion
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = scan_history)]
pub struct NewScanRecord {
    pub id: Uuid,
    pub scanned_url: String,
    pub trust_score: i32,
    pub threat_level: String,
    pub is_threat: bool,
    pub scan_type: String,
    pub scan_details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl NewScanRecord {
    pub fn from_verdict(url: &str, verdict: &Verdict) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: Uuid::new_v4(),
            scanned_url: url.to_string(),
            trust_score: i32::from(verdict.trust_score),
            threat_level: verdict.classification.as_threat_level().to_string(),
            is_threat: verdict.is_threat(),
            scan_type: SCAN_TYPE_COMPREHENSIVE.to_string(),
            scan_details: serde_json::to_value(verdict)?,
            created_at: Utc::now(),
        })
    }

    /// The row as it reads back from a store
    pub fn into_record(self) -> ScanRecord {
        ScanRecord {
            id: self.id,
            scanned_url: self.scanned_url,
            trust_score: self.trust_score,
            threat_level: self.threat_level,
            is_threat: self.is_threat,
            scan_type: self.scan_type,
            scan_details: self.scan_details,
            created_at: self.created_at,
        }
    }
}

impl ScanRecord {
    pub fn verdict(&self) -> Result<Verdict, serde_json::Error> {
        serde_json::from_value(self.scan_details.clone())
    }

    pub fn is_fresh(&self, ttl: chrono::Duration, now: DateTime<Utc>) -> bool {
        self.created_at >= now - ttl
    }
}
