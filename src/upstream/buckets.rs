//! Reduces an object listing to the one row the backups widget shows.
//!
//! Object stores have no notion of a backup job, so the newest upload stands
//! in for the last run and the summed object sizes for the backup size.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;

use crate::models::backup::{BackupInfo, BackupStatus};
use crate::upstream::format_bytes;

/// A target whose newest object is older than this is reported as failed.
pub const STALE_AFTER_HOURS: i64 = 48;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketSummary {
    pub objects: usize,
    pub total_bytes: i64,
    pub latest: Option<DateTime<Utc>>,
}

impl BucketSummary {
    pub fn record(&mut self, size: i64, uploaded_at: Option<DateTime<Utc>>) {
        self.objects += 1;
        self.total_bytes += size.max(0);
        if let Some(at) = uploaded_at {
            self.latest = Some(self.latest.map_or(at, |latest| latest.max(at)));
        }
    }

    pub fn to_backup_info(&self, name: &str, now: DateTime<Utc>, tz: Tz) -> BackupInfo {
        let fresh = self
            .latest
            .is_some_and(|latest| now - latest <= Duration::hours(STALE_AFTER_HOURS));

        BackupInfo {
            name: name.to_string(),
            last_run: self
                .latest
                .map(|at| at.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "never".to_string()),
            status: if fresh {
                BackupStatus::Success
            } else {
                BackupStatus::Failed
            },
            size: format_bytes(self.total_bytes),
            is_running: false,
            progress: 0,
        }
    }
}
