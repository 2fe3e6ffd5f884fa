use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupStatus {
    Success,
    Failed,
    Running,
}

/// One off-site backup target as shown on the backups widget.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupInfo {
    pub name: String,
    pub last_run: String,
    pub status: BackupStatus,
    pub size: String,
    pub is_running: bool,
    pub progress: u32,
}

impl BackupInfo {
    pub fn demo() -> Vec<BackupInfo> {
        let target = |name: &str, last_run: &str, size: &str| BackupInfo {
            name: name.to_string(),
            last_run: last_run.to_string(),
            status: BackupStatus::Success,
            size: size.to_string(),
            is_running: false,
            progress: 0,
        };

        vec![
            target("Backblaze B2", "2025-12-16 04:00", "138 GB"),
            target("AWS S3", "2025-12-15 02:00", "892 GB"),
        ]
    }
}
