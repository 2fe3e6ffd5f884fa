use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolHealth {
    Healthy,
    Degraded,
    Error,
}

impl PoolHealth {
    /// Maps the ZFS `health` column. Anything not online is at least degraded.
    pub fn from_zfs(health: &str) -> Self {
        match health.to_ascii_uppercase().as_str() {
            "ONLINE" => PoolHealth::Healthy,
            "FAULTED" | "UNAVAIL" | "REMOVED" => PoolHealth::Error,
            _ => PoolHealth::Degraded,
        }
    }
}

/// A ZFS pool. Sizes are TiB with two decimals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoragePool {
    pub name: String,
    pub used: f64,
    pub total: f64,
    pub status: PoolHealth,
    #[serde(rename = "type")]
    pub kind: String,
}

impl StoragePool {
    pub fn demo() -> Vec<StoragePool> {
        let pool = |name: &str, used, total, kind: &str| StoragePool {
            name: name.to_string(),
            used,
            total,
            status: PoolHealth::Healthy,
            kind: kind.to_string(),
        };

        vec![
            pool("TANK", 14.2, 27.3, "media/docker"),
            pool("COLD", 8.5, 14.5, "backup/archive"),
        ]
    }
}
