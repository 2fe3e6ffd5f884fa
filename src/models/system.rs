use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemStatus {
    Online,
    Offline,
}

/// Host metrics as shown on the system overview widget. Temperatures in °C.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub id: String,
    pub name: String,
    pub status: SystemStatus,
    pub cpu: i64,
    pub memory: i64,
    pub temp: Option<i64>,
    pub gpu_load: Option<f64>,
    pub gpu_temp: Option<i64>,
}

impl SystemStats {
    pub fn demo() -> Vec<SystemStats> {
        let host = |id: &str, name: &str, cpu, memory, temp, gpu_load, gpu_temp| SystemStats {
            id: id.to_string(),
            name: name.to_string(),
            status: SystemStatus::Online,
            cpu,
            memory,
            temp,
            gpu_load,
            gpu_temp,
        };

        vec![
            host("pve-main", "PVE", 68, 82, Some(52), None, None),
            host("fnos", "fnOS", 15, 45, Some(38), None, None),
            host("rtx4090", "4090-PC", 23, 45, Some(38), Some(12.0), Some(45)),
        ]
    }
}
