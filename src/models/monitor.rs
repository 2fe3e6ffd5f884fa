use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: i64,
    pub name: String,
    pub status: bool,
    pub uptime: f64,
    pub response_time: f64,
}

impl Monitor {
    fn new(id: i64, name: &str, status: bool, uptime: f64, response_time: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            status,
            uptime,
            response_time,
        }
    }

    pub fn demo() -> Vec<Monitor> {
        vec![
            Monitor::new(1, "Jellyfin", true, 99.9, 45.0),
            Monitor::new(2, "Sonarr", true, 99.8, 32.0),
            Monitor::new(3, "Radarr", true, 99.9, 28.0),
            Monitor::new(4, "Ollama", true, 98.5, 120.0),
            Monitor::new(5, "ComfyUI", false, 0.0, 0.0),
            Monitor::new(6, "n8n", true, 99.9, 35.0),
            Monitor::new(7, "Portainer", true, 100.0, 22.0),
            Monitor::new(8, "AdGuard", true, 100.0, 15.0),
            Monitor::new(9, "Prowlarr", true, 99.7, 40.0),
            Monitor::new(10, "Bazarr", true, 99.8, 38.0),
            Monitor::new(11, "qBittorrent", true, 99.5, 25.0),
            Monitor::new(12, "Jellyseerr", true, 99.9, 30.0),
            Monitor::new(13, "FreshRSS", true, 99.8, 42.0),
            Monitor::new(14, "Uptime Kuma", true, 100.0, 12.0),
            Monitor::new(15, "Beszel", true, 99.9, 18.0),
            Monitor::new(16, "Dawarich", true, 99.5, 55.0),
            Monitor::new(17, "Blinko", true, 99.9, 20.0),
            Monitor::new(18, "Forgejo", true, 99.8, 35.0),
            Monitor::new(19, "Open WebUI", true, 99.7, 48.0),
            Monitor::new(20, "Dozzle", true, 100.0, 15.0),
            Monitor::new(21, "Syncthing", true, 99.9, 22.0),
            Monitor::new(22, "MT Photos", true, 99.8, 85.0),
            Monitor::new(23, "Reactive Resume", true, 99.5, 40.0),
        ]
    }
}
