pub const DAWARICH_POINTS: &str = "/api/v1/points";
pub const DAWARICH_PAGE_SIZE: u32 = 1000;

pub const BLINKO_NOTE_LIST: &str = "/api/v1/note/list";
pub const BLINKO_NOTE_UPSERT: &str = "/api/v1/note/upsert";
pub const BLINKO_NOTE_DELETE: &str = "/api/v1/note/delete";

pub const COINGECKO_SIMPLE_PRICE: &str = "/simple/price";

pub const UPTIME_STATUS_PAGE: &str = "/api/status-page";
pub const UPTIME_METRICS: &str = "/metrics";

pub const BESZEL_AUTH: &str = "/api/collections/users/auth-with-password";
pub const BESZEL_SYSTEMS: &str = "/api/collections/systems/records";

pub const QBIT_LOGIN: &str = "/api/v2/auth/login";
pub const QBIT_TORRENTS: &str = "/api/v2/torrents/info";

pub const JELLYFIN_SESSIONS: &str = "/Sessions";

pub const OPEN_METEO_CURRENT_FIELDS: &str =
    "temperature_2m,apparent_temperature,weather_code,relative_humidity_2m,wind_speed_10m,is_day";
pub const IP_API_FIELDS: &str = "status,city,country,lat,lon,timezone";

pub const PVE_TICKET: &str = "/api2/json/access/ticket";
/// Followed by `/{node}/disks/zfs`.
pub const PVE_NODES: &str = "/api2/json/nodes";

pub const B2_AUTHORIZE: &str = "/b2api/v2/b2_authorize_account";
pub const B2_LIST_BUCKETS: &str = "/b2api/v2/b2_list_buckets";
pub const B2_LIST_FILE_NAMES: &str = "/b2api/v2/b2_list_file_names";
pub const B2_PAGE_SIZE: u32 = 1000;
