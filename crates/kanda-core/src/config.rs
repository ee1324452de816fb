#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_dir: String,
    /// Local MaxMind/DB-IP City database; preferred over the HTTP lookup when
    /// the file exists.
    pub geoip_path: String,
    /// Base URL of the ip-api.com style JSON lookup. Empty disables it.
    pub geo_api_url: String,
    pub auth_mode: AuthMode,
    pub https: bool,
    pub cors_origins: Vec<String>,
    pub session_hours: u32,
    /// The site's own hostname, used to classify internal referrers.
    pub site_host: Option<String>,
    pub argon2_memory_kb: u32,
    pub duckdb_memory_limit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthMode {
    /// Admin routes are open. Development and tests only.
    None,
    /// Email + password login against the `admins` table.
    Local,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        Ok(Self {
            port: std::env::var("KANDA_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .map_err(|e| format!("invalid port: {e}"))?,
            data_dir: std::env::var("KANDA_DATA_DIR").unwrap_or_else(|_| "./data".to_string()),
            geoip_path: std::env::var("KANDA_GEOIP_PATH")
                .unwrap_or_else(|_| "./GeoLite2-City.mmdb".to_string()),
            geo_api_url: std::env::var("KANDA_GEO_API_URL")
                .unwrap_or_else(|_| "http://ip-api.com/json".to_string()),
            auth_mode: {
                let raw = std::env::var("KANDA_AUTH").unwrap_or_else(|_| "local".to_string());
                match raw.as_str() {
                    "none" => AuthMode::None,
                    "local" => AuthMode::Local,
                    other => return Err(format!("invalid KANDA_AUTH: {other}")),
                }
            },
            https: std::env::var("KANDA_HTTPS")
                .map(|v| v == "true")
                .unwrap_or(true),
            cors_origins: std::env::var("KANDA_CORS_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            session_hours: std::env::var("KANDA_SESSION_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .unwrap_or(24),
            site_host: std::env::var("KANDA_SITE_HOST")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            argon2_memory_kb: std::env::var("KANDA_ARGON2_MEMORY_KB")
                .unwrap_or_else(|_| "65536".to_string())
                .parse()
                .unwrap_or(65536),
            duckdb_memory_limit: std::env::var("KANDA_DUCKDB_MEMORY")
                .unwrap_or_else(|_| "1GB".to_string()),
        })
    }

    pub fn session_max_age_secs(&self) -> u64 {
        u64::from(self.session_hours) * 3600
    }
}
