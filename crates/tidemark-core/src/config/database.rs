use serde::{Deserialize, Serialize};

/// Database configuration.
///
/// Either `url` is set, or the connection is assembled from the individual
/// fields. Missing fields can be filled from the `PSQL_*` environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL. Takes precedence over the individual fields.
    #[serde(default)]
    pub url: String,

    pub host: Option<String>,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dbname: Option<String>,
    pub sslmode: Option<String>,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connection acquire timeout in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Server-side statement timeout in seconds. Unset means no limit.
    #[serde(default)]
    pub statement_timeout_secs: Option<u64>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            host: None,
            port: None,
            user: None,
            password: None,
            dbname: None,
            sslmode: None,
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            statement_timeout_secs: None,
        }
    }
}

fn default_pool_size() -> u32 {
    2
}

fn default_connect_timeout() -> u64 {
    30
}

impl DatabaseConfig {
    /// Whether enough is configured to attempt a connection.
    pub fn is_configured(&self) -> bool {
        !self.url.is_empty() || self.host.is_some()
    }

    /// Fill unset connection fields from `PSQL_HOST`, `PSQL_PORT`,
    /// `PSQL_USER`, `PSQL_PASSWORD`, `PSQL_DBNAME` and `PSQL_SSLMODE`.
    pub fn with_psql_env(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.host.is_none() {
            self.host = get("PSQL_HOST");
        }
        if self.port.is_none() {
            self.port = get("PSQL_PORT").and_then(|p| p.parse().ok());
        }
        if self.user.is_none() {
            self.user = get("PSQL_USER");
        }
        if self.password.is_none() {
            self.password = get("PSQL_PASSWORD");
        }
        if self.dbname.is_none() {
            self.dbname = get("PSQL_DBNAME");
        }
        if self.sslmode.is_none() {
            self.sslmode = get("PSQL_SSLMODE");
        }
        self
    }

    /// Connection target for log lines, without credentials.
    pub fn describe(&self) -> String {
        if !self.url.is_empty() {
            return redact_url(&self.url);
        }
        format!(
            "{}:{}/{}",
            self.host.as_deref().unwrap_or("localhost"),
            self.port.unwrap_or(5432),
            self.dbname.as_deref().unwrap_or("")
        )
    }
}

fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
