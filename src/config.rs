use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;

/// Local storage key holding the anonymous visitor's question counter.
pub const ANONYMOUS_COUNT_KEY: &str = "anonymousQuestionsCount";

/// Name of the private cookie carrying the session token.
pub const SESSION_COOKIE: &str = "zaki_session";

/// Optional configuration file, looked up in the working directory.
pub const CONFIG_FILE: &str = "config.toml";

pub static CONFIG: LazyLock<Config> = LazyLock::new(|| {
    Config::load().expect("FATAL: failed to load configuration (config.toml / ZAKI_* env)")
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub basic: BasicConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicConfig {
    pub listen_addr: String,
    pub database_url: String,
    pub loglevel: String,
    /// Bearer key guarding the administrative endpoints. Empty disables them.
    pub admin_key: String,
    /// Base64 encoded key (>= 64 bytes) for the private session cookie.
    /// A random key is generated when absent, so sessions do not survive restarts.
    pub cookie_secret: Option<String>,
    pub insecure_cookie: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub session_ttl_hours: u64,
    pub reset_ttl_minutes: u64,
    pub min_password_len: usize,
    /// Sign-in and reset attempts allowed per email per minute.
    pub attempts_per_minute: u32,
    /// Page that completes a password reset; the token is appended as `?token=`.
    pub reset_url: String,
}

impl Default for BasicConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8000".to_string(),
            database_url: "sqlite://zaki.sqlite".to_string(),
            loglevel: "info".to_string(),
            admin_key: String::new(),
            cookie_secret: None,
            insecure_cookie: false,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: 24 * 7,
            reset_ttl_minutes: 30,
            min_password_len: 6,
            attempts_per_minute: 10,
            reset_url: "http://localhost:8000/reset-password".to_string(),
        }
    }
}

impl Config {
    /// Defaults, then `config.toml`, then `ZAKI_*` environment variables.
    /// Nested keys use a double underscore: `ZAKI_BASIC__LISTEN_ADDR`.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::prefixed("ZAKI_").split("__"))
    }
}

impl AuthConfig {
    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_hours * 3600)
    }

    pub fn reset_ttl(&self) -> Duration {
        Duration::from_secs(self.reset_ttl_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn env_overrides_toml_and_defaults() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [basic]
                listen_addr = "127.0.0.1:9000"
                admin_key = "from-file"

                [auth]
                min_password_len = 10
                "#,
            )?;
            jail.set_env("ZAKI_BASIC__ADMIN_KEY", "from-env");

            let cfg = Config::load()?;
            assert_eq!(cfg.basic.listen_addr, "127.0.0.1:9000");
            assert_eq!(cfg.basic.admin_key, "from-env");
            assert_eq!(cfg.auth.min_password_len, 10);
            assert_eq!(cfg.auth.attempts_per_minute, 10);
            Ok(())
        });
    }
}
