use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";
pub const BASE_URL_ENV: &str = "POLIS_API_BASE_URL";

#[derive(Parser, Debug)]
#[command(name = "polis", about = "Client for the Political App social network")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Backend API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in with email and password
    Login { email: String, password: String },
    /// Create a new account
    Register {
        username: String,
        email: String,
        password: String,
    },
    /// Log out and clear the stored session
    Logout,
    /// Show the stored session
    Whoami,
    /// Re-fetch the current user and update the session
    Refresh,
    /// Show a user's profile, follow counts and posts
    Profile { username: String },
    /// Search users
    Search { query: String },
    /// Follow a user by id
    Follow { user_id: i64 },
    /// Unfollow a user by id
    Unfollow { user_id: i64 },
    /// List a user's followers
    Followers {
        user_id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List the users a user follows
    Following {
        user_id: i64,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// List communities
    Communities,
    /// Show a community and its posts
    Community { id: String },
    /// Join a community
    Join { id: String },
    /// Leave a community
    Leave { id: String },
    /// List a user's posts
    Posts { user_id: i64 },
    /// Like or unlike a post
    Like { post_id: i64 },
    /// Change the current username
    SetUsername { username: String },
    /// Update display name, bio or profile image
    UpdateProfile {
        #[arg(long)]
        display_name: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Request timeout; unset means the transport default.
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
    /// Optional second tier consulted when the primary holds no token.
    pub fallback: Option<StorageBackend>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SessionConfig {
    pub placeholder_username: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: None,
            user_agent: format!("polis/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: None,
            fallback: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            placeholder_username: "User".to_string(),
        }
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(cli, std::env::var(BASE_URL_ENV).ok());

        if config.storage.path.is_none() {
            config.storage.path = Some(data_dir.join("polis.db"));
        }

        Ok(config)
    }

    /// Environment beats the file, the CLI flag beats both.
    pub fn apply_overrides(&mut self, cli: &Cli, env_base_url: Option<String>) {
        if let Some(url) = env_base_url.filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url;
        }
        if let Some(ref url) = cli.api_url {
            self.api.base_url = url.clone();
        }
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".polis")
        })
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from("polis.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(data_dir: Option<PathBuf>, config: Option<PathBuf>, api_url: Option<&str>) -> Cli {
        Cli {
            config,
            data_dir,
            api_url: api_url.map(str::to_string),
            command: Command::Whoami,
        }
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:8080/api");
        assert!(config.api.timeout_secs.is_none());
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!(config.storage.fallback.is_none());
        assert_eq!(config.session.placeholder_username, "User");
    }

    #[test]
    fn data_dir_uses_cli_override() {
        let cli = cli(Some(PathBuf::from("/tmp/test-polis")), None, None);
        assert_eq!(Config::data_dir(&cli), PathBuf::from("/tmp/test-polis"));
    }

    #[test]
    fn data_dir_defaults_to_home_dot_polis() {
        let dir = Config::data_dir(&cli(None, None, None));
        assert!(dir.ends_with(".polis"));
    }

    #[test]
    fn load_with_no_config_file_resolves_db_path() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load(&cli(Some(tmp.path().to_path_buf()), None, Some("http://x/api")))
            .unwrap();
        assert_eq!(config.db_path(), tmp.path().join("polis.db"));
        assert_eq!(config.api.base_url, "http://x/api");
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        let config_path = tmp.path().join("config.toml");
        std::fs::write(
            &config_path,
            r#"
[api]
base_url = "https://political.example/api"
timeout_secs = 10

[storage]
backend = "memory"
fallback = "memory"

[session]
placeholder_username = "Guest"
"#,
        )
        .unwrap();

        let mut config: Config =
            toml::from_str(&std::fs::read_to_string(&config_path).unwrap()).unwrap();
        config.apply_overrides(&cli(None, Some(config_path), None), None);
        assert_eq!(config.api.base_url, "https://political.example/api");
        assert_eq!(config.api.timeout_secs, Some(10));
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(config.storage.fallback, Some(StorageBackend::Memory));
        assert_eq!(config.session.placeholder_username, "Guest");
    }

    #[test]
    fn env_overrides_file_and_cli_overrides_env() {
        let mut config = Config::default();
        config.apply_overrides(&cli(None, None, None), Some("http://env/api".into()));
        assert_eq!(config.api.base_url, "http://env/api");

        config.apply_overrides(&cli(None, None, Some("http://flag/api")), Some("http://env/api".into()));
        assert_eq!(config.api.base_url, "http://flag/api");
    }

    #[test]
    fn blank_env_value_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(&cli(None, None, None), Some("  ".into()));
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
    }
}
