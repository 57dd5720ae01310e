use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
    pub config_path: PathBuf,
}

impl Config {
    /// Defaults, then `.pipbotrc`, then the environment (a `.env` file counts as environment).
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        let mut cfg = Self::from_file(default_config_path());

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                cfg.inner.insert(k, v);
            }
        }

        cfg
    }

    /// Defaults overlaid with `KEY=VALUE` lines from `config_path`, if it exists.
    pub fn from_file(config_path: PathBuf) -> Self {
        let mut map = default_map();
        if let Ok(file) = fs::File::open(&config_path) {
            let reader = BufReader::new(file);
            for line in reader.lines().map_while(Result::ok) {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                if let Some((k, v)) = line.split_once('=') {
                    map.insert(k.trim().to_string(), v.trim().to_string());
                }
            }
        }
        Self { inner: map, config_path }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key).filter(|v| !v.trim().is_empty()).map(PathBuf::from)
    }

    pub fn duration_secs(&self, key: &str, default: u64) -> Duration {
        Duration::from_secs(self.get_u64(key).unwrap_or(default))
    }

    /// Bot token; blank values count as missing.
    pub fn bot_token(&self) -> Option<String> {
        self.get("TELEGRAM_BOT_TOKEN").filter(|t| !t.trim().is_empty())
    }

    pub fn python_bin(&self) -> String {
        self.get("PYTHON_BIN")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "python3".into())
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.get_path("STAGING_DIR").unwrap_or_else(env::temp_dir)
    }

    pub fn requirements_path(&self) -> PathBuf {
        self.get_path("REQUIREMENTS_PATH")
            .unwrap_or_else(|| PathBuf::from("requirements.txt"))
    }

    pub fn exec_timeout(&self) -> Duration {
        self.duration_secs("EXEC_TIMEOUT", 60)
    }
}

fn is_config_key(k: &str) -> bool {
    // Accept known keys or PIPBOT_* for forward-compat
    const KEYS: &[&str] = &[
        "TELEGRAM_BOT_TOKEN",
        "TELEGRAM_API_BASE",
        "POLL_TIMEOUT",
        "REQUEST_TIMEOUT",
        "PYTHON_BIN",
        "STAGING_DIR",
        "REQUIREMENTS_PATH",
        "EXEC_TIMEOUT",
        "INSTALL_TIMEOUT",
        "UNINSTALL_TIMEOUT",
        "UPDATE_TIMEOUT",
        "QUERY_TIMEOUT",
    ];

    KEYS.contains(&k) || k.starts_with("PIPBOT_")
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("pipbot").join(".pipbotrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    m.insert("TELEGRAM_API_BASE".into(), "https://api.telegram.org".into());
    m.insert("PYTHON_BIN".into(), "python3".into());
    m.insert("REQUIREMENTS_PATH".into(), "requirements.txt".into());
    m.insert(
        "STAGING_DIR".into(),
        env::temp_dir().to_string_lossy().into_owned(),
    );

    // Seconds
    m.insert("POLL_TIMEOUT".into(), "30".into());
    m.insert("REQUEST_TIMEOUT".into(), "60".into());
    m.insert("EXEC_TIMEOUT".into(), "60".into());
    m.insert("INSTALL_TIMEOUT".into(), "300".into());
    m.insert("UNINSTALL_TIMEOUT".into(), "60".into());
    m.insert("UPDATE_TIMEOUT".into(), "300".into());
    m.insert("QUERY_TIMEOUT".into(), "60".into());

    m
}
