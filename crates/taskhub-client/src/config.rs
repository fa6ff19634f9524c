use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Client connection settings. Any failure to read or parse the config file
/// falls back to the built-in `localhost:65432` default, so the client
/// always starts.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ClientConfig {
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    fn load_from(path: &Path) -> Self {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|contents| toml::from_str(&contents).ok())
            .unwrap_or_default()
    }

    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("TASKHUB_CONFIG") {
            return PathBuf::from(path);
        }
        dirs_path().join("client.toml")
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn dirs_path() -> PathBuf {
    if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
        PathBuf::from(config_dir).join("taskhub")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".config").join("taskhub")
    } else {
        PathBuf::from("/tmp/taskhub")
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    65432
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = ClientConfig::load_from(&dir.path().join("client.toml"));
        assert_eq!(cfg, ClientConfig::default());
        assert_eq!(cfg.addr(), "localhost:65432");
    }

    #[test]
    fn reads_host_and_port() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "host = \"tasks.example.org\"\nport = 7000\n").unwrap();
        let cfg = ClientConfig::load_from(&path);
        assert_eq!(cfg.addr(), "tasks.example.org:7000");
    }

    #[test]
    fn partial_config_keeps_defaults_for_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "host = \"tasks.example.org\"\n").unwrap();
        let cfg = ClientConfig::load_from(&path);
        assert_eq!(cfg.host, "tasks.example.org");
        assert_eq!(cfg.port, 65432);
    }

    #[test]
    fn malformed_file_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(&path, "host = [not toml").unwrap();
        assert_eq!(ClientConfig::load_from(&path), ClientConfig::default());
    }
}
