use anyhow::{Context, Result, anyhow};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const DEFAULT_CONFIG_PATH: &str = "/etc/cliptube-env";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DATABASE_FILE: &str = "cliptube.db";

/// Raw key/value pairs as read from the env file; everything optional.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub data_root: Option<PathBuf>,
    pub media_root: Option<PathBuf>,
    pub public_base_url: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
}

/// Fully resolved configuration the backend starts with.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub data_root: PathBuf,
    pub media_root: PathBuf,
    /// Prefix prepended to media URLs; empty means host-relative URLs.
    pub public_base_url: String,
    pub host: String,
    pub port: u16,
}

impl RuntimeConfig {
    pub fn db_path(&self) -> PathBuf {
        self.data_root.join(DATABASE_FILE)
    }
}

pub fn read_env_config(path: &Path) -> Result<Option<EnvConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    let mut cfg = EnvConfig::default();
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        if let Some((key, value_raw)) = trimmed.split_once('=') {
            let value = value_raw.trim().trim_matches('"');
            match key {
                "DATA_ROOT" => cfg.data_root = Some(PathBuf::from(value)),
                "MEDIA_ROOT" => cfg.media_root = Some(PathBuf::from(value)),
                "PUBLIC_BASE_URL" => {
                    if !value.is_empty() {
                        cfg.public_base_url = Some(value.to_string());
                    }
                }
                "CLIPTUBE_PORT" => {
                    let port: u16 = value.parse().with_context(|| {
                        format!("Parsing CLIPTUBE_PORT from {}", path.display())
                    })?;
                    cfg.port = Some(port);
                }
                "CLIPTUBE_HOST" => {
                    if !value.is_empty() {
                        cfg.host = Some(value.to_string());
                    }
                }
                _ => {}
            }
        }
    }
    Ok(Some(cfg))
}

pub fn load_runtime_config() -> Result<RuntimeConfig> {
    load_runtime_config_from(Path::new(DEFAULT_CONFIG_PATH))
}

pub fn load_runtime_config_from(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    let path = path.as_ref();
    let cfg = read_env_config(path)?
        .ok_or_else(|| anyhow!("Missing config file at {}", path.display()))?;
    let data_root = cfg
        .data_root
        .ok_or_else(|| anyhow!("DATA_ROOT not set in {}", path.display()))?;
    let media_root = cfg
        .media_root
        .ok_or_else(|| anyhow!("MEDIA_ROOT not set in {}", path.display()))?;
    Ok(RuntimeConfig {
        data_root,
        media_root,
        public_base_url: cfg.public_base_url.unwrap_or_default(),
        host: cfg.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: cfg.port.unwrap_or(DEFAULT_PORT),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn make_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", contents).unwrap();
        file
    }

    #[test]
    fn read_env_config_extracts_port() {
        let cfg = make_config(
            "DATA_ROOT=\"/var/lib/cliptube\"\nMEDIA_ROOT=\"/srv/media\"\nCLIPTUBE_PORT=\"4242\"\n",
        );
        let parsed = read_env_config(cfg.path()).unwrap().unwrap();
        assert_eq!(parsed.port, Some(4242));
    }

    #[test]
    fn load_runtime_config_defaults_optional_keys() {
        let cfg = make_config("DATA_ROOT=\"/d\"\nMEDIA_ROOT=\"/m\"\n");
        let runtime = load_runtime_config_from(cfg.path()).unwrap();
        assert_eq!(runtime.port, DEFAULT_PORT);
        assert_eq!(runtime.host, DEFAULT_HOST);
        assert_eq!(runtime.public_base_url, "");
        assert_eq!(runtime.db_path(), PathBuf::from("/d").join(DATABASE_FILE));
    }

    #[test]
    fn load_runtime_config_requires_data_root() {
        let cfg = make_config("MEDIA_ROOT=\"/m\"\n");
        assert!(load_runtime_config_from(cfg.path()).is_err());
    }

    #[test]
    fn load_runtime_config_reads_host_and_base_url() {
        let cfg = make_config(
            "DATA_ROOT=\"/d\"\nMEDIA_ROOT=\"/m\"\nCLIPTUBE_HOST=\"0.0.0.0\"\nPUBLIC_BASE_URL=\"https://tube.example\"\n",
        );
        let runtime = load_runtime_config_from(cfg.path()).unwrap();
        assert_eq!(runtime.host, "0.0.0.0");
        assert_eq!(runtime.public_base_url, "https://tube.example");
    }
}
