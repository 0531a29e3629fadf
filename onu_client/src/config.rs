use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use url::Url;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

/// 客户端配置，只有服务器地址一项
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub onu_url: Url,
}

impl Config {
    /// 读取 `ONU_CONFIG` 指定的文件，默认是当前目录下的 config.json
    pub fn load() -> anyhow::Result<Config> {
        let path = env::var_os("ONU_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
        Config::from_file(&path)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        Config::from_json(&text).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Config> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let config = Config::from_json(r#"{"onu_url": "https://onu.example.com"}"#).unwrap();
        assert_eq!(config.onu_url.as_str(), "https://onu.example.com/");
    }

    #[test]
    fn test_reject_bad_config() {
        assert!(Config::from_json(r#"{"onu_url": "not a url"}"#).is_err());
        assert!(Config::from_json(r#"{}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::from_file(Path::new("/definitely/not/here/config.json")).unwrap_err();
        assert!(err.to_string().contains("could not read config file"));
    }
}
