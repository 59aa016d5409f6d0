use std::path::PathBuf;
use std::{fs::File, io::Read};

use serde::Deserialize;

/// Address used when neither the command line nor the config file names one
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub server: Server,
}

/// Server configuration
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub address: Option<String>,
    pub tls: Option<Tls>,
}

/// PEM encoded certificate chain and private key to serve TLS with
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Tls {
    pub cert: PathBuf,
    pub key: PathBuf,
}

impl Config {
    pub fn parse(path: &str) -> Result<Self, anyhow::Error> {
        let mut file = File::open(path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, anyhow::Error> {
        // An empty document deserializes to `()`, not an empty map
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let config = serde_yaml::from_str::<'_, Config>(contents)?;

        Ok(config)
    }

    /// Resolves the listen address. An explicit command line value wins over
    /// the file, which wins over [`DEFAULT_ADDRESS`].
    pub fn listen_address(&self, cli: Option<&str>) -> String {
        cli.or(self.server.address.as_deref())
            .unwrap_or(DEFAULT_ADDRESS)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_config() {
        let config = Config::from_yaml(
            r#"
        server:
            address: '127.0.0.1:9000'
            tls:
                cert: /etc/eventsink/cert.pem
                key: /etc/eventsink/key.pem
        "#,
        )
        .unwrap();

        assert_eq!(config.server.address.as_deref(), Some("127.0.0.1:9000"));
        assert_eq!(
            config.server.tls,
            Some(Tls {
                cert: "/etc/eventsink/cert.pem".into(),
                key: "/etc/eventsink/key.pem".into(),
            })
        );
    }

    #[test]
    fn test_sections_are_optional() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("server: {}").unwrap(), Config::default());
        assert_eq!(Config::from_yaml("{}").unwrap(), Config::default());
    }

    #[test]
    fn test_invalid_config() {
        assert!(Config::from_yaml("server: [1, 2]").is_err());
        assert!(Config::from_yaml("server:\n  tls:\n    cert: only-cert.pem").is_err());
    }

    #[test]
    fn test_listen_address_precedence() {
        let config = Config::default();
        assert_eq!(config.listen_address(None), DEFAULT_ADDRESS);
        assert_eq!(config.listen_address(Some("127.0.0.1:1")), "127.0.0.1:1");

        let config = Config::from_yaml("server:\n  address: '127.0.0.1:2'").unwrap();
        assert_eq!(config.listen_address(None), "127.0.0.1:2");
        assert_eq!(config.listen_address(Some("127.0.0.1:1")), "127.0.0.1:1");
    }
}
