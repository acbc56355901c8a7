// Copyright 2021-2024 SecureDNA Stiftung (SecureDNA Foundation) <licensing@securedna.org>
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use clap::{crate_version, Parser};
use serde::Deserialize;

#[derive(Debug, Parser)]
#[clap(
    name = "turbo_demo",
    about = "Serves Turbo Stream responses rendered from a directory of partials",
    version = crate_version!()
)]
pub struct Opts {
    #[clap(
        long,
        env = "TURBO_DEMO_CFG_PATH",
        help = "The path to the server config TOML",
        exclusive = true
    )]
    pub cfg_path: Option<PathBuf>,

    #[clap(
        short,
        long,
        env = "TURBO_DEMO_PORT",
        help = "Address to listen on; if only a port is specified, all IPv4 addresses are used.",
        value_parser = parse_port_or_socket_addr,
        default_value = "8080"
    )]
    pub port: SocketAddr,

    #[clap(
        long,
        env = "TURBO_DEMO_MAX_CONNECTIONS",
        help = "Maximum simultaneous connections that may be accepted before the server returns 503.",
        default_value_t = Config::default_max_connections()
    )]
    pub max_connections: usize,

    #[clap(
        long,
        env = "TURBO_DEMO_PARTIALS_DIR",
        help = "Directory containing `<partial>.html` files",
        default_value = "views"
    )]
    pub partials_dir: PathBuf,
}

impl Opts {
    /// Resolve the effective [`Config`], reading the TOML file if one was given.
    pub async fn into_config(self) -> anyhow::Result<Config> {
        match self.cfg_path {
            Some(path) => Config::read(path).await,
            None => Ok(Config {
                address: self.port,
                max_connections: self.max_connections,
                partials_dir: self.partials_dir,
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "Config::default_address")]
    pub address: SocketAddr,
    #[serde(default = "Config::default_max_connections")]
    pub max_connections: usize,
    pub partials_dir: PathBuf,
}

impl Config {
    pub fn default_address() -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], 8080))
    }

    pub const fn default_max_connections() -> usize {
        1024
    }

    /// Read a TOML config; relative paths in it are relative to the file's directory.
    pub async fn read(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Couldn't open config TOML: {path:?}"))?;
        let config: Self =
            toml::from_str(&text).with_context(|| format!("Couldn't parse as TOML: {path:?}"))?;
        let parent_path = path.parent().unwrap_or(".".as_ref());
        Ok(config.relative_to(parent_path))
    }

    fn relative_to(mut self, base: &Path) -> Self {
        self.partials_dir = base.join(self.partials_dir);
        self
    }
}

fn parse_port_or_socket_addr(arg: &str) -> Result<SocketAddr, <SocketAddr as FromStr>::Err> {
    match u16::from_str(arg) {
        Ok(port) => Ok(SocketAddr::from(([0, 0, 0, 0], port))),
        Err(_) => SocketAddr::from_str(arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Opts {
        match Opts::try_parse_from(args) {
            Ok(x) => x,
            Err(err) => panic!("{err}"),
        }
    }

    #[tokio::test]
    async fn defaults() {
        let config = parse(&["turbo_demo"]).into_config().await.unwrap();
        assert_eq!(
            config,
            Config {
                address: "0.0.0.0:8080".parse().unwrap(),
                max_connections: 1024,
                partials_dir: "views".into(),
            }
        );
    }

    #[tokio::test]
    async fn accepts_addressless_port() {
        let config = parse(&["turbo_demo", "-p", "123", "--partials-dir", "/srv/views"])
            .into_config()
            .await
            .unwrap();
        assert_eq!(config.address, "0.0.0.0:123".parse().unwrap());
        assert_eq!(config.partials_dir, PathBuf::from("/srv/views"));
    }

    #[test]
    fn accepts_full_address() {
        let opts = parse(&["turbo_demo", "--port", "127.0.0.1:9000"]);
        assert_eq!(opts.port, "127.0.0.1:9000".parse().unwrap());
    }

    #[test]
    fn cfg_path_is_exclusive() {
        let result = Opts::try_parse_from(["turbo_demo", "--cfg-path", "a.toml", "-p", "1"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn reads_toml_relative_to_its_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turbo_demo.toml");
        std::fs::write(&path, "partials_dir = \"views\"\nmax_connections = 2\n").unwrap();

        let cfg_path = path.to_str().unwrap();
        let config = parse(&["turbo_demo", "--cfg-path", cfg_path])
            .into_config()
            .await
            .unwrap();
        assert_eq!(
            config,
            Config {
                address: Config::default_address(),
                max_connections: 2,
                partials_dir: dir.path().join("views"),
            }
        );
    }

    #[tokio::test]
    async fn rejects_unknown_toml_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("turbo_demo.toml");
        std::fs::write(&path, "partials_dir = \"views\"\nportt = 80\n").unwrap();
        let err = Config::read(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("Couldn't parse as TOML"));
    }
}
