//! Server configuration from command-line flags and environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use allowlist_stages::DEFAULT_STAGES_DIR;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "allowlist-proof-server")]
#[command(about = "Serve allow-list Merkle proofs per sale stage", long_about = None)]
pub struct Config {
    /// Directory holding one <stage>.json per stage
    #[arg(long, env = "ALLOWLIST_STAGES_DIR", default_value = DEFAULT_STAGES_DIR)]
    pub stages_dir: PathBuf,

    /// Address to listen on
    #[arg(long, env = "ALLOWLIST_BIND", default_value = "0.0.0.0:3001")]
    pub bind: SocketAddr,

    /// Load and validate every stage before accepting requests
    #[arg(long, env = "ALLOWLIST_PRELOAD")]
    pub preload: bool,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["allowlist-proof-server"]).unwrap();

        assert_eq!(config.stages_dir, PathBuf::from("stages"));
        assert_eq!(config.bind.port(), 3001);
        assert!(!config.preload);
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "allowlist-proof-server",
            "--stages-dir",
            "/srv/stages",
            "--bind",
            "127.0.0.1:8080",
            "--preload",
        ])
        .unwrap();

        assert_eq!(config.stages_dir, PathBuf::from("/srv/stages"));
        assert_eq!(config.bind, "127.0.0.1:8080".parse().unwrap());
        assert!(config.preload);
    }
}
