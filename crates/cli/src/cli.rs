use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "beekon", about = "Operate the Beekon offline cache", version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// TOML configuration file (overrides BEEKON_SW_CONFIG_FILE)
    #[arg(short, long, global = true, env = "BEEKON_SW_CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a URL through the cache
    Fetch {
        /// Path (resolved against the origin) or absolute URL
        url: String,

        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Request header as "name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body
        #[arg(short, long)]
        data: Option<String>,

        /// Print the response body
        #[arg(short, long)]
        include_body: bool,
    },

    /// Precache the app shell, then evict old cache versions
    Install,

    /// Remove entries past their partition TTL
    Sweep,

    /// Clear one partition, or the whole cache
    Clear {
        /// static, api, images, metrics or pages
        partition: Option<String>,
    },

    /// Replay writes queued while offline
    Sync,

    /// Show counters, entries per partition and queued writes
    Stats,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_fetch() {
        let args = Args::try_parse_from([
            "beekon",
            "fetch",
            "/rest/v1/brands",
            "-X",
            "POST",
            "-H",
            "content-type: application/json",
            "-d",
            "{}",
        ])
        .unwrap();
        match args.command {
            Commands::Fetch { url, method, headers, data, include_body } => {
                assert_eq!(url, "/rest/v1/brands");
                assert_eq!(method, "POST");
                assert_eq!(headers, vec!["content-type: application/json".to_string()]);
                assert_eq!(data.as_deref(), Some("{}"));
                assert!(!include_body);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_clear_and_globals() {
        let args = Args::try_parse_from(["beekon", "clear", "metrics", "--json", "-c", "sw.toml"]).unwrap();
        assert!(args.json);
        assert_eq!(args.config, Some(PathBuf::from("sw.toml")));
        assert!(matches!(args.command, Commands::Clear { partition: Some(ref p) } if p == "metrics"));
    }

    #[test]
    fn test_fetch_requires_url() {
        assert!(Args::try_parse_from(["beekon", "fetch"]).is_err());
    }
}
