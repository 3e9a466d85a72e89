use clap::Parser;
use std::collections::HashMap;
use std::io::{Error, ErrorKind, Result};
use std::path::{Path, PathBuf};
use std::{env, fs};

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BIND: &str = "0.0.0.0";
const DEFAULT_WORKER_COUNT: usize = 4;
const DEFAULT_STATIC_DIR: &str = "public";
const DEFAULT_UPSTREAM_BASE_URL: &str = "verification.didit.me";
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ENV_FILE: &str = ".env";

#[derive(Parser, Debug, Default)]
#[command(name = "verification_gateway")]
#[command(about = "Static front-end host and key-injecting proxy for the verification API")]
pub struct CliArgs {
    /// Port to listen on
    #[arg(long)]
    pub port: Option<u16>,

    /// Address to bind
    #[arg(long)]
    pub bind: Option<String>,

    /// HTTP worker count
    #[arg(long)]
    pub workers: Option<usize>,

    /// Document root for static files
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Env file with KEY=VALUE lines
    #[arg(long)]
    pub env_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub port: u16,
    pub worker_count: usize,
    pub static_dir: PathBuf,
    pub upstream_base_url: String,
    pub api_key: String,
    pub workflow_id: Option<String>,
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn load(args: &CliArgs) -> Result<Config> {
        let env_file = args
            .env_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_FILE));
        let vars = EnvSource::load(&env_file);

        // The proxy is useless without the secret key, so refuse to start.
        let api_key = vars.get("API_KEY").ok_or_else(|| {
            Error::new(
                ErrorKind::InvalidInput,
                "API_KEY is not set; provide it via the environment or the env file",
            )
        })?;

        let port = args.port.unwrap_or_else(|| {
            vars.get("PORT")
                .map_or(DEFAULT_PORT, |v| v.parse::<u16>().unwrap_or(DEFAULT_PORT))
        });
        let bind = args
            .bind
            .clone()
            .or_else(|| vars.get("HTTP_BIND"))
            .unwrap_or_else(|| DEFAULT_BIND.into());
        let worker_count = args.workers.unwrap_or_else(|| {
            vars.get("HTTP_WORKER_COUNT").map_or(DEFAULT_WORKER_COUNT, |v| {
                v.parse::<usize>().unwrap_or(DEFAULT_WORKER_COUNT)
            })
        });
        let static_dir = args
            .static_dir
            .clone()
            .or_else(|| vars.get("STATIC_DIR").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        let upstream_base_url = vars
            .get("VERIFICATION_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_BASE_URL.into());
        let upstream_timeout_secs = vars.get("UPSTREAM_TIMEOUT_SECS").map_or(
            DEFAULT_UPSTREAM_TIMEOUT_SECS,
            |v| v.parse::<u64>().unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
        );
        let workflow_id = vars.get("WORKFLOW_ID");

        Ok(Config {
            bind,
            port,
            worker_count,
            static_dir,
            upstream_base_url,
            api_key,
            workflow_id,
            upstream_timeout_secs,
        })
    }
}

/// Variables from an optional env file, consulted only when the process
/// environment does not already define the key.
struct EnvSource {
    file_vars: HashMap<String, String>,
}

impl EnvSource {
    fn load(env_file: &Path) -> EnvSource {
        // A missing env file is not an error.
        let file_vars = match fs::read_to_string(env_file) {
            Ok(content) => parse_env_lines(&content),
            Err(_) => HashMap::new(),
        };

        EnvSource { file_vars }
    }

    fn get(&self, key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .or_else(|| self.file_vars.get(key).cloned())
    }
}

fn parse_env_lines(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in content.lines() {
        // Split on the first '=' only; values may contain '='.
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        vars.insert(key.to_string(), value.trim().to_string());
    }

    vars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_key_value_lines() {
        let vars = parse_env_lines("API_KEY=secret\nWORKFLOW_ID = wf-1 \n");

        assert_eq!(vars.get("API_KEY").map(String::as_str), Some("secret"));
        assert_eq!(vars.get("WORKFLOW_ID").map(String::as_str), Some("wf-1"));
    }

    #[test]
    fn value_may_contain_equals() {
        let vars = parse_env_lines("API_KEY=abc==def=g");

        assert_eq!(vars.get("API_KEY").map(String::as_str), Some("abc==def=g"));
    }

    #[test]
    fn skips_malformed_lines() {
        let vars = parse_env_lines("no separator here\n=orphan value\n\nPORT=3000");

        assert_eq!(vars.len(), 1);
        assert_eq!(vars.get("PORT").map(String::as_str), Some("3000"));
    }

    #[test]
    fn process_environment_wins_over_file() {
        env::set_var("GATEWAY_TEST_PRECEDENCE", "from-env");
        let source = EnvSource {
            file_vars: parse_env_lines("GATEWAY_TEST_PRECEDENCE=from-file\nONLY_IN_FILE=yes"),
        };

        assert_eq!(
            source.get("GATEWAY_TEST_PRECEDENCE").as_deref(),
            Some("from-env")
        );
        assert_eq!(source.get("ONLY_IN_FILE").as_deref(), Some("yes"));
        assert_eq!(source.get("IN_NEITHER_PLACE"), None);

        env::remove_var("GATEWAY_TEST_PRECEDENCE");
    }

    #[test]
    fn missing_api_key_fails_startup() {
        env::remove_var("API_KEY");
        let args = CliArgs {
            env_file: Some(PathBuf::from("/nonexistent/.env")),
            ..CliArgs::default()
        };

        let result = Config::load(&args);

        assert!(result.is_err());
        assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn env_file_populates_config() {
        let dir = env::temp_dir().join(format!("gateway-cfg-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let env_file = dir.join("test.env");
        fs::write(
            &env_file,
            "API_KEY=file-key\nWORKFLOW_ID=wf-file\nUPSTREAM_TIMEOUT_SECS=5\n",
        )
        .unwrap();

        let args = CliArgs {
            port: Some(4000),
            env_file: Some(env_file),
            ..CliArgs::default()
        };
        let config = Config::load(&args).unwrap();

        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.workflow_id.as_deref(), Some("wf-file"));
        assert_eq!(config.upstream_timeout_secs, 5);
        assert_eq!(config.port, 4000);
        assert_eq!(config.bind, DEFAULT_BIND);
    }
}
