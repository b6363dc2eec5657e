use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use terrastore_core::{ClientConfig, HostPolicy};
use terrastore_rs::{CodecRegistry, TerrastoreClient, Values};

mod telemetry;

#[derive(Parser, Debug)]
#[command(name = "terrastore", about = "Command line client for Terrastore clusters")]
struct Cli {
    /// JSON client configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Server base URL, repeatable; several hosts enable failover ordering
    #[arg(long = "host")]
    hosts: Vec<String>,

    /// Debug logging for the client library
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cluster and node status
    Stats,
    /// List bucket names
    Buckets,
    Get {
        bucket: String,
        key: String,
        /// Only return the document if it satisfies this predicate
        #[arg(long)]
        predicate: Option<String>,
    },
    Put {
        bucket: String,
        key: String,
        /// Document as JSON
        value: String,
        /// Only store if the current document satisfies this predicate
        #[arg(long)]
        predicate: Option<String>,
    },
    Remove {
        bucket: String,
        key: String,
    },
    /// Remove every document in a bucket
    Clear {
        bucket: String,
    },
    Values {
        bucket: String,
        #[arg(long, default_value_t = 0)]
        limit: u32,
    },
    Range {
        bucket: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: Option<String>,
        #[arg(long)]
        comparator: Option<String>,
        #[arg(long)]
        predicate: Option<String>,
        #[arg(long, default_value_t = 0)]
        limit: u32,
        /// Milliseconds the server may reuse a cached result
        #[arg(long, default_value_t = 0)]
        time_to_live: u64,
        /// Remove the matching documents instead of returning them
        #[arg(long)]
        remove: bool,
    },
    Predicate {
        bucket: String,
        predicate: String,
    },
    /// Apply a server-side update function
    Update {
        bucket: String,
        key: String,
        function: String,
        /// Function parameters as a JSON object
        #[arg(long)]
        params: Option<String>,
        #[arg(long, default_value_t = 0)]
        timeout: u64,
    },
    /// Export a bucket to a server-side file
    Export {
        bucket: String,
        file: String,
        #[arg(long)]
        secret: String,
    },
    /// Import a bucket from a server-side file
    Import {
        bucket: String,
        file: String,
        #[arg(long)]
        secret: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let _guard = telemetry::init_telemetry(&config.logging, cli.verbose)?;

    tracing::debug!(hosts = ?config.hosts, policy = ?config.host_policy, "Connecting");
    let client = TerrastoreClient::from_config(&config, CodecRegistry::new())?;

    let output = run(&client, cli.command)?;
    if let Some(output) = output {
        println!("{}", output);
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<ClientConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let path = path.to_str().context("Config path is not valid UTF-8")?;
            ClientConfig::load(path)?
        }
        None => ClientConfig::default(),
    };

    if !cli.hosts.is_empty() {
        config.hosts = cli.hosts.clone();
        if config.hosts.len() > 1 {
            config.host_policy = HostPolicy::Ordered;
        }
    }
    config.validate()?;
    Ok(config)
}

fn parse_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("Invalid JSON: {}", text))
}

/// Pretty JSON straight from the value's serializer, so `Values` keep server order
fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Execute one command; `None` means there is nothing to print
fn run(client: &TerrastoreClient, command: Command) -> Result<Option<String>> {
    let output = match command {
        Command::Stats => Some(render(&client.stats().cluster()?)?),
        Command::Buckets => Some(render(&client.buckets().list()?)?),
        Command::Get {
            bucket,
            key,
            predicate,
        } => {
            let key = client.bucket(bucket).key(key);
            let value: Value = match predicate {
                Some(predicate) => key.conditional(predicate).get()?,
                None => key.get()?,
            };
            Some(render(&value)?)
        }
        Command::Put {
            bucket,
            key,
            value,
            predicate,
        } => {
            let value = parse_json(&value)?;
            let key = client.bucket(bucket).key(key);
            match predicate {
                Some(predicate) => key.conditional(predicate).put(&value)?,
                None => key.put(&value)?,
            }
            None
        }
        Command::Remove { bucket, key } => {
            client.bucket(bucket).key(key).remove()?;
            None
        }
        Command::Clear { bucket } => {
            client.bucket(bucket).clear()?;
            None
        }
        Command::Values { bucket, limit } => {
            let values: Values<Value> = client.bucket(bucket).values().limit(limit).get()?;
            Some(render(&values)?)
        }
        Command::Range {
            bucket,
            from,
            to,
            comparator,
            predicate,
            limit,
            time_to_live,
            remove,
        } => {
            let bucket = client.bucket(bucket);
            let mut range = match comparator {
                Some(comparator) => bucket.range_with_comparator(comparator),
                None => bucket.range(),
            }
            .from(from)
            .limit(limit)
            .time_to_live(time_to_live);
            if let Some(to) = to {
                range = range.to(to);
            }
            if let Some(predicate) = predicate {
                range = range.predicate(predicate);
            }

            if remove {
                Some(render(&range.remove()?)?)
            } else {
                let values: Values<Value> = range.get()?;
                Some(render(&values)?)
            }
        }
        Command::Predicate { bucket, predicate } => {
            let values: Values<Value> = client.bucket(bucket).predicate(predicate).get()?;
            Some(render(&values)?)
        }
        Command::Update {
            bucket,
            key,
            function,
            params,
            timeout,
        } => {
            let parameters: Map<String, Value> = match params {
                Some(params) => serde_json::from_str(&params)
                    .with_context(|| format!("Parameters must be a JSON object: {}", params))?,
                None => Map::new(),
            };
            let updated: Value = client
                .bucket(bucket)
                .key(key)
                .update(function)
                .parameters(parameters)
                .timeout(timeout)
                .execute_and_get()?;
            Some(render(&updated)?)
        }
        Command::Export {
            bucket,
            file,
            secret,
        } => {
            client
                .bucket(bucket)
                .backup()
                .file(file)
                .secret_key(secret)
                .execute_export()?;
            None
        }
        Command::Import {
            bucket,
            file,
            secret,
        } => {
            client
                .bucket(bucket)
                .backup()
                .file(file)
                .secret_key(secret)
                .execute_import()?;
            None
        }
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_host_flag() {
        let cli =
            Cli::try_parse_from(["terrastore", "--host", "http://a:8080", "buckets"]).unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.hosts, vec!["http://a:8080"]);
        assert_eq!(config.host_policy, HostPolicy::Single);
    }

    #[test]
    fn test_repeated_host_enables_ordering() {
        let cli = Cli::try_parse_from([
            "terrastore",
            "--host",
            "http://a:8080",
            "--host",
            "http://b:8080",
            "stats",
        ])
        .unwrap();
        let config = build_config(&cli).unwrap();
        assert_eq!(config.host_policy, HostPolicy::Ordered);
        assert_eq!(config.hosts.len(), 2);
    }

    #[test]
    fn test_range_arguments() {
        let cli = Cli::try_parse_from([
            "terrastore",
            "range",
            "customers",
            "--from",
            "a",
            "--to",
            "m",
            "--limit",
            "10",
            "--remove",
        ])
        .unwrap();
        match cli.command {
            Command::Range {
                bucket,
                from,
                to,
                limit,
                remove,
                time_to_live,
                ..
            } => {
                assert_eq!(bucket, "customers");
                assert_eq!(from, "a");
                assert_eq!(to.as_deref(), Some("m"));
                assert_eq!(limit, 10);
                assert_eq!(time_to_live, 0);
                assert!(remove);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_range_requires_from() {
        assert!(Cli::try_parse_from(["terrastore", "range", "customers"]).is_err());
    }

    #[test]
    fn test_export_requires_secret() {
        assert!(Cli::try_parse_from(["terrastore", "export", "customers", "c.bak"]).is_err());
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        assert!(parse_json("{not json").is_err());
        assert_eq!(parse_json(r#"{"a":1}"#).unwrap()["a"], 1);
    }

    #[test]
    fn test_render_keeps_server_order() {
        let values: Values<Value> = vec![
            ("b".to_string(), Value::from(1)),
            ("a".to_string(), Value::from(2)),
        ]
        .into_iter()
        .collect();
        assert_eq!(render(&values).unwrap(), "{\n  \"b\": 1,\n  \"a\": 2\n}");
    }

    #[test]
    fn test_render_key_set() {
        let keys: std::collections::BTreeSet<String> =
            ["b", "a"].into_iter().map(String::from).collect();
        assert_eq!(render(&keys).unwrap(), "[\n  \"a\",\n  \"b\"\n]");
    }
}
