//! keyviz CLI
//!
//! Command-line interface for keyviz operations:
//! - Fetch heatmaps from a running server
//! - List the table catalog
//! - Check server status
//! - Decode raw region keys offline

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use keyviz::codec::{KeyDecoder, TableKeyDecoder};
use keyviz::keyspace::Key;

#[derive(Parser)]
#[command(name = "keyviz-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Query a keyviz server and decode region keys")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// keyviz server URL
    #[arg(long, default_value = "http://localhost:8000", global = true)]
    pub api_url: String,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch table heatmaps
    Heatmap {
        /// Window start as an offset from now (e.g. -1h, -30m)
        #[arg(short, long, allow_hyphen_values = true)]
        start: Option<String>,
        /// Window end as an offset from now (default: 0)
        #[arg(short, long, allow_hyphen_values = true)]
        end: Option<String>,
        /// Statistic (written_bytes, read_bytes, written_keys, read_keys)
        #[arg(short, long, default_value = "written_bytes")]
        tag: String,
        /// Restrict to one database
        #[arg(long)]
        db: Option<String>,
        /// Restrict to one table
        #[arg(long)]
        table: Option<String>,
        /// One heatmap over the whole keyspace instead of per table
        #[arg(long)]
        keyspace: bool,
    },

    /// List the table catalog
    Tables {
        /// Restrict to one database
        #[arg(long)]
        db: Option<String>,
    },

    /// Show server status
    Status,

    /// Decode a hex-encoded region key
    Decode {
        /// Key bytes as hex, e.g. 7480000000000000ff2d5f728000000000ff0000010000000000fa
        key: String,
    },

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Heatmap {
            start,
            end,
            tag,
            db,
            table,
            keyspace,
        } => {
            let path = if keyspace {
                "/api/v1/heatmaps/keyspace"
            } else {
                "/api/v1/heatmaps"
            };

            let mut params = vec![("tag", tag)];
            for (name, value) in [("start", start), ("end", end), ("db", db), ("table", table)] {
                if let Some(value) = value {
                    params.push((name, value));
                }
            }

            let response = client
                .get(format!("{}{}", cli.api_url, path))
                .query(&params)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let text = response.text().await.unwrap_or_default();
                eprintln!("Heatmap request failed ({}): {}", status, text);
                std::process::exit(1);
            }

            let data: serde_json::Value = response.json().await?;

            match cli.format.as_str() {
                "json" => println!("{}", serde_json::to_string_pretty(&data)?),
                _ => print_heatmaps(&data),
            }
        }

        Commands::Tables { db } => {
            let mut request = client.get(format!("{}/api/v1/tables", cli.api_url));
            if let Some(db) = &db {
                request = request.query(&[("db", db)]);
            }
            let response = request.send().await?;

            if !response.status().is_success() {
                eprintln!("Failed to fetch tables: {}", response.status());
                std::process::exit(1);
            }

            let data: serde_json::Value = response.json().await?;

            if cli.format == "json" {
                println!("{}", serde_json::to_string_pretty(&data)?);
                return Ok(());
            }

            let tables = data["tables"].as_array().cloned().unwrap_or_default();
            if tables.is_empty() {
                println!("No tables in the catalog yet.");
            } else {
                println!("{:<8} {:<20} {:<30} {}", "ID", "Database", "Table", "Indices");
                println!("{}", "-".repeat(70));

                for table in tables {
                    let indices = table["indices"]
                        .as_object()
                        .map(|m| m.len())
                        .unwrap_or(0);
                    println!(
                        "{:<8} {:<20} {:<30} {}",
                        table["id"].as_i64().unwrap_or(0),
                        table["db"].as_str().unwrap_or("-"),
                        table["name"].as_str().unwrap_or("-"),
                        indices
                    );
                }
            }
        }

        Commands::Status => {
            let response = client
                .get(format!("{}/api/v1/status", cli.api_url))
                .send()
                .await;

            match response {
                Ok(resp) if resp.status().is_success() => {
                    let status: serde_json::Value = resp.json().await?;

                    if cli.format == "json" {
                        println!("{}", serde_json::to_string_pretty(&status)?);
                        return Ok(());
                    }

                    println!(
                        "keyviz v{}",
                        status["version"].as_str().unwrap_or(env!("CARGO_PKG_VERSION"))
                    );
                    println!();

                    let history = &status["history"];
                    println!("History:");
                    println!(
                        "  Snapshots: {} / {}",
                        history["len"].as_u64().unwrap_or(0),
                        history["capacity"].as_u64().unwrap_or(0)
                    );
                    println!(
                        "  Interval: {}s",
                        history["interval_secs"].as_i64().unwrap_or(0)
                    );
                    if let Some(newest) = history["newest"].as_str() {
                        println!("  Newest: {}", newest);
                    }

                    if let Some(collector) = status.get("collector").filter(|c| !c.is_null()) {
                        println!();
                        println!("Collector:");
                        println!(
                            "  Collected: {}",
                            collector["snapshots_collected"].as_u64().unwrap_or(0)
                        );
                        println!(
                            "  Consecutive failures: {}",
                            collector["consecutive_failures"].as_u64().unwrap_or(0)
                        );
                        if let Some(error) = collector["last_error"].as_str() {
                            println!("  Last error: {}", error);
                        }
                    }

                    println!();
                    println!(
                        "Catalog: {} tables, {} indices",
                        status["catalog"]["tables"].as_u64().unwrap_or(0),
                        status["catalog"]["indices"].as_u64().unwrap_or(0)
                    );

                    if let Some(uptime) = status["uptime_seconds"].as_u64() {
                        println!();
                        println!("Uptime: {}", format_duration(uptime));
                    }
                }
                Ok(resp) => {
                    eprintln!("API returned error: {}", resp.status());
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Cannot connect to keyviz at {}", cli.api_url);
                    eprintln!("Error: {}", e);
                    eprintln!();
                    eprintln!("Make sure the keyviz server is running:");
                    eprintln!("  cargo run --bin keyviz");
                    std::process::exit(1);
                }
            }
        }

        Commands::Decode { key } => {
            let key = match Key::from_hex(key.trim()) {
                Ok(key) => key,
                Err(e) => {
                    eprintln!("Invalid hex key: {}", e);
                    std::process::exit(1);
                }
            };

            let descriptor = TableKeyDecoder.decode(&key);
            println!("{}", serde_json::to_string_pretty(&descriptor)?);
        }

        Commands::Config { output } => {
            let config = keyviz::config::generate_default_config();

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(&path, &config)?;
                    println!("Config written to {:?}", path);
                }
                None => {
                    print!("{}", config);
                }
            }
        }
    }

    Ok(())
}

fn format_duration(seconds: u64) -> String {
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m {}s", seconds / 60, seconds % 60)
    } else if seconds < 86400 {
        format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
    } else {
        format!("{}d {}h", seconds / 86400, (seconds % 86400) / 3600)
    }
}

/// One line per heatmap: labels, shape and the busiest bucket
fn print_heatmaps(data: &serde_json::Value) {
    println!(
        "Window: {} .. {} ({} snapshots)",
        data["start_time"].as_str().unwrap_or("-"),
        data["end_time"].as_str().unwrap_or("-"),
        data["snapshots"].as_u64().unwrap_or(0)
    );
    println!();

    let heatmaps = match data["heatmaps"].as_array() {
        Some(h) if !h.is_empty() => h,
        _ => {
            println!("No data for the selected time range");
            return;
        }
    };

    println!("{:<40} {:>8} {:>8} {:>16}", "Labels", "Buckets", "Columns", "Total");
    println!("{}", "-".repeat(76));

    for heatmap in heatmaps {
        let labels = heatmap["labels"]
            .as_array()
            .map(|l| {
                l.iter()
                    .filter_map(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "(keyspace)".to_string());

        let rows = heatmap["values"].as_array().cloned().unwrap_or_default();
        let columns = rows.first().and_then(|r| r.as_array()).map_or(0, |r| r.len());
        let total: u64 = rows
            .iter()
            .filter_map(|r| r.as_array())
            .flatten()
            .filter_map(|v| v.as_u64())
            .sum();

        println!(
            "{:<40} {:>8} {:>8} {:>16}",
            labels,
            rows.len(),
            columns,
            total
        );
    }
}
