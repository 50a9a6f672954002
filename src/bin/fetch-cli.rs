use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;

use resilient_fetch::config::{load_config, ClientConfig};
use resilient_fetch::observability::{logging, metrics};
use resilient_fetch::{HttpClient, RequestOptions, Response};

#[derive(Parser)]
#[command(name = "fetch-cli")]
#[command(about = "Resilient HTTP fetch with retries, circuit breaking and ETag caching", long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Per-attempt timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Retries after the first attempt
    #[arg(long)]
    max_retries: Option<u32>,

    /// Base backoff delay in milliseconds
    #[arg(long)]
    backoff_base_ms: Option<u64>,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// GET a URL and print the body
    Get {
        url: String,
        /// Parse and pretty-print the body as JSON
        #[arg(long)]
        json: bool,
    },
    /// POST a JSON document and print the JSON reply
    Post {
        url: String,
        /// JSON request body
        #[arg(short, long)]
        data: String,
    },
    /// Repeatedly GET a URL, showing revalidation and breaker state
    Watch {
        url: String,
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        #[arg(long, default_value_t = 5)]
        count: u32,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::default(),
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init_logging(&level);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let options = build_options(&cli)?;
    let client = HttpClient::new(config)?;

    let outcome = match &cli.command {
        Commands::Get { url, json } => run_get(&client, url, options, *json).await,
        Commands::Post { url, data } => run_post(&client, url, data, options).await,
        Commands::Watch {
            url,
            interval_ms,
            count,
        } => {
            run_watch(&client, url, options, *interval_ms, *count).await;
            Ok(())
        }
    };

    if let Err(e) = outcome {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn build_options(cli: &Cli) -> Result<RequestOptions, Box<dyn std::error::Error>> {
    let mut options = RequestOptions::new();
    if let Some(ms) = cli.timeout_ms {
        options = options.timeout_ms(ms);
    }
    if let Some(n) = cli.max_retries {
        options = options.max_retries(n);
    }
    if let Some(ms) = cli.backoff_base_ms {
        options = options.backoff_base_ms(ms);
    }
    for raw in &cli.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header '{}' must look like 'Name: value'", raw))?;
        options = options.header(name.trim(), value.trim());
    }
    Ok(options)
}

async fn run_get(
    client: &HttpClient,
    url: &str,
    options: RequestOptions,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        let value: Value = client.get_json(url, options).await?;
        print_json(&value);
    } else {
        let res = client.fetch_retry(url, options).await?;
        println!("{}", res.text());
    }
    Ok(())
}

async fn run_post(
    client: &HttpClient,
    url: &str,
    data: &str,
    options: RequestOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let body = parse_data(data)?;
    let reply: Value = client.post_json(url, &body, options).await?;
    print_json(&reply);
    Ok(())
}

async fn run_watch(client: &HttpClient, url: &str, options: RequestOptions, interval_ms: u64, count: u32) {
    for i in 0..count {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
        }
        match client.fetch_retry(url, options.clone()).await {
            Ok(res) => println!("[{}] {}", i + 1, describe(&res)),
            Err(e) => println!("[{}] error: {}", i + 1, e),
        }
    }
}

fn describe(res: &Response) -> String {
    format!(
        "{} {} bytes{}{}",
        res.status(),
        res.bytes().len(),
        res.header("etag").map(|e| format!(" etag={}", e)).unwrap_or_default(),
        if res.is_revalidated() { " (not modified, from cache)" } else { "" }
    )
}

fn parse_data(data: &str) -> Result<Value, String> {
    serde_json::from_str(data).map_err(|e| format!("invalid --data JSON: {}", e))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
