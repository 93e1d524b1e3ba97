use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Client for a running mTLS proxy", long_about = None)]
struct Cli {
    /// Base URL of the proxy.
    #[arg(short = 'u', long, default_value = "http://localhost:3000")]
    proxy_url: String,

    /// Shared secret sent as x-proxy-secret.
    #[arg(short, long, env = "PROXY_SECRET", hide_env_values = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check proxy liveness and mTLS state
    Health,
    /// Forward a request through the proxy
    Send {
        /// Upstream URL
        #[arg(long)]
        url: String,

        /// HTTP method (proxy defaults to POST)
        #[arg(short = 'X', long)]
        method: Option<String>,

        /// Header as `name:value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Request body; parsed as JSON when possible, sent as text otherwise
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Health => {
            let res = client
                .get(format!("{}/health", cli.proxy_url))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Send {
            url,
            method,
            headers,
            body,
        } => {
            let envelope = build_envelope(url, method, &headers, body)?;

            let mut request_headers = HeaderMap::new();
            if let Some(secret) = cli.secret.as_deref() {
                request_headers.insert("x-proxy-secret", HeaderValue::from_str(secret)?);
            }

            let res = client
                .post(format!("{}/proxy", cli.proxy_url))
                .headers(request_headers)
                .json(&envelope)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn build_envelope(
    url: String,
    method: Option<String>,
    headers: &[String],
    body: Option<String>,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut header_map = Map::new();
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| format!("Header must be name:value, got {header:?}"))?;
        header_map.insert(name.trim().to_string(), Value::String(value.trim().to_string()));
    }

    let mut envelope = json!({ "url": url, "headers": header_map });
    if let Some(method) = method {
        envelope["method"] = Value::String(method);
    }
    if let Some(body) = body {
        envelope["body"] = serde_json::from_str(&body).unwrap_or(Value::String(body));
    }
    Ok(envelope)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Proxy returned status {}", status);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
