use clap::{Args, Parser, Subcommand};
use kodo_bridge::types::wire::KodoObjectListing;
use kodo_bridge::{
    ClientConfiguration, ClientError, ClientResult, Command, CommandSigner, Credentials,
    RequestBuilder,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// kodo-bridge: sign OSS-style requests for Qiniu Kodo and translate its replies
#[derive(Parser, Debug)]
#[command(name = "kodo-bridge")]
#[command(about = "Translate OSS-style object requests into signed Kodo requests", long_about = None)]
struct Cli {
    /// Path to a JSON or YAML configuration file
    #[arg(short, long, env = "KODO_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Kodo access key
    #[arg(long, env = "KODO_ACCESS_KEY", default_value = "")]
    access_key_id: String,

    /// Kodo secret key
    #[arg(long, env = "KODO_SECRET_KEY", default_value = "", hide_env_values = true)]
    secret_access_key: String,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Build and sign a request, then print it as JSON
    Sign(SignArgs),

    /// Translate a Kodo listing reply into a canonical listing page
    Translate {
        #[arg(long)]
        bucket: String,

        /// File holding the JSON body returned by the list service
        file: PathBuf,
    },
}

#[derive(Args, Debug)]
struct SignArgs {
    #[arg(long)]
    command: Command,

    #[arg(long)]
    bucket: String,

    #[arg(long)]
    key: Option<String>,

    /// Query parameter, `name=value`
    #[arg(long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,

    /// Request header, `name=value`
    #[arg(long = "header", value_parser = parse_pair)]
    headers: Vec<(String, String)>,

    /// Declared body length; -1 forces chunked encoding
    #[arg(long, allow_negative_numbers = true)]
    content_length: Option<i64>,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

fn sign(
    config: &ClientConfiguration,
    credentials: Credentials,
    args: SignArgs,
) -> ClientResult<String> {
    let mut builder = RequestBuilder::new(config)
        .command(args.command)
        .bucket(args.bucket);
    if let Some(key) = args.key {
        builder = builder.key(key);
    }
    for (name, value) in args.params {
        builder = builder.parameter(name, value);
    }
    for (name, value) in args.headers {
        builder = builder.header(name, value);
    }
    if let Some(content_length) = args.content_length {
        builder = builder.input_size(content_length);
    }

    let mut request = builder.build()?;
    CommandSigner::new(credentials, config).sign(args.command, &mut request)?;

    let url = request
        .url()
        .map_err(|e| ClientError::InvalidState(format!("signed request has no valid url: {}", e)))?;
    let output = serde_json::json!({
        "url": url.as_str(),
        "request": request,
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

fn translate(bucket: &str, file: &Path) -> ClientResult<String> {
    let body = fs::read(file)
        .map_err(|e| ClientError::InvalidArgument(format!("{}: {}", file.display(), e)))?;
    let page = KodoObjectListing::from_json(&body)?;

    let listing = page.to_object_listing(bucket).ok_or_else(|| {
        ClientError::InvalidState(format!(
            "listing reports an error: {}",
            page.status().message.unwrap_or_default()
        ))
    })?;

    tracing::info!(
        "Translated {} objects, truncated: {}",
        listing.object_summaries.len(),
        listing.truncated
    );
    Ok(serde_json::to_string_pretty(&listing)?)
}

fn main() {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match ClientConfiguration::from_file(path) {
            Ok(cfg) => {
                tracing::info!("Loaded configuration from {}", path.display());
                cfg
            }
            Err(e) => {
                tracing::error!("Failed to load config file '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => ClientConfiguration::default(),
    };

    let credentials = Credentials::new(cli.access_key_id, cli.secret_access_key);
    if !credentials.is_complete() {
        tracing::warn!("Credentials incomplete, requests will be left unsigned");
    }

    let result = match cli.action {
        Action::Sign(args) => sign(&config, credentials, args),
        Action::Translate { bucket, file } => translate(&bucket, &file),
    };

    match result {
        Ok(output) => println!("{}", output),
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    }
}
