//! Chatfolio intent gateway.
//!
//! Serves `POST /api/get-intent`, forwarding each question to a Dialogflow
//! agent and relaying the detected intent and entities as JSON.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use chatfolio_core::auth::{ServiceAccountTokenSource, StaticTokenSource, TokenSource};
use chatfolio_core::config::{
    DEFAULT_CREDENTIALS_PATH, DEFAULT_LANGUAGE_CODE, DEFAULT_PROJECT_ID, DEFAULT_TIME_ZONE,
    SessionConfig,
};
use chatfolio_core::nlu::NluError;
use chatfolio_core::nlu::dialogflow::{DEFAULT_API_BASE_URL, DialogflowClient};
use clap::Parser;
use tracing::{error, info, warn};

/// CLI arguments for the gateway.
#[derive(Parser, Debug)]
#[command(name = "chatfolio_server", about = "Chatfolio intent gateway", version)]
struct Args {
    /// Interface to listen on.
    #[arg(long, env = "CHATFOLIO_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, env = "CHATFOLIO_PORT", default_value_t = chatfolio_api::config::DEFAULT_PORT)]
    port: u16,

    /// Dialogflow agent project id.
    #[arg(long, env = "DIALOGFLOW_PROJECT_ID", default_value = DEFAULT_PROJECT_ID)]
    project_id: String,

    /// Service-account JSON key file.
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", default_value = DEFAULT_CREDENTIALS_PATH)]
    credentials: PathBuf,

    /// Language code sent with every query.
    #[arg(long, env = "DIALOGFLOW_LANGUAGE_CODE", default_value = DEFAULT_LANGUAGE_CODE)]
    language_code: String,

    /// Time zone sent with every query.
    #[arg(long, env = "DIALOGFLOW_TIME_ZONE", default_value = DEFAULT_TIME_ZONE)]
    time_zone: String,

    /// Dialogflow API endpoint.
    #[arg(long, env = "DIALOGFLOW_API_URL", default_value = DEFAULT_API_BASE_URL)]
    api_base_url: String,

    /// Pre-issued bearer token; skips the credentials file when set.
    #[arg(long, env = "DIALOGFLOW_ACCESS_TOKEN", hide_env_values = true)]
    access_token: Option<String>,
}

/// Stands in for the service account when its key cannot be loaded, so the
/// server still starts and every request degrades to an empty result.
struct UnavailableTokenSource(String);

#[async_trait::async_trait]
impl TokenSource for UnavailableTokenSource {
    async fn access_token(&self) -> Result<String, NluError> {
        Err(NluError::Credentials(self.0.clone()))
    }
}

fn token_source(args: &Args, http: &reqwest::Client) -> Arc<dyn TokenSource> {
    if let Some(token) = &args.access_token {
        info!("using access token from environment");
        return Arc::new(StaticTokenSource::new(token.clone()));
    }
    match ServiceAccountTokenSource::from_file(&args.credentials, http.clone()) {
        Ok(source) => Arc::new(source),
        Err(e) => {
            error!(credentials = %args.credentials.display(), "Error in auth with Dialogflow: {e}");
            Arc::new(UnavailableTokenSource(e.to_string()))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chatfolio_api=debug,chatfolio_core=debug".into()),
        )
        .init();

    let args = Args::parse();

    let session = SessionConfig {
        project_id: args.project_id.clone(),
        credentials_path: args.credentials.clone(),
        language_code: args.language_code.clone(),
        time_zone: args.time_zone.clone(),
    };
    info!(
        project_id = %session.project_id,
        language_code = %session.language_code,
        time_zone = %session.time_zone,
        "configuring Dialogflow session"
    );
    if args.api_base_url != DEFAULT_API_BASE_URL {
        warn!(api_base_url = %args.api_base_url, "using non-default Dialogflow endpoint");
    }

    let http = reqwest::Client::new();
    let tokens = token_source(&args, &http);
    let detector = DialogflowClient::new(http, session, tokens).with_base_url(&args.api_base_url);

    let config = chatfolio_api::config::ApiConfig::new(&args.host, args.port);
    let app = chatfolio_api::router(chatfolio_api::AppState {
        detector: Arc::new(detector),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;
    info!(addr = %local_addr, "Starting server");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
