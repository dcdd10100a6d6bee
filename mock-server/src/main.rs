use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("mock_server=info")),
        )
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let config = mock_server::Config {
        api_key: std::env::var("AIRTABLE_API_KEY").ok().filter(|k| !k.is_empty()),
    };
    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(
        "listening on http://{addr}/v0 (api key {})",
        if config.api_key.is_some() { "required" } else { "not checked" }
    );
    mock_server::serve(listener, config).await
}
