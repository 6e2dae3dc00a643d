use color_eyre::eyre::{Result, WrapErr};

use apidesk::api::{ApiClient, FileTokenStore, MemoryTokenStore, ReqwestTransport};
use apidesk::app::{App, AppFlags};
use apidesk::config::Settings;
use apidesk::hooks::Hooks;
use apidesk::logging;
use apidesk::notify::Notifier;
use apidesk::query::QueryClient;
use apidesk::runtime::Runtime;

fn build_client(settings: &Settings) -> Result<ApiClient> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = settings.request_timeout() {
        builder = builder.timeout(timeout);
    }
    let http = builder.build().wrap_err("failed to build HTTP client")?;
    let transport = ReqwestTransport::with_client(http, &settings.api_url);

    let token_path = settings.token_path.clone().or_else(FileTokenStore::default_path);
    Ok(match token_path {
        Some(path) => ApiClient::new(transport, FileTokenStore::open(path)),
        None => {
            tracing::warn!("no data directory, the session will not persist");
            ApiClient::new(transport, MemoryTokenStore::new())
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let settings = Settings::load()?;
    let rust_log_set = std::env::var_os("RUST_LOG").is_some();
    if let Some(path) = logging::resolve_log_path(settings.log_file.as_deref(), rust_log_set) {
        logging::init(&path).wrap_err_with(|| format!("failed to open log file {}", path.display()))?;
    }
    tracing::info!(api_url = %settings.api_url, "starting");

    let hooks = Hooks::new(
        build_client(&settings)?,
        QueryClient::with_config(settings.query_config()),
        Notifier::new(),
    );
    let frame_rate = settings.frame_rate;
    let flags = AppFlags {
        hooks,
        settings,
        settings_path: Settings::default_path(),
    };

    let mut terminal = ratatui::init();
    let result = Runtime::<App>::new(flags).run(&mut terminal, frame_rate).await;
    ratatui::restore();

    result
}
