mod server;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use tandem_core::logging;
use tandem_core::relay::{HttpRelay, MediaRelay};
use tandem_core::translate::{
    DeepLProvider, LibreTranslateProvider, MyMemoryProvider, TranslationGateway,
    TranslationProvider,
};
use tandem_core::{Config, SessionService};

use server::TandemServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration (TANDEM_CONFIG names an optional file; env wins)
    let config_file = std::env::var("TANDEM_CONFIG").ok();
    let config = Config::load(config_file.as_deref())?;
    config.validate()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;

    info!("Tandem server starting...");
    info!("HTTP address: {}", config.http_address());
    info!("Media relay: {}", config.relay.base_url);

    // 3. Media relay client
    let relay = Arc::new(HttpRelay::new(&config.relay)?);

    // 4. Translation tiers, primary first. DeepL only runs with a key; the
    // free tiers are always wired so the gateway has somewhere to go.
    let tier_timeout = Duration::from_secs(config.translation.timeout_secs);
    let mut providers: Vec<Arc<dyn TranslationProvider>> = Vec::new();
    if let Some(api_key) = &config.translation.deepl_api_key {
        providers.push(Arc::new(DeepLProvider::new(
            config.translation.deepl_base_url.clone(),
            api_key.clone(),
            tier_timeout,
        )?));
    }
    providers.push(Arc::new(LibreTranslateProvider::new(
        config.translation.libretranslate_base_url.clone(),
        tier_timeout,
    )?));
    providers.push(Arc::new(MyMemoryProvider::new(
        config.translation.mymemory_base_url.clone(),
        tier_timeout,
    )?));
    info!("Translation tiers: {} remote provider(s)", providers.len());
    let gateway = Arc::new(TranslationGateway::new(providers, tier_timeout));

    // 5. Session service
    let grace = Duration::from_secs(config.room.reclaim_grace_secs);
    let service = Arc::new(SessionService::new(
        Arc::clone(&relay) as Arc<dyn MediaRelay>,
        gateway,
        grace,
    ));

    // 6. Serve until a signal arrives or the relay worker dies
    let server = TandemServer::new(config, service, relay);
    server.start().await
}
