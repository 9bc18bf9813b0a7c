/// Oxbow Mirror service binary

use oxbow_server::{
    config::ServerConfig, context::AppContext, error::OxbowResult, jobs::JobScheduler, server,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> OxbowResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "oxbow_server=debug,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    print_banner();

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
   ____       __
  / __ \_  __/ /_  ____ _      __
 / / / / |/_/ __ \/ __ \ | /| / /
/ /_/ />  </ /_/ / /_/ / |/ |/ /
\____/_/|_/_.___/\____/|__/|__/

        Mirror generation service v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
