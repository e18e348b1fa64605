use envconfig::Envconfig;
use tokio::net::TcpListener;

#[derive(Envconfig, Clone, Debug)]
pub struct MockServerConfig {
    #[envconfig(from = "PORT", default = "3000")]
    pub port: u16,

    #[envconfig(from = "MOCK_SEED_ADMIN", default = "true")]
    pub seed_admin: bool,
}

pub fn init_log() {
    use tracing::level_filters::LevelFilter;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("MOCK_LOG")
                .from_env_lossy(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_log();
    let conf = MockServerConfig::init_from_env()?;
    let addr = format!("127.0.0.1:{}", conf.port);
    let listener = TcpListener::bind(&addr).await?;
    if conf.seed_admin {
        tracing::info!(email = mock_server::SEED_ADMIN_EMAIL, "seeded system administrator");
    }
    mock_server::run_app(listener, mock_server::app_with(conf.seed_admin)).await?;
    Ok(())
}
