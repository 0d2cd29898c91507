use std::sync::Arc;

use anyhow::{anyhow, Context};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use tracing_subscriber::EnvFilter;

use pitchvault::{
    acl::DbAccessControl,
    ai::OpenAiClient,
    auth::jwt::JwtService,
    config::AppConfig,
    convert::LibreOfficeConverter,
    create_router, db,
    extract::DocumentIntelligenceExtractor,
    render::RenderServiceClient,
    repo::{PgRepository, Repository},
    s3::build_client,
    state::AppState,
    storage::S3Storage,
};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        component = "api",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        s3_bucket = %config.s3_bucket,
        "loaded configuration"
    );

    let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
    run_migrations(&pool)?;

    let s3_client = build_client(&config).await?;
    let storage = Arc::new(S3Storage::new(s3_client, config.s3_bucket.clone()));
    let repo: Arc<dyn Repository> = Arc::new(PgRepository::new(pool));
    let access = Arc::new(DbAccessControl::new(repo.clone()));
    let jwt = Arc::new(JwtService::from_config(&config));

    let openai = Arc::new(OpenAiClient::new(
        config.openai_endpoint.clone(),
        config.openai_api_key.clone(),
        config.openai_chat_deployment.clone(),
    ));

    let state = AppState {
        config: config.clone(),
        jwt,
        repo,
        storage,
        access,
        pdf_converter: Arc::new(LibreOfficeConverter::new(config.soffice_binary.clone())),
        text_extractor: Arc::new(DocumentIntelligenceExtractor::new(
            config.docintel_endpoint.clone(),
            config.docintel_api_key.clone(),
        )),
        summarizer: openai.clone(),
        section_extractor: openai.clone(),
        content_validator: openai.clone(),
        content_enhancer: openai,
        renderer: Arc::new(RenderServiceClient::new(config.renderer_endpoint.clone())),
    };

    let router = create_router(state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "api server listening");

    axum::serve(listener, router).await?;
    Ok(())
}

fn run_migrations(pool: &db::PgPool) -> anyhow::Result<()> {
    let mut conn = pool.get().context("failed to get connection for migrations")?;
    conn.run_pending_migrations(MIGRATIONS)
        .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
