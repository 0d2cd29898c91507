use std::{sync::Arc, time::Duration};

use tokio::signal;
use tracing_subscriber::EnvFilter;

use pitchvault::{
    acl::DbAccessControl,
    ai::OpenAiClient,
    auth::jwt::JwtService,
    config::AppConfig,
    convert::LibreOfficeConverter,
    db,
    extract::DocumentIntelligenceExtractor,
    render::RenderServiceClient,
    repo::{PgRepository, Repository},
    s3::build_client,
    state::AppState,
    storage::S3Storage,
    workers::{case_study::CaseStudyHandler, rendition::RenditionHandler},
    Worker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = Arc::new(AppConfig::from_env()?);
    tracing::info!(
        component = "worker",
        database_url = %config.redacted_database_url(),
        rendition_workers = config.rendition_workers,
        case_study_workers = config.case_study_workers,
        s3_bucket = %config.s3_bucket,
        "loaded configuration"
    );

    let pool_size = (config.rendition_workers + config.case_study_workers).max(1) as u32;
    let pool = db::init_pool_with_size(&config.database_url, pool_size)?;

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

    let poll_interval = Duration::from_secs(config.worker_poll_interval_secs);
    let mut handles = Vec::new();
    for _ in 0..config.rendition_workers {
        let worker = Worker::new(state.clone(), Arc::new(RenditionHandler), poll_interval);
        handles.push(tokio::spawn(worker.run()));
    }
    for _ in 0..config.case_study_workers {
        let worker = Worker::new(state.clone(), Arc::new(CaseStudyHandler), poll_interval);
        handles.push(tokio::spawn(worker.run()));
    }

    signal::ctrl_c().await?;
    tracing::info!("worker received shutdown signal");
    for handle in handles {
        handle.abort();
    }

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
