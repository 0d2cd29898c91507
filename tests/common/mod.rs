use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use pitchvault::acl::{DbAccessControl, Permission};
use pitchvault::ai::{ContentEnhancer, ContentValidator, SectionExtractor, Summarizer};
use pitchvault::auth::jwt::JwtService;
use pitchvault::config::AppConfig;
use pitchvault::convert::{classify, ConvertError, InputClass, PdfConverter, CONTENT_TYPE_PPTX};
use pitchvault::models::{
    CaseStudyAgent, CaseStudyValidationResult, Document, DocumentVersion, Job,
    NewCaseStudyAgent, NewCaseStudyValidationResult, NewDocument, NewDocumentVersion, Rendition,
    RenditionKind, RenditionStatus, User,
};
use pitchvault::render::PresentationRenderer;
use pitchvault::repo::{
    PreparedRendition, Repository, JOB_STATUS_PROCESSING, JOB_STATUS_QUEUED,
};
use pitchvault::routes;
use pitchvault::state::AppState;
use pitchvault::storage::{object_key, ObjectStorage};
use pitchvault::template::TemplateConfig;
use pitchvault::workers::{case_study::CaseStudyHandler, rendition::RenditionHandler, Worker};
use pitchvault::extract::TextExtractor;
use rand::rngs::OsRng;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

#[allow(dead_code)]
pub static DEFAULT_TEMPLATE_CONFIG: Lazy<Value> = Lazy::new(|| {
    json!({
        "version": "1.0",
        "aspectRatio": "16:9",
        "sections": [
            { "key": "title", "sectionType": "TEXT", "required": true, "order": 1 },
            { "key": "challenges", "sectionType": "BULLET_LIST", "order": 2 }
        ]
    })
});

#[derive(Default)]
struct RepoInner {
    users: Vec<User>,
    documents: Vec<Document>,
    versions: Vec<DocumentVersion>,
    renditions: Vec<Rendition>,
    agents: Vec<CaseStudyAgent>,
    validation_results: Vec<CaseStudyValidationResult>,
    acl: Vec<(Uuid, String, Uuid, String)>,
    jobs: Vec<Job>,
}

/// In-memory stand-in for `PgRepository`, mirroring its semantics closely
/// enough that the pipelines and routes behave as they would against
/// Postgres (atomic prepare, single active agent, skip-locked style job
/// reservation).
#[derive(Default)]
pub struct InMemoryRepository {
    inner: Mutex<RepoInner>,
}

impl InMemoryRepository {
    pub async fn add_user(&self, username: &str, password_hash: &str, role: &str) -> Uuid {
        let now = Utc::now().naive_utc();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            role: role.to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = user.id;
        self.inner.lock().await.users.push(user);
        id
    }

    #[allow(dead_code)]
    pub async fn grant(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
        permission: Permission,
    ) {
        self.inner.lock().await.acl.push((
            user_id,
            resource_type.to_string(),
            resource_id,
            permission.as_str().to_string(),
        ));
    }

    #[allow(dead_code)]
    pub async fn jobs_by_type(&self, job_type: &str) -> Vec<Job> {
        self.inner
            .lock()
            .await
            .jobs
            .iter()
            .filter(|job| job.job_type == job_type)
            .cloned()
            .collect()
    }

    #[allow(dead_code)]
    pub async fn rendition_rows(&self, document_version_id: Uuid) -> Vec<Rendition> {
        self.inner
            .lock()
            .await
            .renditions
            .iter()
            .filter(|row| row.document_version_id == document_version_id)
            .cloned()
            .collect()
    }

    #[allow(dead_code)]
    pub async fn validation_rows(&self, document_version_id: Uuid) -> Vec<CaseStudyValidationResult> {
        self.inner
            .lock()
            .await
            .validation_results
            .iter()
            .filter(|row| row.document_version_id == document_version_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn insert_document_with_version(
        &self,
        document: NewDocument,
        version: NewDocumentVersion,
    ) -> Result<(Document, DocumentVersion)> {
        let now = Utc::now().naive_utc();
        let document = Document {
            id: document.id,
            title: document.title,
            status: document.status,
            current_version_number: document.current_version_number,
            created_at: now,
            updated_at: now,
        };
        let version = DocumentVersion {
            id: version.id,
            document_id: version.document_id,
            version_number: version.version_number,
            file_path: version.file_path,
            file_name: version.file_name,
            file_size: version.file_size,
            content_type: version.content_type,
            checksum: version.checksum,
            created_at: now,
        };
        let mut inner = self.inner.lock().await;
        inner.documents.push(document.clone());
        inner.versions.push(version.clone());
        Ok((document, version))
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        let inner = self.inner.lock().await;
        Ok(inner.documents.iter().find(|doc| doc.id == id).cloned())
    }

    async fn find_version(&self, id: Uuid) -> Result<Option<DocumentVersion>> {
        let inner = self.inner.lock().await;
        Ok(inner.versions.iter().find(|ver| ver.id == id).cloned())
    }

    async fn current_version(&self, document_id: Uuid) -> Result<Option<DocumentVersion>> {
        let inner = self.inner.lock().await;
        let Some(document) = inner.documents.iter().find(|doc| doc.id == document_id) else {
            return Ok(None);
        };
        Ok(inner
            .versions
            .iter()
            .find(|ver| {
                ver.document_id == document.id
                    && ver.version_number == document.current_version_number
            })
            .cloned())
    }

    async fn find_rendition(
        &self,
        document_version_id: Uuid,
        kind: RenditionKind,
    ) -> Result<Option<Rendition>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .renditions
            .iter()
            .find(|row| {
                row.document_version_id == document_version_id && row.kind == kind.as_str()
            })
            .cloned())
    }

    async fn list_renditions(&self, document_version_id: Uuid) -> Result<Vec<Rendition>> {
        Ok(self.rendition_rows(document_version_id).await)
    }

    async fn prepare_rendition(
        &self,
        document_version_id: Uuid,
        kind: RenditionKind,
    ) -> Result<PreparedRendition> {
        let mut inner = self.inner.lock().await;
        if let Some(pos) = inner.renditions.iter().position(|row| {
            row.document_version_id == document_version_id && row.kind == kind.as_str()
        }) {
            if inner.renditions[pos].is_completed() {
                return Ok(PreparedRendition::AlreadyCompleted(
                    inner.renditions[pos].clone(),
                ));
            }
            inner.renditions.remove(pos);
        }

        let now = Utc::now().naive_utc();
        let row = Rendition {
            id: Uuid::new_v4(),
            document_version_id,
            kind: kind.as_str().to_string(),
            status: RenditionStatus::Pending.as_str().to_string(),
            file_path: None,
            file_size: None,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        inner.renditions.push(row.clone());
        Ok(PreparedRendition::Created(row))
    }

    async fn set_rendition_processing(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(row) = inner.renditions.iter_mut().find(|row| row.id == id) {
            row.status = RenditionStatus::Processing.as_str().to_string();
            row.updated_at = Utc::now().naive_utc();
        }
        Ok(())
    }

    async fn complete_rendition(&self, id: Uuid, file_path: &str, file_size: i64) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(row) = inner.renditions.iter_mut().find(|row| row.id == id) {
            row.status = RenditionStatus::Completed.as_str().to_string();
            row.file_path = Some(file_path.to_string());
            row.file_size = Some(file_size);
            row.error_message = None;
            row.updated_at = Utc::now().naive_utc();
        }
        Ok(())
    }

    async fn fail_rendition(&self, id: Uuid, error_message: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(row) = inner.renditions.iter_mut().find(|row| row.id == id) {
            row.status = RenditionStatus::Failed.as_str().to_string();
            row.error_message = Some(error_message.to_string());
            row.updated_at = Utc::now().naive_utc();
        }
        Ok(())
    }

    async fn delete_rendition(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.renditions.retain(|row| row.id != id);
        Ok(())
    }

    async fn insert_agent(&self, agent: NewCaseStudyAgent) -> Result<CaseStudyAgent> {
        let now = Utc::now().naive_utc();
        let agent = CaseStudyAgent {
            id: agent.id,
            name: agent.name,
            description: agent.description,
            template_config: agent.template_config,
            is_active: agent.is_active,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.agents.push(agent.clone());
        Ok(agent)
    }

    async fn list_agents(&self) -> Result<Vec<CaseStudyAgent>> {
        Ok(self.inner.lock().await.agents.clone())
    }

    async fn find_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>> {
        let inner = self.inner.lock().await;
        Ok(inner.agents.iter().find(|agent| agent.id == id).cloned())
    }

    async fn active_agent(&self) -> Result<Option<CaseStudyAgent>> {
        let inner = self.inner.lock().await;
        Ok(inner.agents.iter().find(|agent| agent.is_active).cloned())
    }

    async fn activate_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>> {
        let mut inner = self.inner.lock().await;
        if !inner.agents.iter().any(|agent| agent.id == id) {
            return Ok(None);
        }
        let now = Utc::now().naive_utc();
        for agent in inner.agents.iter_mut() {
            let was_active = agent.is_active;
            agent.is_active = agent.id == id;
            if was_active != agent.is_active {
                agent.updated_at = now;
            }
        }
        Ok(inner.agents.iter().find(|agent| agent.id == id).cloned())
    }

    async fn deactivate_agent(&self, id: Uuid) -> Result<Option<CaseStudyAgent>> {
        let mut inner = self.inner.lock().await;
        let Some(agent) = inner.agents.iter_mut().find(|agent| agent.id == id) else {
            return Ok(None);
        };
        agent.is_active = false;
        agent.updated_at = Utc::now().naive_utc();
        Ok(Some(agent.clone()))
    }

    async fn insert_validation_result(
        &self,
        result: NewCaseStudyValidationResult,
    ) -> Result<CaseStudyValidationResult> {
        let result = CaseStudyValidationResult {
            id: result.id,
            document_version_id: result.document_version_id,
            agent_id: result.agent_id,
            is_valid: result.is_valid,
            validation_details: result.validation_details,
            created_at: Utc::now().naive_utc(),
        };
        self.inner
            .lock()
            .await
            .validation_results
            .push(result.clone());
        Ok(result)
    }

    async fn latest_validation_result(
        &self,
        document_version_id: Uuid,
    ) -> Result<Option<CaseStudyValidationResult>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .validation_results
            .iter()
            .filter(|row| row.document_version_id == document_version_id)
            .last()
            .cloned())
    }

    async fn max_granted_permission(
        &self,
        user_id: Uuid,
        resource_type: &str,
        resource_id: Uuid,
    ) -> Result<Option<Permission>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .acl
            .iter()
            .filter(|(uid, rtype, rid, _)| {
                *uid == user_id && rtype == resource_type && *rid == resource_id
            })
            .filter_map(|(_, _, _, permission)| Permission::parse(permission))
            .max())
    }

    async fn enqueue_job(&self, job_type: &str, payload: Value) -> Result<Job> {
        let now = Utc::now().naive_utc();
        let job = Job {
            id: Uuid::new_v4(),
            job_type: job_type.to_string(),
            payload,
            status: JOB_STATUS_QUEUED.to_string(),
            attempts: 0,
            run_after: now,
            last_error: None,
            created_at: now,
            updated_at: now,
        };
        self.inner.lock().await.jobs.push(job.clone());
        Ok(job)
    }

    async fn reserve_job(&self, job_types: &[&str]) -> Result<Option<Job>> {
        let now = Utc::now().naive_utc();
        let mut inner = self.inner.lock().await;
        let candidate = inner
            .jobs
            .iter_mut()
            .filter(|job| {
                job.status == JOB_STATUS_QUEUED
                    && job.run_after <= now
                    && job_types.contains(&job.job_type.as_str())
            })
            .min_by_key(|job| job.run_after);
        if let Some(job) = candidate {
            job.status = JOB_STATUS_PROCESSING.to_string();
            job.attempts += 1;
            job.updated_at = now;
            return Ok(Some(job.clone()));
        }
        Ok(None)
    }

    async fn mark_job_succeeded(&self, id: Uuid) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.iter_mut().find(|job| job.id == id) {
            job.status = "succeeded".to_string();
            job.last_error = None;
            job.updated_at = Utc::now().naive_utc();
        }
        Ok(())
    }

    async fn mark_job_failed(&self, id: Uuid, error_message: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.iter_mut().find(|job| job.id == id) {
            job.status = "failed".to_string();
            job.last_error = Some(error_message.to_string());
            job.updated_at = Utc::now().naive_utc();
        }
        Ok(())
    }

    async fn retry_job_after(&self, id: Uuid, delay: Duration, error_message: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if let Some(job) = inner.jobs.iter_mut().find(|job| job.id == id) {
            let now = Utc::now();
            job.status = JOB_STATUS_QUEUED.to_string();
            job.run_after = (now + chrono::Duration::from_std(delay)?).naive_utc();
            job.last_error = Some(error_message.to_string());
            job.updated_at = now.naive_utc();
        }
        Ok(())
    }
}

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
    puts: AtomicUsize,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(
        &self,
        container: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.objects.lock().await;
        guard.insert(
            object_key(container, path),
            StoredObject {
                bytes,
                content_type,
            },
        );
        Ok(())
    }

    async fn get_object(&self, container: &str, path: &str) -> Result<Vec<u8>> {
        let key = object_key(container, path);
        let guard = self.objects.lock().await;
        guard
            .get(&key)
            .map(|obj| obj.bytes.clone())
            .ok_or_else(|| anyhow!("object {key} missing"))
    }

    async fn delete_object(&self, container: &str, path: &str) -> Result<()> {
        let mut guard = self.objects.lock().await;
        guard.remove(&object_key(container, path));
        Ok(())
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }

    #[allow(dead_code)]
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

/// Converts via the real content-type dispatch; produced bytes are canned.
pub struct FakePdfConverter;

#[async_trait]
impl PdfConverter for FakePdfConverter {
    async fn convert_to_pdf(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<Vec<u8>, ConvertError> {
        match classify(content_type)? {
            InputClass::Pdf => Ok(bytes),
            _ => Ok(b"%PDF-1.4 fake".to_vec()),
        }
    }
}

pub struct FakeExtractor {
    pub text: Mutex<Option<String>>,
}

impl Default for FakeExtractor {
    fn default() -> Self {
        Self {
            text: Mutex::new(Some("Solved X for customer Y.".to_string())),
        }
    }
}

impl FakeExtractor {
    #[allow(dead_code)]
    pub async fn set_text(&self, text: Option<&str>) {
        *self.text.lock().await = text.map(str::to_string);
    }
}

#[async_trait]
impl TextExtractor for FakeExtractor {
    async fn extract_text(&self, _bytes: Vec<u8>, _content_type: &str) -> Result<Option<String>> {
        Ok(self.text.lock().await.clone())
    }
}

pub struct FakeSummarizer {
    pub response: Mutex<String>,
}

impl Default for FakeSummarizer {
    fn default() -> Self {
        Self {
            response: Mutex::new("Summary: X.".to_string()),
        }
    }
}

#[async_trait]
impl Summarizer for FakeSummarizer {
    async fn summarize(&self, _text: &str, _document_title: &str) -> Result<String> {
        Ok(self.response.lock().await.clone())
    }
}

pub struct FakeSectionExtractor {
    pub response: Mutex<String>,
}

impl Default for FakeSectionExtractor {
    fn default() -> Self {
        Self {
            response: Mutex::new(r#"{"title":"Acme migration"}"#.to_string()),
        }
    }
}

#[async_trait]
impl SectionExtractor for FakeSectionExtractor {
    async fn extract_sections(&self, _source_text: &str, _section_keys: &str) -> Result<String> {
        Ok(self.response.lock().await.clone())
    }
}

pub struct FakeValidator {
    pub verdict: Mutex<String>,
    pub calls: AtomicUsize,
}

impl Default for FakeValidator {
    fn default() -> Self {
        Self {
            verdict: Mutex::new(r#"{"overallScore":0.95}"#.to_string()),
            calls: AtomicUsize::new(0),
        }
    }
}

impl FakeValidator {
    #[allow(dead_code)]
    pub async fn set_verdict(&self, verdict: &str) {
        *self.verdict.lock().await = verdict.to_string();
    }
}

#[async_trait]
impl ContentValidator for FakeValidator {
    async fn validate_content(&self, _extracted_json: &str, _rules_json: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.verdict.lock().await.clone())
    }
}

#[derive(Default)]
pub struct FakeEnhancer {
    pub fail: std::sync::atomic::AtomicBool,
}

#[async_trait]
impl ContentEnhancer for FakeEnhancer {
    async fn enhance_content(&self, content_json: &str) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("enhancement service unavailable"));
        }
        Ok(content_json.to_string())
    }
}

pub struct FakeRenderer {
    pub bytes: Vec<u8>,
    pub calls: AtomicUsize,
}

impl Default for FakeRenderer {
    fn default() -> Self {
        Self {
            bytes: b"PK fake pptx".to_vec(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl PresentationRenderer for FakeRenderer {
    async fn build_presentation(
        &self,
        _template: &TemplateConfig,
        _content: &Value,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.bytes.clone())
    }
}

pub struct TestApp {
    pub state: AppState,
    router: Router,
    pub repo: Arc<InMemoryRepository>,
    pub storage: Arc<FakeStorage>,
    pub extractor: Arc<FakeExtractor>,
    pub validator: Arc<FakeValidator>,
    pub renderer: Arc<FakeRenderer>,
    pub enhancer: Arc<FakeEnhancer>,
    pub section_extractor: Arc<FakeSectionExtractor>,
}

impl TestApp {
    pub fn new() -> Self {
        let config = Arc::new(test_config());
        let repo = Arc::new(InMemoryRepository::default());
        let storage = Arc::new(FakeStorage::default());
        let extractor = Arc::new(FakeExtractor::default());
        let validator = Arc::new(FakeValidator::default());
        let renderer = Arc::new(FakeRenderer::default());
        let enhancer = Arc::new(FakeEnhancer::default());
        let section_extractor = Arc::new(FakeSectionExtractor::default());

        let repo_for_state: Arc<dyn Repository> = repo.clone();
        let state = AppState {
            config: config.clone(),
            jwt: Arc::new(JwtService::from_config(&config)),
            repo: repo_for_state.clone(),
            storage: storage.clone(),
            access: Arc::new(DbAccessControl::new(repo_for_state)),
            pdf_converter: Arc::new(FakePdfConverter),
            text_extractor: extractor.clone(),
            summarizer: Arc::new(FakeSummarizer::default()),
            section_extractor: section_extractor.clone(),
            content_validator: validator.clone(),
            content_enhancer: enhancer.clone(),
            renderer: renderer.clone(),
        };
        let router = routes::create_router(state.clone());

        Self {
            state,
            router,
            repo,
            storage,
            extractor,
            validator,
            renderer,
            enhancer,
            section_extractor,
        }
    }

    #[allow(dead_code)]
    pub async fn insert_user(&self, username: &str, password: &str, role: &str) -> Result<Uuid> {
        let password_hash = hash_password(password)?;
        Ok(self.repo.add_user(username, &password_hash, role).await)
    }

    #[allow(dead_code)]
    pub async fn login_token(&self, username: &str, password: &str) -> Result<String> {
        #[derive(Serialize)]
        struct LoginPayload<'a> {
            username: &'a str,
            password: &'a str,
        }

        let response = self
            .post_json(
                "/api/auth/login",
                &LoginPayload { username, password },
                None,
            )
            .await?;

        ensure!(
            response.status() == StatusCode::OK,
            "login failed with status {}",
            response.status()
        );

        let body = body_to_vec(response.into_body()).await?;
        #[derive(serde::Deserialize)]
        struct LoginResponse {
            access_token: String,
        }
        let parsed: LoginResponse = serde_json::from_slice(&body)?;
        Ok(parsed.access_token)
    }

    /// Seeds a document with one version and its source bytes in storage.
    #[allow(dead_code)]
    pub async fn insert_document_version(
        &self,
        title: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<(Uuid, Uuid)> {
        let document_id = Uuid::new_v4();
        let version_id = Uuid::new_v4();
        let container = self.state.config.container_documents.clone();
        let path = format!("{document_id}/1/{file_name}");

        self.storage
            .put_object(&container, &path, data.to_vec(), Some(content_type.to_string()))
            .await?;

        self.repo
            .insert_document_with_version(
                NewDocument {
                    id: document_id,
                    title: title.to_string(),
                    status: "ACTIVE".to_string(),
                    current_version_number: 1,
                },
                NewDocumentVersion {
                    id: version_id,
                    document_id,
                    version_number: 1,
                    file_path: object_key(&container, &path),
                    file_name: file_name.to_string(),
                    file_size: data.len() as i64,
                    content_type: content_type.to_string(),
                    checksum: "test-checksum".to_string(),
                },
            )
            .await?;

        Ok((document_id, version_id))
    }

    #[allow(dead_code)]
    pub async fn insert_pptx_version(&self, title: &str) -> Result<(Uuid, Uuid)> {
        self.insert_document_version(title, "deck.pptx", CONTENT_TYPE_PPTX, b"PK deck bytes")
            .await
    }

    #[allow(dead_code)]
    pub async fn insert_agent(&self, name: &str, template_config: Value, active: bool) -> Result<Uuid> {
        let agent = self
            .repo
            .insert_agent(NewCaseStudyAgent {
                id: Uuid::new_v4(),
                name: name.to_string(),
                description: None,
                template_config,
                is_active: false,
            })
            .await?;
        if active {
            self.repo.activate_agent(agent.id).await?;
        }
        Ok(agent.id)
    }

    /// Runs both worker families until the queue has nothing runnable left.
    #[allow(dead_code)]
    pub async fn drain_jobs(&self) -> Result<()> {
        let rendition_worker = Worker::new(
            self.state.clone(),
            Arc::new(RenditionHandler),
            Duration::from_millis(1),
        );
        let case_study_worker = Worker::new(
            self.state.clone(),
            Arc::new(CaseStudyHandler),
            Duration::from_millis(1),
        );

        loop {
            let mut progressed = false;
            while rendition_worker.run_once().await? {
                progressed = true;
            }
            while case_study_worker.run_once().await? {
                progressed = true;
            }
            if !progressed {
                return Ok(());
            }
        }
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn post_empty(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::POST).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

#[allow(dead_code)]
pub async fn body_to_json(body: Body) -> Result<Value> {
    let bytes = body_to_vec(body).await?;
    serde_json::from_slice(&bytes).context("response body is not JSON")
}

fn test_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://unused/test".to_string(),
        database_max_pool_size: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        jwt_secret: "test-secret".to_string(),
        jwt_issuer: "test-issuer".to_string(),
        jwt_audience: "test-audience".to_string(),
        jwt_expiry_minutes: 60,
        cors_allowed_origin: None,
        aws_endpoint_url: None,
        aws_access_key_id: None,
        aws_secret_access_key: None,
        aws_region: "us-east-1".to_string(),
        s3_bucket: "test-bucket".to_string(),
        container_documents: "documents".to_string(),
        container_renditions: "renditions".to_string(),
        container_summaries: "summaries".to_string(),
        openai_endpoint: "http://openai.invalid".to_string(),
        openai_api_key: "test-key".to_string(),
        openai_chat_deployment: "gpt-test".to_string(),
        docintel_endpoint: "http://docintel.invalid".to_string(),
        docintel_api_key: "test-key".to_string(),
        renderer_endpoint: "http://renderer.invalid".to_string(),
        soffice_binary: "soffice".to_string(),
        worker_poll_interval_secs: 1,
        rendition_workers: 1,
        case_study_workers: 1,
    }
}

fn hash_password(password: &str) -> Result<String> {
    use argon2::password_hash::{PasswordHasher, SaltString};
    use argon2::Argon2;

    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?
        .to_string())
}
