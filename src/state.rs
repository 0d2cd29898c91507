use std::sync::Arc;

use crate::acl::AccessControl;
use crate::ai::{ContentEnhancer, ContentValidator, SectionExtractor, Summarizer};
use crate::auth::jwt::JwtService;
use crate::config::AppConfig;
use crate::convert::PdfConverter;
use crate::extract::TextExtractor;
use crate::render::PresentationRenderer;
use crate::repo::Repository;
use crate::storage::ObjectStorage;

/// Shared application state. Every collaborator sits behind a trait object so
/// the router and worker loops can run against fakes in tests.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtService>,
    pub repo: Arc<dyn Repository>,
    pub storage: Arc<dyn ObjectStorage>,
    pub access: Arc<dyn AccessControl>,
    pub pdf_converter: Arc<dyn PdfConverter>,
    pub text_extractor: Arc<dyn TextExtractor>,
    pub summarizer: Arc<dyn Summarizer>,
    pub section_extractor: Arc<dyn SectionExtractor>,
    pub content_validator: Arc<dyn ContentValidator>,
    pub content_enhancer: Arc<dyn ContentEnhancer>,
    pub renderer: Arc<dyn PresentationRenderer>,
}
