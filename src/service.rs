//! Request boundary: `generate`, `enhance_description`, `package_for_download`.
//!
//! Every internal error is logged here with full detail and translated into a
//! [`ServiceError`], whose user-facing message never carries internal text.
//!
//! ## Generate pipeline
//!
//! ```text
//! validate ──► allocate ──► rasterize (blocking pool) ──► compose ──► persist
//!    │            │               │                          │
//!    └ Validation └ Generation    └ Generation + reclaim     └ Generation + reclaim
//! ```
//!
//! Artifact write failures inside `persist` are recorded on the bundle and
//! never escalate.

use crate::compose::{self, RawFields};
use crate::config::ForgeConfig;
use crate::credits::{CreditError, CreditLedger, UsageEntry, UsageKind, User};
use crate::enhance::TextEnhancer;
use crate::imaging::{self, RustBackend};
use crate::links::{canonicalize_url, is_web_url};
use crate::package::{self, ArtifactSet};
use crate::session::{Session, SessionId, SessionStore};
use crate::types::{IconCatalog, SiteAssetBundle};
use crate::upload::Upload;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("generation failed")]
    Generation,
    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: u32, available: u32 },
    #[error("session expired")]
    SessionExpired,
    #[error("packaging failed")]
    Packaging,
    #[error("upstream service failed")]
    Upstream,
}

impl ServiceError {
    /// HTTP-equivalent status code.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::Validation(_) => 400,
            ServiceError::Generation | ServiceError::Packaging => 500,
            ServiceError::InsufficientCredits { .. } => 402,
            ServiceError::SessionExpired => 404,
            ServiceError::Upstream => 502,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Packaging | ServiceError::Upstream)
    }

    /// Text safe to show an end user.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Validation(reason) => reason.clone(),
            ServiceError::Generation => {
                "We could not generate your assets. Please try again.".to_string()
            }
            ServiceError::InsufficientCredits { required, available } => format!(
                "This needs {required} credit(s); you have {available}."
            ),
            ServiceError::SessionExpired => {
                "This download has expired. Please generate your assets again.".to_string()
            }
            ServiceError::Packaging => {
                "We could not prepare your download. Please try again.".to_string()
            }
            ServiceError::Upstream => {
                "The text service is unavailable right now. Please try again.".to_string()
            }
        }
    }
}

/// Input to [`SeoService::generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateRequest {
    pub title: String,
    pub description: String,
    pub site_url: String,
    /// Newline-delimited; may be empty.
    pub site_links: String,
    /// Validated by the service, deleted by the caller.
    pub image: Option<Upload>,
}

/// What to package.
#[derive(Debug, Clone, Copy)]
pub enum PackageTarget<'a> {
    /// A bundle the caller still holds.
    Bundle(&'a SiteAssetBundle),
    /// Only the id; everything is read back from the namespace.
    Session(&'a SessionId),
}

impl PackageTarget<'_> {
    fn session_id(&self) -> &SessionId {
        match self {
            PackageTarget::Bundle(bundle) => &bundle.session_id,
            PackageTarget::Session(id) => id,
        }
    }
}

pub struct SeoService {
    config: Arc<ForgeConfig>,
    store: Arc<SessionStore>,
    ledger: Arc<dyn CreditLedger>,
    enhancer: Arc<dyn TextEnhancer>,
}

impl SeoService {
    pub fn new(
        config: Arc<ForgeConfig>,
        store: Arc<SessionStore>,
        ledger: Arc<dyn CreditLedger>,
        enhancer: Arc<dyn TextEnhancer>,
    ) -> Self {
        Self {
            config,
            store,
            ledger,
            enhancer,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &ForgeConfig {
        &self.config
    }

    fn validate(&self, request: &GenerateRequest) -> Result<(), ServiceError> {
        if request.title.trim().is_empty() {
            return Err(ServiceError::Validation("A title is required.".into()));
        }
        if request.description.trim().is_empty() {
            return Err(ServiceError::Validation("A description is required.".into()));
        }
        let url = canonicalize_url(&request.site_url);
        if url.is_empty() {
            return Err(ServiceError::Validation("A site URL is required.".into()));
        }
        if !is_web_url(&url) || url.contains(['<', '>', '"', ' ']) {
            return Err(ServiceError::Validation(
                "The site URL must be a full http:// or https:// address.".into(),
            ));
        }
        if let Some(upload) = &request.image {
            upload.validate(&self.config.uploads).map_err(|e| {
                warn!(file = %upload.original_name, error = %e, "upload rejected");
                ServiceError::Validation(format!("The logo was rejected: {e}."))
            })?;
        }
        Ok(())
    }

    /// Run the whole pipeline for one request.
    pub async fn generate(&self, request: GenerateRequest) -> Result<SiteAssetBundle, ServiceError> {
        self.validate(&request)?;

        let session = self.store.allocate().await.map_err(|e| {
            error!(error = %e, "namespace allocation failed");
            ServiceError::Generation
        })?;

        match self.run_pipeline(&session, &request).await {
            Ok(bundle) => {
                info!(
                    session = %session.id,
                    icons = bundle.icons.as_ref().map_or(0, |c| c.icons.len()),
                    links = bundle.site_links.len(),
                    "assets generated"
                );
                Ok(bundle)
            }
            Err(e) => {
                if let Err(cleanup) = self.store.reclaim_now(&session.id).await {
                    warn!(session = %session.id, error = %cleanup, "failed to reclaim namespace");
                }
                Err(e)
            }
        }
    }

    async fn run_pipeline(
        &self,
        session: &Session,
        request: &GenerateRequest,
    ) -> Result<SiteAssetBundle, ServiceError> {
        let catalog = match &request.image {
            Some(upload) => Some(self.rasterize(session, upload).await?),
            None => None,
        };

        let generated_at: DateTime<Utc> = self.store.clock().now().into();
        let raw = RawFields {
            title: &request.title,
            description: &request.description,
            site_url: &request.site_url,
            site_links: &request.site_links,
        };
        let mut bundle = compose::compose(
            raw,
            catalog,
            session.id.clone(),
            generated_at,
            &self.config.webapp,
        )
        .map_err(|e| {
            error!(session = %session.id, error = %e, "composition failed");
            ServiceError::Generation
        })?;

        compose::persist(&mut bundle, &session.namespace).await;
        Ok(bundle)
    }

    async fn rasterize(
        &self,
        session: &Session,
        upload: &Upload,
    ) -> Result<IconCatalog, ServiceError> {
        let source = upload.path.clone();
        let target = session.clone();
        let config = Arc::clone(&self.config);

        let result = tokio::task::spawn_blocking(move || {
            imaging::rasterize_catalog(
                &RustBackend::new(),
                &source,
                &target,
                &config.icons,
                &config.social,
            )
        })
        .await;

        match result {
            Ok(Ok(catalog)) => Ok(catalog),
            Ok(Err(e)) => {
                error!(session = %session.id, file = %upload.original_name, error = %e, "rasterization failed");
                Err(ServiceError::Generation)
            }
            Err(e) => {
                error!(session = %session.id, error = %e, "rasterizer task failed");
                Err(ServiceError::Generation)
            }
        }
    }

    /// Improve a description through the text service, charging the user.
    ///
    /// The balance check and the debit both finish before the upstream call.
    /// When the call fails the debit is refunded and the caller gets
    /// [`ServiceError::Upstream`].
    pub async fn enhance_description(&self, text: &str, user: &User) -> Result<String, ServiceError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ServiceError::Validation("A description is required.".into()));
        }
        let cost = self.config.credits.enhance_cost;

        let ledger_down = |e: CreditError| {
            error!(user = %user.id, error = %e, "credit ledger failed");
            ServiceError::Upstream
        };

        if !self.ledger.has_credits(user, cost).await.map_err(ledger_down)? {
            let available = self.ledger.balance(user).await.map_err(ledger_down)?;
            return Err(ServiceError::InsufficientCredits {
                required: cost,
                available,
            });
        }
        match self.ledger.debit(user, cost).await {
            Ok(_) => {}
            Err(CreditError::Insufficient { required, available }) => {
                return Err(ServiceError::InsufficientCredits { required, available });
            }
            Err(e) => return Err(ledger_down(e)),
        }

        match self.enhancer.enhance(text).await {
            Ok(improved) => {
                self.record(user, UsageKind::Enhance, cost, "description enhancement")
                    .await;
                Ok(improved)
            }
            Err(e) => {
                error!(user = %user.id, error = %e, "enhancement failed");
                match self.ledger.credit(user, cost).await {
                    Ok(_) => {
                        self.record(user, UsageKind::Refund, cost, "enhancement failed upstream")
                            .await
                    }
                    Err(refund) => {
                        error!(user = %user.id, error = %refund, "refund failed")
                    }
                }
                Err(ServiceError::Upstream)
            }
        }
    }

    async fn record(&self, user: &User, kind: UsageKind, amount: u32, detail: &str) {
        let entry = UsageEntry {
            at: self.store.clock().now().into(),
            kind,
            amount,
            detail: detail.to_string(),
        };
        if let Err(e) = self.ledger.log_usage(user, entry).await {
            warn!(user = %user.id, error = %e, "usage not logged");
        }
    }

    /// Write the download archive into the session's `temp/` and return its path.
    pub async fn package_for_download(
        &self,
        target: PackageTarget<'_>,
    ) -> Result<PathBuf, ServiceError> {
        let id = target.session_id();
        let Some(namespace) = self.store.namespace(id).await else {
            info!(session = %id, "package requested for expired session");
            return Err(ServiceError::SessionExpired);
        };

        let set = match target {
            PackageTarget::Bundle(bundle) => ArtifactSet::from_bundle(bundle, &namespace),
            PackageTarget::Session(_) => match ArtifactSet::from_namespace(&namespace).await {
                Ok(set) => set,
                Err(e) => return Err(self.packaging_failure(id, e).await),
            },
        };

        let output = namespace
            .join(crate::session::SCRATCH_DIR)
            .join(package::archive_name(id));
        match package::package_archive(set, &output).await {
            Ok(path) => Ok(path),
            Err(e) => Err(self.packaging_failure(id, e).await),
        }
    }

    /// A namespace reclaimed mid-packaging reads as expired, not as a failure.
    async fn packaging_failure(&self, id: &SessionId, e: package::PackageError) -> ServiceError {
        if self.store.namespace(id).await.is_none() {
            info!(session = %id, "session expired during packaging");
            return ServiceError::SessionExpired;
        }
        error!(session = %id, error = %e, "packaging failed");
        ServiceError::Packaging
    }

    /// Clear the session's scratch space once the archive has been served.
    pub async fn finish_download(&self, id: &SessionId) -> Result<(), ServiceError> {
        self.store.clear_scratch(id).await.map_err(|e| match e {
            crate::session::SessionError::NotFound(_) => ServiceError::SessionExpired,
            other => {
                error!(session = %id, error = %other, "scratch cleanup failed");
                ServiceError::Packaging
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{FixtureService, RecordingEnhancer, png_upload, request};
    use tempfile::TempDir;

    #[test]
    fn error_taxonomy() {
        assert_eq!(ServiceError::Validation("x".into()).status(), 400);
        assert_eq!(ServiceError::Generation.status(), 500);
        assert_eq!(
            ServiceError::InsufficientCredits { required: 1, available: 0 }.status(),
            402
        );
        assert_eq!(ServiceError::SessionExpired.status(), 404);
        assert_eq!(ServiceError::Packaging.status(), 500);
        assert_eq!(ServiceError::Upstream.status(), 502);
        assert!(ServiceError::Upstream.is_retryable());
        assert!(ServiceError::Packaging.is_retryable());
        assert!(!ServiceError::Generation.is_retryable());
    }

    #[tokio::test]
    async fn validation_happens_before_allocation() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);

        for bad in [
            GenerateRequest { title: "  ".into(), ..request() },
            GenerateRequest { description: "".into(), ..request() },
            GenerateRequest { site_url: "example.com".into(), ..request() },
            GenerateRequest { site_url: "ftp://example.com".into(), ..request() },
        ] {
            assert!(matches!(
                fx.service.generate(bad).await,
                Err(ServiceError::Validation(_))
            ));
        }
        assert!(!fx.sessions_root().exists() || fx.namespace_count() == 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_a_validation_error() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let mut upload = png_upload(&tmp, 64, 64);
        upload.size = 6 * 1024 * 1024;

        let result = fx
            .service
            .generate(GenerateRequest { image: Some(upload), ..request() })
            .await;
        assert!(matches!(result, Err(ServiceError::Validation(_))));
    }

    #[tokio::test]
    async fn undecodable_image_reclaims_namespace() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let path = tmp.path().join("broken.png");
        std::fs::write(&path, b"not really a png").unwrap();
        let upload = Upload::from_path(&path).unwrap();

        let result = fx
            .service
            .generate(GenerateRequest { image: Some(upload), ..request() })
            .await;
        assert_eq!(result, Err(ServiceError::Generation));
        assert!(!ServiceError::Generation.user_message().contains("png"));
        assert_eq!(fx.namespace_count(), 0);
    }

    #[tokio::test]
    async fn generate_with_logo_persists_icons() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let upload = png_upload(&tmp, 300, 150);

        let bundle = fx
            .service
            .generate(GenerateRequest { image: Some(upload.clone()), ..request() })
            .await
            .unwrap();

        let catalog = bundle.icons.as_ref().unwrap();
        assert_eq!(catalog.icons.len(), 14);
        let namespace = fx.service.store().namespace(&bundle.session_id).await.unwrap();
        for icon in catalog.all() {
            assert!(namespace.join("icons").join(&icon.file_name).is_file());
        }
        assert!(namespace.join("site.webmanifest").is_file());
        // the upload belongs to the caller
        assert!(upload.path.exists());
    }

    #[tokio::test]
    async fn enhance_with_zero_credits_makes_no_upstream_call() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let user = User::new("broke");

        let result = fx.service.enhance_description("My shop", &user).await;
        assert_eq!(
            result,
            Err(ServiceError::InsufficientCredits { required: 1, available: 0 })
        );
        assert_eq!(fx.enhancer.calls(), 0);
    }

    #[tokio::test]
    async fn enhance_debits_and_logs() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let user = User::new("paying");
        fx.ledger.grant(&user, 2).await;

        let improved = fx.service.enhance_description("My shop", &user).await.unwrap();
        assert_eq!(improved, "Improved: My shop");
        assert_eq!(fx.ledger.balance(&user).await.unwrap(), 1);
        let history = fx.ledger.history(&user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, UsageKind::Enhance);
    }

    #[tokio::test]
    async fn upstream_failure_refunds_credit() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::with_enhancer(&tmp, RecordingEnhancer::failing());
        let user = User::new("paying");
        fx.ledger.grant(&user, 1).await;

        let result = fx.service.enhance_description("My shop", &user).await;
        assert_eq!(result, Err(ServiceError::Upstream));
        assert_eq!(fx.enhancer.calls(), 1);
        assert_eq!(fx.ledger.balance(&user).await.unwrap(), 1);
        let history = fx.ledger.history(&user).await.unwrap();
        assert_eq!(history.last().unwrap().kind, UsageKind::Refund);
    }

    #[tokio::test]
    async fn package_unknown_session_is_expired() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let id = SessionId::generate();

        assert_eq!(
            fx.service.package_for_download(PackageTarget::Session(&id)).await,
            Err(ServiceError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn package_after_reclaim_is_expired() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let bundle = fx.service.generate(request()).await.unwrap();
        fx.service.store().reclaim_now(&bundle.session_id).await.unwrap();

        assert_eq!(
            fx.service.package_for_download(PackageTarget::Bundle(&bundle)).await,
            Err(ServiceError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn package_and_finish_download() {
        let tmp = TempDir::new().unwrap();
        let fx = FixtureService::new(&tmp);
        let bundle = fx.service.generate(request()).await.unwrap();

        let archive = fx
            .service
            .package_for_download(PackageTarget::Session(&bundle.session_id))
            .await
            .unwrap();
        assert!(archive.is_file());
        assert!(archive.parent().unwrap().ends_with("temp"));

        fx.service.finish_download(&bundle.session_id).await.unwrap();
        assert!(!archive.exists());
        assert!(archive.parent().unwrap().is_dir());
    }
}
