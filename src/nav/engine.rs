//! Per-request navigation engine
//!
//! A page handler builds one engine per request, bound to the current actor
//! (or to nobody on public pages):
//!
//! ```text
//! load_state / load_from_cache
//!        │
//!        ▼
//! add_link / add_head / add_hidden_link / add_text_link   (page renders)
//!        │
//!        ├──► check_request_url   authorize the incoming request
//!        ├──► finish              persist + flush, page ends normally
//!        └──► redirect            persist + flush + commit, then Redirect
//! ```
//!
//! A link must be offered before it can be followed, and following one
//! consumes everything the previous page offered.
//!
//! The actor snapshot is last-writer-wins: two tabs of the same actor can
//! overwrite each other's offered links. Nothing here locks across requests.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::output::anchor;
use super::{
    Link, LinkRecord, LinkRegistry, OutputSink, PageNamespace, PathValidator, Redirect,
    RedirectSettings, RequestContext, REDIRECT_LINK_NAME,
};
use crate::auth::{AuthorizationPredicate, Restriction};
use crate::db::schemas::ActorDoc;
use crate::db::{RecordStore, TransactionGateway};
use crate::logging::{AuditLog, EventType, NavigationEvent, Severity, TracingAudit};
use crate::types::{NavError, Result};

/// Why an `add` was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// URL failed the path-safety check
    UnsafePath,
    /// Actor does not satisfy the link's restriction
    Unauthorized,
}

/// Result of offering a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// Appended or spliced into the registry
    Added,
    /// A matching record was already offered; nothing changed
    AlreadyOffered,
    Rejected(Rejection),
}

impl AddOutcome {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, AddOutcome::Rejected(_))
    }
}

/// Collaborators of one request.
///
/// Validator, audit log and redirect settings are shared across requests.
/// The store and gateway are that request's unit of work: build a fresh
/// bundle with [`NavServices::for_request`] so a redirect flushes and commits
/// only what its own request staged.
#[derive(Clone)]
pub struct NavServices {
    pub store: Arc<dyn RecordStore>,
    pub transactions: Arc<dyn TransactionGateway>,
    pub validator: Arc<dyn PathValidator>,
    pub audit: Arc<dyn AuditLog>,
    pub redirect: RedirectSettings,
}

impl NavServices {
    /// Default validator, tracing audit, `Location` redirects to `/`
    pub fn new(store: Arc<dyn RecordStore>, transactions: Arc<dyn TransactionGateway>) -> Self {
        Self {
            store,
            transactions,
            validator: Arc::new(PageNamespace::new()),
            audit: Arc::new(TracingAudit),
            redirect: RedirectSettings::default(),
        }
    }

    /// Use one object as both record store and transaction gateway
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: RecordStore + TransactionGateway + 'static,
    {
        Self::new(store.clone(), store)
    }

    /// Same shared settings, bound to another request's unit of work
    pub fn for_request<S>(&self, store: Arc<S>) -> Self
    where
        S: RecordStore + TransactionGateway + 'static,
    {
        Self {
            store: store.clone(),
            transactions: store,
            ..self.clone()
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn PathValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_redirect(mut self, settings: RedirectSettings) -> Self {
        self.redirect = settings;
        self
    }
}

pub struct NavigationEngine<'a> {
    services: &'a NavServices,
    actor: Option<&'a mut ActorDoc>,
    output: Option<&'a mut (dyn OutputSink + Send)>,
    request: RequestContext,
    registry: LinkRegistry,
    validation_enabled: bool,
    last_add_outcome: bool,
    cache_navigation: bool,
}

impl<'a> NavigationEngine<'a> {
    /// Validation starts enabled iff an actor is bound
    pub fn new(services: &'a NavServices, actor: Option<&'a mut ActorDoc>) -> Self {
        let validation_enabled = actor.is_some();
        Self {
            services,
            actor,
            output: None,
            request: RequestContext::default(),
            registry: LinkRegistry::new(),
            validation_enabled,
            last_add_outcome: false,
            cache_navigation: false,
        }
    }

    pub fn with_output(mut self, sink: &'a mut (dyn OutputSink + Send)) -> Self {
        self.output = Some(sink);
        self
    }

    pub fn with_request(mut self, request: RequestContext) -> Self {
        self.request = request;
        self
    }

    pub fn actor(&self) -> Option<&ActorDoc> {
        self.actor.as_deref()
    }

    // ------------------------------------------------------------------
    // Offering links
    // ------------------------------------------------------------------

    /// Offer a link. `absolute_position` is 1-based.
    pub fn add(&mut self, link: Link, absolute_position: Option<usize>) -> AddOutcome {
        let outcome = self.admit(&link, absolute_position);
        self.last_add_outcome = outcome.is_accepted();
        outcome
    }

    fn admit(&mut self, link: &Link, absolute_position: Option<usize>) -> AddOutcome {
        if self.validation_enabled {
            if let Some(url) = link.url() {
                if !self.services.validator.validate(url) {
                    debug!(url, "Link rejected: unsafe path");
                    return AddOutcome::Rejected(Rejection::UnsafePath);
                }
            }
        }

        if self.registry.exists(link.display_name(), link.url()) {
            return AddOutcome::AlreadyOffered;
        }

        let allowed = !self.validation_enabled
            || link
                .restriction()
                .map_or(true, |r| r.is_allowed_by(self.actor.as_deref()));

        if !allowed {
            debug!(
                name = link.display_name().unwrap_or("-"),
                url = link.url().unwrap_or("-"),
                "Link rejected: restriction not met"
            );
            return AddOutcome::Rejected(Rejection::Unauthorized);
        }

        self.registry.insert(link.to_record(), absolute_position);
        AddOutcome::Added
    }

    /// Section header in `container`
    pub fn add_head(
        &mut self,
        title: &str,
        container: &str,
        restriction: Option<Restriction>,
    ) -> &mut Self {
        let link = Link::head(title)
            .with_container(container)
            .with_restriction(restriction);
        self.add(link, None);
        self
    }

    /// Visible link in `container`
    pub fn add_link(
        &mut self,
        name: &str,
        url: &str,
        container: &str,
        restriction: Option<Restriction>,
    ) -> &mut Self {
        let link = Link::named(name, url)
            .with_container(container)
            .with_restriction(restriction);
        self.add(link, None);
        self
    }

    /// Target that may be followed but is not listed, e.g. a form action
    pub fn add_hidden_link(&mut self, url: &str, restriction: Option<Restriction>) -> &mut Self {
        self.add(Link::hidden(url).with_restriction(restriction), None);
        self
    }

    /// Hidden link plus an anchor written to the output sink. Nothing is
    /// written when the link was refused.
    pub fn add_text_link(
        &mut self,
        text: &str,
        url: &str,
        restriction: Option<Restriction>,
    ) -> Result<&mut Self> {
        self.add_hidden_link(url, restriction);

        if self.last_add_outcome {
            let sink = self
                .output
                .as_mut()
                .ok_or_else(|| NavError::OutputSinkUnavailable(url.to_string()))?;
            sink.output(&anchor(text, url));
        }

        Ok(self)
    }

    /// Drop every offered link whose display name or URL is `key`
    pub fn remove(&mut self, key: &str) -> usize {
        self.registry.remove(key)
    }

    pub fn exists(&self, display_name: Option<&str>, url: Option<&str>) -> bool {
        self.registry.exists(display_name, url)
    }

    pub fn link_list(&self) -> &[LinkRecord] {
        self.registry.records()
    }

    pub fn registry(&self) -> &LinkRegistry {
        &self.registry
    }

    pub fn clear(&mut self) {
        self.registry.clear();
    }

    /// Whether the most recent `add` was accepted
    pub fn last_add_outcome(&self) -> bool {
        self.last_add_outcome
    }

    pub fn enable_validation(&mut self) {
        self.validation_enabled = true;
    }

    pub fn disable_validation(&mut self) {
        self.validation_enabled = false;
    }

    pub fn validation_enabled(&self) -> bool {
        self.validation_enabled
    }

    /// Also write the cache snapshot on the next `save`
    pub fn set_cache_navigation(&mut self, enabled: bool) {
        self.cache_navigation = enabled;
    }

    pub fn cache_navigation(&self) -> bool {
        self.cache_navigation
    }

    // ------------------------------------------------------------------
    // Request authorization
    // ------------------------------------------------------------------

    pub fn request_url(&self) -> Option<String> {
        self.request.request_url()
    }

    pub fn referer_url(&self) -> Option<String> {
        self.request.referer_url()
    }

    /// Authorize `url` (default: the current request URL) against the
    /// offered links. Returns the URL when it was offered, `None` otherwise.
    /// Unless `keep_registry` is set a successful check consumes the registry.
    pub async fn check_request_url(
        &mut self,
        url: Option<&str>,
        keep_registry: bool,
    ) -> Option<String> {
        let url = match url.filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => self.request.request_url()?,
        };

        if !self.registry.exists(None, Some(&url)) {
            debug!(url = %url, "Request URL was not offered");
            return None;
        }

        let event = NavigationEvent::new(
            EventType::RequestAuthorized,
            Severity::Verbose,
            format!("Open {}", url),
        )
        .with_actor(self.actor.as_deref())
        .with_url(url.as_str());
        self.services.audit.record(event).await;

        if !keep_registry {
            self.registry.clear();
        }

        Some(url)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Restore the links offered by the actor's previous page
    pub fn load_state(&mut self) {
        let snapshot = self.actor.as_deref().and_then(|a| a.allowed_navs.clone());
        match snapshot {
            Some(records) => self.registry.replace(records),
            None => self.registry.clear(),
        }
    }

    /// Replay the cache snapshot. Cached links are not re-authorized: they
    /// passed their restrictions when they were first offered. Turns caching
    /// off for the rest of the request and saves immediately.
    pub fn load_from_cache(&mut self) {
        let snapshot = self
            .actor
            .as_deref()
            .and_then(|a| a.allowed_navs_cache.clone())
            .unwrap_or_default();

        debug!(links = snapshot.len(), "Navigation replayed from cache");
        self.registry.replace(snapshot);
        self.cache_navigation = false;
        self.save();
    }

    /// Write the registry into the bound actor. No-op on public pages.
    pub fn save(&mut self) {
        let Some(actor) = self.actor.as_deref_mut() else {
            return;
        };

        actor.allowed_navs = Some(self.registry.to_vec());
        if self.cache_navigation {
            actor.allowed_navs_cache = Some(self.registry.to_vec());
        }
    }

    async fn persist_and_flush(&mut self) -> Result<()> {
        self.save();
        if let Some(actor) = self.actor.as_deref() {
            self.services.store.persist(actor).await?;
        }
        self.services.store.flush().await
    }

    /// End of a page that does not redirect: save, stage the actor, flush
    pub async fn finish(mut self) -> Result<()> {
        self.persist_and_flush().await
    }

    /// Navigate to `target`.
    ///
    /// The target is offered first so the next request passes its check.
    /// Navigation state is flushed and any open transaction committed before
    /// the [`Redirect`] exists; on any persistence error no redirect is
    /// produced.
    pub async fn redirect(mut self, target: &str) -> Result<Redirect> {
        let outcome = self.add(Link::named(REDIRECT_LINK_NAME, target), None);
        if !outcome.is_accepted() {
            warn!(url = target, ?outcome, "Redirect target could not be offered");
        }

        self.persist_and_flush().await?;

        if self.services.transactions.is_transaction_active().await {
            self.services.transactions.commit().await?;
        }

        let event = NavigationEvent::new(
            EventType::Redirected,
            Severity::Info,
            format!("Redirect to {}", target),
        )
        .with_actor(self.actor.as_deref())
        .with_url(target);
        self.services.audit.record(event).await;

        info!(url = target, "Redirecting");
        Ok(Redirect::new(&self.services.redirect, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PermissionLevel;
    use crate::db::MemoryRecordStore;

    fn services() -> NavServices {
        NavServices::shared(Arc::new(MemoryRecordStore::new()))
    }

    fn names(engine: &NavigationEngine<'_>) -> Vec<String> {
        engine
            .link_list()
            .iter()
            .map(|r| r.display_name.clone().unwrap_or_default())
            .collect()
    }

    #[test]
    fn test_validation_default_follows_actor() {
        let services = services();
        assert!(!NavigationEngine::new(&services, None).validation_enabled());

        let mut actor = ActorDoc::new("alice".to_string());
        let mut engine = NavigationEngine::new(&services, Some(&mut actor));
        assert!(engine.validation_enabled());
        engine.disable_validation();
        assert!(!engine.validation_enabled());
        engine.enable_validation();
        assert!(engine.validation_enabled());
    }

    #[test]
    fn test_duplicate_add_is_idempotent() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);

        assert_eq!(engine.add(Link::named("Home", "page=home"), None), AddOutcome::Added);
        assert_eq!(
            engine.add(Link::named("Home", "page=home"), None),
            AddOutcome::AlreadyOffered
        );
        assert!(engine.last_add_outcome());
        assert_eq!(engine.link_list().len(), 1);
    }

    #[test]
    fn test_restricted_link_rejected_for_bound_actor() {
        let services = services();
        let mut actor = ActorDoc::new("player".to_string()).with_groups(&["players"]);
        let mut engine = NavigationEngine::new(&services, Some(&mut actor));
        engine.add_link("Home", "page=home", "main", None);

        let outcome = engine.add(
            Link::named("Admin", "page=admin").with_restriction(Some(Restriction::group("admins"))),
            None,
        );

        assert_eq!(outcome, AddOutcome::Rejected(Rejection::Unauthorized));
        assert!(!engine.last_add_outcome());
        assert_eq!(names(&engine), vec!["Home"]);
    }

    #[test]
    fn test_restriction_ignored_when_validation_disabled() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);

        engine.add_link(
            "Admin",
            "page=admin",
            "main",
            Some(Restriction::Level(PermissionLevel::Admin)),
        );
        assert!(engine.last_add_outcome());
        assert!(engine.exists(Some("Admin"), Some("page=admin")));
    }

    #[test]
    fn test_restricted_link_with_validation_and_no_actor() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);
        engine.enable_validation();

        engine.add_link("Open", "page=open", "main", None);
        assert!(engine.last_add_outcome());
        engine.add_link("Club", "page=club", "main", Some(Restriction::group("members")));
        assert!(!engine.last_add_outcome());
    }

    #[test]
    fn test_unsafe_path_rejected_only_with_validation() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        let mut engine = NavigationEngine::new(&services, Some(&mut actor));

        assert_eq!(
            engine.add(Link::named("Escape", "page=../etc/passwd"), None),
            AddOutcome::Rejected(Rejection::UnsafePath)
        );
        assert!(engine.link_list().is_empty());

        engine.disable_validation();
        assert_eq!(
            engine.add(Link::named("Escape", "page=../etc/passwd"), None),
            AddOutcome::Added
        );
    }

    #[test]
    fn test_head_skips_path_check() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        let mut engine = NavigationEngine::new(&services, Some(&mut actor));

        engine.add_head("Town", "main", None);
        assert!(engine.last_add_outcome());
        assert!(engine.exists(Some("Town"), None));
    }

    #[test]
    fn test_absolute_position() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);
        engine
            .add_link("A", "page=a", "main", None)
            .add_link("B", "page=b", "main", None)
            .add_link("C", "page=c", "main", None);

        engine.add(Link::named("X", "page=x"), Some(2));
        assert_eq!(names(&engine), vec!["A", "X", "B", "C"]);
    }

    #[test]
    fn test_text_link_writes_anchor() {
        let services = services();
        let mut page = String::new();
        {
            let mut engine = NavigationEngine::new(&services, None).with_output(&mut page);
            engine
                .add_text_link("the market", "page=market", None)
                .unwrap();
            assert!(engine.exists(None, Some("page=market")));
        }
        assert_eq!(page, "<a href='?page=market'>the market</a>");
    }

    #[test]
    fn test_text_link_without_sink_fails() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);

        let result = engine.add_text_link("the market", "page=market", None);
        assert!(matches!(result, Err(NavError::OutputSinkUnavailable(_))));
    }

    #[test]
    fn test_refused_text_link_writes_nothing() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        let mut page = String::new();
        {
            let mut engine =
                NavigationEngine::new(&services, Some(&mut actor)).with_output(&mut page);
            engine
                .add_text_link("vault", "page=vault", Some(Restriction::group("bankers")))
                .unwrap();
            assert!(!engine.last_add_outcome());
        }
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn test_check_request_url_consumes_registry() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);
        engine.add_link("Home", "page=home", "main", None);
        engine.add_link("Shop", "page=shop", "main", None);

        assert!(engine.check_request_url(Some("page=bank"), false).await.is_none());
        assert_eq!(engine.link_list().len(), 2);

        let url = engine.check_request_url(Some("page=home"), false).await;
        assert_eq!(url.as_deref(), Some("page=home"));
        assert!(engine.link_list().is_empty());
    }

    #[tokio::test]
    async fn test_check_request_url_keep_registry() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);
        engine.add_link("Home", "page=home", "main", None);

        let url = engine.check_request_url(Some("page=home"), true).await;
        assert_eq!(url.as_deref(), Some("page=home"));
        assert_eq!(engine.link_list().len(), 1);
    }

    #[tokio::test]
    async fn test_check_request_url_defaults_to_request() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None)
            .with_request(RequestContext::new("/index?page=home"));
        engine.add_hidden_link("page=home", None);

        assert_eq!(engine.request_url().as_deref(), Some("page=home"));
        assert_eq!(
            engine.check_request_url(None, false).await.as_deref(),
            Some("page=home")
        );

        let mut bare =
            NavigationEngine::new(&services, None).with_request(RequestContext::new("/index"));
        bare.add_hidden_link("page=home", None);
        assert!(bare.check_request_url(None, false).await.is_none());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        {
            let mut engine = NavigationEngine::new(&services, Some(&mut actor));
            engine
                .add_link("B", "page=b", "main", None)
                .add_link("A", "page=a", "side", None);
            engine.save();
        }
        assert!(actor.allowed_navs_cache.is_none());

        let mut engine = NavigationEngine::new(&services, Some(&mut actor));
        engine.load_state();
        assert_eq!(names(&engine), vec!["B", "A"]);
        assert_eq!(engine.link_list()[1].container, "side");
    }

    #[test]
    fn test_load_state_without_snapshot_is_empty() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        let mut engine = NavigationEngine::new(&services, Some(&mut actor));
        engine.add_link("Stale", "page=stale", "main", None);
        engine.load_state();
        assert!(engine.link_list().is_empty());

        let mut public = NavigationEngine::new(&services, None);
        public.add_link("Stale", "page=stale", "main", None);
        public.load_state();
        assert!(public.link_list().is_empty());
    }

    #[test]
    fn test_save_is_noop_without_actor() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);
        engine.add_link("Home", "page=home", "main", None);
        engine.set_cache_navigation(true);
        engine.save();
        assert!(engine.actor().is_none());
    }

    #[test]
    fn test_cache_snapshot_written_when_flagged() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        {
            let mut engine = NavigationEngine::new(&services, Some(&mut actor));
            engine.set_cache_navigation(true);
            engine.add_link("Home", "page=home", "main", None);
            engine.save();
        }
        assert_eq!(actor.allowed_navs, actor.allowed_navs_cache);
        assert_eq!(actor.allowed_navs_cache.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_load_from_cache_replays_without_reauthorizing() {
        let services = services();
        let mut actor = ActorDoc::new("alice".to_string());
        actor.allowed_navs = Some(vec![LinkRecord::new(Some("Old"), Some("page=old"))]);
        // Would be refused by a restriction today; the cache trusts it
        actor.allowed_navs_cache = Some(vec![LinkRecord::new(Some("Vault"), Some("page=vault"))]);

        {
            let mut engine = NavigationEngine::new(&services, Some(&mut actor));
            engine.set_cache_navigation(true);
            engine.load_from_cache();
            assert!(!engine.cache_navigation());
            assert_eq!(names(&engine), vec!["Vault"]);
        }

        let navs = actor.allowed_navs.unwrap();
        assert_eq!(navs[0].url.as_deref(), Some("page=vault"));
    }

    #[test]
    fn test_remove() {
        let services = services();
        let mut engine = NavigationEngine::new(&services, None);
        engine
            .add_link("Home", "page=home", "main", None)
            .add_link("Shop", "page=shop", "main", None);

        assert_eq!(engine.remove("page=home"), 1);
        assert_eq!(names(&engine), vec!["Shop"]);
    }
}
