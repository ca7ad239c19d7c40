use async_trait::async_trait;
use axum::Router;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{
    Event, Level, Subscriber,
    field::{Field, Visit},
};
use tracing_subscriber::layer::{Context, Layer};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

use carwatch::{
    api,
    app_state::AppState,
    entities::Listing,
    fetcher::Fetcher,
    notifier::NotifyError,
    orchestrator::{ListingStore, Notifier, PipelineSettings, SiteScraper},
    repositories::{ListingRepository, MemoryStore},
};

pub const SITE_ORIGIN: &str = "https://www.polovniautomobili.com";

/// One advertisement block with every field populated.
pub fn block(id: u32, slug: &str) -> String {
    format!(
        r#"<article class="classified ordinaryClassified">
  <a href="/auto-oglasi/{id}/{slug}" title="Alfa Romeo {slug}">x</a>
  <span> 12.500 € </span>
  <div class="top" title="2015. Limuzina">a</div>
  <div class="bottom" title="Dizel | 1956 cm3">b</div>
  <div class="top" title="150.000 km">c</div>
  <div class="bottom uk-hidden-medium uk-hidden-small" title="103kW (140KS)">d</div>
</article>"#
    )
}

/// A block without any listing link.
pub fn linkless_block() -> String {
    r#"<article class="classified"><span> 3.000 € </span><div class="top" title="2005. Hečbek">a</div></article>"#
        .to_string()
}

pub fn page_body(blocks: &[String]) -> String {
    format!("<html><body><section>{}</section></body></html>", blocks.join("\n"))
}

pub fn post_link(id: u32, slug: &str) -> String {
    format!("{SITE_ORIGIN}/auto-oglasi/{id}/{slug}")
}

/// Serve `body` as results page `page` of the listings site.
pub async fn mount_page(server: &MockServer, page: u32, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/auto-oglasi/pretraga"))
        .and(query_param("page", page.to_string()))
        .respond_with(response)
        .mount(server)
        .await;
}

pub fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("Content-Type", "text/html; charset=utf-8")
}

/// Records every notification and fails for the configured links.
#[derive(Default)]
pub struct StubNotifier {
    pub failing_links: Vec<String>,
    pub sent: Mutex<Vec<String>>,
    pub attempted: Mutex<Vec<String>>,
}

impl StubNotifier {
    pub fn failing_for(links: &[String]) -> Self {
        Self {
            failing_links: links.to_vec(),
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attempted(&self) -> Vec<String> {
        self.attempted.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for StubNotifier {
    async fn notify(&self, _subject: &str, listing: &Listing) -> Result<(), NotifyError> {
        self.attempted
            .lock()
            .unwrap()
            .push(listing.post_link.clone());
        if self.failing_links.contains(&listing.post_link) {
            return Err(NotifyError::Remote {
                status: 554,
                detail: "relay rejected message".into(),
            });
        }
        self.sent.lock().unwrap().push(listing.post_link.clone());
        Ok(())
    }
}

pub fn settings() -> PipelineSettings {
    PipelineSettings {
        notify_concurrency: 2,
        deadline: Duration::from_secs(10),
        subject: "New Car Listed".into(),
    }
}

/// All-in-one state against a mocked listings site and an in-memory store.
pub fn test_state(site: &MockServer, store: Arc<MemoryStore>, notifier: Arc<StubNotifier>) -> AppState {
    let source = SiteScraper::new(Fetcher::new().unwrap(), site.uri());
    AppState::with_repository(
        Arc::new(source),
        ListingRepository::new(store),
        notifier,
        settings(),
    )
}

pub fn test_app(site: &MockServer, store: Arc<MemoryStore>, notifier: Arc<StubNotifier>) -> Router {
    api::router(test_state(site, store, notifier))
}

/// State with an arbitrary store behind the pipeline.
pub fn test_state_with_store(
    site: &MockServer,
    store: Arc<dyn ListingStore>,
    notifier: Arc<StubNotifier>,
) -> AppState {
    let source = SiteScraper::new(Fetcher::new().unwrap(), site.uri());
    AppState::new(Arc::new(source), store, notifier, settings())
}

#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn message(&self) -> &str {
        self.fields.get("message").map(String::as_str).unwrap_or_default()
    }
}

/// Layer that keeps every event it sees, for asserting on log output.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    pub fn events_at(&self, level: Level) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
struct FieldRecorder(BTreeMap<String, String>);

impl Visit for FieldRecorder {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut recorder = FieldRecorder::default();
        event.record(&mut recorder);
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            fields: recorder.0,
        });
    }
}
