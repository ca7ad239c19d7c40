use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::orchestrator::{ListingSource, ListingStore, Notifier, Pipeline, PipelineSettings};
use crate::repositories::ListingRepository;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Pipeline,
    pub source: Arc<dyn ListingSource>,
    pub store: Arc<dyn ListingStore>,
    pub notifier: Arc<dyn Notifier>,
    /// Local document store, probed by `/api/debug`. `None` when storage is remote.
    pub repository: Option<ListingRepository>,
    pub shutdown: CancellationToken,
    pub tasks: TaskTracker,
}

impl AppState {
    pub fn new(
        source: Arc<dyn ListingSource>,
        store: Arc<dyn ListingStore>,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            pipeline: Pipeline::new(source.clone(), store.clone(), notifier.clone(), settings),
            source,
            store,
            notifier,
            repository: None,
            shutdown: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    /// All-in-one state where the deduper is an in-process repository.
    pub fn with_repository(
        source: Arc<dyn ListingSource>,
        repository: ListingRepository,
        notifier: Arc<dyn Notifier>,
        settings: PipelineSettings,
    ) -> Self {
        let mut state = Self::new(source, Arc::new(repository.clone()), notifier, settings);
        state.repository = Some(repository);
        state
    }
}
