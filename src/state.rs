//! Application state management

use std::sync::Arc;

use crate::config::Config;
use crate::store::ObjectStore;
use crate::tempurl::TempUrlIssuer;
use crate::thumbnails::ThumbnailService;
use crate::trash::TrashManager;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: Arc<dyn ObjectStore>,
    tempurl: TempUrlIssuer,
    trash: TrashManager,
    thumbnails: ThumbnailService,
}

impl AppState {
    /// Wire the managers up around one injected store client.
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let tempurl = TempUrlIssuer::new(store.clone());
        let trash = TrashManager::new(store.clone(), &config);
        let thumbnails = ThumbnailService::new(store.clone(), &config);
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                tempurl,
                trash,
                thumbnails,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn store(&self) -> &dyn ObjectStore {
        self.inner.store.as_ref()
    }

    pub fn tempurl(&self) -> &TempUrlIssuer {
        &self.inner.tempurl
    }

    pub fn trash(&self) -> &TrashManager {
        &self.inner.trash
    }

    pub fn thumbnails(&self) -> &ThumbnailService {
        &self.inner.thumbnails
    }
}
