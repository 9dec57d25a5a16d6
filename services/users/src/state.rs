//! Application state shared across handlers

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::{
    directory::UserDirectory,
    repositories::UserStore,
    sync::{LibraryEvent, LibraryGrantSynchronizer},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: UserDirectory,
    pub synchronizer: LibraryGrantSynchronizer,
    /// Queue drained by the synchronizer's listener task
    pub library_events: mpsc::Sender<LibraryEvent>,
}

impl AppState {
    /// Wire the directory and synchronizer over one shared store
    ///
    /// `library_events` is the sending half of the queue passed to
    /// [`LibraryGrantSynchronizer::listen`].
    pub fn new(store: Arc<dyn UserStore>, library_events: mpsc::Sender<LibraryEvent>) -> Self {
        Self {
            directory: UserDirectory::new(store.clone()),
            synchronizer: LibraryGrantSynchronizer::new(store),
            library_events,
        }
    }
}
