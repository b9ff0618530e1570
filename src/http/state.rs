use crate::session::SessionControllerHandle;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The running session controller
    pub controller: SessionControllerHandle,
}

impl AppState {
    pub fn new(controller: SessionControllerHandle) -> Self {
        Self { controller }
    }
}
