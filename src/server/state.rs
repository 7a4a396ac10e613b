use crate::reference::GeoResolver;
use std::sync::Arc;

/// Loaded once before the listener starts; handlers only read.
pub struct AppState {
    pub resolver: Arc<GeoResolver>,
}
