use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::IdentityApi;
use crate::meeting::service::MeetingService;

pub struct AppState {
    pub config: AppConfig,
    pub core: Arc<dyn IdentityApi>,
    pub meetings: Arc<MeetingService>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("core", &"Arc<dyn IdentityApi>")
            .field("meetings", &"Arc<MeetingService>")
            .finish()
    }
}
