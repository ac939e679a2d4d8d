use std::sync::Arc;

use monitor_app::MonitorService;

#[derive(Clone)]
pub struct BasicCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Clone)]
pub struct HttpState {
    pub service: Arc<MonitorService>,
    pub credentials: BasicCredentials,
}

impl HttpState {
    pub fn new(service: Arc<MonitorService>, credentials: BasicCredentials) -> Self {
        Self {
            service,
            credentials,
        }
    }
}
