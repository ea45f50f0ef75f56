use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_quickbooks_api_error(endpoint: &str, status: Option<u16>, error: &str) {
    error!("QuickBooks API error: {} - Status: {:?} - Error: {}", endpoint, status, error);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 QBO auth middleware server starting on port {}", port);
}

pub fn log_server_ready(host: &str, port: u16) {
    info!("✅ Server ready and listening on http://{}:{}", host, port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_session_event(event: &str, session_id: &str) {
    info!("🔐 [Session] {} - session: {}", event, super::redact(session_id));
}

pub fn log_store_sweep(states: usize, sessions: usize) {
    if states > 0 || sessions > 0 {
        info!("🧹 [Stores] Removidos {} states e {} sessões expiradas", states, sessions);
    } else {
        debug!("🧹 [Stores] Nada expirado");
    }
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}
