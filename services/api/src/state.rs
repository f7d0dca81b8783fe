//! Application state shared across handlers

use corkboard::Client;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub client: Client,
    /// Max-Age of the session cookie in seconds
    pub cookie_max_age: i64,
    pub secure_cookies: bool,
}
