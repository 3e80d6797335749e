// ABOUTME: Server configuration loaded from environment variables
// ABOUTME: Covers listen port, database location, and allowed CORS origin

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub cors_origin: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(4200),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://crucible.db?mode=rwc".to_string()),
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
        }
    }
}
