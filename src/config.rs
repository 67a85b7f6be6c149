// config.rs
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_name: String,
    pub jwt_secret: String,
    pub port: u16,
    pub host: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        AppConfig {
            database_url: env::var("DATABASE_URL")
                .expect("DATABASE_URL must be set"),
            database_name: env::var("DATABASE_NAME")
                .unwrap_or_else(|_| "admissionsdb".to_string()),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "change-this-in-production".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "10000".to_string())
                .parse()
                .expect("PORT must be a number"),
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
        }
    }

    pub fn get_config_info(&self) -> serde_json::Value {
        serde_json::json!({
            "database_name": self.database_name,
            "jwt_secret_set": self.jwt_secret != "change-this-in-production",
            "port": self.port,
            "host": self.host,
        })
    }
}
