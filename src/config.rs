//! Application settings.
//!
//! They live next to Rocket's own settings in `Rocket.toml` (or `ROCKET_*`
//! environment variables) and are extracted from the same figment.

use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Posts on one HTML page, also the default API `limit`
    pub posts_per_page: u64,
    /// Directory uploaded images are written to and served from
    pub media_root: PathBuf,
    /// Lifetime of a cached index page; zero turns caching off
    pub index_cache_seconds: u64,
    /// bcrypt cost for new password hashes
    pub password_cost: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            posts_per_page: 10,
            media_root: PathBuf::from("media"),
            index_cache_seconds: 20,
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::AppConfig;
    use rocket::figment::{providers::Serialized, Figment};

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let figment = Figment::new().merge(Serialized::default("posts_per_page", 3));
        let config: AppConfig = figment.extract().unwrap();

        assert_eq!(config.posts_per_page, 3);
        assert_eq!(config.index_cache_seconds, 20);
        assert_eq!(config.media_root.to_str(), Some("media"));
    }
}
