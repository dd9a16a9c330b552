use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub publish_quality: PublishQuality,
}

/// Minimum quality bar for publishing a listing.
///
/// Owned by the enclosing application and passed explicitly into validation,
/// never read from ambient global state.
#[derive(Debug, Clone, Copy)]
pub struct PublishQuality {
    pub min_images: u32,
    pub min_title_len: usize,
    pub min_description_len: usize,
}

impl Default for PublishQuality {
    fn default() -> Self {
        Self {
            min_images: 1,
            min_title_len: 5,
            min_description_len: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = PublishQuality::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            publish_quality: PublishQuality {
                min_images: env_or("LISTING_MIN_IMAGES_PUBLISH", defaults.min_images)?,
                min_title_len: env_or("LISTING_MIN_TITLE_LEN", defaults.min_title_len)?,
                min_description_len: env_or(
                    "LISTING_MIN_DESCRIPTION_LEN",
                    defaults.min_description_len,
                )?,
            },
        })
    }
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a valid number", name)),
        Err(_) => Ok(default),
    }
}
