//! Configuration module
//!
//! Client configuration read from the environment (and `.env` when present): API endpoint and
//! credentials, upload validation limits, transport deadlines, catalog paging and batch limits.

use std::env;
use std::time::Duration;

use uuid::Uuid;

use crate::constants::{
    DEFAULT_ALLOWED_CONTENT_TYPES, DEFAULT_BATCH_CONCURRENCY, DEFAULT_BATCH_MAX_SIZE,
    DEFAULT_MAX_DOCUMENT_SIZE_MB, DEFAULT_PAGE_SIZE, DEFAULT_TRANSPORT_TIMEOUT_SECS,
    DEFAULT_UPLOAD_TIMEOUT_SECS, MAX_PAGE_SIZE,
};
use crate::validation::ValidationRules;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_ARCHIVE_FORMAT: &str = "zip";

#[derive(Clone, Debug)]
pub struct AcervoConfig {
    pub api_url: String,
    /// Opaque bearer token; authentication itself happens elsewhere
    pub api_token: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub max_document_size_bytes: u64,
    pub document_allowed_content_types: Vec<String>,
    pub transport_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub catalog_page_size: u32,
    pub batch_max_size: usize,
    pub batch_concurrency: usize,
    /// `zip` or `tar`
    pub archive_format: String,
}

impl Default for AcervoConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_token: None,
            tenant_id: None,
            user_id: None,
            max_document_size_bytes: DEFAULT_MAX_DOCUMENT_SIZE_MB * 1024 * 1024,
            document_allowed_content_types: DEFAULT_ALLOWED_CONTENT_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            transport_timeout_secs: DEFAULT_TRANSPORT_TIMEOUT_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            catalog_page_size: DEFAULT_PAGE_SIZE,
            batch_max_size: DEFAULT_BATCH_MAX_SIZE,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            archive_format: DEFAULT_ARCHIVE_FORMAT.to_string(),
        }
    }
}

impl AcervoConfig {
    /// Load `.env` if present, read the process environment and validate.
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to their defaults;
    /// malformed UUIDs are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AcervoConfig::default();

        let api_url = lookup("ACERVO_API_URL")
            .or_else(|| lookup("API_URL"))
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let tenant_id = lookup("ACERVO_TENANT_ID")
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                Uuid::parse_str(s.trim())
                    .map_err(|_| anyhow::anyhow!("ACERVO_TENANT_ID must be a valid UUID"))
            })
            .transpose()?;

        let user_id = lookup("ACERVO_USER_ID")
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                Uuid::parse_str(s.trim())
                    .map_err(|_| anyhow::anyhow!("ACERVO_USER_ID must be a valid UUID"))
            })
            .transpose()?;

        let document_allowed_content_types = match lookup("DOCUMENT_ALLOWED_CONTENT_TYPES") {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => defaults.document_allowed_content_types.clone(),
        };

        let max_document_size_mb = lookup("MAX_DOCUMENT_SIZE_MB")
            .unwrap_or_else(|| DEFAULT_MAX_DOCUMENT_SIZE_MB.to_string())
            .parse::<u64>()
            .unwrap_or(DEFAULT_MAX_DOCUMENT_SIZE_MB);
        let max_document_size_bytes = max_document_size_mb
            .checked_mul(1024 * 1024)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "MAX_DOCUMENT_SIZE_MB is too large: {}",
                    max_document_size_mb
                )
            })?;

        Ok(Self {
            api_url,
            api_token: lookup("ACERVO_API_TOKEN").filter(|s| !s.trim().is_empty()),
            tenant_id,
            user_id,
            max_document_size_bytes,
            document_allowed_content_types,
            transport_timeout_secs: lookup("TRANSPORT_TIMEOUT_SECS")
                .unwrap_or_else(|| DEFAULT_TRANSPORT_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_TRANSPORT_TIMEOUT_SECS),
            upload_timeout_secs: lookup("UPLOAD_TIMEOUT_SECS")
                .unwrap_or_else(|| DEFAULT_UPLOAD_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_UPLOAD_TIMEOUT_SECS),
            catalog_page_size: lookup("CATALOG_PAGE_SIZE")
                .unwrap_or_else(|| DEFAULT_PAGE_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_PAGE_SIZE),
            batch_max_size: lookup("BATCH_MAX_SIZE")
                .unwrap_or_else(|| DEFAULT_BATCH_MAX_SIZE.to_string())
                .parse()
                .unwrap_or(DEFAULT_BATCH_MAX_SIZE),
            batch_concurrency: lookup("BATCH_CONCURRENCY")
                .unwrap_or_else(|| DEFAULT_BATCH_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(DEFAULT_BATCH_CONCURRENCY),
            archive_format: lookup("ARCHIVE_FORMAT")
                .unwrap_or_else(|| DEFAULT_ARCHIVE_FORMAT.to_string())
                .trim()
                .to_lowercase(),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err(anyhow::anyhow!(
                "ACERVO_API_URL must be an http:// or https:// URL"
            ));
        }

        if self.max_document_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_DOCUMENT_SIZE_MB must be greater than 0"));
        }

        if self.document_allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!(
                "DOCUMENT_ALLOWED_CONTENT_TYPES must list at least one content type"
            ));
        }

        if self.transport_timeout_secs == 0 {
            return Err(anyhow::anyhow!("TRANSPORT_TIMEOUT_SECS must be greater than 0"));
        }

        if self.upload_timeout_secs == 0 {
            return Err(anyhow::anyhow!("UPLOAD_TIMEOUT_SECS must be greater than 0"));
        }

        if !(1..=MAX_PAGE_SIZE).contains(&self.catalog_page_size) {
            return Err(anyhow::anyhow!(
                "CATALOG_PAGE_SIZE must be between 1 and {}",
                MAX_PAGE_SIZE
            ));
        }

        if self.batch_max_size == 0 {
            return Err(anyhow::anyhow!("BATCH_MAX_SIZE must be greater than 0"));
        }

        if self.batch_concurrency == 0 {
            return Err(anyhow::anyhow!("BATCH_CONCURRENCY must be greater than 0"));
        }

        if !matches!(self.archive_format.as_str(), "zip" | "tar") {
            return Err(anyhow::anyhow!(
                "ARCHIVE_FORMAT must be 'zip' or 'tar', got '{}'",
                self.archive_format
            ));
        }

        Ok(())
    }

    /// Tenant id, required by every catalog operation
    pub fn require_tenant(&self) -> Result<Uuid, anyhow::Error> {
        self.tenant_id
            .ok_or_else(|| anyhow::anyhow!("ACERVO_TENANT_ID must be set"))
    }

    pub fn require_token(&self) -> Result<&str, anyhow::Error> {
        self.api_token
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("ACERVO_API_TOKEN must be set"))
    }

    pub fn validation_rules(&self) -> ValidationRules {
        ValidationRules::new(
            self.max_document_size_bytes,
            self.document_allowed_content_types.clone(),
        )
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_secs(self.transport_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AcervoConfig, anyhow::Error> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AcervoConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.max_document_size_bytes, 25 * 1024 * 1024);
        assert_eq!(config.catalog_page_size, 20);
        assert_eq!(config.batch_max_size, 50);
        assert_eq!(config.archive_format, "zip");
        assert!(config.tenant_id.is_none());
        assert!(config.require_tenant().is_err());
        assert_eq!(config.validation_rules(), ValidationRules::default());
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let tenant = Uuid::new_v4();
        let tenant_str = tenant.to_string();
        let config = config_from(&[
            ("API_URL", "https://docs.example.com/"),
            ("ACERVO_TENANT_ID", &tenant_str),
            ("MAX_DOCUMENT_SIZE_MB", "10"),
            ("DOCUMENT_ALLOWED_CONTENT_TYPES", "Application/PDF, image/*"),
            ("BATCH_CONCURRENCY", "not-a-number"),
            ("ARCHIVE_FORMAT", "TAR"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://docs.example.com");
        assert_eq!(config.require_tenant().unwrap(), tenant);
        assert_eq!(config.max_document_size_bytes, 10 * 1024 * 1024);
        assert_eq!(
            config.document_allowed_content_types,
            vec!["application/pdf".to_string(), "image/*".to_string()]
        );
        assert_eq!(config.batch_concurrency, 4);
        assert_eq!(config.archive_format, "tar");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_reported() {
        assert!(config_from(&[("ACERVO_TENANT_ID", "acme")]).is_err());

        let config = config_from(&[("CATALOG_PAGE_SIZE", "500")]).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CATALOG_PAGE_SIZE"));

        let config = config_from(&[("ARCHIVE_FORMAT", "rar")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("DOCUMENT_ALLOWED_CONTENT_TYPES", " , ")]).unwrap();
        assert!(config.validate().is_err());

        let config = config_from(&[("MAX_DOCUMENT_SIZE_MB", "0")]).unwrap();
        assert!(config.validate().is_err());

        let err = config_from(&[("MAX_DOCUMENT_SIZE_MB", &u64::MAX.to_string())]).unwrap_err();
        assert!(err.to_string().contains("MAX_DOCUMENT_SIZE_MB"));
    }
}
