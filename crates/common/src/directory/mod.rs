//! User directory client abstraction
//!
//! The service denormalizes author and reply-target display fields at
//! write time from an external user-directory service. This module
//! provides the boundary trait, an HTTP implementation, and a mock for
//! tests.

use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Public profile of a community member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub display_name: String,
    pub avatar: Option<String>,
}

/// Trait for user profile lookups
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id; `Ok(None)` means the user does not exist,
    /// `Err(DirectoryUnavailable)` means the directory could not answer.
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>>;
}

/// HTTP user directory client
pub struct HttpDirectory {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

#[derive(Deserialize)]
struct DirectoryResponse {
    id: Uuid,
    display_name: String,
    avatar: Option<String>,
}

impl HttpDirectory {
    /// Create a new HTTP directory client
    pub fn new(base_url: String, timeout_secs: u64, max_retries: u32) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            max_retries,
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, id: Uuid) -> Result<Option<UserProfile>> {
        let mut last_error = None;

        for attempt in 0..self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(id).await {
                Ok(profile) => return Ok(profile),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        user_id = %id,
                        error = %e,
                        "User directory request failed, retrying"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::DirectoryUnavailable {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, id: Uuid) -> Result<Option<UserProfile>> {
        let url = format!("{}/users/{}", self.base_url, id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AppError::DirectoryUnavailable {
                message: format!("Request failed: {}", e),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::DirectoryUnavailable {
                message: format!("Directory error {}: {}", status, body),
            });
        }

        let result: DirectoryResponse =
            response
                .json()
                .await
                .map_err(|e| AppError::DirectoryUnavailable {
                    message: format!("Failed to parse response: {}", e),
                })?;

        Ok(Some(UserProfile {
            id: result.id,
            display_name: result.display_name,
            avatar: result.avatar,
        }))
    }
}

#[async_trait]
impl UserDirectory for HttpDirectory {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        self.request_with_retry(id).await
    }
}

/// Mock directory for testing
#[derive(Default)]
pub struct MockDirectory {
    users: HashMap<Uuid, UserProfile>,
    unavailable: bool,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a known user
    pub fn with_user(mut self, id: Uuid, display_name: &str) -> Self {
        self.users.insert(
            id,
            UserProfile {
                id,
                display_name: display_name.to_string(),
                avatar: None,
            },
        );
        self
    }

    /// Make every lookup fail with `DirectoryUnavailable`
    pub fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn get_user(&self, id: Uuid) -> Result<Option<UserProfile>> {
        if self.unavailable {
            return Err(AppError::DirectoryUnavailable {
                message: "mock directory is down".to_string(),
            });
        }
        Ok(self.users.get(&id).cloned())
    }
}

/// Create a directory client based on configuration
pub fn create_directory(
    provider: &str,
    base_url: Option<String>,
    timeout_secs: u64,
    max_retries: u32,
) -> Result<Arc<dyn UserDirectory>> {
    match provider {
        "http" => {
            let url = base_url.ok_or_else(|| AppError::Configuration {
                message: "directory.base_url is required for the http provider".to_string(),
            })?;
            Ok(Arc::new(HttpDirectory::new(url, timeout_secs, max_retries)?))
        }
        "mock" => Ok(Arc::new(MockDirectory::new())),
        other => {
            tracing::warn!(provider = other, "Unknown directory provider, using mock");
            Ok(Arc::new(MockDirectory::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_lookup() {
        let id = Uuid::new_v4();
        let directory = MockDirectory::new().with_user(id, "Ada");

        let profile = directory.get_user(id).await.unwrap().unwrap();
        assert_eq!(profile.display_name, "Ada");

        let missing = directory.get_user(Uuid::new_v4()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_mock_unavailable() {
        let directory = MockDirectory::new().unavailable();
        let err = directory.get_user(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::DirectoryUnavailable { .. }));
    }
}
