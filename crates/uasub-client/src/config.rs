// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client configuration.
//!
//! Configuration is passed in as plain values; nothing here reads files or
//! the environment. [`ClientConfig`] is serde-compatible so hosts can embed
//! it in their own configuration documents, with durations written in
//! human-readable form (`"30s"`, `"2m"`).
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//! use uasub_client::config::ClientConfig;
//!
//! let config = ClientConfig::builder()
//!     .application_name("Line 4 Historian")
//!     .session_timeout(Duration::from_secs(60))
//!     .username("operator", "secret")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.max_notifications_per_publish, 65535);
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigurationError, UaError, UaResult};
use crate::types::{ApplicationDescription, ApplicationType};

/// Default limit on notifications per publish response.
pub const DEFAULT_MAX_NOTIFICATIONS_PER_PUBLISH: u32 = 65535;

/// Default number of publish requests kept outstanding per subscription.
pub const DEFAULT_PUBLISH_PIPELINE_DEPTH: u32 = 2;

// =============================================================================
// UserIdentity
// =============================================================================

/// Identity presented when activating a session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserIdentity {
    /// Anonymous user.
    #[default]
    Anonymous,

    /// User name and password.
    UserName {
        /// User name.
        username: String,
        /// Password.
        password: String,
    },
}

impl UserIdentity {
    /// Returns the identity token type name.
    pub fn token_type(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::UserName { .. } => "username",
        }
    }
}

impl fmt::Debug for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::UserName { username, .. } => f
                .debug_struct("UserName")
                .field("username", username)
                .field("password", &"***")
                .finish(),
        }
    }
}

// =============================================================================
// ClientConfig
// =============================================================================

/// Session and subscription runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Application name.
    #[serde(default = "default_application_name")]
    pub application_name: String,

    /// Application URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_uri: Option<String>,

    /// Product URI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_uri: Option<String>,

    /// Session name; generated from the application name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_name: Option<String>,

    /// Requested session timeout.
    #[serde(default = "default_session_timeout")]
    #[serde(with = "humantime_serde")]
    pub session_timeout: Duration,

    /// Default request timeout; also the publish timeout hint with no subscriptions.
    #[serde(default = "default_request_timeout")]
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Largest response accepted, 0 for no limit.
    #[serde(default)]
    pub max_response_message_size: u32,

    /// Identity presented on activation.
    #[serde(default)]
    pub user_identity: UserIdentity,

    /// Preferred locales.
    #[serde(default)]
    pub locale_ids: Vec<String>,

    /// Notification limit used by the interval-only subscription helpers.
    #[serde(default = "default_max_notifications_per_publish")]
    pub max_notifications_per_publish: u32,

    /// Publish requests kept outstanding per subscription.
    #[serde(default = "default_publish_pipeline_depth")]
    pub publish_pipeline_depth: u32,

    /// Delay before re-arming after a failed publish; zero re-arms immediately.
    #[serde(default)]
    #[serde(with = "humantime_serde")]
    pub publish_failure_backoff: Duration,

    /// Capacity of each monitored item's value broadcast channel.
    #[serde(default = "default_value_channel_capacity")]
    pub value_channel_capacity: usize,
}

fn default_application_name() -> String {
    "uasub client".to_string()
}

fn default_session_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_notifications_per_publish() -> u32 {
    DEFAULT_MAX_NOTIFICATIONS_PER_PUBLISH
}

fn default_publish_pipeline_depth() -> u32 {
    DEFAULT_PUBLISH_PIPELINE_DEPTH
}

fn default_value_channel_capacity() -> usize {
    64
}

impl ClientConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Validates this configuration.
    pub fn validate(&self) -> UaResult<()> {
        if self.application_name.trim().is_empty() {
            return Err(UaError::configuration(ConfigurationError::missing_field(
                "application_name",
            )));
        }

        if self.session_timeout.is_zero() {
            return Err(UaError::configuration(ConfigurationError::invalid_value(
                "session_timeout",
                "Session timeout must be greater than 0",
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(UaError::configuration(ConfigurationError::invalid_value(
                "request_timeout",
                "Request timeout must be greater than 0",
            )));
        }

        if self.publish_pipeline_depth == 0 {
            return Err(UaError::configuration(ConfigurationError::invalid_value(
                "publish_pipeline_depth",
                "At least one publish request per subscription is required",
            )));
        }

        if self.max_notifications_per_publish == 0 {
            return Err(UaError::configuration(ConfigurationError::invalid_value(
                "max_notifications_per_publish",
                "Must be greater than 0",
            )));
        }

        if self.value_channel_capacity == 0 {
            return Err(UaError::configuration(ConfigurationError::invalid_value(
                "value_channel_capacity",
                "Must be greater than 0",
            )));
        }

        if let UserIdentity::UserName { username, .. } = &self.user_identity {
            if username.is_empty() {
                return Err(UaError::configuration(ConfigurationError::invalid_value(
                    "user_identity",
                    "User name must not be empty",
                )));
            }
        }

        Ok(())
    }

    /// Returns the effective application URI.
    pub fn effective_application_uri(&self) -> String {
        self.application_uri
            .clone()
            .unwrap_or_else(|| format!("urn:uasub:client:{}", self.application_name.replace(' ', "")))
    }

    /// Returns the session name to request, generating one if not configured.
    pub fn effective_session_name(&self) -> String {
        self.session_name.clone().unwrap_or_else(|| {
            format!(
                "UaSession:{}:{}",
                self.application_name,
                chrono::Utc::now().timestamp_millis()
            )
        })
    }

    /// Builds the client application description.
    pub fn application_description(&self) -> ApplicationDescription {
        ApplicationDescription {
            application_uri: self.effective_application_uri(),
            product_uri: self.product_uri.clone().unwrap_or_default(),
            application_name: self.application_name.clone(),
            application_type: ApplicationType::Client,
            gateway_server_uri: None,
            discovery_urls: Vec::new(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application_name: default_application_name(),
            application_uri: None,
            product_uri: None,
            session_name: None,
            session_timeout: default_session_timeout(),
            request_timeout: default_request_timeout(),
            max_response_message_size: 0,
            user_identity: UserIdentity::default(),
            locale_ids: Vec::new(),
            max_notifications_per_publish: default_max_notifications_per_publish(),
            publish_pipeline_depth: default_publish_pipeline_depth(),
            publish_failure_backoff: Duration::ZERO,
            value_channel_capacity: default_value_channel_capacity(),
        }
    }
}

// =============================================================================
// ClientConfigBuilder
// =============================================================================

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    application_name: Option<String>,
    application_uri: Option<String>,
    product_uri: Option<String>,
    session_name: Option<String>,
    session_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    max_response_message_size: Option<u32>,
    user_identity: Option<UserIdentity>,
    locale_ids: Vec<String>,
    max_notifications_per_publish: Option<u32>,
    publish_pipeline_depth: Option<u32>,
    publish_failure_backoff: Option<Duration>,
    value_channel_capacity: Option<usize>,
}

impl ClientConfigBuilder {
    /// Sets the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Sets the application URI.
    pub fn application_uri(mut self, uri: impl Into<String>) -> Self {
        self.application_uri = Some(uri.into());
        self
    }

    /// Sets the product URI.
    pub fn product_uri(mut self, uri: impl Into<String>) -> Self {
        self.product_uri = Some(uri.into());
        self
    }

    /// Sets the session name.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Sets the requested session timeout.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }

    /// Sets the default request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the max response message size.
    pub fn max_response_message_size(mut self, size: u32) -> Self {
        self.max_response_message_size = Some(size);
        self
    }

    /// Uses user name authentication.
    pub fn username(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.user_identity = Some(UserIdentity::UserName {
            username: username.into(),
            password: password.into(),
        });
        self
    }

    /// Uses anonymous authentication.
    pub fn anonymous(mut self) -> Self {
        self.user_identity = Some(UserIdentity::Anonymous);
        self
    }

    /// Adds a preferred locale.
    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale_ids.push(locale.into());
        self
    }

    /// Sets the notification limit used by the interval-only helpers.
    pub fn max_notifications_per_publish(mut self, max: u32) -> Self {
        self.max_notifications_per_publish = Some(max);
        self
    }

    /// Sets the number of publish requests kept outstanding per subscription.
    pub fn publish_pipeline_depth(mut self, depth: u32) -> Self {
        self.publish_pipeline_depth = Some(depth);
        self
    }

    /// Sets the delay before re-arming after a failed publish.
    pub fn publish_failure_backoff(mut self, backoff: Duration) -> Self {
        self.publish_failure_backoff = Some(backoff);
        self
    }

    /// Sets the capacity of each monitored item's value channel.
    pub fn value_channel_capacity(mut self, capacity: usize) -> Self {
        self.value_channel_capacity = Some(capacity);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> UaResult<ClientConfig> {
        let config = ClientConfig {
            application_name: self.application_name.unwrap_or_else(default_application_name),
            application_uri: self.application_uri,
            product_uri: self.product_uri,
            session_name: self.session_name,
            session_timeout: self.session_timeout.unwrap_or_else(default_session_timeout),
            request_timeout: self.request_timeout.unwrap_or_else(default_request_timeout),
            max_response_message_size: self.max_response_message_size.unwrap_or(0),
            user_identity: self.user_identity.unwrap_or_default(),
            locale_ids: self.locale_ids,
            max_notifications_per_publish: self
                .max_notifications_per_publish
                .unwrap_or_else(default_max_notifications_per_publish),
            publish_pipeline_depth: self
                .publish_pipeline_depth
                .unwrap_or_else(default_publish_pipeline_depth),
            publish_failure_backoff: self.publish_failure_backoff.unwrap_or(Duration::ZERO),
            value_channel_capacity: self
                .value_channel_capacity
                .unwrap_or_else(default_value_channel_capacity),
        };

        config.validate()?;
        Ok(config)
    }
}

// =============================================================================
// humantime_serde helper
// =============================================================================

mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        humantime::format_duration(*duration)
            .to_string()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Tests
// =============================================================================
