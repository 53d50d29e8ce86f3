// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Protocol value types shared by the session and subscription layers.
//!
//! - **StatusCode**: Service and operation result codes
//! - **NodeId**: Node identifiers with parsing and display
//! - **Variant / DataValue**: Values delivered to monitored items
//! - **ReadValueId / WriteValue**: Attribute read and write targets
//! - **SecurityPolicy / SecurityMode**: Negotiated channel security
//! - **ApplicationDescription / EndpointDescription**: Endpoint metadata
//!
//! # Examples
//!
//! ```
//! use uasub_client::types::{NodeId, ReadValueId, StatusCode};
//!
//! let node: NodeId = "ns=2;s=Line1.Temperature".parse().unwrap();
//! let target = ReadValueId::value(node);
//! assert_eq!(target.attribute_id.value(), 13);
//! assert!(StatusCode::GOOD.is_good());
//! ```

use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ConfigurationError, UaError};

// =============================================================================
// StatusCode
// =============================================================================

/// OPC UA status code.
///
/// The two most significant bits carry the severity: `00` good,
/// `01` uncertain, `10` bad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct StatusCode(pub u32);

impl StatusCode {
    /// The operation succeeded.
    pub const GOOD: Self = Self(0x0000_0000);
    /// An unexpected error occurred.
    pub const BAD_UNEXPECTED_ERROR: Self = Self(0x8001_0000);
    /// A low level communication error occurred.
    pub const BAD_COMMUNICATION_ERROR: Self = Self(0x8005_0000);
    /// An unrecognized response was received from the server.
    pub const BAD_UNKNOWN_RESPONSE: Self = Self(0x8009_0000);
    /// The operation timed out.
    pub const BAD_TIMEOUT: Self = Self(0x800A_0000);
    /// The operation was cancelled because the application is shutting down.
    pub const BAD_SHUTDOWN: Self = Self(0x800C_0000);
    /// There was nothing to do because the client passed a list of operations with no elements.
    pub const BAD_NOTHING_TO_DO: Self = Self(0x800F_0000);
    /// The certificate provided as a parameter is not valid.
    pub const BAD_CERTIFICATE_INVALID: Self = Self(0x8012_0000);
    /// The session id is not valid.
    pub const BAD_SESSION_ID_INVALID: Self = Self(0x8025_0000);
    /// The session was closed by the client.
    pub const BAD_SESSION_CLOSED: Self = Self(0x8026_0000);
    /// The subscription id is not valid.
    pub const BAD_SUBSCRIPTION_ID_INVALID: Self = Self(0x8028_0000);
    /// The node id refers to a node that does not exist in the server address space.
    pub const BAD_NODE_ID_UNKNOWN: Self = Self(0x8034_0000);
    /// The monitoring item id does not refer to a valid monitored item.
    pub const BAD_MONITORED_ITEM_ID_INVALID: Self = Self(0x8042_0000);
    /// The server has reached the maximum number of queued publish requests.
    pub const BAD_TOO_MANY_PUBLISH_REQUESTS: Self = Self(0x8078_0000);
    /// There is no subscription available for this session.
    pub const BAD_NO_SUBSCRIPTION: Self = Self(0x8079_0000);
    /// The sequence number is unknown to the server.
    pub const BAD_SEQUENCE_NUMBER_UNKNOWN: Self = Self(0x807A_0000);
    /// The requested notification message is no longer available.
    pub const BAD_MESSAGE_NOT_AVAILABLE: Self = Self(0x807B_0000);
    /// The sequence number is not valid.
    pub const BAD_SEQUENCE_NUMBER_INVALID: Self = Self(0x8088_0000);
    /// There is a problem with the configuration that affects the usefulness of the value.
    pub const BAD_CONFIGURATION_ERROR: Self = Self(0x8089_0000);
    /// The variable should receive its value from another variable, but has never been configured to do so.
    pub const BAD_NOT_CONNECTED: Self = Self(0x808A_0000);
    /// One or more arguments are invalid.
    pub const BAD_INVALID_ARGUMENT: Self = Self(0x80AB_0000);

    /// Returns `true` if the severity bits are good.
    #[inline]
    pub const fn is_good(&self) -> bool {
        self.0 & 0xC000_0000 == 0
    }

    /// Returns `true` if the severity bits are uncertain.
    #[inline]
    pub const fn is_uncertain(&self) -> bool {
        self.0 & 0xC000_0000 == 0x4000_0000
    }

    /// Returns `true` if the severity bits are bad.
    #[inline]
    pub const fn is_bad(&self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    /// Returns the symbolic name, if known.
    pub fn name(&self) -> Option<&'static str> {
        let name = match *self {
            Self::GOOD => "Good",
            Self::BAD_UNEXPECTED_ERROR => "BadUnexpectedError",
            Self::BAD_COMMUNICATION_ERROR => "BadCommunicationError",
            Self::BAD_UNKNOWN_RESPONSE => "BadUnknownResponse",
            Self::BAD_TIMEOUT => "BadTimeout",
            Self::BAD_SHUTDOWN => "BadShutdown",
            Self::BAD_NOTHING_TO_DO => "BadNothingToDo",
            Self::BAD_CERTIFICATE_INVALID => "BadCertificateInvalid",
            Self::BAD_SESSION_ID_INVALID => "BadSessionIdInvalid",
            Self::BAD_SESSION_CLOSED => "BadSessionClosed",
            Self::BAD_SUBSCRIPTION_ID_INVALID => "BadSubscriptionIdInvalid",
            Self::BAD_NODE_ID_UNKNOWN => "BadNodeIdUnknown",
            Self::BAD_MONITORED_ITEM_ID_INVALID => "BadMonitoredItemIdInvalid",
            Self::BAD_TOO_MANY_PUBLISH_REQUESTS => "BadTooManyPublishRequests",
            Self::BAD_NO_SUBSCRIPTION => "BadNoSubscription",
            Self::BAD_SEQUENCE_NUMBER_UNKNOWN => "BadSequenceNumberUnknown",
            Self::BAD_MESSAGE_NOT_AVAILABLE => "BadMessageNotAvailable",
            Self::BAD_SEQUENCE_NUMBER_INVALID => "BadSequenceNumberInvalid",
            Self::BAD_CONFIGURATION_ERROR => "BadConfigurationError",
            Self::BAD_NOT_CONNECTED => "BadNotConnected",
            Self::BAD_INVALID_ARGUMENT => "BadInvalidArgument",
            _ => return None,
        };
        Some(name)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{} (0x{:08X})", name, self.0),
            None => write!(f, "0x{:08X}", self.0),
        }
    }
}

impl From<u32> for StatusCode {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

// =============================================================================
// NodeId
// =============================================================================

/// Node identifier within a server address space.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId {
    /// Namespace index (0 = standard namespace).
    pub namespace_index: u16,

    /// The identifier.
    pub identifier: NodeIdentifier,
}

/// The identifier part of a [`NodeId`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum NodeIdentifier {
    /// Numeric identifier.
    Numeric(u32),
    /// String identifier.
    String(String),
    /// GUID identifier.
    Guid(Uuid),
    /// Opaque byte string identifier.
    Opaque(Vec<u8>),
}

impl NodeId {
    /// Creates a numeric node ID.
    #[inline]
    pub fn numeric(namespace_index: u16, value: u32) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Numeric(value),
        }
    }

    /// Creates a string node ID.
    #[inline]
    pub fn string(namespace_index: u16, value: impl Into<String>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::String(value.into()),
        }
    }

    /// Creates a GUID node ID.
    #[inline]
    pub fn guid(namespace_index: u16, value: Uuid) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Guid(value),
        }
    }

    /// Creates an opaque node ID.
    #[inline]
    pub fn opaque(namespace_index: u16, value: impl Into<Vec<u8>>) -> Self {
        Self {
            namespace_index,
            identifier: NodeIdentifier::Opaque(value.into()),
        }
    }

    /// The null node ID (`ns=0;i=0`).
    #[inline]
    pub fn null() -> Self {
        Self::numeric(0, 0)
    }

    /// Returns `true` if this is the null node ID.
    pub fn is_null(&self) -> bool {
        self.namespace_index == 0 && self.identifier == NodeIdentifier::Numeric(0)
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::null()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace_index != 0 {
            write!(f, "ns={};", self.namespace_index)?;
        }
        match &self.identifier {
            NodeIdentifier::Numeric(v) => write!(f, "i={}", v),
            NodeIdentifier::String(v) => write!(f, "s={}", v),
            NodeIdentifier::Guid(v) => write!(f, "g={}", v),
            NodeIdentifier::Opaque(v) => write!(f, "b={}", BASE64.encode(v)),
        }
    }
}

impl FromStr for NodeId {
    type Err = UaError;

    /// Parses `ns=<n>;<t>=<value>` or `<t>=<value>` where `<t>` is one of
    /// `i`, `s`, `g` or `b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = |reason: String| {
            UaError::configuration(ConfigurationError::invalid_node_id(s, reason))
        };

        let (namespace_index, identifier_part) = match s.strip_prefix("ns=") {
            Some(rest) => {
                let (ns, id) = rest
                    .split_once(';')
                    .ok_or_else(|| invalid("Missing identifier after namespace".into()))?;
                let ns: u16 = ns
                    .parse()
                    .map_err(|_| invalid("Invalid namespace index".into()))?;
                (ns, id)
            }
            None => (0, s),
        };

        let identifier = if let Some(id) = identifier_part.strip_prefix("i=") {
            NodeIdentifier::Numeric(
                id.parse()
                    .map_err(|_| invalid("Invalid numeric identifier".into()))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("s=") {
            NodeIdentifier::String(id.to_string())
        } else if let Some(id) = identifier_part.strip_prefix("g=") {
            NodeIdentifier::Guid(
                Uuid::parse_str(id).map_err(|e| invalid(format!("Invalid GUID: {}", e)))?,
            )
        } else if let Some(id) = identifier_part.strip_prefix("b=") {
            NodeIdentifier::Opaque(
                BASE64
                    .decode(id)
                    .map_err(|e| invalid(format!("Invalid base64: {}", e)))?,
            )
        } else {
            return Err(invalid(
                "Unknown identifier type. Expected i=, s=, g=, or b=".into(),
            ));
        };

        Ok(Self {
            namespace_index,
            identifier,
        })
    }
}

// =============================================================================
// Variant
// =============================================================================

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Variant {
    /// No value.
    #[default]
    Empty,
    /// Boolean.
    Boolean(bool),
    /// Signed 32-bit integer.
    Int32(i32),
    /// Unsigned 32-bit integer.
    UInt32(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// Unsigned 64-bit integer.
    UInt64(u64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// String.
    String(String),
    /// UTC timestamp.
    DateTime(DateTime<Utc>),
    /// Byte string.
    ByteString(Vec<u8>),
    /// GUID.
    Guid(Uuid),
    /// Node identifier.
    NodeId(NodeId),
    /// Status code.
    StatusCode(StatusCode),
    /// One-dimensional array.
    Array(Vec<Variant>),
}

impl Variant {
    /// Returns `true` if the variant holds no value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the value as `bool`, if boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as `i64`, widening any integer type.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int32(v) => Some(*v as i64),
            Self::UInt32(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            Self::UInt64(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Returns the value as `f64`, widening any numeric type.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    /// Returns the value as a string slice, if a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the type name of this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Boolean(_) => "Boolean",
            Self::Int32(_) => "Int32",
            Self::UInt32(_) => "UInt32",
            Self::Int64(_) => "Int64",
            Self::UInt64(_) => "UInt64",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::DateTime(_) => "DateTime",
            Self::ByteString(_) => "ByteString",
            Self::Guid(_) => "Guid",
            Self::NodeId(_) => "NodeId",
            Self::StatusCode(_) => "StatusCode",
            Self::Array(_) => "Array",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "null"),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::UInt32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::UInt64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "\"{}\"", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
            Self::ByteString(v) => write!(f, "[{} bytes]", v.len()),
            Self::Guid(v) => write!(f, "{}", v),
            Self::NodeId(v) => write!(f, "{}", v),
            Self::StatusCode(v) => write!(f, "{}", v),
            Self::Array(v) => write!(f, "[{} elements]", v.len()),
        }
    }
}

macro_rules! impl_variant_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Variant {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_variant_from! {
    bool => Boolean,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    DateTime<Utc> => DateTime,
    Uuid => Guid,
    NodeId => NodeId,
    StatusCode => StatusCode,
}

impl From<&str> for Variant {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

// =============================================================================
// DataValue
// =============================================================================

/// A value with its status and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct DataValue {
    /// The value.
    pub value: Variant,

    /// Quality of the value.
    pub status: StatusCode,

    /// Timestamp assigned by the data source.
    pub source_timestamp: Option<DateTime<Utc>>,

    /// Timestamp assigned by the server.
    pub server_timestamp: Option<DateTime<Utc>>,
}

impl DataValue {
    /// Creates a good value stamped with the current time.
    pub fn new(value: impl Into<Variant>) -> Self {
        let now = Utc::now();
        Self {
            value: value.into(),
            status: StatusCode::GOOD,
            source_timestamp: Some(now),
            server_timestamp: Some(now),
        }
    }

    /// Creates a value that carries only a status.
    pub fn from_status(status: StatusCode) -> Self {
        Self {
            status,
            ..Default::default()
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Returns `true` if the status is good.
    #[inline]
    pub fn is_good(&self) -> bool {
        self.status.is_good()
    }
}

// =============================================================================
// AttributeId
// =============================================================================

/// Node attributes addressable by read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributeId {
    /// Node ID attribute.
    NodeId,
    /// Node class attribute.
    NodeClass,
    /// Browse name attribute.
    BrowseName,
    /// Display name attribute.
    DisplayName,
    /// Description attribute.
    Description,
    /// Event notifier attribute.
    EventNotifier,
    /// Value attribute.
    #[default]
    Value,
    /// Data type attribute.
    DataType,
    /// Access level attribute.
    AccessLevel,
    /// Minimum sampling interval attribute.
    MinimumSamplingInterval,
}

impl AttributeId {
    /// Returns the numeric attribute id.
    pub const fn value(&self) -> u32 {
        match self {
            Self::NodeId => 1,
            Self::NodeClass => 2,
            Self::BrowseName => 3,
            Self::DisplayName => 4,
            Self::Description => 5,
            Self::EventNotifier => 12,
            Self::Value => 13,
            Self::DataType => 14,
            Self::AccessLevel => 17,
            Self::MinimumSamplingInterval => 19,
        }
    }
}

/// Timestamps the server should return with read values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TimestampsToReturn {
    /// Source timestamp only.
    Source,
    /// Server timestamp only.
    Server,
    /// Both timestamps.
    #[default]
    Both,
    /// No timestamps.
    Neither,
}

// =============================================================================
// ReadValueId / WriteValue
// =============================================================================

/// Target of an attribute read; also the target of a monitored item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReadValueId {
    /// Node to read.
    pub node_id: NodeId,

    /// Attribute to read.
    pub attribute_id: AttributeId,

    /// Optional numeric range for array values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,
}

impl ReadValueId {
    /// Targets the Value attribute of `node_id`.
    pub fn value(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::Value)
    }

    /// Targets the EventNotifier attribute of `node_id`.
    pub fn event_notifier(node_id: NodeId) -> Self {
        Self::new(node_id, AttributeId::EventNotifier)
    }

    /// Creates a read target.
    pub fn new(node_id: NodeId, attribute_id: AttributeId) -> Self {
        Self {
            node_id,
            attribute_id,
            index_range: None,
        }
    }
}

/// A single attribute write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteValue {
    /// Node to write.
    pub node_id: NodeId,

    /// Attribute to write.
    pub attribute_id: AttributeId,

    /// Optional numeric range for array values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_range: Option<String>,

    /// Value to write.
    pub value: DataValue,
}

impl WriteValue {
    /// Writes `value` to the Value attribute of `node_id`.
    pub fn value(node_id: NodeId, value: DataValue) -> Self {
        Self {
            node_id,
            attribute_id: AttributeId::Value,
            index_range: None,
            value,
        }
    }
}

// =============================================================================
// Security
// =============================================================================

/// Message security mode of the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    /// No security.
    #[default]
    None,
    /// Messages are signed.
    Sign,
    /// Messages are signed and encrypted.
    SignAndEncrypt,
}

/// Security policy negotiated for the secure channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityPolicy {
    /// No security policy.
    #[default]
    None,
    /// Basic128Rsa15.
    Basic128Rsa15,
    /// Basic256.
    Basic256,
    /// Basic256Sha256.
    Basic256Sha256,
    /// Aes128Sha256RsaOaep.
    Aes128Sha256RsaOaep,
    /// Aes256Sha256RsaPss.
    Aes256Sha256RsaPss,
}

impl SecurityPolicy {
    /// Returns the policy URI.
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::None => "http://opcfoundation.org/UA/SecurityPolicy#None",
            Self::Basic128Rsa15 => "http://opcfoundation.org/UA/SecurityPolicy#Basic128Rsa15",
            Self::Basic256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
            Self::Basic256Sha256 => "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
            Self::Aes128Sha256RsaOaep => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep"
            }
            Self::Aes256Sha256RsaPss => {
                "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss"
            }
        }
    }

    /// Length in bytes of a client nonce for this policy's asymmetric algorithm.
    ///
    /// `None` uses no nonce. RSA-1.5 uses 16 bytes; the OAEP and PSS
    /// algorithms use 32 bytes.
    pub const fn nonce_length(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Basic128Rsa15 => 16,
            Self::Basic256
            | Self::Basic256Sha256
            | Self::Aes128Sha256RsaOaep
            | Self::Aes256Sha256RsaPss => 32,
        }
    }

    /// Returns `true` if certificates are required for this policy.
    #[inline]
    pub const fn requires_certificates(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for SecurityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let uri = self.uri();
        write!(f, "{}", uri.rsplit('#').next().unwrap_or(uri))
    }
}

// =============================================================================
// Application / Endpoint metadata
// =============================================================================

/// Kind of application described by an [`ApplicationDescription`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationType {
    /// Server.
    Server,
    /// Client.
    #[default]
    Client,
    /// Client and server.
    ClientAndServer,
    /// Discovery server.
    DiscoveryServer,
}

/// Identity of a client or server application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ApplicationDescription {
    /// Globally unique application URI.
    pub application_uri: String,

    /// Product URI.
    #[serde(default)]
    pub product_uri: String,

    /// Human-readable name.
    pub application_name: String,

    /// Application type.
    #[serde(default)]
    pub application_type: ApplicationType,

    /// URI of the gateway server, when the server is reached through a gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway_server_uri: Option<String>,

    /// Discovery URLs.
    #[serde(default)]
    pub discovery_urls: Vec<String>,
}

impl ApplicationDescription {
    /// Returns `true` if a non-empty gateway server URI is advertised.
    pub fn has_gateway(&self) -> bool {
        self.gateway_server_uri
            .as_deref()
            .is_some_and(|uri| !uri.is_empty())
    }
}

/// Endpoint the secure channel is connected to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EndpointDescription {
    /// Endpoint URL.
    pub endpoint_url: String,

    /// Server application description.
    pub server: ApplicationDescription,

    /// Server certificate (DER).
    #[serde(default)]
    pub server_certificate: Vec<u8>,

    /// Security mode.
    #[serde(default)]
    pub security_mode: SecurityMode,

    /// Security policy.
    #[serde(default)]
    pub security_policy: SecurityPolicy,
}

// =============================================================================
// Tests
// =============================================================================
