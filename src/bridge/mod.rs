//! Access to the bridge's two REST APIs.
//!
//! Everything above this module sees a [`Bridge`]: reads return parsed
//! bodies, writes carry a [`CallWeight`] the transport uses to space out
//! mutating calls. Envelope parsing and HTTP error classification stay
//! inside the transport.

pub mod dry_run;
pub mod envelope;
pub mod http;
pub mod memory;
pub mod throttle;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;

pub use dry_run::DryRunBridge;
pub use http::{BridgeConfig, HttpBridge};
pub use memory::MemoryBridge;
pub use throttle::{CallWeight, Throttle, ThrottlePolicy};

/// Which of the bridge's two APIs a call targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    /// Numeric-ID API under `/api/{user}/`.
    Legacy,
    /// GUID API under `/clip/v2/`.
    Modern,
}

impl std::fmt::Display for Api {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Legacy => write!(f, "v1"),
            Self::Modern => write!(f, "v2"),
        }
    }
}

/// A successful response. `warnings` carries errors the bridge reported
/// alongside a 2xx status.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub body: Value,
    pub warnings: Vec<String>,
}

impl Reply {
    pub fn new(body: Value) -> Self {
        Self {
            body,
            warnings: Vec::new(),
        }
    }
}

#[async_trait]
pub trait Bridge: Send + Sync {
    /// Read `path`. Modern API replies are already unwrapped to their `data` member.
    async fn get(&self, api: Api, path: &str) -> Result<Reply>;

    /// Write a partial body to `path`.
    async fn put(&self, api: Api, path: &str, body: Value, weight: CallWeight) -> Result<Reply>;
}
