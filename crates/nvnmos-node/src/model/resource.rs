//! The common resource envelope (spec.md §3) and the monotonic version
//! stamp every mutation bumps.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::model::types::{
    ConnectionReceiverBody, ConnectionSenderBody, DeviceBody, FlowBody, NodeBody, ReceiverBody,
    SenderBody, SourceBody,
};

/// Seconds+nanoseconds since the Unix epoch, rendered `"<s>:<ns>"` exactly as
/// the NMOS `version` wire format requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub seconds: u64,
    pub nanos: u64,
}

impl Version {
    pub fn now() -> Self {
        let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
        Self {
            seconds: now.as_secs(),
            nanos: now.subsec_nanos() as u64,
        }
    }

    /// The next version strictly greater than `self`, used when wall-clock
    /// resolution is coarser than the mutation rate (spec.md §8 "Version
    /// monotonicity").
    pub fn next_after(self) -> Self {
        let now = Self::now();
        if now > self {
            now
        } else if self.nanos < 999_999_999 {
            Self {
                seconds: self.seconds,
                nanos: self.nanos + 1,
            }
        } else {
            Self {
                seconds: self.seconds + 1,
                nanos: 0,
            }
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.seconds, self.nanos)
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Node,
    Device,
    Source,
    Flow,
    Sender,
    Receiver,
    ConnectionSender,
    ConnectionReceiver,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ResourceBody {
    Node(NodeBody),
    Device(DeviceBody),
    Source(SourceBody),
    Flow(FlowBody),
    Sender(SenderBody),
    Receiver(ReceiverBody),
    ConnectionSender(ConnectionSenderBody),
    ConnectionReceiver(ConnectionReceiverBody),
}

/// The envelope shared by every resource kind (spec.md §3).
#[derive(Debug, Clone, Serialize)]
pub struct Resource {
    pub id: Uuid,
    pub resource_type: ResourceType,
    pub version: Version,
    pub label: String,
    pub description: String,
    pub tags: std::collections::HashMap<String, Vec<String>>,
    #[serde(flatten)]
    pub data: ResourceBody,
}

impl Resource {
    pub fn bump_version(&mut self) {
        self.version = self.version.next_after();
    }
}
