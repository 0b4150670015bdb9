//! Status catalog for requests and documents.
//!
//! The numeric code is the persisted source of truth. Display labels are a
//! pure presentation derivation and are never used to recover a code except
//! when an external system hands back a label.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Lifecycle status shared by requests and their documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum RequestStatus {
    Unsigned = 0,
    ReadyForSign = 1,
    Rejected = 2,
    Delegated = 3,
    InProcess = 4,
    Signed = 5,
    /// Display-only. Never persisted; a `Signed` request is shown this way
    /// to its owner and to readers.
    ReadyForDispatch = 6,
    Dispatched = 7,
}

/// Failed catalog lookup. Indicates corrupted upstream data.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnknownStatus {
    #[error("unknown status code {0}")]
    Code(i64),

    #[error("unknown status label '{0}'")]
    Label(String),
}

impl RequestStatus {
    /// Every status in code order.
    pub const ALL: [RequestStatus; 8] = [
        RequestStatus::Unsigned,
        RequestStatus::ReadyForSign,
        RequestStatus::Rejected,
        RequestStatus::Delegated,
        RequestStatus::InProcess,
        RequestStatus::Signed,
        RequestStatus::ReadyForDispatch,
        RequestStatus::Dispatched,
    ];

    /// Returns the persisted numeric code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Looks up a status by its numeric code.
    pub fn from_code(code: i64) -> Result<Self, UnknownStatus> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| i64::from(s.code()) == code)
            .ok_or(UnknownStatus::Code(code))
    }

    /// Returns the human display label.
    pub fn label(self) -> &'static str {
        match self {
            RequestStatus::Unsigned => "Unsigned",
            RequestStatus::ReadyForSign => "Ready for Signature",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Delegated => "Delegated",
            RequestStatus::InProcess => "In Process",
            RequestStatus::Signed => "Signed",
            RequestStatus::ReadyForDispatch => "Ready for Dispatch",
            RequestStatus::Dispatched => "Dispatched",
        }
    }

    /// Reverse lookup for storage backends that return the label instead of
    /// the code.
    pub fn from_label(label: &str) -> Result<Self, UnknownStatus> {
        Self::ALL
            .iter()
            .copied()
            .find(|s| s.label() == label)
            .ok_or_else(|| UnknownStatus::Label(label.to_string()))
    }

    /// Whether this status may be written to storage.
    pub fn is_persistable(self) -> bool {
        self != RequestStatus::ReadyForDispatch
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for RequestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = i64::deserialize(deserializer)?;
        RequestStatus::from_code(code).map_err(serde::de::Error::custom)
    }
}

/// Renders a raw code for display. Unknown codes are flagged visibly and
/// logged rather than shown as a blank or generic label.
pub fn label_for_code(code: i64) -> String {
    match RequestStatus::from_code(code) {
        Ok(status) => status.label().to_string(),
        Err(e) => {
            tracing::error!(code, "status catalog lookup failed: {}", e);
            format!("Unknown status (code {})", code)
        }
    }
}
