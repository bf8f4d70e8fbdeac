//! Scanned QR payload contract
//!
//! Printed labels outlive deployments, so the wire shape is frozen:
//! `{"t":"HSB_QR","c":<code>,"a":<areaId>,"b":<bagId>}`. New fields may be
//! added over time but `c`, `a` and `b` keep their meaning.

use serde::{Deserialize, Serialize};

/// Type tag every label payload carries
pub const QR_PAYLOAD_TAG: &str = "HSB_QR";

/// The payload printed into the QR symbol
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LabelQrPayload {
    #[serde(rename = "t")]
    pub tag: String,
    #[serde(rename = "c")]
    pub code: String,
    #[serde(rename = "a")]
    pub area_id: i32,
    #[serde(rename = "b")]
    pub bag_id: i32,
}

impl LabelQrPayload {
    pub fn new(code: impl Into<String>, area_id: i32, bag_id: i32) -> Self {
        Self {
            tag: QR_PAYLOAD_TAG.to_string(),
            code: code.into(),
            area_id,
            bag_id,
        }
    }

    /// Serialize for printing. Serialization of this fixed shape cannot
    /// fail, so fall back to an empty object rather than panicking.
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Result of interpreting raw scanner input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanPayload {
    /// Structured label payload; area/bag act as hints to cross-check
    /// against the stored label
    Parsed {
        code: String,
        area_id: i32,
        bag_id: i32,
    },
    /// Anything else the scanner emitted verbatim
    Unparsable { raw: String },
}

impl ScanPayload {
    /// Parse raw scanner text. Scanners in plain-text mode emit the bare
    /// code, so an unparsable payload is not an error here; the caller
    /// treats the raw text as a code with no hints.
    pub fn parse(raw: &str) -> ScanPayload {
        match serde_json::from_str::<LabelQrPayload>(raw.trim()) {
            Ok(payload) if payload.tag == QR_PAYLOAD_TAG && !payload.code.is_empty() => {
                ScanPayload::Parsed {
                    code: payload.code,
                    area_id: payload.area_id,
                    bag_id: payload.bag_id,
                }
            }
            _ => ScanPayload::Unparsable {
                raw: raw.to_string(),
            },
        }
    }
}
