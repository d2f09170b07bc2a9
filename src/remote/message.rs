// src/remote/message.rs
//! Bridge wire format
//!
//! One JSON object per line, tagged by `kind`:
//!
//! ```text
//! {"kind":"request","id":"<uuid>","request":{"id":..,"method":..,"url":..,"headers":[..],"credentials":..,"body":"<base64>"}}
//! {"kind":"response","id":"<uuid>","response":{"status":..,"statusText":..,"headers":[..],"body":"<base64>"}}
//! {"kind":"unhandled","id":"<uuid>"}
//! ```
//!
//! Neither side ever writes a line longer than the configured frame limit,
//! and a reader skips over-long lines instead of giving up on the stream.

use crate::interception::headers::Headers;
use crate::interception::request::{normalize_method, Credentials, InterceptedRequest};
use crate::interception::response::InterceptedResponse;
use crate::utils::errors::{InterceptorError, Result};
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::warn;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BridgeMessage {
    /// Child to parent: a request awaiting resolution
    Request { id: Uuid, request: SerializedRequest },

    /// Parent to child: a parent-side listener mocked the request
    Response {
        id: Uuid,
        response: SerializedResponse,
    },

    /// Parent to child: nobody responded, fall through to the network
    Unhandled { id: Uuid },
}

impl BridgeMessage {
    /// Correlation id
    pub fn id(&self) -> Uuid {
        match self {
            Self::Request { id, .. } | Self::Response { id, .. } | Self::Unhandled { id } => *id,
        }
    }

    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    /// Encode, refusing lines the peer would discard
    pub fn encode_within(&self, max_frame_length: usize) -> Result<String> {
        let line = self.encode()?;
        if line.len() > max_frame_length {
            return Err(InterceptorError::Bridge(format!(
                "{} frame for {} is {} bytes, limit is {}",
                self.kind(),
                self.id(),
                line.len(),
                max_frame_length
            )));
        }
        Ok(line)
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Request { .. } => "request",
            Self::Response { .. } => "response",
            Self::Unhandled { .. } => "unhandled",
        }
    }
}

/// Next line from the bridge, or `None` once the stream is done
///
/// An over-long line is skipped: the codec discards up to the next newline
/// and `FramedRead` yields a single `None` after the error before it resumes
/// reading. Only I/O errors and end of stream end the loop.
pub(crate) async fn next_line<R>(lines: &mut FramedRead<R, LinesCodec>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    let mut skipped = false;
    loop {
        match lines.next().await {
            Some(Ok(line)) => return Some(line),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                warn!(
                    "Skipping bridge frame longer than {} bytes",
                    lines.decoder().max_length()
                );
                skipped = true;
            }
            Some(Err(LinesCodecError::Io(e))) => {
                warn!("Bridge read failed: {}", e);
                return None;
            }
            None if skipped => skipped = false,
            None => return None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedRequest {
    pub id: Uuid,
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub credentials: Credentials,
    #[serde(default, with = "base64_body")]
    pub body: Bytes,
}

impl From<&InterceptedRequest> for SerializedRequest {
    fn from(request: &InterceptedRequest) -> Self {
        Self {
            id: request.id(),
            method: request.method().to_string(),
            url: request.url().to_string(),
            headers: request.headers().clone(),
            credentials: request.credentials(),
            body: request.body().clone(),
        }
    }
}

impl SerializedRequest {
    /// Rebuild the canonical request, keeping its identifier
    pub fn to_request(&self) -> Result<InterceptedRequest> {
        let url = Url::parse(&self.url)
            .map_err(|e| InterceptorError::InvalidUrl(format!("{}: {}", self.url, e)))?;

        Ok(InterceptedRequest::builder(normalize_method(&self.method)?, url)
            .id(self.id)
            .headers(self.headers.clone())
            .credentials(self.credentials)
            .body(self.body.clone())
            .build())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedResponse {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, with = "base64_body")]
    pub body: Bytes,
}

impl From<&InterceptedResponse> for SerializedResponse {
    fn from(response: &InterceptedResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text.clone(),
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }
}

impl From<SerializedResponse> for InterceptedResponse {
    fn from(response: SerializedResponse) -> Self {
        Self {
            status: response.status,
            status_text: response.status_text,
            headers: response.headers,
            body: response.body,
        }
    }
}

mod base64_body {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded)
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}
