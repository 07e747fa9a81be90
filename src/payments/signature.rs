//! Verification of signed payment webhooks.
//!
//! The provider sends `t=<unix_ts>,v1=<hex>[,v1=<hex>...]`. Each `v1` is an
//! HMAC-SHA256 over `"{t}.{raw_body}"` keyed with the shared webhook secret.

use axum::http::StatusCode;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

pub const SIGNATURE_HEADER: &str = "stripe-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("signature header missing")]
    MissingHeader,

    #[error("signature header malformed")]
    MalformedHeader,

    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,

    #[error("no signature matched")]
    NoMatch,
}

impl SignatureError {
    pub fn status(&self) -> StatusCode {
        match self {
            SignatureError::MissingHeader | SignatureError::MalformedHeader => {
                StatusCode::BAD_REQUEST
            }
            SignatureError::TimestampOutOfTolerance | SignatureError::NoMatch => {
                StatusCode::UNAUTHORIZED
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

pub fn parse_header(raw: &str) -> Result<SignatureHeader, SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in raw.split(',') {
        let (scheme, value) = part
            .trim()
            .split_once('=')
            .ok_or(SignatureError::MalformedHeader)?;

        match scheme {
            "t" => {
                let parsed = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader)?;
                timestamp = Some(parsed);
            }
            "v1" => signatures.push(hex::decode(value).ok_or(SignatureError::MalformedHeader)?),
            // other schemes (v0 test signatures and future versions) are not trusted
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::MalformedHeader)?;
    if signatures.is_empty() {
        return Err(SignatureError::MalformedHeader);
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Checks the header against `body`. Returns the signed timestamp on success.
///
/// Stale timestamps are rejected before any signature is compared, and every
/// comparison is constant time.
pub fn verify(
    secret: &str,
    header: Option<&str>,
    body: &[u8],
    tolerance_secs: i64,
    now: i64,
) -> Result<i64, SignatureError> {
    let header = parse_header(header.ok_or(SignatureError::MissingHeader)?)?;

    if now.abs_diff(header.timestamp) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    for candidate in &header.signatures {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::NoMatch)?;
        mac.update(signed_payload_prefix(header.timestamp).as_bytes());
        mac.update(body);
        if mac.verify_slice(candidate).is_ok() {
            return Ok(header.timestamp);
        }
    }

    Err(SignatureError::NoMatch)
}

/// Hex HMAC for `body` at `timestamp`, as the provider would compute it.
pub fn sign(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(signed_payload_prefix(timestamp).as_bytes());
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

fn signed_payload_prefix(timestamp: i64) -> String {
    format!("{timestamp}.")
}

// hex helpers (no extra dep)
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes
            .as_ref()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect()
    }

    pub fn decode(raw: &str) -> Option<Vec<u8>> {
        if raw.is_empty() || raw.len() % 2 != 0 {
            return None;
        }

        raw.as_bytes()
            .chunks(2)
            .map(|pair| {
                let text = std::str::from_utf8(pair).ok()?;
                u8::from_str_radix(text, 16).ok()
            })
            .collect()
    }
}
