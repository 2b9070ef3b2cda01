// storefront/src/services/signature.rs

//! Verification of processor-signed webhook deliveries.
//!
//! The header looks like `t=1700000000,v1=<hex>,v1=<hex>`. Each `v1` digest is
//! HMAC-SHA256 over `"{t}.{raw body}"` keyed with the endpoint secret. Other
//! schemes (`v0=` and friends) are ignored.

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(5 * 60);

/// How far a timestamp may sit in the future before it counts as expired.
const MAX_FUTURE_SKEW_SECS: i64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SignatureError {
  #[error("malformed signature header: {0}")]
  Malformed(String),
  #[error("signature timestamp {timestamp} is outside the tolerance window (now {now})")]
  Expired { timestamp: i64, now: i64 },
  #[error("no signature matched the payload")]
  Mismatch,
}

struct ParsedHeader<'a> {
  /// Kept as received; the digest covers these exact characters.
  timestamp_raw: &'a str,
  timestamp: i64,
  digests: Vec<Vec<u8>>,
}

fn parse_header(header: &str) -> Result<ParsedHeader<'_>, SignatureError> {
  let mut timestamp: Option<(&str, i64)> = None;
  let mut digests = Vec::new();
  let mut saw_v1 = false;

  for part in header.split(',') {
    let Some((key, value)) = part.split_once('=') else {
      continue;
    };
    match key.trim() {
      "t" if timestamp.is_none() => {
        let raw = value.trim();
        let parsed = raw
          .parse::<i64>()
          .map_err(|_| SignatureError::Malformed(format!("timestamp '{}' is not an integer", raw)))?;
        timestamp = Some((raw, parsed));
      }
      "v1" => {
        saw_v1 = true;
        // A digest that is not hex can never match; drop it and let the others try.
        if let Ok(bytes) = hex::decode(value.trim()) {
          digests.push(bytes);
        }
      }
      _ => {}
    }
  }

  let (timestamp_raw, timestamp) =
    timestamp.ok_or_else(|| SignatureError::Malformed("missing timestamp".to_string()))?;
  if !saw_v1 {
    return Err(SignatureError::Malformed("missing v1 signature".to_string()));
  }
  Ok(ParsedHeader {
    timestamp_raw,
    timestamp,
    digests,
  })
}

fn compute_digest(timestamp: &str, raw_body: &[u8], secret: &str) -> Result<Vec<u8>, SignatureError> {
  let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
    .map_err(|_| SignatureError::Malformed("unusable signing secret".to_string()))?;
  mac.update(timestamp.as_bytes());
  mac.update(b".");
  mac.update(raw_body);
  Ok(mac.finalize().into_bytes().to_vec())
}

/// Checks `signature_header` against `raw_body` using the current clock.
///
/// `raw_body` must be the bytes exactly as received. Pure apart from reading the clock.
pub fn verify(raw_body: &[u8], signature_header: &str, secret: &str, tolerance: Duration) -> Result<(), SignatureError> {
  verify_at(raw_body, signature_header, secret, tolerance, Utc::now().timestamp())
}

/// [`verify`] with an explicit "now" in unix seconds.
pub fn verify_at(
  raw_body: &[u8],
  signature_header: &str,
  secret: &str,
  tolerance: Duration,
  now: i64,
) -> Result<(), SignatureError> {
  let parsed = parse_header(signature_header)?;

  let expected = compute_digest(parsed.timestamp_raw, raw_body, secret)?;
  let matched = parsed
    .digests
    .iter()
    .fold(false, |acc, candidate| acc | bool::from(expected.as_slice().ct_eq(candidate.as_slice())));
  if !matched {
    return Err(SignatureError::Mismatch);
  }

  let tolerance_secs = i64::try_from(tolerance.as_secs()).unwrap_or(i64::MAX);
  let age = now.saturating_sub(parsed.timestamp);
  let ahead = parsed.timestamp.saturating_sub(now);
  if age > tolerance_secs || ahead > MAX_FUTURE_SKEW_SECS {
    return Err(SignatureError::Expired {
      timestamp: parsed.timestamp,
      now,
    });
  }
  Ok(())
}

/// Produces a header value in the processor's format. Used by the in-memory
/// processor and by tests to sign deliveries.
pub fn sign_header(raw_body: &[u8], secret: &str, timestamp: i64) -> Result<String, SignatureError> {
  let ts = timestamp.to_string();
  let digest = compute_digest(&ts, raw_body, secret)?;
  Ok(format!("t={},v1={}", ts, hex::encode(digest)))
}
