//! Client-side decoding of the access credential's expiry claim.
//!
//! No signature verification happens here. The check only avoids sending
//! credentials that are already known to be dead, so every decode failure
//! counts as expired.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

const LENIENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CodecError {
    #[error("credential must have three dot-separated segments, found {0}")]
    Malformed(usize),

    #[error("claim segment is not valid base64")]
    Encoding,

    #[error("claim segment is not a JSON claim set: {0}")]
    Claims(String),

    #[error("claim set has no numeric exp")]
    MissingExpiry,
}

/// Claims read from the middle segment of an access credential.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    /// Expiry in seconds since the epoch
    pub exp: f64,
}

impl Claims {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp.trunc() as i64, 0)
    }

    pub fn is_expired_at(&self, now_secs: f64) -> bool {
        self.exp < now_secs
    }

    pub fn time_until_expiry(&self) -> Duration {
        Duration::milliseconds(((self.exp - now_secs()) * 1000.0) as i64)
    }

    /// Minutes remaining until expiry (for display)
    pub fn minutes_until_expiry(&self) -> i64 {
        self.time_until_expiry().num_minutes().max(0)
    }
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<serde_json::Value>,
    #[serde(default)]
    exp: Option<serde_json::Value>,
}

/// Current time in fractional seconds since the epoch.
pub fn now_secs() -> f64 {
    Utc::now().timestamp_millis() as f64 / 1000.0
}

pub fn decode_claims(token: &str) -> Result<Claims, CodecError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(CodecError::Malformed(segments.len()));
    }

    let payload = segments[1];
    let bytes = URL_SAFE_LENIENT
        .decode(payload)
        .or_else(|_| STANDARD_LENIENT.decode(payload))
        .map_err(|_| CodecError::Encoding)?;

    let raw: RawClaims =
        serde_json::from_slice(&bytes).map_err(|e| CodecError::Claims(e.to_string()))?;

    let exp = raw
        .exp
        .as_ref()
        .and_then(serde_json::Value::as_f64)
        .filter(|exp| exp.is_finite())
        .ok_or(CodecError::MissingExpiry)?;

    let sub = match raw.sub {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Ok(Claims { sub, exp })
}

/// True when the credential is expired at `now_secs`, or cannot be decoded.
pub fn is_expired_at(token: &str, now_secs: f64) -> bool {
    match decode_claims(token) {
        Ok(claims) => claims.is_expired_at(now_secs),
        Err(_) => true,
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, now_secs())
}
