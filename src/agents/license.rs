//! Offline license validation for pro-tier agents.
//!
//! A token has the form `AL-PRO-<payload>-<sig>` where `sig` is the first
//! 16 hex characters of HMAC-SHA256 over `payload`. A payload that starts
//! with eight digits carries an expiry date (`YYYYMMDD`, inclusive).

use chrono::{Local, NaiveDate};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::types::Tier;

type HmacSha256 = Hmac<Sha256>;

const LICENSE_PREFIX: &str = "AL-PRO-";
const LICENSE_SECRET: &[u8] = b"archlens-license-v1";
const SIGNATURE_HEX_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub valid: bool,
    pub tier: Tier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl LicenseInfo {
    fn free(message: &str) -> Self {
        Self {
            valid: false,
            tier: Tier::Free,
            expires_at: None,
            message: Some(message.to_string()),
        }
    }
}

/// Validate `key` against today's local date.
pub fn validate_license(key: Option<&str>) -> LicenseInfo {
    validate_license_at(key, Local::now().date_naive())
}

/// Validate `key` as of `today`.
pub fn validate_license_at(key: Option<&str>, today: NaiveDate) -> LicenseInfo {
    let Some(key) = key.map(str::trim).filter(|k| !k.is_empty()) else {
        return LicenseInfo::free("No license key provided");
    };
    let Some((payload, sig)) = key
        .strip_prefix(LICENSE_PREFIX)
        .and_then(|rest| rest.rsplit_once('-'))
        .filter(|(payload, _)| !payload.is_empty())
    else {
        return LicenseInfo::free("Invalid license format");
    };

    if !verify(payload, sig) {
        return LicenseInfo::free("Invalid license key");
    }

    let digits = payload.get(..8).filter(|p| p.bytes().all(|b| b.is_ascii_digit()));
    let Some(digits) = digits else {
        return LicenseInfo {
            valid: true,
            tier: Tier::Pro,
            expires_at: None,
            message: None,
        };
    };
    let Ok(expires) = NaiveDate::parse_from_str(digits, "%Y%m%d") else {
        return LicenseInfo::free("Invalid license expiry date");
    };
    if expires < today {
        return LicenseInfo {
            expires_at: Some(expires),
            ..LicenseInfo::free("License expired")
        };
    }
    LicenseInfo {
        valid: true,
        tier: Tier::Pro,
        expires_at: Some(expires),
        message: None,
    }
}

fn verify(payload: &str, sig: &str) -> bool {
    if sig.len() != SIGNATURE_HEX_LEN {
        return false;
    }
    let Ok(tag) = hex::decode(sig.to_ascii_lowercase()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(LICENSE_SECRET) else {
        return false;
    };
    mac.update(payload.as_bytes());
    mac.verify_truncated_left(&tag).is_ok()
}

/// Truncated signature for `payload`, as embedded in a token.
///
/// Token issuance lives outside this crate; this is kept for building
/// fixtures in tests.
#[doc(hidden)]
pub fn signature(payload: &str) -> String {
    match HmacSha256::new_from_slice(LICENSE_SECRET) {
        Ok(mut mac) => {
            mac.update(payload.as_bytes());
            let digest = hex::encode(mac.finalize().into_bytes());
            digest[..SIGNATURE_HEX_LEN].to_string()
        }
        Err(_) => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(payload: &str) -> String {
        format!("{LICENSE_PREFIX}{payload}-{}", signature(payload))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_and_malformed() {
        let today = day(2026, 1, 1);
        assert_eq!(
            validate_license_at(None, today).message.as_deref(),
            Some("No license key provided")
        );
        assert_eq!(
            validate_license_at(Some("XX-PRO-abc-123"), today).message.as_deref(),
            Some("Invalid license format")
        );
        assert_eq!(
            validate_license_at(Some("AL-PRO-nosig"), today).message.as_deref(),
            Some("Invalid license format")
        );
    }

    #[test]
    fn test_perpetual_token() {
        let info = validate_license_at(Some(&token("LIFETIME")), day(2026, 1, 1));
        assert!(info.valid);
        assert_eq!(info.tier, Tier::Pro);
        assert_eq!(info.expires_at, None);
    }

    #[test]
    fn test_payload_with_dashes() {
        let info = validate_license_at(Some(&token("team-acme")), day(2026, 1, 1));
        assert!(info.valid);
    }

    #[test]
    fn test_tampered_signature() {
        let mut key = token("LIFETIME");
        key.pop();
        key.push('x');
        let info = validate_license_at(Some(&key), day(2026, 1, 1));
        assert!(!info.valid);
        assert_eq!(info.message.as_deref(), Some("Invalid license key"));

        let other = format!("{LICENSE_PREFIX}OTHER-{}", signature("LIFETIME"));
        assert!(!validate_license_at(Some(&other), day(2026, 1, 1)).valid);
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let key = token("20260630");
        assert!(validate_license_at(Some(&key), day(2026, 6, 30)).valid);
        let expired = validate_license_at(Some(&key), day(2026, 7, 1));
        assert!(!expired.valid);
        assert_eq!(expired.tier, Tier::Free);
        assert_eq!(expired.expires_at, Some(day(2026, 6, 30)));
        assert_eq!(expired.message.as_deref(), Some("License expired"));
    }

    #[test]
    fn test_invalid_date_payload() {
        let info = validate_license_at(Some(&token("20261399")), day(2026, 1, 1));
        assert!(!info.valid);
    }

    #[test]
    fn test_signature_shape() {
        let sig = signature("LIFETIME");
        assert_eq!(sig.len(), 16);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
