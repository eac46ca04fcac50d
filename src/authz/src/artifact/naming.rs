//! Expiry encoded in artifact names
//!
//! An ephemeral artifact is named `<base>_till_<UTC timestamp>`, with the
//! timestamp written as `%Y-%m-%dt%H:%M:%S`. The encoding is fixed-width for
//! four-digit years, so names sort in expiry order and liveness can be
//! recomputed from the name alone.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

pub const VALID_TILL_SEPARATOR: &str = "_till_";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dt%H:%M:%S";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("double '_till_' in artifact name {0}")]
    DoubleSeparator(String),

    #[error("invalid expiry in artifact name {name}: {message}")]
    InvalidTimestamp { name: String, message: String },
}

/// Encode an expiry, truncated to whole seconds
pub fn encode(valid_till: DateTime<Utc>) -> String {
    valid_till.format(TIMESTAMP_FORMAT).to_string()
}

/// Decode an expiry produced by [`encode`]
pub fn decode(encoded: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(encoded, TIMESTAMP_FORMAT).map(|naive| Utc.from_utc_datetime(&naive))
}

/// Append the encoded expiry to a base name
pub fn with_valid_till(base: &str, valid_till: DateTime<Utc>) -> String {
    format!("{}{}{}", base, VALID_TILL_SEPARATOR, encode(valid_till))
}

/// Expiry carried by a name; `None` for names without one
pub fn valid_till(name: &str) -> Result<Option<DateTime<Utc>>, NamingError> {
    let parts: Vec<&str> = name.split(VALID_TILL_SEPARATOR).collect();
    match parts.as_slice() {
        [_] => Ok(None),
        [_, encoded] => decode(encoded)
            .map(Some)
            .map_err(|e| NamingError::InvalidTimestamp {
                name: name.to_string(),
                message: e.to_string(),
            }),
        _ => Err(NamingError::DoubleSeparator(name.to_string())),
    }
}

/// Whether the name's expiry lies before `now`; names without one never expire
pub fn is_overdue(name: &str, now: DateTime<Utc>) -> Result<bool, NamingError> {
    Ok(valid_till(name)?.map(|till| till < now).unwrap_or(false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).single().unwrap()
    }

    #[test]
    fn test_name_format() {
        let name = with_valid_till("warden_x1", at(1_700_000_000));
        assert_eq!(name, "warden_x1_till_2023-11-14t22:13:20");
    }

    #[test]
    fn test_overdue() {
        let name = with_valid_till("warden_x1", at(1_000));
        assert!(is_overdue(&name, at(1_001)).unwrap());
        assert!(!is_overdue(&name, at(1_000)).unwrap());
        assert!(!is_overdue(&name, at(999)).unwrap());
    }

    #[test]
    fn test_names_without_expiry_never_expire() {
        assert!(!is_overdue("default", at(i32::MAX as i64)).unwrap());
        assert_eq!(valid_till("root").unwrap(), None);
    }

    #[test]
    fn test_malformed_names() {
        assert!(matches!(
            is_overdue("a_till_b_till_c", at(0)),
            Err(NamingError::DoubleSeparator(_))
        ));
        assert!(matches!(
            is_overdue("a_till_tomorrow", at(0)),
            Err(NamingError::InvalidTimestamp { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(secs in 0i64..253_402_300_799) {
            prop_assert_eq!(decode(&encode(at(secs))).unwrap(), at(secs));
        }

        #[test]
        fn prop_encoding_preserves_order(a in 0i64..253_402_300_799, b in 0i64..253_402_300_799) {
            prop_assert_eq!(encode(at(a)).cmp(&encode(at(b))), a.cmp(&b));
        }

        #[test]
        fn prop_overdue_is_monotonic_in_now(till in 0i64..4_000_000_000, now in 0i64..4_000_000_000, step in 0i64..1_000_000) {
            let name = with_valid_till("p", at(till));
            let earlier = is_overdue(&name, at(now)).unwrap();
            let later = is_overdue(&name, at(now) + Duration::seconds(step)).unwrap();
            prop_assert!(!earlier || later);
        }
    }
}
