//! Wire-to-domain conversion rules shared by every resource.
//!
//! Wire structs mirror the JSON verbatim: unix seconds, `0`/`1` flags,
//! nullable fields. Each one implements [`IntoDomain`] using the field rules
//! here, so no resource carries its own copy of the timestamp or flag logic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::error::MappingError;

/// Conversion from a wire-shaped struct into its caller-facing form.
pub trait IntoDomain {
    type Domain;

    fn into_domain(self) -> Result<Self::Domain, MappingError>;
}

impl<W: IntoDomain> IntoDomain for Vec<W> {
    type Domain = Vec<W::Domain>;

    fn into_domain(self) -> Result<Self::Domain, MappingError> {
        self.into_iter().map(IntoDomain::into_domain).collect()
    }
}

impl<W: IntoDomain> IntoDomain for Option<W> {
    type Domain = Option<W::Domain>;

    fn into_domain(self) -> Result<Self::Domain, MappingError> {
        self.map(IntoDomain::into_domain).transpose()
    }
}

/// A timestamp that is always present. Zero maps to the epoch itself.
pub fn epoch(secs: i64) -> Result<DateTime<Utc>, MappingError> {
    DateTime::<Utc>::from_timestamp(secs, 0).ok_or(MappingError::Timestamp(secs))
}

/// A timestamp for an event that may not have happened. Zero and absent
/// both map to `None`.
pub fn optional_epoch(secs: Option<i64>) -> Result<Option<DateTime<Utc>>, MappingError> {
    match secs {
        None | Some(0) => Ok(None),
        Some(secs) => epoch(secs).map(Some),
    }
}

/// The service's integer flag: `1` is true, anything else is false.
pub fn bit(flag: i64) -> bool {
    flag == 1
}

/// Accept a JSON number or a numeric string. Some functions send decimal
/// grades as strings ("8.00"); an empty or null value becomes `None`.
pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid number {s:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn epoch_maps_seconds() {
        assert_eq!(
            epoch(1577836800).unwrap(),
            Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn required_zero_is_the_epoch() {
        assert_eq!(epoch(0).unwrap(), Utc.timestamp_opt(0, 0).unwrap());
    }

    #[test]
    fn optional_zero_and_absent_are_none() {
        assert_eq!(optional_epoch(Some(0)).unwrap(), None);
        assert_eq!(optional_epoch(None).unwrap(), None);
        assert_eq!(
            optional_epoch(Some(1577837100)).unwrap(),
            Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 5, 0).unwrap())
        );
    }

    #[test]
    fn out_of_range_timestamp_is_mapping_error() {
        assert_eq!(epoch(i64::MAX), Err(MappingError::Timestamp(i64::MAX)));
    }

    #[test]
    fn bit_is_true_only_for_one() {
        assert!(bit(1));
        assert!(!bit(0));
        assert!(!bit(2));
        assert!(!bit(-1));
    }

    #[derive(Deserialize)]
    struct Grade {
        #[serde(default, deserialize_with = "lenient_f64")]
        grade: Option<f64>,
    }

    #[test]
    fn lenient_f64_accepts_numbers_and_strings() {
        let g: Grade = serde_json::from_str(r#"{"grade":"8.50"}"#).unwrap();
        assert_eq!(g.grade, Some(8.5));
        let g: Grade = serde_json::from_str(r#"{"grade":3}"#).unwrap();
        assert_eq!(g.grade, Some(3.0));
        let g: Grade = serde_json::from_str(r#"{"grade":null}"#).unwrap();
        assert_eq!(g.grade, None);
        let g: Grade = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(g.grade, None);
        assert!(serde_json::from_str::<Grade>(r#"{"grade":"n/a"}"#).is_err());
    }
}
