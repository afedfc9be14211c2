use crate::error::{Error, Result};
use crate::model::{FieldType, FieldValue};
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

/// Parse date or datetime text into UTC. Text without an offset is taken as UTC.
pub fn parse_timestamp(field: &str, field_type: FieldType, text: &str) -> Result<DateTime<Utc>> {
    let text = text.trim();
    let parsed = match field_type {
        FieldType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
            .or_else(|| parse_datetime(text)),
        _ => parse_datetime(text).or_else(|| {
            NaiveDate::parse_from_str(text, DATE_FORMAT)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }),
    };

    parsed.ok_or_else(|| Error::Coercion {
        field: field.to_string(),
        field_type: field_type.as_str().to_string(),
        value: text.to_string(),
    })
}

fn parse_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Coerce one raw payload value according to its schema type
pub fn coerce_value(
    field: &str,
    field_type: Option<FieldType>,
    value: serde_json::Value,
) -> Result<FieldValue> {
    match (field_type, value) {
        (_, serde_json::Value::Null) => Ok(FieldValue::Null),
        (Some(ft), serde_json::Value::String(text)) if ft.is_temporal() => {
            Ok(FieldValue::Timestamp(parse_timestamp(field, ft, &text)?))
        }
        (_, other) => Ok(FieldValue::Scalar(other)),
    }
}

/// Text the server expects for a date or datetime field
pub fn format_timestamp(field_type: FieldType, ts: &DateTime<Utc>) -> String {
    match field_type {
        FieldType::Date => ts.format(DATE_FORMAT).to_string(),
        _ => ts.format(DATETIME_FORMAT).to_string(),
    }
}

/// Wire value for a saveable field
pub fn serialize_value(field_type: FieldType, value: &FieldValue) -> serde_json::Value {
    match value {
        FieldValue::Timestamp(ts) => serde_json::Value::String(format_timestamp(field_type, ts)),
        // Strings already in server format pass through; anything else unparsed is sent raw
        FieldValue::Scalar(raw) => raw.clone(),
        FieldValue::Null => serde_json::Value::Null,
        FieldValue::Record(record) => record
            .id()
            .map(|id| serde_json::Value::String(id.to_string()))
            .unwrap_or(serde_json::Value::Null),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_date_is_midnight_utc_and_round_trips() {
        let ts = parse_timestamp("closedate", FieldType::Date, "2024-01-15").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap());
        assert_eq!(format_timestamp(FieldType::Date, &ts), "2024-01-15");
    }

    #[test]
    fn test_datetime_offsets_normalize_to_utc() {
        let ts = parse_timestamp(
            "lastmodifieddate",
            FieldType::Datetime,
            "2024-03-01T10:30:00.000+0200",
        )
        .unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
        assert_eq!(
            format_timestamp(FieldType::Datetime, &ts),
            "2024-03-01T08:30:00.000+0000"
        );

        let rfc = parse_timestamp("x", FieldType::Datetime, "2024-03-01T08:30:00Z").unwrap();
        assert_eq!(rfc, ts);
    }

    #[test]
    fn test_datetime_without_offset_assumes_utc() {
        let ts = parse_timestamp("x", FieldType::Datetime, "2024-03-01T08:30:00").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap());
    }

    #[test]
    fn test_unparseable_date_is_an_error() {
        match parse_timestamp("closedate", FieldType::Date, "next tuesday") {
            Err(Error::Coercion {
                field,
                field_type,
                value,
            }) => {
                assert_eq!(field, "closedate");
                assert_eq!(field_type, "date");
                assert_eq!(value, "next tuesday");
            }
            other => panic!("expected coercion error, got {:?}", other),
        }
    }

    #[test]
    fn test_coerce_value_only_touches_temporal_strings() {
        assert_eq!(
            coerce_value("name", Some(FieldType::String), json!("2024-01-15")).unwrap(),
            FieldValue::Scalar(json!("2024-01-15"))
        );
        assert_eq!(
            coerce_value("closedate", Some(FieldType::Date), json!(null)).unwrap(),
            FieldValue::Null
        );
        assert!(matches!(
            coerce_value("closedate", Some(FieldType::Date), json!("2024-01-15")).unwrap(),
            FieldValue::Timestamp(_)
        ));
        assert_eq!(
            coerce_value("unknown", None, json!(42)).unwrap(),
            FieldValue::Scalar(json!(42))
        );
    }
}
