//! Visit and routing decision models

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::target::Target;
use crate::error::{AppError, AppResult};

/// One inbound visit to route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub geo_state: String,
    pub timestamp: DateTime<Utc>,
}

impl Visit {
    pub fn new(geo_state: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            geo_state: geo_state.into(),
            timestamp,
        }
    }

    /// UTC hour of day, 0 to 23
    pub fn hour_of_day(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Route request body
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RouteRequest {
    /// Region code, matched case-insensitively
    #[schema(example = "ca")]
    pub geo_state: Option<String>,
    /// ISO-8601 instant
    #[schema(example = "2018-07-19T14:28:59Z")]
    pub timestamp: Option<String>,
}

impl RouteRequest {
    /// Check required fields and parse the timestamp
    pub fn into_visit(self) -> AppResult<Visit> {
        let (Some(geo_state), Some(timestamp)) = (
            self.geo_state.filter(|s| !s.is_empty()),
            self.timestamp.filter(|s| !s.is_empty()),
        ) else {
            return Err(AppError::BadRequest(
                "Missing required fields: geoState and timestamp".to_string(),
            ));
        };

        let timestamp = parse_timestamp(&timestamp).ok_or_else(|| {
            AppError::BadRequest(
                "Invalid timestamp format. Must be a valid date string.".to_string(),
            )
        })?;

        Ok(Visit::new(geo_state, timestamp))
    }
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC,
/// a bare date as midnight UTC.
pub fn parse_timestamp(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Accept,
    Reject,
}

/// The part of the winning target returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AcceptedTarget {
    pub id: String,
    pub url: String,
    #[schema(value_type = String)]
    pub value: Decimal,
}

/// Routing outcome: `{"decision": "reject"}` or `{"decision": "accept", "target": {...}}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RoutingDecision {
    pub decision: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<AcceptedTarget>,
}

impl RoutingDecision {
    pub fn reject() -> Self {
        Self {
            decision: Decision::Reject,
            target: None,
        }
    }

    pub fn accept(target: &Target) -> Self {
        Self {
            decision: Decision::Accept,
            target: Some(AcceptedTarget {
                id: target.id.clone(),
                url: target.url.clone(),
                value: target.value,
            }),
        }
    }

    pub fn is_accept(&self) -> bool {
        self.decision == Decision::Accept
    }

    pub fn target_id(&self) -> Option<&str> {
        self.target.as_ref().map(|t| t.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_timestamp_variants() {
        let expected = Utc.with_ymd_and_hms(2018, 7, 19, 14, 28, 59).unwrap();
        assert_eq!(parse_timestamp("2018-07-19T14:28:59Z"), Some(expected));
        assert_eq!(parse_timestamp("2018-07-19T14:28:59.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2018-07-19T14:28:59"), Some(expected));
        assert_eq!(parse_timestamp("2018-07-19T16:28:59+02:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2018-07-19"),
            Some(Utc.with_ymd_and_hms(2018, 7, 19, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp("not-a-date"), None);
        assert_eq!(parse_timestamp("2018-13-45T00:00:00Z"), None);
    }

    #[test]
    fn test_offset_moves_hour_and_day_to_utc() {
        let visit = Visit::new("ca", parse_timestamp("2018-07-19T23:30:00-05:00").unwrap());
        assert_eq!(visit.hour_of_day(), 4);
        assert_eq!(visit.timestamp.date_naive().to_string(), "2018-07-20");
    }

    #[test]
    fn test_into_visit_requires_fields() {
        let req = RouteRequest {
            geo_state: None,
            timestamp: Some("2018-07-19T14:28:59Z".into()),
        };
        assert!(matches!(req.into_visit(), Err(AppError::BadRequest(m)) if m.contains("Missing")));

        let req = RouteRequest {
            geo_state: Some("ca".into()),
            timestamp: Some("yesterday".into()),
        };
        assert!(
            matches!(req.into_visit(), Err(AppError::BadRequest(m)) if m.contains("Invalid timestamp"))
        );
    }

    #[test]
    fn test_decision_wire_shape() {
        assert_eq!(
            serde_json::to_value(RoutingDecision::reject()).unwrap(),
            json!({"decision": "reject"})
        );

        let target = Target {
            id: "a".into(),
            url: "https://a.example".into(),
            value: "1.00".parse().unwrap(),
            max_accepts_per_day: 1,
            accept: Default::default(),
        };
        let decision = RoutingDecision::accept(&target);
        assert!(decision.is_accept());
        assert_eq!(
            serde_json::to_value(decision).unwrap(),
            json!({"decision": "accept", "target": {"id": "a", "url": "https://a.example", "value": "1.00"}})
        );
    }
}
