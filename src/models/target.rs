//! Target model

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::error::{AppError, AppResult};

/// A routing destination with a payout value and a daily quota
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    /// Assigned at creation, never changes
    pub id: String,
    /// Destination URL
    pub url: String,
    /// Payout weight, compared numerically when selecting a winner
    #[schema(value_type = String, example = "1.00")]
    pub value: Decimal,
    /// Accepted visits allowed per UTC calendar day
    pub max_accepts_per_day: u32,
    #[serde(default)]
    pub accept: AcceptRules,
}

/// Optional acceptance rules. A missing group accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AcceptRules {
    #[serde(rename = "geoState", default, skip_serializing_if = "Option::is_none")]
    pub geo_state: Option<InclusionSet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hour: Option<InclusionSet>,
}

/// A finite set of accepted values, written as `{"$in": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct InclusionSet {
    #[serde(rename = "$in", deserialize_with = "deserialize_members")]
    #[schema(value_type = Vec<String>)]
    pub values: Vec<String>,
}

impl InclusionSet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values.iter().any(|v| v == value)
    }

    pub fn contains_ignore_case(&self, value: &str) -> bool {
        let value = value.to_lowercase();
        self.values.iter().any(|v| v.to_lowercase() == value)
    }
}

impl AcceptRules {
    /// Whether a visit from `geo_state` at UTC `hour` satisfies every present rule group
    pub fn admits(&self, geo_state: &str, hour: u32) -> bool {
        let geo_ok = self
            .geo_state
            .as_ref()
            .map_or(true, |set| set.contains_ignore_case(geo_state));
        let hour_ok = self
            .hour
            .as_ref()
            .map_or(true, |set| set.contains(&hour.to_string()));
        geo_ok && hour_ok
    }

    pub fn is_empty(&self) -> bool {
        self.geo_state.is_none() && self.hour.is_none()
    }
}

/// Fields for a new target, already validated
#[derive(Debug, Clone)]
pub struct NewTarget {
    pub id: Option<String>,
    pub url: String,
    pub value: Decimal,
    pub max_accepts_per_day: u32,
    pub accept: AcceptRules,
}

/// Partial update; `None` leaves the stored field untouched
#[derive(Debug, Clone, Default)]
pub struct TargetUpdate {
    pub url: Option<String>,
    pub value: Option<Decimal>,
    pub max_accepts_per_day: Option<u32>,
    pub accept: Option<AcceptRules>,
}

impl Target {
    /// Build a stored target, generating an id when the caller did not supply one
    pub fn from_new(new: NewTarget) -> Self {
        let id = new
            .id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        Self {
            id,
            url: new.url,
            value: new.value,
            max_accepts_per_day: new.max_accepts_per_day,
            accept: new.accept,
        }
    }

    pub fn apply(&mut self, update: TargetUpdate) {
        if let Some(url) = update.url {
            self.url = url;
        }
        if let Some(value) = update.value {
            self.value = value;
        }
        if let Some(max) = update.max_accepts_per_day {
            self.max_accepts_per_day = max;
        }
        if let Some(accept) = update.accept {
            self.accept = accept;
        }
    }
}

/// Create target request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTarget {
    /// Optional caller-chosen id, letters, digits, `_` and `-` only
    #[validate(custom(function = "validate_target_id"))]
    pub id: Option<String>,
    #[validate(length(min = 1, message = "Field \"url\" must not be empty"))]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<String>, example = "0.50")]
    pub value: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_integer")]
    #[validate(range(min = 0, message = "Field \"maxAcceptsPerDay\" must be a non-negative integer"))]
    #[schema(value_type = Option<u32>)]
    pub max_accepts_per_day: Option<i64>,
    pub accept: Option<AcceptRules>,
}

/// Update target request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTarget {
    #[validate(length(min = 1, message = "Field \"url\" must not be empty"))]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "deserialize_decimal")]
    #[validate(custom(function = "validate_non_negative"))]
    #[schema(value_type = Option<String>)]
    pub value: Option<Decimal>,
    #[serde(default, deserialize_with = "deserialize_integer")]
    #[validate(range(min = 0, message = "Field \"maxAcceptsPerDay\" must be a non-negative integer"))]
    #[schema(value_type = Option<u32>)]
    pub max_accepts_per_day: Option<i64>,
    pub accept: Option<AcceptRules>,
}

impl CreateTarget {
    pub fn into_new_target(self) -> AppResult<NewTarget> {
        let (Some(url), Some(value), Some(max)) = (self.url.clone(), self.value, self.max_accepts_per_day) else {
            return Err(AppError::BadRequest(
                "Missing required fields: url, value, and maxAcceptsPerDay".to_string(),
            ));
        };
        self.validate()?;

        Ok(NewTarget {
            id: self.id,
            url,
            value,
            max_accepts_per_day: to_quota(max)?,
            accept: self.accept.unwrap_or_default(),
        })
    }
}

impl UpdateTarget {
    pub fn into_update(self) -> AppResult<TargetUpdate> {
        self.validate()?;

        Ok(TargetUpdate {
            url: self.url,
            value: self.value,
            max_accepts_per_day: self.max_accepts_per_day.map(to_quota).transpose()?,
            accept: self.accept,
        })
    }
}

fn to_quota(max: i64) -> AppResult<u32> {
    u32::try_from(max).map_err(|_| {
        AppError::Validation("Field \"maxAcceptsPerDay\" must be a non-negative integer".to_string())
    })
}

/// Ids become part of storage keys, so key separators are not allowed
fn validate_target_id(id: &str) -> Result<(), ValidationError> {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '-';
    if !id.chars().all(allowed) {
        let mut err = ValidationError::new("target_id");
        err.message =
            Some("Field \"id\" may only contain letters, digits, '_' and '-'".into());
        return Err(err);
    }
    Ok(())
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Field \"value\" must be a non-negative number".into());
        return Err(err);
    }
    Ok(())
}

/// Accepts `"1.50"` as well as `1.5`
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let invalid =
        || <D::Error as serde::de::Error>::custom("Field \"value\" must be a non-negative number");
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<Decimal>().map(Some).map_err(|_| invalid()),
        Some(Value::Number(n)) => {
            let text = n.to_string();
            text.parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&text))
                .map(Some)
                .map_err(|_| invalid())
        }
        Some(_) => Err(invalid()),
    }
}

/// Accepts `"10"`, `10` and integral floats such as `10.0`
fn deserialize_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let invalid = || {
        <D::Error as serde::de::Error>::custom("Field \"maxAcceptsPerDay\" must be a non-negative integer")
    };
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
                .map(Some)
                .ok_or_else(invalid)
        }
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral))
            .map(Some)
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

/// Whole-valued floats within the exactly representable integer range
fn integral(f: f64) -> Option<i64> {
    const MAX_EXACT: f64 = 9_007_199_254_740_991.0;
    (f.is_finite() && f.fract() == 0.0 && f.abs() <= MAX_EXACT).then_some(f as i64)
}

/// Members may be strings or integers; integers are kept as their decimal text
fn deserialize_members<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<Value>::deserialize(deserializer)?
        .into_iter()
        .map(|member| match member {
            Value::String(s) => Ok(s),
            Value::Number(n) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
            other => Err(serde::de::Error::custom(format!(
                "inclusion set members must be strings or integers, got {}",
                other
            ))),
        })
        .collect()
}
