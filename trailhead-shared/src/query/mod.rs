/// Backend-neutral list queries
///
/// List endpoints turn their raw query string into a [`ListQuery`] through
/// the [`ApiFeatures`] chain. A `ListQuery` carries no SQL; each store
/// backend validates it against the entity's declared [`Column`]s and
/// executes it in its own way.
///
/// # Example
///
/// ```
/// use std::collections::BTreeMap;
/// use trailhead_shared::query::{ApiFeatures, Comparison, ListQuery};
///
/// let mut params = BTreeMap::new();
/// params.insert("duration[gte]".to_string(), "5".to_string());
/// params.insert("sort".to_string(), "-price".to_string());
///
/// let query = ApiFeatures::new(ListQuery::default(), params)
///     .filter()
///     .sort()
///     .limit_fields()
///     .paginate()
///     .into_query();
///
/// assert_eq!(query.conditions[0].op, Comparison::Gte);
/// assert!(query.sort[0].descending);
/// assert_eq!(query.limit, 100);
/// ```

pub mod features;

pub use features::ApiFeatures;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use uuid::Uuid;

/// Page size used when the client does not ask for one
pub const DEFAULT_LIMIT: u64 = 100;

/// Error raised when a query refers to something the entity does not have
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum QueryError {
    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Invalid value '{value}' for field {field}")]
    InvalidValue { field: String, value: String },
}

/// Comparison operator of a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Comparison {
    /// Parses the bracketed operator token of a `field[op]` key
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "gt" => Some(Comparison::Gt),
            "gte" => Some(Comparison::Gte),
            "lt" => Some(Comparison::Lt),
            "lte" => Some(Comparison::Lte),
            _ => None,
        }
    }

    pub fn to_sql(&self) -> &'static str {
        match self {
            Comparison::Eq => "=",
            Comparison::Gt => ">",
            Comparison::Gte => ">=",
            Comparison::Lt => "<",
            Comparison::Lte => "<=",
        }
    }

    /// Whether `ordering` (record value compared to the operand) satisfies the operator
    pub fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Comparison::Eq => ordering == Ordering::Equal,
            Comparison::Gt => ordering == Ordering::Greater,
            Comparison::Gte => ordering != Ordering::Less,
            Comparison::Lt => ordering == Ordering::Less,
            Comparison::Lte => ordering != Ordering::Greater,
        }
    }
}

/// A single `field op value` predicate; all conditions are AND-ed
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Wire (camelCase) field name
    pub field: String,
    pub op: Comparison,
    /// Raw operand, typed later against the column
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: String,
    pub descending: bool,
}

/// Which fields of each record are returned
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Exclude(Vec::new())
    }
}

impl Projection {
    /// Applies the projection to a serialized record in place
    ///
    /// `id` survives every inclusion list.
    pub fn apply(&self, record: &mut Value) {
        let Value::Object(map) = record else {
            return;
        };

        match self {
            Projection::Include(fields) => {
                let kept: Map<String, Value> = std::mem::take(map)
                    .into_iter()
                    .filter(|(key, _)| key == "id" || fields.iter().any(|f| f == key))
                    .collect();
                *map = kept;
            }
            Projection::Exclude(fields) => {
                for field in fields {
                    map.remove(field);
                }
            }
        }
    }
}

/// Storage type of a queryable column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    /// Postgres enum, compared through its text form
    Enum,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Uuid,
}

/// A field that list queries may filter and sort on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Wire (camelCase) name
    pub field: &'static str,
    /// SQL column name
    pub column: &'static str,
    pub kind: ColumnKind,
}

impl Column {
    pub const fn new(field: &'static str, column: &'static str, kind: ColumnKind) -> Self {
        Self { field, column, kind }
    }

    /// Parses a raw operand into a typed value for this column
    pub fn parse(&self, raw: &str) -> Result<TypedValue, QueryError> {
        let invalid = || QueryError::InvalidValue {
            field: self.field.to_string(),
            value: raw.to_string(),
        };

        Ok(match self.kind {
            ColumnKind::Text | ColumnKind::Enum => TypedValue::Text(raw.to_string()),
            ColumnKind::Integer => TypedValue::Integer(raw.parse().map_err(|_| invalid())?),
            ColumnKind::Float => TypedValue::Float(raw.parse().map_err(|_| invalid())?),
            ColumnKind::Boolean => TypedValue::Boolean(raw.parse().map_err(|_| invalid())?),
            ColumnKind::Timestamp => TypedValue::Timestamp(parse_timestamp(raw).ok_or_else(invalid)?),
            ColumnKind::Uuid => TypedValue::Uuid(raw.parse().map_err(|_| invalid())?),
        })
    }
}

// Accepts full RFC 3339 or a bare date (midnight UTC).
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Operand after it has been typed against its column
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Timestamp(DateTime<Utc>),
    Uuid(Uuid),
}

impl TypedValue {
    /// Compares a serialized record value against this operand
    ///
    /// Returns `None` when the two cannot be compared (wrong type, null).
    pub fn compare_json(&self, value: &Value) -> Option<Ordering> {
        match self {
            TypedValue::Text(expected) => value.as_str().map(|actual| actual.cmp(expected.as_str())),
            TypedValue::Integer(expected) => value
                .as_f64()
                .and_then(|actual| actual.partial_cmp(&(*expected as f64))),
            TypedValue::Float(expected) => value
                .as_f64()
                .and_then(|actual| actual.partial_cmp(expected)),
            TypedValue::Boolean(expected) => value.as_bool().map(|actual| actual.cmp(expected)),
            TypedValue::Timestamp(expected) => value
                .as_str()
                .and_then(|actual| DateTime::parse_from_rfc3339(actual).ok())
                .map(|actual| actual.with_timezone(&Utc).cmp(expected)),
            TypedValue::Uuid(expected) => value
                .as_str()
                .and_then(|actual| actual.parse::<Uuid>().ok())
                .map(|actual| actual.cmp(expected)),
        }
    }
}

/// A fully built list query
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub conditions: Vec<Condition>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
    pub skip: u64,
    pub limit: u64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            sort: Vec::new(),
            projection: Projection::default(),
            skip: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl ListQuery {
    /// Base query restricted to `field == value`, used by nested routes
    pub fn scoped(field: &str, value: impl Into<String>) -> Self {
        Self {
            conditions: vec![Condition {
                field: field.to_string(),
                op: Comparison::Eq,
                value: value.into(),
            }],
            ..Self::default()
        }
    }

    /// Checks conditions and sort keys against the declared columns
    ///
    /// Every condition operand must parse as its column's type.
    pub fn validate(&self, columns: &[Column]) -> Result<(), QueryError> {
        for condition in &self.conditions {
            lookup(columns, &condition.field)?.parse(&condition.value)?;
        }
        for key in &self.sort {
            lookup(columns, &key.field)?;
        }
        Ok(())
    }
}

/// Finds the column declared for a wire field name
pub fn lookup<'a>(columns: &'a [Column], field: &str) -> Result<&'a Column, QueryError> {
    columns
        .iter()
        .find(|column| column.field == field)
        .ok_or_else(|| QueryError::UnknownField(field.to_string()))
}
