//! Conference query compiler
//!
//! Translates transport filters (`{field, operator, value}`) into a validated
//! [`ConferenceQuery`]. Only one field may carry a non-equality operator; the
//! result is ordered by that field first, then by name.
//!
//! Column names in generated SQL come only from [`ConferenceField::column`];
//! user values are always bound.

use confcentral_common::db::Conference;
use confcentral_common::{Error, Result};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// One filter as received from a client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QueryFilter {
    pub field: String,
    pub operator: String,
    pub value: String,
}

impl QueryFilter {
    pub fn new(field: &str, operator: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: operator.to_string(),
            value: value.to_string(),
        }
    }
}

/// Filterable conference fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConferenceField {
    City,
    Topic,
    Month,
    MaxAttendees,
}

impl ConferenceField {
    pub fn from_transport(name: &str) -> Result<Self> {
        match name {
            "CITY" => Ok(Self::City),
            "TOPIC" => Ok(Self::Topic),
            "MONTH" => Ok(Self::Month),
            "MAX_ATTENDEES" => Ok(Self::MaxAttendees),
            other => Err(Error::InvalidFilter(format!(
                "Filter contains invalid field: {}",
                other
            ))),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Topic => "topics",
            Self::Month => "month",
            Self::MaxAttendees => "max_attendees",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Self::Month | Self::MaxAttendees)
    }

    /// Expression the result set is sorted by for this field
    fn order_expr(self) -> &'static str {
        match self {
            Self::Topic => "(SELECT MIN(value) FROM json_each(conferences.topics))",
            other => other.column(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    GtEq,
    Lt,
    LtEq,
    Ne,
}

impl Operator {
    pub fn from_transport(name: &str) -> Result<Self> {
        match name {
            "EQ" => Ok(Self::Eq),
            "GT" => Ok(Self::Gt),
            "GTEQ" => Ok(Self::GtEq),
            "LT" => Ok(Self::Lt),
            "LTEQ" => Ok(Self::LtEq),
            "NE" => Ok(Self::Ne),
            other => Err(Error::InvalidFilter(format!(
                "Filter contains invalid operator: {}",
                other
            ))),
        }
    }

    pub fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Ne => "!=",
        }
    }

    pub fn is_equality(self) -> bool {
        self == Self::Eq
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

/// A validated predicate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: ConferenceField,
    pub operator: Operator,
    pub value: FilterValue,
}

/// Compiled query: ANDed predicates plus ordering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConferenceQuery {
    pub predicates: Vec<Predicate>,
    pub inequality_field: Option<ConferenceField>,
}

impl ConferenceQuery {
    /// Sort keys, most significant first; `None` stands for the name
    pub fn ordering(&self) -> Vec<Option<ConferenceField>> {
        match self.inequality_field {
            Some(field) => vec![Some(field), None],
            None => vec![None],
        }
    }

    fn build(&self) -> QueryBuilder<'_, Sqlite> {
        let mut qb = QueryBuilder::new(format!("SELECT {} FROM conferences", Conference::COLUMNS));

        for (idx, predicate) in self.predicates.iter().enumerate() {
            qb.push(if idx == 0 { " WHERE " } else { " AND " });

            match predicate.field {
                ConferenceField::Topic => {
                    qb.push("EXISTS (SELECT 1 FROM json_each(conferences.topics) WHERE value ");
                    qb.push(predicate.operator.sql());
                    qb.push(" ");
                    push_value(&mut qb, &predicate.value);
                    qb.push(")");
                }
                field => {
                    qb.push(field.column());
                    qb.push(" ");
                    qb.push(predicate.operator.sql());
                    qb.push(" ");
                    push_value(&mut qb, &predicate.value);
                }
            }
        }

        qb.push(" ORDER BY ");
        for key in self.ordering() {
            qb.push(key.map_or("name", ConferenceField::order_expr));
            qb.push(", ");
        }
        qb.push("id");

        qb
    }

    /// Generated SQL text, with `?` placeholders
    pub fn sql(&self) -> String {
        self.build().into_sql()
    }

    pub async fn fetch(&self, pool: &SqlitePool) -> Result<Vec<Conference>> {
        let mut qb = self.build();
        let rows = qb.build().fetch_all(pool).await?;

        rows.iter().map(Conference::from_row).collect()
    }
}

fn push_value<'a>(qb: &mut QueryBuilder<'a, Sqlite>, value: &'a FilterValue) {
    match value {
        FilterValue::Text(text) => {
            qb.push_bind(text.as_str());
        }
        FilterValue::Integer(number) => {
            qb.push_bind(*number);
        }
    }
}

/// Validate filters and build the query
///
/// Unknown fields/operators, unparsable numeric values, and a non-equality
/// operator on a second field all fail with `InvalidFilter`.
pub fn compile(filters: &[QueryFilter]) -> Result<ConferenceQuery> {
    let mut predicates = Vec::with_capacity(filters.len());
    let mut inequality_field: Option<ConferenceField> = None;

    for filter in filters {
        let field = ConferenceField::from_transport(&filter.field)?;
        let operator = Operator::from_transport(&filter.operator)?;

        if !operator.is_equality() {
            match inequality_field {
                Some(existing) if existing != field => {
                    return Err(Error::InvalidFilter(
                        "Inequality filter is allowed on only one field.".to_string(),
                    ));
                }
                Some(_) => {}
                None => inequality_field = Some(field),
            }
        }

        let value = if field.is_numeric() {
            let number = filter.value.trim().parse::<i64>().map_err(|_| {
                Error::InvalidFilter(format!(
                    "Filter value for {} must be an integer: {}",
                    filter.field, filter.value
                ))
            })?;
            FilterValue::Integer(number)
        } else {
            FilterValue::Text(filter.value.clone())
        };

        predicates.push(Predicate {
            field,
            operator,
            value,
        });
    }

    Ok(ConferenceQuery {
        predicates,
        inequality_field,
    })
}

/// Compile and execute in one step
pub async fn run_query(pool: &SqlitePool, filters: &[QueryFilter]) -> Result<Vec<Conference>> {
    let query = compile(filters)?;
    tracing::debug!(
        predicates = query.predicates.len(),
        inequality_field = ?query.inequality_field,
        "Running conference query"
    );
    query.fetch(pool).await
}
