//! Query plans - store-agnostic filter/join/sort/limit descriptions.
//!
//! `QueryBuilder` maps extracted criteria onto predicates. Plans are immutable
//! once built; stores read them through the accessors and may use
//! [`QueryPlan::matches_row`] / [`QueryPlan::compare_rows`] to interpret them.

use serde::Serialize;
use serde_json::{Map, Value};
use std::cmp::Ordering;

use super::criteria::{BlogCriteria, CourseCriteria, EducationLevel, ExtractedCriteria};

pub const DEFAULT_LIMIT: usize = 10;

/// A stored record: field name → JSON value.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Profile,
    Account,
    Course,
    BlogPost,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// Exact equality.
    Equals { value: Value },
    /// Exact equality with any of the values.
    OneOf { values: Vec<Value> },
    /// Case-insensitive substring; array fields match if any element does.
    ContainsCi { needle: String },
    /// Case-insensitive substring of any needle.
    ContainsAnyCi { needles: Vec<String> },
    /// Inclusive numeric range. `min > max` matches nothing.
    Range { min: Option<f64>, max: Option<f64> },
    /// Matches no record.
    Never,
}

impl Condition {
    fn matches_value(&self, value: &Value) -> bool {
        match self {
            Self::Equals { value: expected } => value == expected,
            Self::OneOf { values } => values.contains(value),
            Self::ContainsCi { needle } => text_values(value)
                .iter()
                .any(|text| text.contains(needle.as_str())),
            Self::ContainsAnyCi { needles } => text_values(value)
                .iter()
                .any(|text| needles.iter().any(|n| text.contains(n.as_str()))),
            Self::Range { min, max } => match value.as_f64() {
                Some(n) => min.map_or(true, |m| n >= m) && max.map_or(true, |m| n <= m),
                None => false,
            },
            Self::Never => false,
        }
    }

    fn is_unsatisfiable(&self) -> bool {
        match self {
            Self::Range {
                min: Some(min),
                max: Some(max),
            } => min > max,
            Self::Never => true,
            _ => false,
        }
    }

    /// Price range in đồng. Bounds are compared as integers first, so an
    /// inverted range stays empty even where `f64` cannot tell them apart.
    fn price_range(min: Option<u64>, max: Option<u64>) -> Self {
        match (min, max) {
            (Some(lo), Some(hi)) if lo > hi => Self::Never,
            _ => Self::Range {
                min: min.map(|p| p as f64),
                max: max.map(|p| p as f64),
            },
        }
    }
}

fn text_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.to_lowercase()],
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_lowercase))
            .collect(),
        _ => Vec::new(),
    }
}

/// A filter on one collection. It holds when any of `fields` satisfies the condition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub collection: Collection,
    pub fields: Vec<String>,
    pub condition: Condition,
    /// Trust-boundary filter added regardless of the user's criteria.
    pub gating: bool,
}

impl Predicate {
    fn new(collection: Collection, field: &str, condition: Condition) -> Self {
        Self {
            collection,
            fields: vec![field.to_string()],
            condition,
            gating: false,
        }
    }

    fn any_field(collection: Collection, fields: &[&str], condition: Condition) -> Self {
        Self {
            collection,
            fields: fields.iter().map(|f| f.to_string()).collect(),
            condition,
            gating: false,
        }
    }

    fn gate(collection: Collection, field: &str, value: Value) -> Self {
        Self {
            collection,
            fields: vec![field.to_string()],
            condition: Condition::Equals { value },
            gating: true,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.fields.iter().any(|field| {
            record
                .get(field)
                .is_some_and(|value| self.condition.matches_value(value))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinSpec {
    pub collection: Collection,
    /// Field on the primary record.
    pub local_key: String,
    /// Field on the joined record.
    pub foreign_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub collection: Collection,
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    fn desc(collection: Collection, field: &str) -> Self {
        Self {
            collection,
            field: field.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    collection: Collection,
    join: Option<JoinSpec>,
    filters: Vec<Predicate>,
    sort: Vec<SortKey>,
    limit: usize,
}

impl QueryPlan {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    pub fn join(&self) -> Option<&JoinSpec> {
        self.join.as_ref()
    }

    pub fn filters(&self) -> &[Predicate] {
        &self.filters
    }

    pub fn filters_for(&self, collection: Collection) -> impl Iterator<Item = &Predicate> {
        self.filters
            .iter()
            .filter(move |p| p.collection == collection)
    }

    pub fn sort_keys(&self) -> &[SortKey] {
        &self.sort
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// True when some predicate can never hold, so the plan yields no rows.
    pub fn is_unsatisfiable(&self) -> bool {
        self.filters.iter().any(|p| p.condition.is_unsatisfiable())
    }

    /// Evaluate every predicate against a primary record and its joined record.
    /// A predicate on the joined collection fails when there is no joined record.
    pub fn matches_row(&self, primary: &Record, joined: Option<&Record>) -> bool {
        self.filters.iter().all(|p| {
            if p.collection == self.collection {
                p.matches(primary)
            } else {
                joined.is_some_and(|j| p.matches(j))
            }
        })
    }

    /// Order two rows by the plan's sort keys. Missing values sort last.
    pub fn compare_rows(
        &self,
        a: (&Record, Option<&Record>),
        b: (&Record, Option<&Record>),
    ) -> Ordering {
        for key in &self.sort {
            let pick = |row: (&Record, Option<&Record>)| -> Option<f64> {
                let record = if key.collection == self.collection {
                    Some(row.0)
                } else {
                    row.1
                };
                record?.get(&key.field).and_then(sort_value)
            };
            let ordering = match (pick(a), pick(b)) {
                (Some(x), Some(y)) => {
                    let ord = x.partial_cmp(&y).unwrap_or(Ordering::Equal);
                    match key.direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                }
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

fn sort_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp() as f64),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Maps extracted criteria onto query plans. Pure; performs no I/O.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    limit: usize,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl QueryBuilder {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Tutor search: `profile` joined to `account` on `profile.user_id = account.id`.
    ///
    /// The role/approved/active gates are always present; criteria can only add
    /// predicates, never remove or relax them.
    pub fn build(&self, criteria: &ExtractedCriteria) -> QueryPlan {
        use Collection::{Account, Profile};

        let mut filters = vec![
            Predicate::gate(Account, "role", Value::from("tutor")),
            Predicate::gate(Account, "is_approved", Value::Bool(true)),
            Predicate::gate(Account, "is_active", Value::Bool(true)),
        ];

        if !criteria.subjects.is_empty() {
            filters.push(Predicate::new(
                Profile,
                "subjects",
                Condition::ContainsAnyCi {
                    needles: criteria.subjects.iter().map(|s| s.to_lowercase()).collect(),
                },
            ));
        }
        if let Some(ref city) = criteria.city {
            filters.push(Predicate::new(
                Profile,
                "city",
                Condition::ContainsCi {
                    needle: city.to_lowercase(),
                },
            ));
        }
        if criteria.min_price.is_some() || criteria.max_price.is_some() {
            filters.push(Predicate::new(
                Profile,
                "hourly_rate",
                Condition::price_range(criteria.min_price, criteria.max_price),
            ));
        }
        if let Some(gender) = criteria.gender {
            let value = serde_json::to_value(gender).unwrap_or(Value::Null);
            filters.push(Predicate::new(Profile, "gender", Condition::Equals { value }));
        }
        if let Some(years) = criteria.min_experience {
            filters.push(Predicate::new(
                Profile,
                "experience_years",
                Condition::Range {
                    min: Some(f64::from(years)),
                    max: None,
                },
            ));
        }
        if let Some(rating) = criteria.min_rating {
            filters.push(Predicate::new(
                Profile,
                "rating",
                Condition::Range {
                    min: Some(f64::from(rating)),
                    max: None,
                },
            ));
        }
        if let Some(level) = criteria.education_level {
            let values = [
                EducationLevel::Student,
                EducationLevel::Bachelor,
                EducationLevel::Teacher,
                EducationLevel::Master,
                EducationLevel::Doctorate,
            ]
            .into_iter()
            .filter(|l| *l >= level)
            .map(|l| Value::from(l.as_key()))
            .collect();
            filters.push(Predicate::new(
                Profile,
                "education_level",
                Condition::OneOf { values },
            ));
        }

        QueryPlan {
            collection: Profile,
            join: Some(JoinSpec {
                collection: Account,
                local_key: "user_id".to_string(),
                foreign_key: "id".to_string(),
            }),
            filters,
            sort: vec![
                SortKey::desc(Profile, "rating"),
                SortKey::desc(Profile, "review_count"),
            ],
            limit: self.limit,
        }
    }

    /// Course search: `course` joined to the owning tutor's `account`.
    pub fn build_course_plan(&self, criteria: &CourseCriteria) -> QueryPlan {
        use Collection::{Account, Course};

        let mut filters = vec![
            Predicate::gate(Course, "is_published", Value::Bool(true)),
            Predicate::gate(Account, "is_active", Value::Bool(true)),
        ];

        if let Some(ref subject) = criteria.subject {
            filters.push(Predicate::any_field(
                Course,
                &["subject", "title"],
                Condition::ContainsCi {
                    needle: subject.to_lowercase(),
                },
            ));
        }
        if let Some(level) = criteria.level {
            filters.push(Predicate::new(
                Course,
                "level",
                Condition::Equals {
                    value: Value::from(level.as_key()),
                },
            ));
        }
        if criteria.min_price.is_some() || criteria.max_price.is_some() {
            filters.push(Predicate::new(
                Course,
                "price",
                Condition::price_range(criteria.min_price, criteria.max_price),
            ));
        }

        QueryPlan {
            collection: Course,
            join: Some(JoinSpec {
                collection: Account,
                local_key: "tutor_id".to_string(),
                foreign_key: "id".to_string(),
            }),
            filters,
            sort: vec![
                SortKey::desc(Course, "rating"),
                SortKey::desc(Course, "enrollment_count"),
            ],
            limit: self.limit,
        }
    }

    /// Blog search over published posts, newest first.
    pub fn build_blog_plan(&self, criteria: &BlogCriteria) -> QueryPlan {
        use Collection::BlogPost;

        let mut filters = vec![Predicate::gate(BlogPost, "is_published", Value::Bool(true))];

        // Every keyword word must appear, in any order and any of the fields.
        if let Some(ref keyword) = criteria.keyword {
            for word in keyword.split_whitespace() {
                filters.push(Predicate::any_field(
                    BlogPost,
                    &["title", "excerpt", "tags"],
                    Condition::ContainsCi {
                        needle: word.to_lowercase(),
                    },
                ));
            }
        }
        if let Some(ref category) = criteria.category {
            filters.push(Predicate::new(
                BlogPost,
                "category",
                Condition::ContainsCi {
                    needle: category.to_lowercase(),
                },
            ));
        }

        QueryPlan {
            collection: BlogPost,
            join: None,
            filters,
            sort: vec![SortKey::desc(BlogPost, "published_at")],
            limit: self.limit,
        }
    }
}
