//! Typed intents. Each function of the catalog gets its own argument payload,
//! parsed and validated here rather than trusted as raw JSON.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::functions::{GET_HELP, SEARCH_BLOG, SEARCH_COURSES, SEARCH_TUTORS};
use crate::error::InvalidArguments;
use crate::search::criteria::{
    canonical_city, canonical_subject, extract_prices, BlogCriteria, CourseCriteria, CourseLevel,
    EducationLevel, ExtractedCriteria, Gender,
};
use crate::search::normalize;

/// A structured call exactly as the backend produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// Raw JSON argument string; validated by [`parse_intent`].
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    SearchTutors(TutorSearchArgs),
    SearchBlog(BlogSearchArgs),
    SearchCourses(CourseSearchArgs),
    GetHelp(HelpArgs),
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchTutors(_) => SEARCH_TUTORS,
            Self::SearchBlog(_) => SEARCH_BLOG,
            Self::SearchCourses(_) => SEARCH_COURSES,
            Self::GetHelp(_) => GET_HELP,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TutorSearchArgs {
    pub subject: Option<String>,
    pub city: Option<String>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub gender: Option<Gender>,
    pub min_experience: Option<u32>,
    pub min_rating: Option<f32>,
    pub education_level: Option<EducationLevel>,
}

impl TutorSearchArgs {
    /// Overlay the backend's arguments on what the extractor found; backend
    /// values win field by field.
    pub fn merge_into(self, mut criteria: ExtractedCriteria) -> ExtractedCriteria {
        if let Some(subject) = self.subject {
            criteria.subjects = [canonical_subject(&subject).unwrap_or(subject)].into();
        }
        if let Some(city) = self.city {
            criteria.city = Some(canonical_city(&city).unwrap_or(city));
        }
        criteria.min_price = self.min_price.or(criteria.min_price);
        criteria.max_price = self.max_price.or(criteria.max_price);
        criteria.gender = self.gender.or(criteria.gender);
        criteria.min_experience = self.min_experience.or(criteria.min_experience);
        criteria.min_rating = self.min_rating.or(criteria.min_rating);
        criteria.education_level = self.education_level.or(criteria.education_level);
        criteria
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CourseSearchArgs {
    pub subject: Option<String>,
    pub level: Option<CourseLevel>,
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
}

impl CourseSearchArgs {
    pub fn merge_into(self, mut criteria: CourseCriteria) -> CourseCriteria {
        if let Some(subject) = self.subject {
            criteria.subject = Some(canonical_subject(&subject).unwrap_or(subject));
        }
        criteria.level = self.level.or(criteria.level);
        criteria.min_price = self.min_price.or(criteria.min_price);
        criteria.max_price = self.max_price.or(criteria.max_price);
        criteria
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogSearchArgs {
    pub keyword: Option<String>,
    pub category: Option<String>,
}

impl BlogSearchArgs {
    pub fn merge_into(self, mut criteria: BlogCriteria) -> BlogCriteria {
        if self.keyword.is_some() {
            criteria.keyword = self.keyword.map(|k| normalize(&k));
        }
        if self.category.is_some() {
            criteria.category = self.category;
        }
        criteria
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HelpTopic {
    Booking,
    Payment,
    Cancellation,
    BecomeTutor,
    Account,
    General,
}

impl HelpTopic {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        let topic = match normalized.replace(['-', ' '], "_").as_str() {
            "booking" | "book" | "đặt_lịch" => Self::Booking,
            "payment" | "thanh_toán" | "refund" | "hoàn_tiền" => Self::Payment,
            "cancellation" | "cancel" | "hủy" | "hủy_lịch" => Self::Cancellation,
            "become_tutor" | "tutor" | "trở_thành_gia_sư" => Self::BecomeTutor,
            "account" | "tài_khoản" => Self::Account,
            "general" | "other" => Self::General,
            _ => return None,
        };
        Some(topic)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HelpArgs {
    pub topic: HelpTopic,
}

/// Validate a structured call against the catalog and type its arguments.
pub fn parse_intent(call: &FunctionCall) -> Result<Intent, InvalidArguments> {
    let name = call.name.as_str();
    let args = ArgReader::new(name, &call.arguments)?;

    let intent = match name {
        SEARCH_TUTORS => Intent::SearchTutors(TutorSearchArgs {
            subject: args.string("subject")?,
            city: args.string("city")?,
            min_price: args.amount("min_price")?,
            max_price: args.amount("max_price")?,
            gender: args.parsed("gender", Gender::parse)?,
            min_experience: args.count("min_experience")?,
            min_rating: args.rating("min_rating")?,
            education_level: args.parsed("education_level", EducationLevel::parse)?,
        }),
        SEARCH_BLOG => Intent::SearchBlog(BlogSearchArgs {
            keyword: args.string("keyword")?,
            category: args.string("category")?,
        }),
        SEARCH_COURSES => Intent::SearchCourses(CourseSearchArgs {
            subject: args.string("subject")?,
            level: args.parsed("level", CourseLevel::parse)?,
            min_price: args.amount("min_price")?,
            max_price: args.amount("max_price")?,
        }),
        GET_HELP => {
            let topic = args
                .parsed("topic", HelpTopic::parse)?
                .ok_or(InvalidArguments::MissingField {
                    function: name.to_string(),
                    field: "topic",
                })?;
            Intent::GetHelp(HelpArgs { topic })
        }
        other => return Err(InvalidArguments::UnknownFunction(other.to_string())),
    };

    Ok(intent)
}

/// Field accessors over a call's argument object. Null and blank values count
/// as absent.
struct ArgReader<'a> {
    function: &'a str,
    map: Map<String, JsonValue>,
}

impl<'a> ArgReader<'a> {
    fn new(function: &'a str, raw: &str) -> Result<Self, InvalidArguments> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self {
                function,
                map: Map::new(),
            });
        }
        match serde_json::from_str::<JsonValue>(raw) {
            Ok(JsonValue::Object(map)) => Ok(Self { function, map }),
            Ok(JsonValue::Null) => Ok(Self {
                function,
                map: Map::new(),
            }),
            Ok(other) => Err(InvalidArguments::Malformed {
                function: function.to_string(),
                message: format!("expected an object, got {}", other),
            }),
            Err(e) => Err(InvalidArguments::Malformed {
                function: function.to_string(),
                message: e.to_string(),
            }),
        }
    }

    fn invalid(&self, field: &'static str, message: impl Into<String>) -> InvalidArguments {
        InvalidArguments::InvalidField {
            function: self.function.to_string(),
            field,
            message: message.into(),
        }
    }

    fn get(&self, field: &str) -> Option<&JsonValue> {
        match self.map.get(field) {
            None | Some(JsonValue::Null) => None,
            Some(JsonValue::String(s)) if s.trim().is_empty() => None,
            Some(value) => Some(value),
        }
    }

    fn string(&self, field: &'static str) -> Result<Option<String>, InvalidArguments> {
        match self.get(field) {
            None => Ok(None),
            Some(JsonValue::String(s)) => Ok(Some(s.trim().to_string())),
            Some(other) => Err(self.invalid(field, format!("expected a string, got {}", other))),
        }
    }

    fn parsed<T>(
        &self,
        field: &'static str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<Option<T>, InvalidArguments> {
        match self.string(field)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| self.invalid(field, format!("unrecognized value {:?}", raw))),
        }
    }

    /// A price in đồng: a plain number, or text such as "300k" / "1,5 triệu".
    fn amount(&self, field: &'static str) -> Result<Option<u64>, InvalidArguments> {
        match self.get(field) {
            None => Ok(None),
            Some(JsonValue::Number(n)) => match n.as_f64() {
                Some(v) if v >= 0.0 => Ok(Some(v.round() as u64)),
                _ => Err(self.invalid(field, format!("expected a non-negative amount, got {}", n))),
            },
            Some(JsonValue::String(s)) => {
                let digits: String = s.chars().filter(|c| !c.is_whitespace() && *c != '.').collect();
                if let Ok(v) = digits.parse::<u64>() {
                    return Ok(Some(v));
                }
                extract_prices(&normalize(s))
                    .into_iter()
                    .next()
                    .map(Some)
                    .ok_or_else(|| self.invalid(field, format!("not an amount: {:?}", s)))
            }
            Some(other) => Err(self.invalid(field, format!("expected an amount, got {}", other))),
        }
    }

    fn count(&self, field: &'static str) -> Result<Option<u32>, InvalidArguments> {
        let value = match self.get(field) {
            None => return Ok(None),
            Some(JsonValue::Number(n)) => n.as_f64(),
            Some(JsonValue::String(s)) => s.trim().parse::<f64>().ok(),
            Some(_) => None,
        };
        match value {
            Some(v) if v >= 0.0 && v <= f64::from(u32::MAX) => Ok(Some(v.round() as u32)),
            _ => Err(self.invalid(field, "expected a non-negative whole number")),
        }
    }

    fn rating(&self, field: &'static str) -> Result<Option<f32>, InvalidArguments> {
        let value = match self.get(field) {
            None => return Ok(None),
            Some(JsonValue::Number(n)) => n.as_f64(),
            Some(JsonValue::String(s)) => s.trim().replace(',', ".").parse::<f64>().ok(),
            Some(_) => None,
        };
        match value {
            Some(v) if (1.0..=5.0).contains(&v) => Ok(Some(v as f32)),
            _ => Err(self.invalid(field, "expected a rating between 1 and 5")),
        }
    }
}
