//! Criteria extraction - pulls structured search parameters out of normalized text.
//!
//! Every field has its own matcher. Matchers never fail: a field that nothing
//! matches simply stays `None` (or empty for subjects).

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::normalizer::{contains_phrase, find_phrase, normalize};

static PRICE_SHORTHAND_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(\d+(?:[.,]\d+)?)\s*(k|nghìn|ngàn|tr|triệu)\b")
        .expect("price shorthand regex is valid")
});
static PRICE_CURRENCY_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(\d{1,3}(?:[.,]\d{3})+|\d{4,})\s*(?:đồng|đ|vnd)\b")
        .expect("price currency regex is valid")
});
static PRICE_HYPHEN_RANGE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\d\s*(?:k|nghìn|ngàn|tr|triệu)?\s*-\s*\d")
        .expect("price hyphen range regex is valid")
});
static RANGE_START_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:từ|from)\b").expect("range start regex is valid")
});
static RANGE_END_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:đến|tới|to)\b").expect("range end regex is valid")
});
static BETWEEN_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:between|giữa|trong khoảng)\b").expect("between regex is valid")
});
static UNDER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:dưới|under|less|below|ít hơn|không quá|tối đa|max|cheaper|rẻ hơn)\b")
        .expect("under regex is valid")
});
static OVER_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:trên|over|more|above|hơn|tối thiểu|ít nhất|min|từ|from)\b")
        .expect("over regex is valid")
});
static EXPERIENCE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(\d+)\s*(?:năm|nam|years?|yrs?)\b").expect("experience regex is valid")
});
static RATING_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?:^|[^\d.,])(\d(?:[.,]\d+)?)\s*(?:sao|stars?|★)")
        .expect("rating regex is valid")
});
static FEMALE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:nữ|female|cô giáo|woman)\b").expect("female regex is valid")
});
static MALE_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"\b(?:gia sư nam|giáo viên nam|thầy giáo|thầy|male|man)\b")
        .expect("male regex is valid")
});

/// Canonical subject name → normalized synonyms.
pub const SUBJECTS: &[(&str, &[&str])] = &[
    ("Toán", &["toán", "math"]),
    ("Tiếng Anh", &["tiếng anh", "english", "ielts", "toeic"]),
    ("Vật lý", &["vật lý", "physics"]),
    ("Hóa học", &["hóa học", "môn hóa", "chemistry"]),
    ("Ngữ văn", &["ngữ văn", "môn văn", "literature"]),
    ("Sinh học", &["sinh học", "biology"]),
    ("Lập trình", &["lập trình", "programming", "coding"]),
    ("Tiếng Nhật", &["tiếng nhật", "japanese"]),
    ("Tiếng Hàn", &["tiếng hàn", "korean"]),
    ("Tiếng Trung", &["tiếng trung", "chinese"]),
    ("Piano", &["piano"]),
];

/// Phrases that contain a subject synonym without meaning the subject.
const SUBJECT_MASKS: &[&str] = &["thanh toán"];

/// Canonical city name → normalized synonyms.
pub const CITIES: &[(&str, &[&str])] = &[
    ("Hà Nội", &["hà nội"]),
    ("Hồ Chí Minh", &["hồ chí minh"]),
    ("Đà Nẵng", &["đà nẵng"]),
    ("Hải Phòng", &["hải phòng"]),
    ("Cần Thơ", &["cần thơ"]),
];

const EDUCATION_LEVELS: &[(EducationLevel, &[&str])] = &[
    (EducationLevel::Student, &["sinh viên", "student"]),
    (EducationLevel::Bachelor, &["cử nhân", "tốt nghiệp", "bachelor", "graduate"]),
    (EducationLevel::Teacher, &["giáo viên", "teacher"]),
    (EducationLevel::Master, &["thạc sĩ", "master"]),
    (EducationLevel::Doctorate, &["tiến sĩ", "phd", "doctor"]),
];

const COURSE_LEVELS: &[(CourseLevel, &[&str])] = &[
    (CourseLevel::Beginner, &["cơ bản", "mới bắt đầu", "beginner", "basic"]),
    (CourseLevel::Intermediate, &["trung cấp", "intermediate"]),
    (CourseLevel::Advanced, &["nâng cao", "advanced"]),
];

pub const BLOG_CATEGORIES: &[(&str, &[&str])] = &[
    ("Kinh nghiệm học tập", &["kinh nghiệm học", "phương pháp học", "study tips", "mẹo học"]),
    ("Tuyển sinh", &["tuyển sinh", "thi đại học", "admission"]),
    ("Hướng nghiệp", &["hướng nghiệp", "nghề nghiệp", "career"]),
    ("Tin tức", &["tin tức", "news"]),
];

/// Words stripped from a blog query before it is used as a keyword.
/// Phrases come before the single words they contain.
const BLOG_STOPWORDS: &[&str] = &[
    "bài viết", "mới nhất", "hay nhất", "gần đây", "liên quan", "tìm", "cho", "tôi", "mình",
    "bài", "blog", "về", "có", "nào", "những", "các", "đọc", "mới", "hay", "gì", "với", "nhé",
    "find", "me", "articles", "article", "posts", "post", "about", "on", "latest", "recent",
    "new", "the",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Male => "nam",
            Self::Female => "nữ",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match normalize(raw).as_str() {
            "male" | "nam" | "thầy" => Some(Self::Male),
            "female" | "nữ" | "cô" => Some(Self::Female),
            _ => None,
        }
    }
}

/// Highest qualification of a tutor, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EducationLevel {
    Student,
    Bachelor,
    Teacher,
    Master,
    Doctorate,
}

impl EducationLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Student => "sinh viên",
            Self::Bachelor => "cử nhân",
            Self::Teacher => "giáo viên",
            Self::Master => "thạc sĩ",
            Self::Doctorate => "tiến sĩ",
        }
    }

    /// Value stored in the profile collection.
    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Bachelor => "bachelor",
            Self::Teacher => "teacher",
            Self::Master => "master",
            Self::Doctorate => "doctorate",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        let key = normalized.replace(' ', "_");
        [
            Self::Student,
            Self::Bachelor,
            Self::Teacher,
            Self::Master,
            Self::Doctorate,
        ]
        .into_iter()
        .find(|level| level.as_key() == key)
        .or_else(|| highest_education(&normalized))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CourseLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl CourseLevel {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Beginner => "cơ bản",
            Self::Intermediate => "trung cấp",
            Self::Advanced => "nâng cao",
        }
    }

    pub fn as_key(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        COURSE_LEVELS
            .iter()
            .find(|(level, synonyms)| {
                level.as_key() == normalized || synonyms.iter().any(|s| contains_phrase(&normalized, s))
            })
            .map(|(level, _)| *level)
    }
}

/// Tutor search parameters. Every field is optional; absence means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedCriteria {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub subjects: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_experience: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rating: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education_level: Option<EducationLevel>,
}

impl ExtractedCriteria {
    pub fn is_empty(&self) -> bool {
        self.subjects.is_empty()
            && self.city.is_none()
            && self.min_price.is_none()
            && self.max_price.is_none()
            && self.gender.is_none()
            && self.min_experience.is_none()
            && self.min_rating.is_none()
            && self.education_level.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<CourseLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCriteria {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// Extract tutor search criteria from already-normalized text.
pub fn extract(normalized: &str) -> ExtractedCriteria {
    let (min_price, max_price) = extract_price_bounds(normalized);
    ExtractedCriteria {
        subjects: extract_subjects(normalized),
        city: extract_city(normalized),
        min_price,
        max_price,
        gender: extract_gender(normalized),
        min_experience: extract_experience(normalized),
        min_rating: extract_rating(normalized),
        education_level: highest_education(normalized),
    }
}

pub fn extract_course_criteria(normalized: &str) -> CourseCriteria {
    let (min_price, max_price) = extract_price_bounds(normalized);
    CourseCriteria {
        subject: extract_subjects(normalized).into_iter().next(),
        level: COURSE_LEVELS
            .iter()
            .find(|(_, synonyms)| synonyms.iter().any(|s| contains_phrase(normalized, s)))
            .map(|(level, _)| *level),
        min_price,
        max_price,
    }
}

pub fn extract_blog_criteria(normalized: &str) -> BlogCriteria {
    let category = BLOG_CATEGORIES
        .iter()
        .find(|(_, synonyms)| synonyms.iter().any(|s| contains_phrase(normalized, s)))
        .map(|(name, _)| name.to_string());

    let mut keyword = format!(" {} ", normalized);
    for stop in BLOG_STOPWORDS {
        keyword = keyword.replace(&format!(" {} ", stop), " ");
    }
    let keyword = keyword
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    BlogCriteria {
        keyword: (!keyword.is_empty()).then_some(keyword),
        category,
    }
}

/// All subjects mentioned, by canonical name.
pub fn extract_subjects(normalized: &str) -> BTreeSet<String> {
    let mut masked = normalized.to_string();
    for mask in SUBJECT_MASKS {
        masked = masked.replace(mask, " ");
    }

    SUBJECTS
        .iter()
        .filter(|(_, synonyms)| synonyms.iter().any(|s| contains_phrase(&masked, s)))
        .map(|(name, _)| name.to_string())
        .collect()
}

/// The city mentioned earliest in the text.
pub fn extract_city(normalized: &str) -> Option<String> {
    CITIES
        .iter()
        .filter_map(|(name, synonyms)| {
            synonyms
                .iter()
                .filter_map(|s| find_phrase(normalized, s))
                .min()
                .map(|pos| (pos, *name))
        })
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, name)| name.to_string())
}

/// Map free text (e.g. a function argument) onto a canonical subject name.
pub fn canonical_subject(raw: &str) -> Option<String> {
    extract_subjects(&normalize(raw)).into_iter().next()
}

/// Map free text onto a canonical city name.
pub fn canonical_city(raw: &str) -> Option<String> {
    extract_city(&normalize(raw))
}

/// Gender preference; absent when the text mentions both.
pub fn extract_gender(normalized: &str) -> Option<Gender> {
    let female = FEMALE_RE.is_match(normalized);
    let male = MALE_RE.is_match(normalized);
    match (male, female) {
        (true, false) => Some(Gender::Male),
        (false, true) => Some(Gender::Female),
        _ => None,
    }
}

/// Words before an amount that are searched for its comparison word.
const DIRECTION_WINDOW_WORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriceSide {
    AtMost,
    AtLeast,
}

#[derive(Debug, Clone, Copy)]
struct PriceMention {
    start: usize,
    end: usize,
    amount: u64,
}

/// Price amounts with their byte spans, in text order.
fn price_mentions(normalized: &str) -> Vec<PriceMention> {
    let mut mentions = Vec::new();

    for cap in PRICE_SHORTHAND_RE.captures_iter(normalized) {
        let (Some(whole), Some(amount), Some(unit)) = (cap.get(0), cap.get(1), cap.get(2)) else {
            continue;
        };
        let Ok(value) = amount.as_str().replace(',', ".").parse::<f64>() else {
            continue;
        };
        let multiplier = match unit.as_str() {
            "tr" | "triệu" => 1_000_000.0,
            _ => 1_000.0,
        };
        mentions.push(PriceMention {
            start: whole.start(),
            end: whole.end(),
            amount: (value * multiplier).round() as u64,
        });
    }

    for cap in PRICE_CURRENCY_RE.captures_iter(normalized) {
        let (Some(whole), Some(amount)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        let digits: String = amount.as_str().chars().filter(|c| c.is_ascii_digit()).collect();
        if let Ok(value) = digits.parse::<u64>() {
            mentions.push(PriceMention {
                start: whole.start(),
                end: whole.end(),
                amount: value,
            });
        }
    }

    mentions.sort_by_key(|m| m.start);
    mentions
}

/// Every price amount mentioned, in đồng.
pub fn extract_prices(normalized: &str) -> Vec<u64> {
    price_mentions(normalized).into_iter().map(|m| m.amount).collect()
}

/// The comparison word closest to the end of `before`, looking only at its
/// last few words. "rẻ hơn" beats the "hơn" inside it.
fn comparison_before(before: &str) -> Option<PriceSide> {
    let words: Vec<&str> = before.split_whitespace().collect();
    let window = words[words.len().saturating_sub(DIRECTION_WINDOW_WORDS)..].join(" ");
    let last = |re: &regex::Regex| re.find_iter(&window).map(|m| (m.end(), m.len())).max();

    match (last(&*UNDER_RE), last(&*OVER_RE)) {
        (Some(under), Some(over)) if under >= over => Some(PriceSide::AtMost),
        (_, Some(_)) => Some(PriceSide::AtLeast),
        (Some(_), None) => Some(PriceSide::AtMost),
        (None, None) => None,
    }
}

/// Price bounds using the comparison words in front of each amount.
///
/// A range ("từ 100k đến 300k", "between", "100k-300k") takes the lowest and
/// highest amounts. Otherwise each amount takes the comparison word just
/// before it, or the direction of the previous amount ("dưới 250k hoặc
/// 400k"). "Under" amounts bound the maximum and "over" amounts the minimum.
/// Without any direction, one amount is a budget and several are a range.
pub fn extract_price_bounds(normalized: &str) -> (Option<u64>, Option<u64>) {
    let mentions = price_mentions(normalized);
    let (Some(lowest), Some(highest)) = (
        mentions.iter().map(|m| m.amount).min(),
        mentions.iter().map(|m| m.amount).max(),
    ) else {
        return (None, None);
    };

    let is_range = mentions.len() >= 2
        && ((RANGE_START_RE.is_match(normalized) && RANGE_END_RE.is_match(normalized))
            || BETWEEN_RE.is_match(normalized)
            || PRICE_HYPHEN_RANGE_RE.is_match(normalized));
    if is_range {
        return (Some(lowest), Some(highest));
    }

    let mut side = None;
    let mut prev_end = 0;
    let (mut min, mut max) = (None::<u64>, None::<u64>);
    for mention in &mentions {
        let before = normalized
            .get(prev_end.min(mention.start)..mention.start)
            .unwrap_or("");
        if let Some(found) = comparison_before(before) {
            side = Some(found);
        }
        prev_end = prev_end.max(mention.end);

        match side {
            Some(PriceSide::AtMost) => max = max.max(Some(mention.amount)),
            Some(PriceSide::AtLeast) => {
                min = Some(min.map_or(mention.amount, |m| m.min(mention.amount)))
            }
            None => {}
        }
    }

    match (min, max) {
        (None, None) if mentions.len() == 1 => (None, Some(highest)),
        (None, None) => (Some(lowest), Some(highest)),
        bounds => bounds,
    }
}

/// Minimum years of experience; the largest figure mentioned wins.
pub fn extract_experience(normalized: &str) -> Option<u32> {
    EXPERIENCE_RE
        .captures_iter(normalized)
        .filter_map(|cap| cap.get(1)?.as_str().parse::<u32>().ok())
        .max()
}

/// Minimum star rating; values outside 1..=5 are ignored.
pub fn extract_rating(normalized: &str) -> Option<f32> {
    RATING_RE
        .captures_iter(normalized)
        .filter_map(|cap| cap.get(1)?.as_str().replace(',', ".").parse::<f32>().ok())
        .filter(|r| (1.0..=5.0).contains(r))
        .fold(None, |best: Option<f32>, r| Some(best.map_or(r, |b| b.max(r))))
}

fn highest_education(normalized: &str) -> Option<EducationLevel> {
    EDUCATION_LEVELS
        .iter()
        .filter(|(_, synonyms)| synonyms.iter().any(|s| contains_phrase(normalized, s)))
        .map(|(level, _)| *level)
        .max()
}
