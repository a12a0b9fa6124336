//! In-memory marketplace store, seeded from JSON.
//!
//! Interprets query plans with the plan's own `matches_row` / `compare_rows`,
//! so results agree with any other store that honours the same plan.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use super::{JoinedRow, MarketplaceStore};
use crate::error::StorageError;
use crate::search::{Collection, JoinSpec, QueryPlan, Record};
use crate::types::EntityKind;

/// Seed file layout: one array of records per collection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SeedData {
    pub accounts: Vec<Record>,
    pub profiles: Vec<Record>,
    pub courses: Vec<Record>,
    pub blog_posts: Vec<Record>,
    pub bookings: Vec<Record>,
    pub reviews: Vec<Record>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: SeedData,
}

impl InMemoryStore {
    pub fn new(data: SeedData) -> Self {
        Self { data }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read seed data {}", path.display()))?;
        let data: SeedData = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse seed data {}", path.display()))?;

        tracing::info!(
            path = %path.display(),
            accounts = data.accounts.len(),
            profiles = data.profiles.len(),
            courses = data.courses.len(),
            blog_posts = data.blog_posts.len(),
            "Loaded seed data"
        );

        Ok(Self::new(data))
    }

    fn records(&self, collection: Collection) -> &[Record] {
        match collection {
            Collection::Profile => &self.data.profiles,
            Collection::Account => &self.data.accounts,
            Collection::Course => &self.data.courses,
            Collection::BlogPost => &self.data.blog_posts,
        }
    }

    fn lookup(&self, join: &JoinSpec, primary: &Record) -> Option<&Record> {
        let key = primary.get(&join.local_key).filter(|v| !v.is_null())?;
        self.records(join.collection)
            .iter()
            .find(|r| r.get(&join.foreign_key) == Some(key))
    }
}

fn flag(record: &Record, field: &str) -> bool {
    record.get(field).and_then(Value::as_bool).unwrap_or(false)
}

fn has_role(record: &Record, role: &str) -> bool {
    record.get("role").and_then(Value::as_str) == Some(role)
}

#[async_trait]
impl MarketplaceStore for InMemoryStore {
    async fn count_by_kind(&self, kind: EntityKind) -> Result<u64, StorageError> {
        let d = &self.data;
        let count = match kind {
            EntityKind::Tutor => d
                .accounts
                .iter()
                .filter(|a| has_role(a, "tutor") && flag(a, "is_approved") && flag(a, "is_active"))
                .count(),
            EntityKind::Student => d
                .accounts
                .iter()
                .filter(|a| has_role(a, "student") && flag(a, "is_active"))
                .count(),
            EntityKind::Course => d.courses.iter().filter(|c| flag(c, "is_published")).count(),
            EntityKind::BlogPost => d.blog_posts.iter().filter(|p| flag(p, "is_published")).count(),
            EntityKind::Booking => d.bookings.len(),
            EntityKind::Review => d.reviews.len(),
        };
        Ok(count as u64)
    }

    async fn find_many(&self, plan: &QueryPlan) -> Result<Vec<JoinedRow>, StorageError> {
        if plan.is_unsatisfiable() {
            tracing::debug!(collection = ?plan.collection(), "Plan is unsatisfiable, skipping scan");
            return Ok(Vec::new());
        }

        let mut rows: Vec<(&Record, Option<&Record>)> = self
            .records(plan.collection())
            .iter()
            .map(|primary| {
                let joined = plan.join().and_then(|j| self.lookup(j, primary));
                (primary, joined)
            })
            .filter(|(primary, joined)| plan.matches_row(primary, *joined))
            .collect();

        rows.sort_by(|a, b| plan.compare_rows(*a, *b));
        rows.truncate(plan.limit());

        Ok(rows
            .into_iter()
            .map(|(primary, joined)| JoinedRow {
                primary: primary.clone(),
                joined: joined.cloned(),
            })
            .collect())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    /// A small marketplace: four tutors (one unapproved), two courses, two posts.
    pub(crate) fn sample_seed() -> SeedData {
        SeedData {
            accounts: vec![
                record(json!({"id": 1, "name": "Nguyễn Minh Anh", "role": "tutor", "is_approved": true, "is_active": true})),
                record(json!({"id": 2, "name": "Trần Văn Bình", "role": "tutor", "is_approved": true, "is_active": true})),
                record(json!({"id": 3, "name": "Lê Thu Hà", "role": "tutor", "is_approved": false, "is_active": true})),
                record(json!({"id": 4, "name": "Phạm Quốc Dũng", "role": "tutor", "is_approved": true, "is_active": true})),
                record(json!({"id": 10, "name": "Học viên A", "role": "student", "is_active": true})),
            ],
            profiles: vec![
                record(json!({
                    "id": 101, "user_id": 1, "subjects": ["Toán", "Vật lý"], "city": "Hà Nội",
                    "hourly_rate": 250000, "gender": "female", "experience_years": 5,
                    "rating": 4.8, "review_count": 42, "education_level": "master"
                })),
                record(json!({
                    "id": 102, "user_id": 2, "subjects": ["Toán"], "city": "Hà Nội",
                    "hourly_rate": 200000, "gender": "male", "experience_years": 3,
                    "rating": 4.8, "review_count": 12, "education_level": "bachelor"
                })),
                record(json!({
                    "id": 103, "user_id": 3, "subjects": ["Toán"], "city": "Hà Nội",
                    "hourly_rate": 150000, "gender": "female", "experience_years": 1,
                    "rating": 5.0, "review_count": 3, "education_level": "student"
                })),
                record(json!({
                    "id": 104, "user_id": 4, "subjects": ["Tiếng Anh"], "city": "Hồ Chí Minh",
                    "hourly_rate": 400000, "gender": "male", "experience_years": 8,
                    "rating": 4.5, "review_count": 80, "education_level": "teacher"
                })),
            ],
            courses: vec![
                record(json!({
                    "id": 201, "tutor_id": 1, "title": "Luyện thi Toán THPT", "subject": "Toán",
                    "level": "advanced", "price": 1500000, "rating": 4.7, "enrollment_count": 120,
                    "is_published": true
                })),
                record(json!({
                    "id": 202, "tutor_id": 4, "title": "IELTS cơ bản", "subject": "Tiếng Anh",
                    "level": "beginner", "price": 2000000, "rating": 4.6, "enrollment_count": 64,
                    "is_published": true
                })),
            ],
            blog_posts: vec![
                record(json!({
                    "id": 301, "title": "Bí quyết học Toán hiệu quả", "excerpt": "Phương pháp ôn tập",
                    "category": "Kinh nghiệm học tập", "tags": ["toán"], "slug": "bi-quyet-hoc-toan",
                    "published_at": "2024-05-01T08:00:00Z", "is_published": true
                })),
                record(json!({
                    "id": 302, "title": "Chọn gia sư tiếng Anh", "excerpt": "Những điều cần biết",
                    "category": "Hướng dẫn", "tags": ["tiếng anh"], "slug": "chon-gia-su-tieng-anh",
                    "published_at": "2024-06-01T08:00:00Z", "is_published": true
                })),
            ],
            bookings: vec![record(json!({"id": 401})), record(json!({"id": 402}))],
            reviews: vec![record(json!({"id": 501}))],
        }
    }

    pub(crate) fn sample_store() -> InMemoryStore {
        InMemoryStore::new(sample_seed())
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::search::criteria::{extract, BlogCriteria, CourseCriteria, ExtractedCriteria};
    use crate::search::{normalize, QueryBuilder};

    fn ids(rows: &[JoinedRow]) -> Vec<i64> {
        rows.iter()
            .filter_map(|r| r.primary.get("id").and_then(Value::as_i64))
            .collect()
    }

    #[tokio::test]
    async fn test_counts_by_kind() {
        let store = sample_store();
        assert_eq!(store.count_by_kind(EntityKind::Tutor).await.unwrap(), 3);
        assert_eq!(store.count_by_kind(EntityKind::Student).await.unwrap(), 1);
        assert_eq!(store.count_by_kind(EntityKind::Course).await.unwrap(), 2);
        assert_eq!(store.count_by_kind(EntityKind::Booking).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_math_tutors_in_hanoi_under_300k() {
        let store = sample_store();
        let criteria = extract(&normalize("tìm gia sư toán ở Hà Nội dưới 300k"));
        let rows = store.find_many(&QueryBuilder::default().build(&criteria)).await.unwrap();
        // 103 is unapproved; equal ratings fall back to review count
        assert_eq!(ids(&rows), vec![101, 102]);
        assert_eq!(rows[0].str_field("name"), Some("Nguyễn Minh Anh"));
    }

    #[tokio::test]
    async fn test_empty_criteria_returns_gated_tutors_sorted() {
        let store = sample_store();
        let rows = store
            .find_many(&QueryBuilder::default().build(&ExtractedCriteria::default()))
            .await
            .unwrap();
        assert_eq!(ids(&rows), vec![101, 102, 104]);
    }

    #[tokio::test]
    async fn test_limit_and_unsatisfiable_plans() {
        let store = sample_store();
        let rows = store
            .find_many(&QueryBuilder::new(1).build(&ExtractedCriteria::default()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);

        let inverted = ExtractedCriteria {
            min_price: Some(500_000),
            max_price: Some(100_000),
            ..Default::default()
        };
        let rows = store.find_many(&QueryBuilder::default().build(&inverted)).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_course_and_blog_plans() {
        let store = sample_store();
        let builder = QueryBuilder::default();

        let courses = store
            .find_many(&builder.build_course_plan(&CourseCriteria {
                subject: Some("Tiếng Anh".into()),
                ..Default::default()
            }))
            .await
            .unwrap();
        assert_eq!(ids(&courses), vec![202]);
        assert_eq!(courses[0].str_field("name"), Some("Phạm Quốc Dũng"));

        let posts = store
            .find_many(&builder.build_blog_plan(&BlogCriteria::default()))
            .await
            .unwrap();
        assert_eq!(ids(&posts), vec![302, 301]);
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join(format!("seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, r#"{"accounts":[{"id":1,"role":"tutor"}]}"#).unwrap();
        let store = InMemoryStore::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(store.data.accounts.len(), 1);
        assert!(store.data.profiles.is_empty());
    }
}
