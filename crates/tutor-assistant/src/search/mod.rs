pub mod criteria;
pub mod normalizer;
pub mod query_plan;

pub use criteria::{
    extract, extract_blog_criteria, extract_course_criteria, BlogCriteria, CourseCriteria,
    CourseLevel, EducationLevel, ExtractedCriteria, Gender,
};
pub use normalizer::normalize;
pub use query_plan::{
    Collection, Condition, JoinSpec, Predicate, QueryBuilder, QueryPlan, Record, SortDirection,
    SortKey, DEFAULT_LIMIT,
};
