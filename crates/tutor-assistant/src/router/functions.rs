//! The four functions the backend may call. Built once, never mutated.

use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use std::sync::LazyLock;

use crate::llm::ToolSchema;

pub const SEARCH_TUTORS: &str = "search_tutors";
pub const SEARCH_BLOG: &str = "search_blog";
pub const SEARCH_COURSES: &str = "search_courses";
pub const GET_HELP: &str = "get_help";

#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: JsonValue,
}

impl FunctionSpec {
    pub fn to_tool_schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.to_string(),
            description: self.description.to_string(),
            parameters: self.parameters.clone(),
        }
    }
}

static CATALOG: LazyLock<Vec<FunctionSpec>> = LazyLock::new(|| {
    vec![
        FunctionSpec {
            name: SEARCH_TUTORS,
            description: "Tìm gia sư theo môn học, khu vực, học phí mỗi giờ (VND), giới tính, \
                          số năm kinh nghiệm, điểm đánh giá tối thiểu và trình độ học vấn. \
                          Dùng khi người dùng muốn tìm hoặc thuê gia sư.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "subject": {"type": "string", "description": "Môn học, ví dụ: Toán, Tiếng Anh"},
                    "city": {"type": "string", "description": "Tỉnh/thành phố, ví dụ: Hà Nội"},
                    "min_price": {"type": "number", "description": "Học phí tối thiểu mỗi giờ (VND)"},
                    "max_price": {"type": "number", "description": "Học phí tối đa mỗi giờ (VND)"},
                    "gender": {"type": "string", "enum": ["male", "female"]},
                    "min_experience": {"type": "integer", "description": "Số năm kinh nghiệm tối thiểu"},
                    "min_rating": {"type": "number", "minimum": 1, "maximum": 5},
                    "education_level": {
                        "type": "string",
                        "enum": ["student", "bachelor", "teacher", "master", "doctorate"]
                    }
                }
            }),
        },
        FunctionSpec {
            name: SEARCH_BLOG,
            description: "Tìm bài viết trên blog của nền tảng theo từ khóa hoặc chuyên mục \
                          (kinh nghiệm học tập, tuyển sinh, hướng nghiệp, tin tức).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "keyword": {"type": "string", "description": "Từ khóa cần tìm"},
                    "category": {"type": "string", "description": "Chuyên mục bài viết"}
                }
            }),
        },
        FunctionSpec {
            name: SEARCH_COURSES,
            description: "Tìm khóa học do gia sư tổ chức theo môn học, trình độ và học phí trọn gói (VND).",
            parameters: json!({
                "type": "object",
                "properties": {
                    "subject": {"type": "string", "description": "Môn học"},
                    "level": {"type": "string", "enum": ["beginner", "intermediate", "advanced"]},
                    "min_price": {"type": "number"},
                    "max_price": {"type": "number"}
                }
            }),
        },
        FunctionSpec {
            name: GET_HELP,
            description: "Hướng dẫn sử dụng nền tảng: đặt lịch, thanh toán, hủy lịch, \
                          trở thành gia sư, tài khoản hoặc câu hỏi chung.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "topic": {
                        "type": "string",
                        "enum": ["booking", "payment", "cancellation", "become_tutor", "account", "general"]
                    }
                },
                "required": ["topic"]
            }),
        },
    ]
});

pub fn catalog() -> &'static [FunctionSpec] {
    &CATALOG
}

pub fn find(name: &str) -> Option<&'static FunctionSpec> {
    CATALOG.iter().find(|spec| spec.name == name)
}

/// The catalog in the backend's tool format.
pub fn tool_schemas() -> Vec<ToolSchema> {
    CATALOG.iter().map(FunctionSpec::to_tool_schema).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_four_unique_functions() {
        let names: Vec<&str> = catalog().iter().map(|f| f.name).collect();
        assert_eq!(names, vec![SEARCH_TUTORS, SEARCH_BLOG, SEARCH_COURSES, GET_HELP]);
    }

    #[test]
    fn test_schemas_are_objects() {
        for schema in tool_schemas() {
            assert_eq!(schema.parameters["type"], "object", "{}", schema.name);
            assert!(schema.parameters["properties"].is_object());
        }
        assert_eq!(find(GET_HELP).unwrap().parameters["required"][0], "topic");
        assert!(find("book_tutor").is_none());
    }
}
