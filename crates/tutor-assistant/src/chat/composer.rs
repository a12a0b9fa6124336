//! Response Composer - turns search rows, help topics and knowledge items into
//! reply text. Every function here is total: any input renders to something.

use serde_json::Value;

use super::{CAPABILITY_SUMMARY, RAG_SYSTEM_PROMPT};
use crate::context::SystemContext;
use crate::knowledge::ScoredItem;
use crate::llm::ChatMessage;
use crate::router::HelpTopic;
use crate::search::{BlogCriteria, CourseCriteria, ExtractedCriteria};
use crate::storage::JoinedRow;

/// "300.000đ"
pub fn format_price(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 2);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    out.push('đ');
    out
}

fn format_rating(rating: f64) -> String {
    format!("{:.1}", rating)
}

fn text_list(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        _ => None,
    }
}

fn record_id(row: &JoinedRow) -> String {
    match row.primary.get("id") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => "?".to_string(),
    }
}

fn price_bounds(min: Option<u64>, max: Option<u64>) -> Option<String> {
    match (min, max) {
        (Some(lo), Some(hi)) => Some(format!("học phí từ {} đến {}", format_price(lo), format_price(hi))),
        (None, Some(hi)) => Some(format!("học phí tối đa {}", format_price(hi))),
        (Some(lo), None) => Some(format!("học phí từ {}", format_price(lo))),
        (None, None) => None,
    }
}

/// Human-readable criteria, in a fixed order, for headers and "no matches" texts.
pub fn describe_criteria(criteria: &ExtractedCriteria) -> Vec<String> {
    let mut parts = Vec::new();
    if !criteria.subjects.is_empty() {
        parts.push(format!(
            "môn {}",
            criteria.subjects.iter().cloned().collect::<Vec<_>>().join(" hoặc ")
        ));
    }
    if let Some(ref city) = criteria.city {
        parts.push(format!("khu vực {}", city));
    }
    if let Some(price) = price_bounds(criteria.min_price, criteria.max_price) {
        parts.push(price);
    }
    if let Some(gender) = criteria.gender {
        parts.push(format!("gia sư {}", gender.label()));
    }
    if let Some(years) = criteria.min_experience {
        parts.push(format!("từ {} năm kinh nghiệm", years));
    }
    if let Some(rating) = criteria.min_rating {
        parts.push(format!("đánh giá từ {} sao", format_rating(f64::from(rating))));
    }
    if let Some(level) = criteria.education_level {
        parts.push(format!("trình độ {} trở lên", level.label()));
    }
    parts
}

fn describe_course_criteria(criteria: &CourseCriteria) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(ref subject) = criteria.subject {
        parts.push(format!("môn {}", subject));
    }
    if let Some(level) = criteria.level {
        parts.push(format!("trình độ {}", level.label()));
    }
    if let Some(price) = price_bounds(criteria.min_price, criteria.max_price) {
        parts.push(price);
    }
    parts
}

fn describe_blog_criteria(criteria: &BlogCriteria) -> Vec<String> {
    let mut parts = Vec::new();
    if let Some(ref keyword) = criteria.keyword {
        parts.push(format!("từ khóa \"{}\"", keyword));
    }
    if let Some(ref category) = criteria.category {
        parts.push(format!("chuyên mục {}", category));
    }
    parts
}

fn criteria_suffix(parts: &[String]) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

// ----------------------------------------------------------------------------
// Structured search
// ----------------------------------------------------------------------------

pub fn render_tutor_results(
    rows: &[JoinedRow],
    criteria: &ExtractedCriteria,
    platform_total: Option<u64>,
) -> String {
    let described = describe_criteria(criteria);
    if rows.is_empty() {
        return render_no_tutors(&described);
    }

    let mut out = format!(
        "Mình tìm thấy {} gia sư phù hợp{}:\n",
        rows.len(),
        criteria_suffix(&described)
    );

    for (i, row) in rows.iter().enumerate() {
        let id = record_id(row);
        let name = row
            .str_field("name")
            .map(str::to_string)
            .unwrap_or_else(|| format!("Gia sư #{}", id));

        out.push_str(&format!("\n{}. **{}**", i + 1, name));
        if let Some(subjects) = text_list(row.primary.get("subjects")) {
            out.push_str(&format!(" - {}", subjects));
        }
        out.push('\n');

        let mut attrs = Vec::new();
        if let Some(city) = row.str_field("city") {
            attrs.push(city.to_string());
        }
        if let Some(rate) = row.f64_field("hourly_rate") {
            attrs.push(format!("{}/giờ", format_price(rate.max(0.0) as u64)));
        }
        if let Some(rating) = row.f64_field("rating") {
            match row.f64_field("review_count") {
                Some(reviews) => attrs.push(format!("{} sao ({} đánh giá)", format_rating(rating), reviews as u64)),
                None => attrs.push(format!("{} sao", format_rating(rating))),
            }
        }
        if let Some(years) = row.f64_field("experience_years") {
            attrs.push(format!("{} năm kinh nghiệm", years as u64));
        }
        if !attrs.is_empty() {
            out.push_str(&format!("   {}\n", attrs.join(" | ")));
        }
        out.push_str(&format!("   [Xem hồ sơ](/tutors/{})\n", id));
    }

    out.push('\n');
    match platform_total {
        Some(total) => out.push_str(&format!(
            "Hiện nền tảng có {} gia sư đã được xác minh. Bạn có thể hỏi thêm để lọc kết quả.",
            total
        )),
        None => out.push_str("Bạn có thể hỏi thêm để lọc kết quả."),
    }
    out
}

fn render_no_tutors(described: &[String]) -> String {
    if described.is_empty() {
        return "Hiện chưa có gia sư nào phù hợp. Bạn thử cho mình biết môn học \
                hoặc khu vực bạn cần nhé."
            .to_string();
    }
    format!(
        "Mình chưa tìm thấy gia sư nào phù hợp với: {}.\n\
         Bạn có thể thử nới rộng khoảng học phí, bỏ bớt điều kiện hoặc chọn khu vực khác.",
        described.join(", ")
    )
}

pub fn render_course_results(
    rows: &[JoinedRow],
    criteria: &CourseCriteria,
    platform_total: Option<u64>,
) -> String {
    let described = describe_course_criteria(criteria);
    if rows.is_empty() {
        return if described.is_empty() {
            "Hiện chưa có khóa học nào đang mở.".to_string()
        } else {
            format!(
                "Mình chưa tìm thấy khóa học nào phù hợp với: {}. Bạn thử bỏ bớt điều kiện nhé.",
                described.join(", ")
            )
        };
    }

    let mut out = format!(
        "Có {} khóa học phù hợp{}:\n",
        rows.len(),
        criteria_suffix(&described)
    );
    for (i, row) in rows.iter().enumerate() {
        let id = record_id(row);
        let title = row
            .primary
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Khóa học");
        out.push_str(&format!("\n{}. **{}**\n", i + 1, title));

        let mut attrs = Vec::new();
        if let Some(subject) = row.primary.get("subject").and_then(Value::as_str) {
            attrs.push(subject.to_string());
        }
        if let Some(level) = row
            .primary
            .get("level")
            .and_then(Value::as_str)
            .and_then(crate::search::CourseLevel::parse)
        {
            attrs.push(format!("trình độ {}", level.label()));
        }
        if let Some(price) = row.f64_field("price") {
            attrs.push(format_price(price.max(0.0) as u64));
        }
        if let Some(tutor) = row.joined.as_ref().and_then(|j| j.get("name")).and_then(Value::as_str) {
            attrs.push(format!("giảng viên {}", tutor));
        }
        if !attrs.is_empty() {
            out.push_str(&format!("   {}\n", attrs.join(" | ")));
        }
        out.push_str(&format!("   [Xem khóa học](/courses/{})\n", id));
    }
    if let Some(total) = platform_total {
        out.push_str(&format!("\nNền tảng hiện có {} khóa học đang mở.", total));
    }
    out
}

pub fn render_blog_results(
    rows: &[JoinedRow],
    criteria: &BlogCriteria,
    platform_total: Option<u64>,
) -> String {
    let described = describe_blog_criteria(criteria);
    if rows.is_empty() {
        return if described.is_empty() {
            "Hiện chưa có bài viết nào.".to_string()
        } else {
            format!(
                "Mình chưa tìm thấy bài viết nào với {}. Bạn thử từ khóa khác nhé.",
                described.join(", ")
            )
        };
    }

    let mut out = format!(
        "Một số bài viết bạn có thể quan tâm{}:\n",
        criteria_suffix(&described)
    );
    for (i, row) in rows.iter().enumerate() {
        let title = row
            .primary
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or("Bài viết");
        let link = row
            .primary
            .get("slug")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| record_id(row));
        out.push_str(&format!("\n{}. **{}**", i + 1, title));
        if let Some(category) = row.primary.get("category").and_then(Value::as_str) {
            out.push_str(&format!(" ({})", category));
        }
        out.push('\n');
        if let Some(excerpt) = row.primary.get("excerpt").and_then(Value::as_str) {
            out.push_str(&format!("   {}\n", excerpt));
        }
        out.push_str(&format!("   [Đọc bài viết](/blog/{})\n", link));
    }
    if let Some(total) = platform_total {
        out.push_str(&format!("\nBlog hiện có {} bài viết.", total));
    }
    out
}

// ----------------------------------------------------------------------------
// Help
// ----------------------------------------------------------------------------

pub fn help_template(topic: HelpTopic) -> &'static str {
    match topic {
        HelpTopic::Booking => "Cách đặt lịch học:\n\
            1. Tìm gia sư phù hợp và mở hồ sơ của gia sư.\n\
            2. Bấm \"Đặt lịch\", chọn ngày, khung giờ và hình thức học.\n\
            3. Xác nhận và thanh toán. Gia sư sẽ phản hồi trong vòng 24 giờ.",
        HelpTopic::Payment => "Về thanh toán:\n\
            - Hỗ trợ chuyển khoản ngân hàng, ví MoMo, ZaloPay và thẻ quốc tế.\n\
            - Học phí được giữ an toàn và chỉ chuyển cho gia sư sau khi buổi học hoàn thành.\n\
            - Tiền hoàn về tài khoản gốc trong 3-5 ngày làm việc.",
        HelpTopic::Cancellation => "Cách hủy hoặc đổi lịch học:\n\
            1. Vào mục \"Lịch học của tôi\".\n\
            2. Chọn buổi học và bấm \"Hủy lịch\" hoặc \"Đổi lịch\".\n\
            3. Hủy trước 24 giờ được hoàn 100% học phí; trong vòng 24 giờ được hoàn 50%.",
        HelpTopic::BecomeTutor => "Để trở thành gia sư:\n\
            1. Đăng ký tài khoản và chọn vai trò \"Gia sư\".\n\
            2. Hoàn thiện hồ sơ: môn dạy, khu vực, học phí, bằng cấp, kinh nghiệm.\n\
            3. Tải lên giấy tờ xác minh. Hồ sơ được duyệt trong 1-3 ngày làm việc.",
        HelpTopic::Account => "Quản lý tài khoản:\n\
            - Đổi mật khẩu trong \"Cài đặt > Bảo mật\".\n\
            - Quên mật khẩu: chọn \"Quên mật khẩu\" ở trang đăng nhập để nhận email đặt lại.\n\
            - Cập nhật thông tin cá nhân trong \"Hồ sơ của tôi\".",
        HelpTopic::General => CAPABILITY_SUMMARY,
    }
}

// ----------------------------------------------------------------------------
// Knowledge answers
// ----------------------------------------------------------------------------

/// Prompt for a grounded answer: counters and retrieved items as context, then
/// the user's question.
pub fn build_rag_messages(
    utterance: &str,
    items: &[ScoredItem<'_>],
    system: &SystemContext,
) -> Vec<ChatMessage> {
    let mut context = String::new();
    let counters = system.counters_line();
    if !counters.is_empty() {
        context.push_str(&format!("Số liệu nền tảng: {}.\n\n", counters));
    }
    for (i, scored) in items.iter().enumerate() {
        context.push_str(&format!(
            "[Mục {}] ({})\n{}\n\n",
            i + 1,
            scored.item.category,
            scored.item.content
        ));
    }

    vec![
        ChatMessage::system(RAG_SYSTEM_PROMPT),
        ChatMessage::user(format!(
            "=== HƯỚNG DẪN ===\n{}=== HẾT ===\n\nCâu hỏi: {}",
            context, utterance
        )),
    ]
}

/// Offline answer: the best item's content, unchanged.
pub fn render_knowledge_verbatim(top: &ScoredItem<'_>) -> String {
    top.item.content.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::KnowledgeBase;
    use crate::search::{extract, normalize};
    use crate::search::QueryBuilder;
    use crate::storage::memory_store::fixtures::sample_store;
    use crate::storage::MarketplaceStore;
    use crate::types::{EntityKind, UserRole};

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(0), "0đ");
        assert_eq!(format_price(999), "999đ");
        assert_eq!(format_price(300_000), "300.000đ");
        assert_eq!(format_price(1_500_000), "1.500.000đ");
    }

    #[tokio::test]
    async fn test_tutor_results_block() {
        let criteria = extract(&normalize("tìm gia sư toán ở Hà Nội dưới 300k"));
        let rows = sample_store()
            .find_many(&QueryBuilder::default().build(&criteria))
            .await
            .unwrap();
        let text = render_tutor_results(&rows, &criteria, Some(3));

        assert!(text.starts_with("Mình tìm thấy 2 gia sư phù hợp"));
        assert!(text.contains("môn Toán"));
        assert!(text.contains("**Nguyễn Minh Anh**"));
        assert!(text.contains("250.000đ/giờ"));
        assert!(text.contains("4.8 sao (42 đánh giá)"));
        assert!(text.contains("[Xem hồ sơ](/tutors/101)"));
        assert!(text.contains("Hiện nền tảng có 3 gia sư"));
    }

    #[test]
    fn test_no_matches_echoes_criteria() {
        let criteria = extract(&normalize("gia sư piano nữ ở Cần Thơ dưới 100k"));
        let text = render_tutor_results(&[], &criteria, Some(3));
        assert!(text.starts_with("Mình chưa tìm thấy gia sư nào phù hợp với"));
        assert!(text.contains("môn Piano"));
        assert!(text.contains("khu vực Cần Thơ"));
        assert!(text.contains("học phí tối đa 100.000đ"));
        assert!(text.contains("gia sư nữ"));
    }

    #[test]
    fn test_help_templates_are_fixed() {
        assert!(help_template(HelpTopic::Cancellation).contains("Hủy lịch"));
        assert_eq!(help_template(HelpTopic::General), CAPABILITY_SUMMARY);
    }

    #[test]
    fn test_rag_prompt_carries_items_and_counters() {
        let kb = KnowledgeBase::builtin();
        let items = kb.retrieve(&normalize("làm sao hủy lịch"));
        let system = SystemContext::new(UserRole::Student).with_count(EntityKind::Tutor, 7);
        let messages = build_rag_messages("làm sao hủy lịch", &items, &system);

        assert_eq!(messages.len(), 2);
        let prompt = messages[1].text();
        assert!(prompt.contains("7 gia sư"));
        assert!(prompt.contains(&items[0].item.content));
        assert!(prompt.ends_with("Câu hỏi: làm sao hủy lịch"));
        assert_eq!(render_knowledge_verbatim(&items[0]), items[0].item.content);
    }
}
