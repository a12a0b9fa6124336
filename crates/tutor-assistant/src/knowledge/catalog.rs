//! Built-in platform guidance used when no catalog file is configured.

/// `(id, category, keywords, content)`. Keywords are written in normalized form.
pub(crate) const BUILTIN_ITEMS: &[(&str, &str, &[&str], &str)] = &[
    (
        "booking-howto",
        "booking",
        &["đặt lịch", "đặt gia sư", "thuê gia sư", "lịch học", "booking", "book a"],
        "Để đặt lịch học với gia sư:\n\
         1. Tìm gia sư phù hợp theo môn học, khu vực và học phí.\n\
         2. Mở hồ sơ gia sư và chọn \"Đặt lịch\".\n\
         3. Chọn ngày, khung giờ và hình thức học (online hoặc tại nhà).\n\
         4. Xác nhận và thanh toán. Gia sư sẽ phản hồi trong vòng 24 giờ.",
    ),
    (
        "booking-cancel",
        "booking",
        &["hủy", "hủy lịch", "đổi lịch", "dời lịch", "cancel", "reschedule"],
        "Cách hủy hoặc đổi lịch học:\n\
         1. Vào mục \"Lịch học của tôi\".\n\
         2. Chọn buổi học cần hủy và bấm \"Hủy lịch\" (hoặc \"Đổi lịch\").\n\
         3. Hủy trước 24 giờ được hoàn 100% học phí; hủy trong vòng 24 giờ được hoàn 50%.\n\
         4. Gia sư sẽ nhận thông báo ngay khi bạn hủy.",
    ),
    (
        "payment-methods",
        "payment",
        &["thanh toán", "chuyển khoản", "momo", "ví điện tử", "payment", "pay"],
        "Nền tảng hỗ trợ thanh toán qua chuyển khoản ngân hàng, ví MoMo, ZaloPay và thẻ \
         quốc tế. Học phí được giữ an toàn và chỉ chuyển cho gia sư sau khi buổi học \
         hoàn thành.",
    ),
    (
        "refund-policy",
        "payment",
        &["hoàn tiền", "trả lại tiền", "refund", "khiếu nại thanh toán"],
        "Chính sách hoàn tiền: buổi học bị hủy trước 24 giờ được hoàn 100%, trong vòng \
         24 giờ được hoàn 50%. Nếu gia sư vắng mặt, bạn được hoàn toàn bộ học phí. Tiền \
         hoàn về tài khoản gốc trong 3-5 ngày làm việc.",
    ),
    (
        "pricing",
        "payment",
        &["bảng giá", "giá cả", "bao nhiêu tiền", "chi phí", "phí dịch vụ", "price", "cost"],
        "Học phí do từng gia sư tự đặt, thường từ 150.000đ đến 500.000đ mỗi giờ tùy môn \
         học và kinh nghiệm. Nền tảng không thu thêm phí của học viên; gia sư trả phí \
         dịch vụ 10% trên mỗi buổi học hoàn thành.",
    ),
    (
        "become-tutor",
        "tutor",
        &["trở thành gia sư", "làm gia sư", "đăng ký gia sư", "hồ sơ gia sư", "duyệt hồ sơ", "become a tutor"],
        "Để trở thành gia sư:\n\
         1. Đăng ký tài khoản và chọn vai trò \"Gia sư\".\n\
         2. Hoàn thiện hồ sơ: môn dạy, khu vực, học phí, bằng cấp và kinh nghiệm.\n\
         3. Tải lên giấy tờ xác minh (CCCD, bằng cấp).\n\
         4. Đội ngũ kiểm duyệt sẽ duyệt hồ sơ trong 1-3 ngày làm việc.",
    ),
    (
        "account-help",
        "account",
        &["tài khoản", "mật khẩu", "đăng nhập", "đăng ký tài khoản", "password", "login"],
        "Quản lý tài khoản: bạn có thể đổi mật khẩu trong \"Cài đặt > Bảo mật\". Nếu quên \
         mật khẩu, chọn \"Quên mật khẩu\" ở trang đăng nhập để nhận email đặt lại.",
    ),
    (
        "reviews",
        "quality",
        &["đánh giá", "nhận xét", "review", "rating"],
        "Sau mỗi buổi học hoàn thành, học viên có thể đánh giá gia sư từ 1 đến 5 sao kèm \
         nhận xét. Điểm đánh giá trung bình được hiển thị trên hồ sơ và dùng để sắp xếp \
         kết quả tìm kiếm.",
    ),
    (
        "tutor-quality",
        "quality",
        &["uy tín", "chất lượng", "xác minh", "kiểm duyệt", "an toàn", "safety"],
        "Mọi gia sư đều được xác minh danh tính và bằng cấp trước khi hiển thị. Tài khoản \
         vi phạm sẽ bị tạm khóa. Nếu gặp vấn đề, hãy báo cáo ngay từ trang hồ sơ gia sư.",
    ),
    (
        "courses-info",
        "course",
        &["khóa học", "lớp học", "học online", "course"],
        "Ngoài học 1-1, nền tảng có các khóa học do gia sư tổ chức, học online hoặc theo \
         nhóm nhỏ. Mỗi khóa học ghi rõ trình độ, số buổi và học phí trọn gói.",
    ),
    (
        "contact-support",
        "support",
        &["liên hệ", "hỗ trợ", "hotline", "khiếu nại", "support", "contact"],
        "Liên hệ đội ngũ hỗ trợ qua hotline 1900 6868 (8:00-22:00 hằng ngày), email \
         hotro@giasu.vn hoặc mục \"Trợ giúp\" trong ứng dụng.",
    ),
];
