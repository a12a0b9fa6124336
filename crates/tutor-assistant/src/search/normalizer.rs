//! Text normalization shared by the criteria extractor and the knowledge retriever.
//!
//! Lower-cases, collapses whitespace and rewrites common typos, unaccented
//! spellings and abbreviations into one canonical form. The substitution table
//! is applied in declaration order; entries match whole words or phrases only.

use std::sync::LazyLock;

/// Ordered `(variant, canonical)` pairs. Longer phrases come before the shorter
/// variants they contain. No canonical form may contain a variant, otherwise a
/// second pass would rewrite it again.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    // people
    ("gia su", "gia sư"),
    ("giasu", "gia sư"),
    ("gs", "gia sư"),
    ("giao vien", "giáo viên"),
    ("sinh vien", "sinh viên"),
    ("thac si", "thạc sĩ"),
    ("tien si", "tiến sĩ"),
    ("cu nhan", "cử nhân"),
    // cities
    ("ha noi", "hà nội"),
    ("hanoi", "hà nội"),
    ("hn", "hà nội"),
    ("tp hcm", "hồ chí minh"),
    ("tp.hcm", "hồ chí minh"),
    ("tphcm", "hồ chí minh"),
    ("hcm", "hồ chí minh"),
    ("sài gòn", "hồ chí minh"),
    ("sai gon", "hồ chí minh"),
    ("saigon", "hồ chí minh"),
    ("da nang", "đà nẵng"),
    ("danang", "đà nẵng"),
    ("hai phong", "hải phòng"),
    ("can tho", "cần thơ"),
    // subjects
    ("thanh toan", "thanh toán"),
    ("toan", "toán"),
    ("tieng anh", "tiếng anh"),
    ("anh van", "tiếng anh"),
    ("vat ly", "vật lý"),
    ("vật lí", "vật lý"),
    ("hoa hoc", "hóa học"),
    ("hoá học", "hóa học"),
    ("hoá", "hóa"),
    ("ngu van", "ngữ văn"),
    ("sinh hoc", "sinh học"),
    ("lap trinh", "lập trình"),
    ("tieng nhat", "tiếng nhật"),
    ("tieng han", "tiếng hàn"),
    ("tieng trung", "tiếng trung"),
    // prices and comparisons
    ("duoi", "dưới"),
    ("tren", "trên"),
    ("tu", "từ"),
    ("den", "đến"),
    ("khoang", "khoảng"),
    ("nghin", "nghìn"),
    ("ngan", "ngàn"),
    ("trieu", "triệu"),
    ("hoc phi", "học phí"),
    ("kinh nghiem", "kinh nghiệm"),
    ("nu", "nữ"),
    // platform actions
    ("huỷ", "hủy"),
    ("huy lich", "hủy lịch"),
    ("dat lich", "đặt lịch"),
    ("tai khoan", "tài khoản"),
    ("hoan tien", "hoàn tiền"),
    ("danh gia", "đánh giá"),
    ("tim", "tìm"),
    ("lam sao", "làm sao"),
    ("the nao", "thế nào"),
];

static COMPILED: LazyLock<Vec<(regex::Regex, &'static str)>> = LazyLock::new(|| {
    SUBSTITUTIONS
        .iter()
        .map(|(variant, canonical)| {
            let pattern = format!(r"\b{}\b", regex::escape(variant));
            let re = regex::Regex::new(&pattern).expect("substitution regex is valid");
            (re, *canonical)
        })
        .collect()
});

/// Canonicalize free text. Total, deterministic and idempotent.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = collapse_whitespace(&lowered);

    for (re, canonical) in COMPILED.iter() {
        if re.is_match(&out) {
            out = re.replace_all(&out, *canonical).into_owned();
        }
    }

    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte offset of the first occurrence of `phrase` that is not glued to a
/// neighbouring letter or digit ("hóa học" does not occur in "khóa học").
pub fn find_phrase(text: &str, phrase: &str) -> Option<usize> {
    if phrase.is_empty() {
        return None;
    }
    text.match_indices(phrase).map(|(i, _)| i).find(|&i| {
        let before = text[..i].chars().next_back();
        let after = text[i + phrase.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

pub fn contains_phrase(text: &str, phrase: &str) -> bool {
    find_phrase(text, phrase).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize("  Tìm   GIA SƯ \n Toán  "), "tìm gia sư toán");
    }

    #[test]
    fn test_rewrites_unaccented_variants() {
        assert_eq!(
            normalize("tim gia su toan o Ha Noi duoi 300k"),
            "tìm gia sư toán o hà nội dưới 300k"
        );
        assert_eq!(normalize("gs tieng anh tphcm"), "gia sư tiếng anh hồ chí minh");
    }

    #[test]
    fn test_variants_only_match_whole_words() {
        // "hn" must not fire inside another word
        assert_eq!(normalize("john"), "john");
        assert_eq!(normalize("tuan"), "tuan");
    }

    #[test]
    fn test_alternate_diacritic_placement() {
        assert_eq!(normalize("làm sao huỷ lịch"), "làm sao hủy lịch");
    }

    #[test]
    fn test_find_phrase_respects_word_edges() {
        assert_eq!(find_phrase("khóa học hóa học", "hóa học"), Some("khóa học ".len()));
        assert!(!contains_phrase("khóa học", "hóa học"));
        assert!(contains_phrase("dạy toán, lý", "toán"));
        assert!(!contains_phrase("anything", ""));
    }

    #[test]
    fn test_canonical_forms_are_fixed_points() {
        for (variant, canonical) in SUBSTITUTIONS {
            assert_eq!(
                normalize(canonical),
                *canonical,
                "canonical form of {variant:?} is rewritten again"
            );
        }
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "Tim GS toan HN tu 100k den 300k",
            "làm sao HUỶ lịch học?",
            "gia su nu 5 nam kinh nghiem, 4.5 sao",
            "Find me a math tutor under 300k in Hanoi!!",
            "tp.hcm   sai gon  saigon hcm",
            "🙂 xin chào",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }
}
