use std::sync::OnceLock;

use regex::Regex;

fn unsafe_chars() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^A-Za-z0-9_\-]+").expect("valid lesson key regex"))
}

fn safe_segment(raw: &str) -> String {
    unsafe_chars().replace_all(raw.trim(), "_").into_owned()
}

/// Stable identifier of a coursebook lesson, e.g. `A1_day3_ch2_5`.
pub(crate) fn lesson_key_build(level: &str, day: u32, chapter: &str) -> String {
    format!("{}_day{}_ch{}", level.trim(), day, safe_segment(chapter))
}

/// Document id of the submission lock for one student and lesson. Student
/// codes match case-insensitively, so the lock does too.
pub(crate) fn lock_id(level: &str, student_code: &str, lesson_key: &str) -> String {
    format!("{}__{}__{}", level.trim(), safe_segment(&student_code.to_lowercase()), lesson_key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_key_replaces_unsafe_runs() {
        assert_eq!(lesson_key_build("A1", 3, "2.5"), "A1_day3_ch2_5");
        assert_eq!(lesson_key_build("B1", 12, " 4 & 5 "), "B1_day12_ch4_5");
        assert_eq!(lesson_key_build("A2", 1, "Lesen-Hören"), "A2_day1_chLesen-H_ren");
    }

    #[test]
    fn lock_id_joins_level_code_and_key() {
        let key = lesson_key_build("A1", 1, "1.0");
        assert_eq!(lock_id("A1", "felix/abebe", &key), "A1__felix_abebe__A1_day1_ch1_0");
    }

    #[test]
    fn lock_id_ignores_student_code_case() {
        let key = lesson_key_build("A1", 1, "1.0");
        assert_eq!(lock_id("A1", "Felix/Abebe", &key), lock_id("A1", "felix/abebe", &key));
        assert_eq!(lock_id("A1", " S1 ", &key), "A1__s1__A1_day1_ch1_0");
    }
}
