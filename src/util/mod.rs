pub(crate) fn now_ms() -> i64 {
    js_sys::Date::now().round() as i64
}

/// Current time as an ISO-8601 UTC string, e.g. `2024-05-01T10:00:00.000Z`.
pub(crate) fn now_iso() -> String {
    String::from(js_sys::Date::new_0().to_iso_string())
}

const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 9;

/// Nine lowercase base-36 characters.
pub(crate) fn random_suffix() -> String {
    let mut bytes = [0u8; SUFFIX_LEN];
    if let Err(e) = getrandom::getrandom(&mut bytes) {
        // Ids still carry the millisecond stamp, so fall back to it.
        leptos::logging::warn!("getrandom failed: {e}");
        bytes
            .iter_mut()
            .enumerate()
            .for_each(|(i, b)| *b = (js_sys::Math::random() * 256.0) as u8 ^ i as u8);
    }
    base36_chars(&bytes)
}

fn base36_chars(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| BASE36[*b as usize % BASE36.len()] as char)
        .collect()
}

pub(crate) fn custom_question_id(now_ms: i64, suffix: &str) -> String {
    format!("custom_{now_ms}_{suffix}")
}

pub(crate) fn exhibit_id(now_ms: i64, suffix: &str) -> String {
    format!("exhibit_{now_ms}_{suffix}")
}

pub(crate) fn section_id(now_ms: i64) -> String {
    format!("section-{now_ms}")
}

pub(crate) fn make_custom_question_id() -> String {
    custom_question_id(now_ms(), &random_suffix())
}

pub(crate) fn make_exhibit_id() -> String {
    exhibit_id(now_ms(), &random_suffix())
}

pub(crate) fn make_section_id() -> String {
    section_id(now_ms())
}
