//! Bank date token → ISO `YYYY-MM-DD`.
//!
//! This is a string-shape transform, not a calendar: no timezone handling and
//! no validation that day 31 exists in the month. A token that matches no
//! known shape comes back unchanged; callers treat a non-ISO result as a
//! parse failure for that row.

use regex::Regex;
use std::sync::OnceLock;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_iso, r"^\d{4}-\d{2}-\d{2}$");
re!(re_iso_loose, r"^(\d{4})-(\d{1,2})-(\d{1,2})$");
re!(re_dotted, r"^(\d{1,2})\.(\d{1,2})\.(\d{4})$");
re!(re_slash, r"^(\d{1,2})/(\d{1,2})/(\d{4})$");
re!(re_compact, r"^(\d{4})(\d{2})(\d{2})$");

/// Is this already a canonical ISO date token?
pub fn is_iso(token: &str) -> bool {
    re_iso().is_match(token)
}

/// Normalize a date token, preferring the dialect's explicit format hint.
///
/// An already-ISO token is returned as-is even when a hint is present, so a
/// correct date is never mangled by a wrong hint. A token that does not
/// structurally match its hint falls through to heuristic detection.
pub fn normalize(token: &str, format_hint: Option<&str>) -> String {
    let token = token.trim();
    if is_iso(token) {
        return token.to_string();
    }
    if let Some(hint) = format_hint {
        if let Some(iso) = apply_hint(token, hint) {
            return iso;
        }
    }
    detect(token).unwrap_or_else(|| token.to_string())
}

fn apply_hint(token: &str, hint: &str) -> Option<String> {
    let (re, order) = match hint {
        "%Y-%m-%d" => (re_iso_loose(), FieldOrder::Ymd),
        "%d.%m.%Y" => (re_dotted(), FieldOrder::Dmy),
        "%d/%m/%Y" => (re_slash(), FieldOrder::Dmy),
        "%m/%d/%Y" => (re_slash(), FieldOrder::Mdy),
        "%Y%m%d" => (re_compact(), FieldOrder::Ymd),
        _ => return None,
    };
    let caps = re.captures(token)?;
    Some(assemble(&caps, order))
}

/// Heuristic shape detection, tried in fixed order.
///
/// Ambiguous `A/B/YYYY` tokens are read day-first when `A > 12` (only a day
/// can exceed 12) and month-first otherwise; dotted dates are always
/// day-first. One rule, applied everywhere.
fn detect(token: &str) -> Option<String> {
    if let Some(caps) = re_dotted().captures(token) {
        return Some(assemble(&caps, FieldOrder::Dmy));
    }
    if let Some(caps) = re_slash().captures(token) {
        let first: u32 = caps[1].parse().ok()?;
        let order = if first > 12 { FieldOrder::Dmy } else { FieldOrder::Mdy };
        return Some(assemble(&caps, order));
    }
    if let Some(caps) = re_compact().captures(token) {
        return Some(assemble(&caps, FieldOrder::Ymd));
    }
    None
}

#[derive(Clone, Copy)]
enum FieldOrder {
    Ymd,
    Dmy,
    Mdy,
}

fn assemble(caps: &regex::Captures<'_>, order: FieldOrder) -> String {
    let (y, m, d) = match order {
        FieldOrder::Ymd => (&caps[1], &caps[2], &caps[3]),
        FieldOrder::Dmy => (&caps[3], &caps[2], &caps[1]),
        FieldOrder::Mdy => (&caps[3], &caps[1], &caps[2]),
    };
    format!("{y}-{m:0>2}-{d:0>2}")
}
