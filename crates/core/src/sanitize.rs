/// Clean a free-text field coming out of a bank export.
///
/// Strips the ASCII control characters that occasionally leak into exports
/// (NUL through BS, VT, FF, SO through US, DEL — tab and line breaks survive
/// the strip and fall to the trim), trims surrounding whitespace, and caps
/// the result at `max_len` characters. An empty result is `None`, never an
/// empty string.
pub fn clean_field(raw: &str, max_len: usize) -> Option<String> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !is_stripped_control(*c))
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.chars().take(max_len).collect())
}

fn is_stripped_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0b}' | '\u{0c}' | '\u{0e}'..='\u{1f}' | '\u{7f}')
}
