//! Small string helpers shared by the mapper and the coercion engine.

/// Returns `true` if `s` begins with a character that has no distinct
/// upper-case form other than itself (capital letters, digits, symbols).
///
/// An empty string yields `false`.
pub fn is_first_upper(s: &str) -> bool {
    match s.chars().next() {
        Some(c) => c.to_uppercase().eq(std::iter::once(c)),
        None => false,
    }
}

/// Removes every character contained in `chars` from `s`.
pub fn remove_chars(s: &str, chars: &str) -> String {
    s.chars().filter(|c| !chars.contains(*c)).collect()
}

/// Guess the radix of an integer literal from its prefix or suffix.
///
/// Recognizes `0x…`/`…h` as hexadecimal and `0b…`/`…b` as binary, ignoring
/// case. Anything else is decimal. The literal itself is not validated.
pub fn int_base(literal: &str) -> u32 {
    let lower = literal.to_lowercase();
    if lower.starts_with("0x") || lower.ends_with('h') {
        16
    } else if lower.starts_with("0b") || lower.ends_with('b') {
        2
    } else {
        10
    }
}

/// Split an integer literal into `(digits, radix)` with the radix marker
/// removed. A leading sign is kept on the digits.
pub(crate) fn split_radix(literal: &str) -> (String, u32) {
    let (sign, body) = match literal.strip_prefix(['-', '+']) {
        Some(rest) => (&literal[..1], rest),
        None => ("", literal),
    };
    let base = int_base(body);
    let digits = match base {
        16 => strip_marker(body, "0x", 'h'),
        2 => strip_marker(body, "0b", 'b'),
        _ => body,
    };
    (format!("{sign}{digits}"), base)
}

fn strip_marker<'a>(body: &'a str, prefix: &str, suffix: char) -> &'a str {
    let body = match body.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &body[prefix.len()..],
        _ => body,
    };
    body.strip_suffix([suffix, suffix.to_ascii_uppercase()]).unwrap_or(body)
}

/// Normalize a name for fuzzy matching: drop every character in `drop`
/// and lower-case the rest.
pub(crate) fn fold_name(name: &str, drop: &str) -> String {
    remove_chars(name, drop).to_lowercase()
}
