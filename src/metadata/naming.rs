//! Identifier case conversion between member names and column names.

const UNDERLINE: char = '_';

/// Convert a camel-cased member name to an underlined column name.
///
/// An upper-case letter is lowered, and prefixed with `_` unless it starts the
/// name, when it follows a lower-case letter or precedes one. Runs of capitals
/// stay together, so `HTTPCode` becomes `HTTP_code`. A capital in second
/// position after a lower-case first letter with nothing lower-case behind it
/// is kept as-is (`aB` stays `aB`).
pub fn camel_to_underline(name: &str) -> String {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let chars: Vec<char> = trimmed.chars().collect();
    let mut out = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        let after_lower = i > 1 && chars[i - 1].is_lowercase();
        let before_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
        if c.is_uppercase() && (after_lower || before_lower) {
            if i > 0 {
                out.push(UNDERLINE);
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Upper-case the first letter (`amount` to `Amount`).
pub fn upper_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
