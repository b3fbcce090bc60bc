//! Column name normalization
//!
//! Headers are rewritten to lower snake_case on load so that
//! `compoundName`, `Compound Name` and `compound.name` all become
//! `compound_name`.

use std::collections::HashMap;

/// Normalize a single raw header to lower snake_case
pub fn clean_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut prev: Option<char> = None;

    for ch in raw.trim().chars() {
        if ch.is_alphanumeric() {
            // camelCase boundary: lower/digit followed by upper
            if ch.is_uppercase()
                && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit())
            {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
        prev = Some(ch);
    }

    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "x".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("x{}", trimmed);
    }
    trimmed.to_string()
}

/// Normalize a full header row, keeping names unique
///
/// The second occurrence of a name becomes `name_2`, the third `name_3`, ...
pub fn clean_names<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.iter()
        .map(|name| {
            let base = clean_name(name.as_ref());
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{}_{}", base, count)
            }
        })
        .collect()
}
