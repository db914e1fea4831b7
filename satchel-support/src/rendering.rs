//! Text rendering utilities for human-friendly error messages.
//!
//! Provides helpers to format key paths, type names,
//! and helpful suggestions in error output.

/// Renders path segments joined by `separator`, marking the segment at
/// `focus` (if any) with `[..]`.
///
/// # Examples
/// ```
/// use satchel_support::rendering::render_path;
///
/// let segments = ["books", "apiClient", "base"];
/// assert_eq!(render_path(&segments, '.', None), "books.apiClient.base");
/// assert_eq!(render_path(&segments, '.', Some(1)), "books.[apiClient].base");
/// ```
pub fn render_path(segments: &[impl AsRef<str>], separator: char, focus: Option<usize>) -> String {
    let mut result = String::new();

    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            result.push(separator);
        }
        if focus == Some(i) {
            result.push('[');
            result.push_str(segment.as_ref());
            result.push(']');
        } else {
            result.push_str(segment.as_ref());
        }
    }

    result
}

/// Renders a dependency chain as `a → b → a`.
///
/// ```
/// use satchel_support::rendering::render_chain;
///
/// assert_eq!(render_chain(&["store", "service", "store"]), "store → service → store");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(" → ")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use satchel_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::services::user::UserService");
/// assert_eq!(short, "UserService");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut rest = full_name;

    // Delimiters are all ASCII, so slicing one byte past them is safe
    while let Some(pos) = rest.find(['<', '>', ',', ' ', '(', ')', '[', ']', ';']) {
        result.push_str(last_segment(&rest[..pos]));
        result.push_str(&rest[pos..=pos]);
        rest = &rest[pos + 1..];
    }

    result.push_str(last_segment(rest));
    result
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

/// Generates "did you mean?" suggestions for a requested key.
///
/// Compares the requested key against the available ones
/// and returns the closest matches, best first.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let requested_lower = requested.to_lowercase();
    if requested_lower.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_lower = name.to_lowercase();
            if name_lower == requested_lower {
                return Some((name, 120));
            }

            // Substring either way
            if name_lower.contains(&requested_lower) || requested_lower.contains(&name_lower) {
                return Some((name, 100));
            }

            // Typos: same length-ish, mostly the same characters in place
            if edit_close(&requested_lower, &name_lower) {
                return Some((name, 90));
            }

            let common = name_lower
                .chars()
                .zip(requested_lower.chars())
                .take_while(|(a, b)| a == b)
                .count();

            if common >= 3 {
                return Some((name, common * 10));
            }

            None
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| name.to_string())
        .collect()
}

/// Quick "close enough" check: lengths within 2 and at least 60% of
/// positions matching.
fn edit_close(a: &str, b: &str) -> bool {
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    if a_len.abs_diff(b_len) > 2 {
        return false;
    }

    let max_len = a_len.max(b_len);
    if max_len == 0 {
        return true;
    }

    let common = a.chars().zip(b.chars()).filter(|(ca, cb)| ca == cb).count();
    common * 100 / max_len >= 60
}
