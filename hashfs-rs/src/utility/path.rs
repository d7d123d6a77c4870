//! Slash handling for logical store paths.
//!
//! Logical paths use `/` and are rooted (`/def/world.sii`); both `/` and `\`
//! are accepted as separators when trimming.

fn is_separator(ch: char) -> bool {
    ch == '/' || ch == '\\'
}

/// Removes a single trailing separator.
pub fn remove_slash_at_end(path: &str) -> &str {
    match path.chars().last() {
        Some(ch) if is_separator(ch) => &path[..path.len() - 1],
        _ => path,
    }
}

/// Removes a single leading separator.
pub fn remove_slash_at_begin(path: &str) -> &str {
    match path.chars().next() {
        Some(ch) if is_separator(ch) => &path[1..],
        _ => path,
    }
}

/// Removes every leading separator.
pub fn trim_slashes_at_begin(path: &str) -> &str {
    path.trim_start_matches(is_separator)
}

/// Removes every trailing separator.
pub fn trim_slashes_at_end(path: &str) -> &str {
    path.trim_end_matches(is_separator)
}

/// Ensures the path ends with `/`. An empty path stays empty.
pub fn make_slash_at_end(path: &str) -> String {
    match path.chars().last() {
        None => String::new(),
        Some(ch) if is_separator(ch) => path.to_string(),
        Some(_) => format!("{path}/"),
    }
}

/// Normalizes a directory path for lookup: strips one trailing separator unless
/// the path is the root itself.
pub fn directory_key(path: &str) -> &str {
    if path.len() != 1 {
        remove_slash_at_end(path)
    } else {
        path
    }
}

/// Joins a child name onto a directory path with exactly one `/`.
pub fn join(directory: &str, name: &str) -> String {
    format!("{}/{}", trim_slashes_at_end(directory), name)
}
