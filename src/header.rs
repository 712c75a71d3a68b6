//! Scanning helpers for C-style `#define NAME "value"` lines

/// Builds the marker a line must contain for `name`, e.g. `#define DATABASE_URL`.
pub fn define_marker(name: &str) -> String {
    format!("#define {}", name)
}

/// Returns the quoted value of the last line defining `name`.
///
/// The value is the text between the first pair of double quotes after the
/// marker. A defining line without a quoted value yields nothing.
pub fn quoted_define(contents: &str, name: &str) -> Option<String> {
    let marker = define_marker(name);
    contents
        .lines()
        .filter_map(|line| {
            let start = line.find(&marker)?;
            line[start + marker.len()..]
                .split('"')
                .nth(1)
                .map(str::to_string)
        })
        .last()
}

/// Returns the last space-separated token of the last line defining `name`.
pub fn trailing_define_token(contents: &str, name: &str) -> Option<String> {
    let marker = define_marker(name);
    contents
        .lines()
        .filter(|line| line.contains(&marker))
        .filter_map(|line| line.trim_end().rsplit(' ').next())
        .map(str::to_string)
        .last()
        .filter(|token| !token.is_empty() && *token != name)
}
