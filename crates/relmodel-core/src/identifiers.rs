//! SQL identifier sanitization and quoting.
//!
//! Identifiers reach the SQL text only through [`inject_identifier`], which
//! first strips everything outside `[A-Za-z0-9_.*]` and then quotes each
//! dotted segment. Because the quote characters can never survive the strip,
//! no escaping is needed.

/// Remove every character outside `[A-Za-z0-9_.*]`.
///
/// **Note:** This function strips characters rather than erroring. If the input
/// contains only invalid characters, the result will be an empty string.
///
/// # Examples
///
/// ```
/// use relmodel_core::sanitize_identifier;
///
/// assert_eq!(sanitize_identifier("users.name"), "users.name");
/// assert_eq!(sanitize_identifier("user;DROP TABLE--"), "userDROPTABLE");
/// ```
#[inline]
pub fn sanitize_identifier(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '*'))
        .collect()
}

/// Sanitize `name`, split it on `.`, and quote every segment except a bare
/// `*` with `quote`.
///
/// # Examples
///
/// ```
/// use relmodel_core::inject_identifier;
///
/// assert_eq!(inject_identifier("users.name", '"'), "\"users\".\"name\"");
/// assert_eq!(inject_identifier("users.*", '`'), "`users`.*");
/// assert_eq!(inject_identifier("a; DROP--.b", '"'), "\"aDROP\".\"b\"");
/// ```
pub fn inject_identifier(name: &str, quote: char) -> String {
    sanitize_identifier(name)
        .split('.')
        .map(|segment| {
            if segment == "*" {
                "*".to_string()
            } else {
                format!("{quote}{segment}{quote}")
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}
