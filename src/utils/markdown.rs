//! Telegram MarkdownV2 escaping.
//!
//! Dynamic content (gym names, boss names) is escaped before it is embedded
//! in rendered boards and cards so stray formatting characters display as
//! literal text.

const SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Escapes MarkdownV2 special characters with backslashes.
///
/// # Example
/// ```
/// use raid_train_bot::utils::markdown::escape_markdown;
///
/// assert_eq!(escape_markdown("Fort Point (West)"), "Fort Point \\(West\\)");
/// ```
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
