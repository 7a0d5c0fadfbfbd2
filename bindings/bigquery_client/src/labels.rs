const MAX_LABEL_LENGTH: usize = 63;

/// Make `value` acceptable as a BigQuery label value: lowercase letters, digits, `_` and `-`, at
/// most 63 characters.
pub fn sanitize_label_value(value: &str) -> String {
    value
        .chars()
        .flat_map(char::to_lowercase)
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_LABEL_LENGTH)
        .collect()
}

/// Make `key` acceptable as a BigQuery label key, which must also start with a letter.
pub fn sanitize_label_key(key: &str) -> String {
    let key = sanitize_label_value(key);
    if key.starts_with(|c: char| c.is_ascii_lowercase()) {
        key
    } else {
        let mut prefixed = format!("l{key}");
        prefixed.truncate(MAX_LABEL_LENGTH);
        prefixed
    }
}
