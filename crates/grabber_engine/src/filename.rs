use url::Url;

const FALLBACK_URL_NAME: &str = "downloaded_file";
const MAX_STEM_LEN: usize = 120;

/// Turns a user-supplied title into a file stem that is safe on every platform.
pub fn sanitize_file_stem(input: &str) -> String {
    let cleaned: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();
    let cleaned = cleaned.trim_matches(&['_', ' ', '.'][..]);
    if cleaned.is_empty() {
        return "untitled".to_string();
    }

    // Collapse runs of underscores left by replaced characters.
    let mut compacted = String::with_capacity(cleaned.len());
    let mut prev_underscore = false;
    for c in cleaned.chars() {
        if c == '_' {
            if !prev_underscore {
                compacted.push(c);
            }
            prev_underscore = true;
        } else {
            compacted.push(c);
            prev_underscore = false;
        }
    }

    let mut final_name = truncate_on_char_boundary(compacted, MAX_STEM_LEN);
    if is_reserved_windows_name(&final_name) {
        final_name.push('_');
    }
    final_name
}

/// File name for a direct download: the last path segment of the URL.
pub fn safe_filename_from_url(url: &str) -> String {
    let segment = Url::parse(url).ok().and_then(|parsed| {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back().map(str::to_owned))
            .filter(|s| !s.is_empty())
    });
    match segment {
        Some(name) => sanitize_file_stem(&name),
        None => FALLBACK_URL_NAME.to_string(),
    }
}

fn truncate_on_char_boundary(mut text: String, max_len: usize) -> String {
    if text.len() > max_len {
        let mut end = max_len;
        while end > 0 && !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

fn is_forbidden(c: char) -> bool {
    matches!(c,
        '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '%' | '\0'..='\u{1F}'
    )
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_characters_are_replaced_and_collapsed() {
        assert_eq!(sanitize_file_stem("My: Title?/Bad"), "My_ Title_Bad");
        assert_eq!(sanitize_file_stem("50% off"), "50_ off");
    }

    #[test]
    fn empty_and_reserved_names_are_patched() {
        assert_eq!(sanitize_file_stem("  ..  "), "untitled");
        assert_eq!(sanitize_file_stem("con"), "con_");
    }

    #[test]
    fn long_titles_are_truncated_on_char_boundary() {
        let long = "é".repeat(100);
        let stem = sanitize_file_stem(&long);
        assert!(stem.len() <= MAX_STEM_LEN);
        assert!(stem.chars().all(|c| c == 'é'));
    }

    #[test]
    fn url_file_name_uses_last_segment() {
        assert_eq!(
            safe_filename_from_url("https://cdn.example.com/media/song.mp3?sig=1"),
            "song.mp3"
        );
        assert_eq!(
            safe_filename_from_url("https://cdn.example.com/"),
            FALLBACK_URL_NAME
        );
        assert_eq!(safe_filename_from_url("not a url"), FALLBACK_URL_NAME);
    }
}
