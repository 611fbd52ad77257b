//! URL extraction from inbound message content.

use {regex::Regex, std::sync::LazyLock};

/// Any run of non-whitespace after an `http://` or `https://` prefix.
static URL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"https?://\S+").expect("URL pattern is a valid literal")
});

/// Collect candidate URLs from a message.
///
/// `links` are the client-declared hyperlink targets and come first, in the
/// order given; plain-text matches from `text` are appended after them.
/// Repeats are kept: each occurrence is its own candidate.
pub fn extract_urls<'a>(links: impl IntoIterator<Item = &'a str>, text: &str) -> Vec<String> {
    links
        .into_iter()
        .filter(|link| is_http_url(link))
        .map(str::to_owned)
        .chain(URL_PATTERN.find_iter(text).map(|m| m.as_str().to_owned()))
        .collect()
}

fn is_http_url(link: &str) -> bool {
    let lowered = link.get(..8).unwrap_or(link).to_ascii_lowercase();
    lowered.starts_with("http://") || lowered.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_only(text: &str) -> Vec<String> {
        extract_urls(std::iter::empty::<&str>(), text)
    }

    #[test]
    fn finds_single_url_in_text() {
        let urls = text_only("check this out https://example.com/cat.webp nice");
        assert_eq!(urls, vec!["https://example.com/cat.webp"]);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(text_only("").is_empty());
        assert!(text_only("no links here, just www.example.com").is_empty());
    }

    #[test]
    fn link_annotations_come_before_text_matches() {
        let urls = extract_urls(
            ["https://hidden.example/clip.webm"],
            "see http://a.example/1.webp and https://b.example/2",
        );
        assert_eq!(urls, vec![
            "https://hidden.example/clip.webm",
            "http://a.example/1.webp",
            "https://b.example/2",
        ]);
    }

    #[test]
    fn repeated_urls_are_independent_candidates() {
        let urls = extract_urls(
            ["https://x.example/a.webp"],
            "https://x.example/a.webp https://x.example/a.webp",
        );
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn url_stops_at_whitespace_only() {
        let urls = text_only("https://x.example/a.webp,\nhttps://y.example/b?c=d\te");
        assert_eq!(urls, vec!["https://x.example/a.webp,", "https://y.example/b?c=d"]);
    }

    #[test]
    fn non_http_annotations_are_dropped() {
        let urls = extract_urls(["tg://user?id=1", "mailto:a@b.c", "HTTPS://X.EXAMPLE/A"], "");
        assert_eq!(urls, vec!["HTTPS://X.EXAMPLE/A"]);
    }
}
