//! One-shot source attribution from landing URLs.
//!
//! Campaign links carry `?src=<name>`. The first session start on a page reads
//! it and removes it from the visible URL, so a later start within the same
//! page load finds nothing and sends no source header. Re-reading the URL is
//! what makes the capture one-shot; no flag is kept.

use crate::environment::PageEnvironment;
use beacon_protocol::SOURCE_PARAM;
use url::{form_urlencoded, Url};

/// Reads the source parameter from the page location and, when present,
/// rewrites the visible URL without it.
///
/// An empty value (`?src=`) is stripped but reported as absent.
pub fn extract_source_name(page: &dyn PageEnvironment) -> Option<String> {
    let location = page.location();
    let (source, stripped) = strip_query_param(&location, SOURCE_PARAM)?;

    page.replace_location(&stripped);
    tracing::debug!(source = ?source, url = %stripped, "captured source attribution");

    source
}

/// Splits `name` out of the query string of `url`.
///
/// Returns `None` when the parameter is not present. Otherwise returns the
/// first non-empty value of the parameter (if any) and the URL with every
/// occurrence removed. Other query segments are kept byte for byte, as is the
/// fragment; an emptied query is dropped entirely.
pub fn strip_query_param(url: &Url, name: &str) -> Option<(Option<String>, Url)> {
    let query = url.query()?;
    let mut found = false;
    let mut value = None;
    let mut kept = Vec::new();

    for segment in query.split('&') {
        match form_urlencoded::parse(segment.as_bytes()).next() {
            Some((key, val)) if key == name => {
                found = true;
                if value.is_none() && !val.is_empty() {
                    value = Some(val.into_owned());
                }
            }
            _ if segment.is_empty() => {}
            _ => kept.push(segment),
        }
    }

    if !found {
        return None;
    }

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.set_query(Some(&kept.join("&")));
    }

    Some((value, stripped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::ScriptedPage;

    fn parse(url: &str) -> Url {
        Url::parse(url).unwrap()
    }

    #[test]
    fn test_absent_param_leaves_url_untouched() {
        assert_eq!(
            strip_query_param(&parse("https://a.example/docs?page=2"), "src"),
            None
        );
    }

    #[test]
    fn test_only_param_drops_query() {
        let (value, url) =
            strip_query_param(&parse("https://a.example/landing?src=newsletter"), "src").unwrap();
        assert_eq!(value.as_deref(), Some("newsletter"));
        assert_eq!(url.as_str(), "https://a.example/landing");
    }

    #[test]
    fn test_other_pairs_and_fragment_survive() {
        let (value, url) = strip_query_param(
            &parse("https://a.example/landing?utm=x&src=ads&lang=en#plans"),
            "src",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("ads"));
        assert_eq!(url.as_str(), "https://a.example/landing?utm=x&lang=en#plans");
    }

    #[test]
    fn test_unrelated_segments_keep_their_spelling() {
        let (value, url) = strip_query_param(
            &parse("https://a.example/search?flag&src=x&q=a%20b&tag=c+d"),
            "src",
        )
        .unwrap();
        assert_eq!(value.as_deref(), Some("x"));
        assert_eq!(url.as_str(), "https://a.example/search?flag&q=a%20b&tag=c+d");
    }

    #[test]
    fn test_encoded_param_name_is_matched() {
        let (value, url) =
            strip_query_param(&parse("https://a.example/?%73rc=qr&page=2"), "src").unwrap();
        assert_eq!(value.as_deref(), Some("qr"));
        assert_eq!(url.as_str(), "https://a.example/?page=2");
    }

    #[test]
    fn test_repeated_param_first_non_empty_wins() {
        let (value, url) =
            strip_query_param(&parse("https://a.example/?src=&src=mail&src=ads"), "src").unwrap();
        assert_eq!(value.as_deref(), Some("mail"));
        assert_eq!(url.as_str(), "https://a.example/");
    }

    #[test]
    fn test_empty_value_is_stripped_but_absent() {
        let (value, url) = strip_query_param(&parse("https://a.example/?src="), "src").unwrap();
        assert_eq!(value, None);
        assert_eq!(url.as_str(), "https://a.example/");
    }

    #[test]
    fn test_percent_encoded_value_is_decoded() {
        let (value, _) =
            strip_query_param(&parse("https://a.example/?src=spring%20sale"), "src").unwrap();
        assert_eq!(value.as_deref(), Some("spring sale"));
    }

    #[test]
    fn test_extract_is_one_shot() {
        let page = ScriptedPage::new(parse("https://a.example/blog?src=newsletter"), "Blog");

        assert_eq!(extract_source_name(&page).as_deref(), Some("newsletter"));
        assert_eq!(page.location().as_str(), "https://a.example/blog");
        assert_eq!(extract_source_name(&page), None);
        assert_eq!(page.history().len(), 1);
    }
}
