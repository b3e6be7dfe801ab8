//! Lookup of a named cookie in a `Cookie` request header.

/// Returns the value of the first cookie called `name` in `header`.
///
/// Pairs are `;`-separated and split on their first `=`. Surrounding
/// whitespace and one pair of double quotes are removed from the value;
/// percent-encoding is left for [`crate::decrypt`] to undo.
#[must_use]
pub fn find_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| unquote(value.trim()))
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_among_others() {
        let header = "XSRF-TOKEN=abc; laravel_session=eyJpdiI6%3D%3D; theme=dark";
        assert_eq!(find_cookie(header, "laravel_session"), Some("eyJpdiI6%3D%3D"));
        assert_eq!(find_cookie(header, "theme"), Some("dark"));
    }

    #[test]
    fn name_must_match_exactly() {
        let header = "old_laravel_session=x; laravel_session_backup=y";
        assert_eq!(find_cookie(header, "laravel_session"), None);
    }

    #[test]
    fn first_of_duplicate_names_wins() {
        assert_eq!(find_cookie("s=one;s=two", "s"), Some("one"));
    }

    #[test]
    fn value_keeps_inner_equals_and_drops_quotes() {
        assert_eq!(find_cookie("s=\"a=b==\"", "s"), Some("a=b=="));
        assert_eq!(find_cookie(" s = abc ; ", "s"), Some("abc"));
    }

    #[test]
    fn missing_or_malformed_pairs_yield_none() {
        assert_eq!(find_cookie("", "s"), None);
        assert_eq!(find_cookie("flag; other", "s"), None);
    }
}
