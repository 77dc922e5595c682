use url::Url;

/// Removes crop transforms (`type=crop640`, `type=crop540_540`, ...) from an
/// image URL, keeping every other query parameter in order.
///
/// Unparseable input is returned unchanged.
pub fn strip_crop_transform(image_url: &str) -> String {
    retain_query_pairs(image_url, |key, value| !(key == "type" && value.contains("crop")))
}

/// Removes every occurrence of `key` from the query string.
pub fn pop_query_param(url: &str, key: &str) -> String {
    retain_query_pairs(url, |k, _| k != key)
}

/// Normalizes a user-supplied series URL. The `page` parameter points at a
/// transient chapter-list position, not at the series itself.
pub fn normalize_series_url(url: &str) -> String {
    pop_query_param(url.trim(), "page")
}

fn retain_query_pairs(input: &str, keep: impl Fn(&str, &str) -> bool) -> String {
    let Ok(mut parsed) = Url::parse(input) else {
        return input.to_string();
    };
    if parsed.query().is_none() {
        return input.to_string();
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, v)| keep(k, v))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(kept);
    }
    parsed.to_string()
}
