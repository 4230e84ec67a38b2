//! Query-string helpers for frame URLs.

use url::form_urlencoded;

/// Splits `url` into the part before `?`, the query and the `#` fragment.
fn split_url(url: &str) -> (&str, &str, Option<&str>) {
    let (rest, fragment) = match url.split_once('#') {
        Some((rest, fragment)) => (rest, Some(fragment)),
        None => (url, None),
    };
    let (base, query) = rest.split_once('?').unwrap_or((rest, ""));
    (base, query, fragment)
}

/// Query parameters grouped by name in first-seen order. Blank values are dropped.
fn grouped_params(query: &str) -> Vec<(String, Vec<String>)> {
    let mut params: Vec<(String, Vec<String>)> = Vec::new();
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        match params.iter_mut().find(|(k, _)| *k == key) {
            Some((_, values)) => values.push(value.into_owned()),
            None => params.push((key.into_owned(), vec![value.into_owned()])),
        }
    }
    params
}

/// All non-blank values of `param` in the URL's query string.
pub fn query_values(url: &str, param: &str) -> Vec<String> {
    let (_, query, _) = split_url(url);
    grouped_params(query)
        .into_iter()
        .find(|(key, _)| key == param)
        .map(|(_, values)| values)
        .unwrap_or_default()
}

/// Sets each `(name, value)` as the only value of `name`, keeping the
/// position of parameters that already exist and appending new ones.
pub fn with_query_params(url: &str, overrides: &[(&str, &str)]) -> String {
    let (base, query, fragment) = split_url(url);
    let mut params = grouped_params(query);
    for (name, value) in overrides {
        match params.iter_mut().find(|(k, _)| k == name) {
            Some((_, values)) => *values = vec![value.to_string()],
            None => params.push((name.to_string(), vec![value.to_string()])),
        }
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (name, values) in &params {
        for value in values {
            serializer.append_pair(name, value);
        }
    }

    let mut result = format!("{}?{}", base, serializer.finish());
    if let Some(fragment) = fragment {
        result.push('#');
        result.push_str(fragment);
    }
    result
}

pub fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
