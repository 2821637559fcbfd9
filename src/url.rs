// Copyright 2019 Dmitry Tantsur <divius.inside@gmail.com>
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Handy primitives for working with URLs.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Url;

/// Query values keep commas so that identifier lists stay readable (`ids=a,b,c`).
const QUERY_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b',')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Make sure the URL ends with a slash, so that relative paths are appended to it.
#[inline]
pub fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Append path segments to a base URL.
///
/// Segments are percent-encoded. A cannot-be-a-base URL is returned unchanged.
#[inline]
pub fn extend<I>(mut url: Url, segments: I) -> Url
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    if let Ok(mut path) = url.path_segments_mut() {
        let _ = path.pop_if_empty().extend(segments);
    }
    url
}

/// Append a query parameter whose value is a comma-separated list.
///
/// Unlike form encoding, the commas are not escaped.
pub fn append_list_query<I>(mut url: Url, key: &str, values: I) -> Url
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let encoded = values
        .into_iter()
        .map(|v| utf8_percent_encode(v.as_ref(), QUERY_VALUE).to_string())
        .collect::<Vec<_>>()
        .join(",");
    let pair = format!("{}={}", key, encoded);
    let query = match url.query() {
        Some(existing) if !existing.is_empty() => format!("{}&{}", existing, pair),
        _ => pair,
    };
    url.set_query(Some(&query));
    url
}

/// The last path segment of a (possibly relative) resource reference.
///
/// Any query string or fragment is ignored, as is a trailing slash.
pub fn last_segment(reference: &str) -> &str {
    let path = reference
        .split(|c: char| c == '?' || c == '#')
        .next()
        .unwrap_or_default()
        .trim_end_matches('/');
    path.rsplit('/').next().unwrap_or(path)
}

/// The value of a query parameter in a (possibly relative) reference.
pub fn query_value(base: &Url, reference: &str, key: &str) -> Option<String> {
    let absolute = base.join(reference).ok()?;
    absolute
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod test {
    use reqwest::Url;

    use super::*;

    #[test]
    fn test_with_trailing_slash() {
        let url = Url::parse("http://127.0.0.1/v1/1234").unwrap();
        assert_eq!(
            with_trailing_slash(url).as_str(),
            "http://127.0.0.1/v1/1234/"
        );
        let url = Url::parse("http://127.0.0.1/v1/").unwrap();
        assert_eq!(with_trailing_slash(url).as_str(), "http://127.0.0.1/v1/");
    }

    #[test]
    fn test_extend() {
        let url = Url::parse("http://127.0.0.1/v1/").unwrap();
        let result = extend(url, &["queues", "fizbit", "messages"]);
        assert_eq!(
            result.as_str(),
            "http://127.0.0.1/v1/queues/fizbit/messages"
        );
    }

    #[test]
    fn test_append_list_query() {
        let url = Url::parse("http://127.0.0.1/v1/queues/q/messages").unwrap();
        let result = append_list_query(url, "ids", &["a1", "b 2", "c3"]);
        assert_eq!(result.query(), Some("ids=a1,b%202,c3"));

        let url = Url::parse("http://127.0.0.1/v1/queues/q/messages?claim_id=x").unwrap();
        let result = append_list_query(url, "ids", &["a1"]);
        assert_eq!(result.query(), Some("claim_id=x&ids=a1"));
    }

    #[test]
    fn test_last_segment() {
        assert_eq!(
            last_segment("/v1/queues/fizbit/messages/50b68a50d6f5b8c8a7c62b01"),
            "50b68a50d6f5b8c8a7c62b01"
        );
        assert_eq!(
            last_segment("/v1/queues/fizbit/messages/50b68a50?claim_id=a28ee94e"),
            "50b68a50"
        );
        assert_eq!(
            last_segment("http://localhost/v1/queues/fizbit/claims/a28ee94e/"),
            "a28ee94e"
        );
        assert_eq!(last_segment("abc"), "abc");
    }

    #[test]
    fn test_query_value() {
        let base = Url::parse("https://example.com").unwrap();
        assert_eq!(
            query_value(&base, "/queues/q/messages?marker=6244&limit=10", "marker"),
            Some("6244".to_string())
        );
        assert_eq!(
            query_value(&base, "/queues/q/messages?limit=10", "marker"),
            None
        );
        assert_eq!(
            query_value(&base, "/queues/q/messages?marker=&limit=10", "marker"),
            None
        );
    }
}
