//! `@import` parameter parsing
//!
//! `@import url("x.css") layer(a, b) supports(display: grid) screen and (min-width: 40em)`
//! is split on whitespace at nesting depth zero, so quoted URLs and the
//! contents of `layer(...)`, `supports(...)` and media features stay whole.

use crate::markers::SENTINEL;

/// What an `@import` rule's params say about the imported file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportParams {
    /// The import target with quotes / `url()` removed
    pub url: String,
    /// Names from every `layer(...)` segment, in order
    pub layers: Vec<String>,
    /// A bare `layer` keyword: anonymous layer
    pub anonymous_layer: bool,
    /// Condition inside `supports(...)`
    pub supports: Option<String>,
    /// Remaining segments joined by a single space
    pub media: Option<String>,
}

pub fn parse_import_params(params: &str) -> ImportParams {
    let mut segments = split_segments(params).into_iter();
    let mut parsed = ImportParams {
        url: segments.next().map(unquote_url).unwrap_or_default(),
        ..ImportParams::default()
    };

    let mut media = Vec::new();
    for segment in segments {
        if segment.starts_with(SENTINEL) {
            continue;
        }
        if let Some(names) = function_args(segment, "layer") {
            parsed.layers.extend(
                names
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string),
            );
        } else if segment.eq_ignore_ascii_case("layer") {
            parsed.anonymous_layer = true;
        } else if let Some(condition) = function_args(segment, "supports") {
            parsed.supports = Some(condition.trim().to_string());
        } else {
            media.push(segment);
        }
    }
    if !media.is_empty() {
        parsed.media = Some(media.join(" "));
    }
    parsed
}

/// `url` without its `?query` or `#fragment`
pub fn url_path(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Split on whitespace outside quotes and parentheses
pub fn split_segments(params: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start: Option<usize> = None;

    for (idx, ch) in params.char_indices() {
        if let Some(open) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        if ch.is_whitespace() && depth == 0 {
            if let Some(begin) = start.take() {
                segments.push(&params[begin..idx]);
            }
            continue;
        }

        if start.is_none() {
            start = Some(idx);
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    if let Some(begin) = start {
        segments.push(&params[begin..]);
    }
    segments
}

/// `name(args)` → `args`, case-insensitive on `name`
fn function_args<'a>(segment: &'a str, name: &str) -> Option<&'a str> {
    let open = segment.find('(')?;
    if !segment[..open].eq_ignore_ascii_case(name) || !segment.ends_with(')') {
        return None;
    }
    Some(&segment[open + 1..segment.len() - 1])
}

/// `"x.css"`, `'x.css'`, `url(x.css)` and `url("x.css")` → `x.css`
pub fn unquote_url(segment: &str) -> String {
    let inner = function_args(segment, "url").unwrap_or(segment).trim();
    strip_quotes(inner).to_string()
}

fn strip_quotes(text: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = text
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    text
}
