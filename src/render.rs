//! HTTP responses for resolved links.

use crate::model::LinkRecord;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};
use url::Url;

const NO_STORE: &str = "no-store";

const BASE_CSS: &str = r#"
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Oxygen, Ubuntu, sans-serif;
      line-height: 1.6;
      color: #1a1a1a;
      background: #fafafa;
    }
    @media (prefers-color-scheme: dark) {
      body { background: #1a1a1a; color: #e5e5e5; }
    }"#;

const ARTICLE_CSS: &str = r#"
    body { padding: 2rem 1rem; }
    @media (prefers-color-scheme: dark) {
      a { color: #60a5fa; }
      pre, code { background: #2d2d2d; }
      blockquote { border-color: #404040; color: #a3a3a3; }
      hr { border-color: #404040; }
    }
    article { max-width: 65ch; margin: 0 auto; }
    h1, h2, h3, h4, h5, h6 { margin: 1.5em 0 0.5em; line-height: 1.3; }
    h1 { font-size: 2em; }
    h2 { font-size: 1.5em; }
    h3 { font-size: 1.25em; }
    p { margin: 1em 0; }
    a { color: #2563eb; }
    pre { background: #f3f4f6; padding: 1rem; border-radius: 0.5rem; overflow-x: auto; margin: 1em 0; }
    code { background: #f3f4f6; padding: 0.2em 0.4em; border-radius: 0.25rem; font-size: 0.9em; }
    pre code { background: none; padding: 0; }
    blockquote { border-left: 4px solid #e5e7eb; padding-left: 1rem; margin: 1em 0; color: #6b7280; }
    ul, ol { margin: 1em 0; padding-left: 2em; }
    li { margin: 0.5em 0; }
    img { max-width: 100%; height: auto; border-radius: 0.5rem; }
    hr { border: none; border-top: 1px solid #e5e7eb; margin: 2em 0; }
    table { border-collapse: collapse; width: 100%; margin: 1em 0; }
    th, td { border: 1px solid #e5e7eb; padding: 0.5rem; text-align: left; }
    th { background: #f9fafb; }"#;

const COUNTDOWN_CSS: &str = r#"
    .countdown {
      position: fixed;
      bottom: 1rem;
      left: 50%;
      transform: translateX(-50%);
      background: rgba(239, 68, 68, 0.95);
      color: white;
      padding: 0.5rem 1rem;
      border-radius: 0.5rem;
      font-size: 0.875rem;
      font-weight: 500;
    }
    @media (prefers-color-scheme: dark) {
      .countdown { background: rgba(220, 38, 38, 0.95); }
    }"#;

const COUNTDOWN_SCRIPT: &str = r#"
  <script>
    (function() {
      var el = document.getElementById('countdown');
      var expiresAt = Number(el.dataset.expiresAt) * 1000;
      function update() {
        var remaining = Math.max(0, expiresAt - Date.now());
        if (remaining <= 0) { window.location.reload(); return; }
        var secs = Math.ceil(remaining / 1000);
        var mins = Math.floor(secs / 60);
        el.textContent = mins > 0
          ? 'Self-destructs in ' + mins + 'm ' + (secs % 60) + 's'
          : 'Self-destructs in ' + secs + 's';
      }
      update();
      setInterval(update, 1000);
    })();
  </script>"#;

/// Terminal page for exhausted and self-destructed links.
pub fn expired_page() -> Response {
    let page = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Link Expired</title>
  <style>{BASE_CSS}
    body {{ min-height: 100vh; display: flex; align-items: center; justify-content: center; }}
    .container {{ text-align: center; padding: 2rem; }}
    h1 {{ font-size: 2em; margin-bottom: 0.5em; }}
    p {{ color: #6b7280; }}
  </style>
</head>
<body>
  <div class="container">
    <h1>Link Expired</h1>
    <p>This link has expired and is no longer available.</p>
  </div>
</body>
</html>"#
    );
    (StatusCode::GONE, [(header::CACHE_CONTROL, NO_STORE)], Html(page)).into_response()
}

/// Renders Markdown content as a page. `expires_at` (epoch seconds) adds a
/// self-destruct countdown.
pub fn text_page(record: &LinkRecord, content: &str, expires_at: Option<i64>) -> Response {
    let title = escape_html(record.title.as_deref().unwrap_or(&record.slug));
    let description = record
        .description
        .as_deref()
        .map(|description| {
            format!(
                r#"<meta name="description" content="{}">"#,
                escape_html(description)
            )
        })
        .unwrap_or_default();
    let (countdown_css, countdown_html, countdown_script) = match expires_at {
        Some(expires_at) => (
            COUNTDOWN_CSS,
            format!(r#"<div id="countdown" class="countdown" data-expires-at="{expires_at}"></div>"#),
            COUNTDOWN_SCRIPT,
        ),
        None => ("", String::new(), ""),
    };
    let body = markdown_to_html(content);

    let page = format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>{title}</title>
  {description}
  <style>{BASE_CSS}{ARTICLE_CSS}{countdown_css}
  </style>
</head>
<body>
  <article>{body}</article>
  {countdown_html}{countdown_script}
</body>
</html>"#
    );
    (StatusCode::OK, [(header::CACHE_CONTROL, NO_STORE)], Html(page)).into_response()
}

pub fn redirect(location: &str, status: StatusCode) -> Response {
    (status, [(header::LOCATION, location.to_string())]).into_response()
}

/// Adds the inbound query to `destination`. The destination is kept as
/// written, minus the parameters the inbound query overrides; inbound
/// segments are appended verbatim.
pub fn merge_query(destination: &str, query: Option<&str>) -> String {
    let inbound: Vec<&str> = query
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty())
        .collect();
    if inbound.is_empty() {
        return destination.to_string();
    }
    if Url::parse(destination).is_err() {
        tracing::warn!("Cannot forward query to unparsable destination {}", destination);
        return destination.to_string();
    }

    let (without_fragment, fragment) = match destination.split_once('#') {
        Some((head, fragment)) => (head, Some(fragment)),
        None => (destination, None),
    };
    let (base, own_query) = match without_fragment.split_once('?') {
        Some((base, own_query)) => (base, own_query),
        None => (without_fragment, ""),
    };

    let overridden: Vec<String> = inbound.iter().map(|segment| query_key(segment)).collect();
    let kept = own_query
        .split('&')
        .filter(|segment| !segment.is_empty() && !overridden.contains(&query_key(segment)));

    let merged = kept.chain(inbound.iter().copied()).collect::<Vec<_>>().join("&");
    let mut location = format!("{base}?{merged}");
    if let Some(fragment) = fragment {
        location.push('#');
        location.push_str(fragment);
    }
    location
}

/// Decoded parameter name of a raw `key=value` segment.
fn query_key(segment: &str) -> String {
    let raw_key = segment.split_once('=').map_or(segment, |(key, _)| key);
    url::form_urlencoded::parse(raw_key.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .unwrap_or_default()
}

/// Markdown to HTML. Raw HTML in the source is shown as text and script
/// urls are dropped from links and images.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_FOOTNOTES;
    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_url(dest_url),
            title,
            id,
        }),
        other => other,
    });

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, events);
    output
}

fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let scheme = url.trim_start().to_ascii_lowercase();
    if scheme.starts_with("javascript:") || scheme.starts_with("vbscript:") {
        CowStr::Borrowed("#")
    } else {
        url
    }
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    // writes into a String never fail
    let _ = pulldown_cmark_escape::escape_html(&mut escaped, text);
    escaped
}
