//! Extracts todo and feed items out of free-text Blinko notes.
//!
//! Every rule below is a standalone function over the note text. None of them
//! can fail: malformed input degrades to empty strings, `None` or `false`.

use std::cmp::Ordering;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;
use url::Url;

use crate::models::note::{Column, Note, RssItem, TodoItem};

const TITLE_MIN_CHARS: usize = 10;
const TITLE_FALLBACK_MIN_CHARS: usize = 5;
const TITLE_LAST_RESORT_MIN_CHARS: usize = 3;
const TITLE_MAX_CHARS: usize = 120;
const UNTITLED: &str = "Untitled";

const DONE_GLYPH: &str = "✓";

lazy_static! {
    static ref URL_RE: Regex = Regex::new(r"https?://\S+").unwrap();
    static ref HASHTAG_RE: Regex = Regex::new(r"#[^\s#]+").unwrap();
    // A tag ends at the first non-word character, so `#later.` and `#稍后，` still count.
    static ref LATER_TAG_RE: Regex = Regex::new(r"(?i)#(?:later|稍后|以后)\b").unwrap();
    static ref COLUMN_TAG_RE: Regex = Regex::new(r"(?i)#(?:today|今天|later|稍后|以后)\b\s*").unwrap();
    static ref STAR_TAG_RE: Regex = Regex::new(r"(?i)#(?:starred|star)\b").unwrap();
    static ref DONE_MARKER_RE: Regex = Regex::new(r"^(?:✓|✔|✅|\[[xX]\])\s*").unwrap();
    static ref CHECKBOX_RE: Regex = Regex::new(r"- \[[ xX]\] ?").unwrap();
    static ref EMOJI_RE: Regex = Regex::new(
        r"[\x{1F000}-\x{1FAFF}\x{2600}-\x{27BF}\x{2B00}-\x{2BFF}\x{2300}-\x{23FF}\x{FE0F}\x{200D}\x{20E3}]"
    )
    .unwrap();
    static ref RT_PREFIX_RE: Regex = Regex::new(r"(?i)^RT by @[^:\s]+:\s*").unwrap();
    static ref CATEGORY_PREFIX_RE: Regex = Regex::new(r"^\[[^\]]*\]\s*").unwrap();
    static ref LABEL_PREFIX_RE: Regex = Regex::new(r"(?i)^(?:EN|CN|Score)\s*[:：]\s*").unwrap();
    static ref SCORE_PREFIX_RE: Regex = Regex::new(r"^\d{1,2}\s*/\s*10\b\s*").unwrap();
    static ref LEADING_PUNCT_RE: Regex =
        Regex::new(r"^[\s\-–—:：|·•,，.。;；!！?？/\\*>~_]+").unwrap();
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
    static ref EN_LINE_RE: Regex = Regex::new(r"💡\s*EN\s*[:：]\s*(.+)").unwrap();
    static ref SCORE_RE: Regex = Regex::new(r"(?i)score\s*[:：]\s*(\d{1,2})\s*/\s*10").unwrap();
}

/// Rewrites links that point at the internal feed proxy without its port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRewrite {
    pub host: String,
    pub port: u16,
}

fn lines(content: &str) -> impl Iterator<Item = &str> {
    content.lines().map(str::trim).filter(|l| !l.is_empty())
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

// ---------------------------------------------------------------------------
// Todo
// ---------------------------------------------------------------------------

pub fn is_done(content: &str, is_archived: bool) -> bool {
    is_archived || DONE_MARKER_RE.is_match(content)
}

/// `#today` is accepted but not needed: anything without a later tag is today.
pub fn column_of(content: &str) -> Column {
    if LATER_TAG_RE.is_match(content) {
        Column::Later
    } else {
        Column::Today
    }
}

pub fn clean_todo_content(content: &str) -> String {
    let without_marker = DONE_MARKER_RE.replace(content, "");
    let without_tags = COLUMN_TAG_RE.replace_all(&without_marker, "");
    CHECKBOX_RE.replace_all(&without_tags, "").trim().to_string()
}

/// Inverse of the done/column extraction. Other formatting is not preserved.
pub fn format_todo_content(content: &str, column: Column, done: bool) -> String {
    let prefix = if done { format!("{} ", DONE_GLYPH) } else { String::new() };
    format!("{}{} {}", prefix, content.trim(), column.tag())
}

pub fn parse_todo(note: &Note) -> TodoItem {
    TodoItem {
        id: note.id,
        content: clean_todo_content(&note.content),
        done: is_done(&note.content, note.is_archived),
        column: column_of(&note.content),
        created_at: note.created_at,
        updated_at: note.updated_at,
    }
}

/// Open items first, then most recently updated.
pub fn sort_todos(todos: &mut [TodoItem]) {
    todos.sort_by(|a, b| a.done.cmp(&b.done).then(b.updated_at.cmp(&a.updated_at)));
}

// ---------------------------------------------------------------------------
// Feed items
// ---------------------------------------------------------------------------

pub fn extract_url(content: &str) -> Option<&str> {
    URL_RE.find(content).map(|m| m.as_str())
}

/// Host comparison ignores ASCII case, matching how `Url` normalizes hosts.
pub fn rewrite_proxy_url(url: &str, proxy: &ProxyRewrite) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let same_host = parsed
        .host_str()
        .is_some_and(|host| host.eq_ignore_ascii_case(&proxy.host));
    if !same_host || parsed.port().is_some() {
        return url.to_string();
    }

    let Some(scheme_end) = url.find("://") else {
        return url.to_string();
    };
    let host_start = scheme_end + 3;
    let host_end = host_start + proxy.host.len();
    match url.get(host_start..host_end) {
        Some(host) if host.eq_ignore_ascii_case(&proxy.host) && !url[host_end..].starts_with(':') => {
            format!("{}:{}{}", &url[..host_end], proxy.port, &url[host_end..])
        }
        _ => url.to_string(),
    }
}

pub fn source_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.host_str()
                .map(|h| h.strip_prefix("www.").unwrap_or(h).to_string())
        })
        .unwrap_or_default()
}

/// Strips decoration from a single line so that only the headline text remains.
pub fn clean_title_line(line: &str) -> String {
    let s = EMOJI_RE.replace_all(line, "");
    let s = HASHTAG_RE.replace_all(&s, "");
    let s = URL_RE.replace_all(&s, "");
    let s = WHITESPACE_RE.replace_all(s.trim(), " ");
    let s = RT_PREFIX_RE.replace(&s, "");
    let s = CATEGORY_PREFIX_RE.replace(&s, "");
    let s = LABEL_PREFIX_RE.replace(&s, "");
    let s = SCORE_PREFIX_RE.replace(&s, "");
    let s = LEADING_PUNCT_RE.replace(&s, "");
    s.trim().to_string()
}

fn is_weak_title(title: &str) -> bool {
    title.chars().count() < TITLE_MIN_CHARS
        || title.eq_ignore_ascii_case("true")
        || title.eq_ignore_ascii_case("false")
}

fn english_summary_line(content: &str) -> Option<String> {
    lines(content)
        .find_map(|line| EN_LINE_RE.captures(line))
        .map(|caps| truncate_chars(&clean_title_line(&caps[1]), TITLE_MAX_CHARS))
        .filter(|t| !t.is_empty())
}

fn first_substantial_line(content: &str) -> Option<String> {
    lines(content)
        .filter(|l| !l.starts_with("http") && !l.starts_with('#'))
        .map(clean_title_line)
        .find(|t| t.chars().count() > TITLE_MIN_CHARS)
        .map(|t| truncate_chars(&t, TITLE_MAX_CHARS))
}

pub fn derive_title(content: &str, source: &str) -> String {
    let mut title = lines(content).next().map(clean_title_line).unwrap_or_default();

    if is_weak_title(&title) {
        if let Some(en) = english_summary_line(content) {
            title = en;
        }
    }

    if title.chars().count() < TITLE_FALLBACK_MIN_CHARS {
        if let Some(line) = first_substantial_line(content) {
            title = line;
        }
    }

    if title.chars().count() < TITLE_LAST_RESORT_MIN_CHARS {
        title = if source.is_empty() {
            UNTITLED.to_string()
        } else {
            source.to_string()
        };
    }

    title
}

pub fn extract_summary(content: &str) -> Option<String> {
    let summary = lines(content)
        .skip(1)
        .filter(|l| !l.starts_with("http") && !l.starts_with('#'))
        .collect::<Vec<_>>()
        .join(" ");
    let summary = summary.trim();
    (!summary.is_empty()).then(|| summary.to_string())
}

pub fn extract_score(content: &str) -> Option<u8> {
    SCORE_RE
        .captures(content)
        .and_then(|caps| caps[1].parse::<u8>().ok())
        .filter(|score| (1..=10).contains(score))
}

pub fn is_starred(content: &str, is_top: bool) -> bool {
    is_top || STAR_TAG_RE.is_match(content)
}

pub fn is_new(created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now - created_at < Duration::hours(24)
}

pub fn parse_rss_item(note: &Note, now: DateTime<Utc>, proxy: Option<&ProxyRewrite>) -> RssItem {
    let url = match (extract_url(&note.content), proxy) {
        (Some(url), Some(proxy)) => rewrite_proxy_url(url, proxy),
        (Some(url), None) => url.to_string(),
        (None, _) => String::new(),
    };
    let source = if url.is_empty() { String::new() } else { source_of(&url) };

    RssItem {
        id: note.id,
        title: derive_title(&note.content, &source),
        summary: extract_summary(&note.content),
        score: extract_score(&note.content),
        is_new: is_new(note.created_at, now),
        is_starred: is_starred(&note.content, note.is_top),
        published_at: note.created_at,
        url,
        source,
    }
}

fn rss_order(a: &RssItem, b: &RssItem) -> Ordering {
    b.is_starred
        .cmp(&a.is_starred)
        .then(b.score.unwrap_or(0).cmp(&a.score.unwrap_or(0)))
        .then(b.published_at.cmp(&a.published_at))
}

/// Starred first, then higher score, then newest.
pub fn sort_rss_items(items: &mut [RssItem]) {
    items.sort_by(rss_order);
}

/// Keeps notes whose text actually carries `#tag`; full-text search upstream is fuzzy.
pub fn has_tag(note: &Note, tag: &str) -> bool {
    note.content.contains(&format!("#{}", tag))
}

pub fn created_on(note: &Note, day: NaiveDate, tz: Tz) -> bool {
    note.created_at.with_timezone(&tz).date_naive() == day
}
