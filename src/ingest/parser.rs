// src/ingest/parser.rs
//! Tolerant feed extraction.
//!
//! Feeds in the wild are rarely well-formed XML, so items are located with
//! case-insensitive block patterns and every field is pulled out by an ordered
//! list of strategies. Each strategy returns `Option<String>`; the first hit
//! wins and a miss on one field never affects the others.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use metrics::histogram;
use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

use crate::error::{IngestError, Result};
use crate::ingest::types::FeedItem;

/// One way of pulling a raw field value out of an item block.
type Strategy = fn(&str) -> Option<String>;

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static feed pattern")
}

static RE_RSS_ITEM: Lazy<Regex> = Lazy::new(|| re(r"(?is)<item\b[^>]*>(.*?)</item>"));
static RE_ATOM_ENTRY: Lazy<Regex> = Lazy::new(|| re(r"(?is)<entry\b[^>]*>(.*?)</entry>"));

static RE_TITLE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<title\b[^>]*>(.*?)</title>"));
static RE_LINK_TEXT: Lazy<Regex> = Lazy::new(|| re(r"(?is)<link(?:\s[^>]*)?>(.*?)</link>"));
static RE_LINK_TAG: Lazy<Regex> = Lazy::new(|| re(r"(?is)<link\b[^>]*>"));
static RE_GUID: Lazy<Regex> = Lazy::new(|| re(r"(?is)<guid\b[^>]*>(.*?)</guid>"));
static RE_DESCRIPTION: Lazy<Regex> =
    Lazy::new(|| re(r"(?is)<description\b[^>]*>(.*?)</description>"));
static RE_CONTENT_ENCODED: Lazy<Regex> =
    Lazy::new(|| re(r"(?is)<content:encoded\b[^>]*>(.*?)</content:encoded>"));
static RE_SUMMARY: Lazy<Regex> = Lazy::new(|| re(r"(?is)<summary\b[^>]*>(.*?)</summary>"));
static RE_ATOM_CONTENT: Lazy<Regex> =
    Lazy::new(|| re(r"(?is)<content(?:\s[^>]*)?>(.*?)</content>"));
static RE_PUB_DATE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<pubDate\b[^>]*>(.*?)</pubDate>"));
static RE_DC_DATE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<dc:date\b[^>]*>(.*?)</dc:date>"));
static RE_PUBLISHED: Lazy<Regex> =
    Lazy::new(|| re(r"(?is)<published\b[^>]*>(.*?)</published>"));
static RE_UPDATED: Lazy<Regex> = Lazy::new(|| re(r"(?is)<updated\b[^>]*>(.*?)</updated>"));

static RE_ENCLOSURE: Lazy<Regex> = Lazy::new(|| re(r"(?is)<enclosure\b[^>]*>"));
static RE_MEDIA_CONTENT: Lazy<Regex> = Lazy::new(|| re(r"(?is)<media:content\b[^>]*>"));
static RE_MEDIA_THUMBNAIL: Lazy<Regex> = Lazy::new(|| re(r"(?is)<media:thumbnail\b[^>]*>"));
static RE_IMG_SRC: Lazy<Regex> =
    Lazy::new(|| re(r#"(?is)<img\b[^>]*?\ssrc\s*=\s*["']([^"'>]+)["']"#));
static RE_SRC_ATTR: Lazy<Regex> = Lazy::new(|| re(r#"(?i)\bsrc\s*=\s*["']([^"']+)["']"#));
static RE_BARE_IMAGE: Lazy<Regex> =
    Lazy::new(|| re(r#"(?i)https?://[^\s"'<>]+\.(?:jpe?g|png|webp|gif)"#));

static RE_TAGS: Lazy<Regex> = Lazy::new(|| re(r"(?is)</?[^>]+>"));
static RE_WS: Lazy<Regex> = Lazy::new(|| re(r"\s+"));

const RSS_TITLE: &[Strategy] = &[title_text];
const RSS_LINK: &[Strategy] = &[link_text, link_href, guid_permalink];
const RSS_DESCRIPTION: &[Strategy] = &[description_text, content_encoded_text];
const RSS_DATE: &[Strategy] = &[pub_date_text, dc_date_text];

const ATOM_TITLE: &[Strategy] = &[title_text];
const ATOM_LINK: &[Strategy] = &[link_href, link_text];
const ATOM_DESCRIPTION: &[Strategy] = &[summary_text, atom_content_text];
const ATOM_DATE: &[Strategy] = &[published_text, updated_text];

/// Structured fields first, brute-force URL scan last.
const IMAGE_CHAIN: &[Strategy] = &[
    enclosure_url,
    media_content_url,
    inline_img_src,
    escaped_description_img,
    bare_image_url,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockFormat {
    Rss,
    Atom,
}

impl BlockFormat {
    fn title(self) -> &'static [Strategy] {
        match self {
            BlockFormat::Rss => RSS_TITLE,
            BlockFormat::Atom => ATOM_TITLE,
        }
    }
    fn link(self) -> &'static [Strategy] {
        match self {
            BlockFormat::Rss => RSS_LINK,
            BlockFormat::Atom => ATOM_LINK,
        }
    }
    fn description(self) -> &'static [Strategy] {
        match self {
            BlockFormat::Rss => RSS_DESCRIPTION,
            BlockFormat::Atom => ATOM_DESCRIPTION,
        }
    }
    fn date(self) -> &'static [Strategy] {
        match self {
            BlockFormat::Rss => RSS_DATE,
            BlockFormat::Atom => ATOM_DATE,
        }
    }
}

/// Parse a fetched document into feed items.
///
/// RSS `<item>` blocks are tried first; Atom `<entry>` blocks only when no RSS
/// item survived. Items without a title or link are dropped. A document with
/// neither kind of block is a [`IngestError::Parse`].
pub fn parse_feed(xml: &str, max_description_len: usize) -> Result<Vec<FeedItem>> {
    let t0 = std::time::Instant::now();

    let rss_blocks: Vec<&str> = blocks(&RE_RSS_ITEM, xml);
    let mut items = parse_blocks(&rss_blocks, BlockFormat::Rss, max_description_len);

    let mut saw_blocks = !rss_blocks.is_empty();
    if items.is_empty() {
        let atom_blocks = blocks(&RE_ATOM_ENTRY, xml);
        saw_blocks |= !atom_blocks.is_empty();
        items = parse_blocks(&atom_blocks, BlockFormat::Atom, max_description_len);
    }

    let ms = t0.elapsed().as_secs_f64() * 1_000.0;
    histogram!("ingest_parse_ms").record(ms);

    if !saw_blocks {
        return Err(IngestError::Parse(
            "no <item> or <entry> blocks found".to_string(),
        ));
    }
    Ok(items)
}

fn blocks<'a>(re: &Regex, xml: &'a str) -> Vec<&'a str> {
    re.captures_iter(xml)
        .filter_map(|c| c.get(1).map(|m| m.as_str()))
        .collect()
}

fn parse_blocks(
    blocks: &[&str],
    format: BlockFormat,
    max_description_len: usize,
) -> Vec<FeedItem> {
    blocks
        .iter()
        .filter_map(|b| parse_block(b, format, max_description_len))
        .collect()
}

fn parse_block(
    block: &str,
    format: BlockFormat,
    max_description_len: usize,
) -> Option<FeedItem> {
    let title = first_match(block, format.title())
        .map(|t| clean_text(&t, usize::MAX))
        .unwrap_or_default();
    let link = first_match(block, format.link())
        .map(|l| decode_entities(&l))
        .unwrap_or_default();
    if title.is_empty() || link.is_empty() {
        return None;
    }

    let description = first_match(block, format.description())
        .map(|d| clean_text(&d, max_description_len))
        .unwrap_or_default();
    let published_raw = first_match(block, format.date());
    let published_at = published_raw.as_deref().and_then(parse_date);
    let image = first_match(block, IMAGE_CHAIN);

    Some(FeedItem {
        title,
        link,
        description,
        published_raw,
        published_at,
        image,
    })
}

fn first_match(block: &str, strategies: &[Strategy]) -> Option<String> {
    strategies.iter().find_map(|s| s(block))
}

// --- field strategies ---

fn inner_text(block: &str, re: &Regex) -> Option<String> {
    let raw = re.captures(block)?.get(1)?.as_str();
    non_empty(strip_cdata(raw).trim())
}

fn title_text(block: &str) -> Option<String> {
    inner_text(block, &RE_TITLE)
}

fn link_text(block: &str) -> Option<String> {
    // A match spanning other markup means the tag was self-closing.
    inner_text(block, &RE_LINK_TEXT).filter(|l| !l.contains('<'))
}

fn link_href(block: &str) -> Option<String> {
    let mut fallback = None;
    for tag in RE_LINK_TAG.find_iter(block) {
        let Some(href) = tag_attribute(tag.as_str(), "href") else {
            continue;
        };
        match tag_attribute(tag.as_str(), "rel").as_deref() {
            None | Some("alternate") => return Some(href),
            _ => {
                fallback.get_or_insert(href);
            }
        }
    }
    fallback
}

fn guid_permalink(block: &str) -> Option<String> {
    inner_text(block, &RE_GUID).filter(|g| g.starts_with("http://") || g.starts_with("https://"))
}

fn description_text(block: &str) -> Option<String> {
    inner_text(block, &RE_DESCRIPTION)
}

fn content_encoded_text(block: &str) -> Option<String> {
    inner_text(block, &RE_CONTENT_ENCODED)
}

fn summary_text(block: &str) -> Option<String> {
    inner_text(block, &RE_SUMMARY)
}

fn atom_content_text(block: &str) -> Option<String> {
    inner_text(block, &RE_ATOM_CONTENT)
}

fn pub_date_text(block: &str) -> Option<String> {
    inner_text(block, &RE_PUB_DATE)
}

fn dc_date_text(block: &str) -> Option<String> {
    inner_text(block, &RE_DC_DATE)
}

fn published_text(block: &str) -> Option<String> {
    inner_text(block, &RE_PUBLISHED)
}

fn updated_text(block: &str) -> Option<String> {
    inner_text(block, &RE_UPDATED)
}

// --- image strategies ---

fn enclosure_url(block: &str) -> Option<String> {
    RE_ENCLOSURE.find_iter(block).find_map(|tag| {
        let tag = tag.as_str();
        let is_image = tag_attribute(tag, "type")
            .map(|t| t.to_ascii_lowercase().starts_with("image/"))
            .unwrap_or(true);
        if is_image {
            tag_attribute(tag, "url")
        } else {
            None
        }
    })
}

fn media_content_url(block: &str) -> Option<String> {
    RE_MEDIA_CONTENT
        .find_iter(block)
        .chain(RE_MEDIA_THUMBNAIL.find_iter(block))
        .find_map(|tag| tag_attribute(tag.as_str(), "url"))
}

fn inline_img_src(block: &str) -> Option<String> {
    let src = RE_IMG_SRC.captures(block)?.get(1)?.as_str();
    non_empty(decode_entities(src).trim())
}

fn escaped_description_img(block: &str) -> Option<String> {
    let raw = RE_DESCRIPTION.captures(block)?.get(1)?.as_str();
    let decoded = decode_entities(strip_cdata(raw).as_str());
    let src = RE_SRC_ATTR.captures(&decoded)?.get(1)?.as_str();
    non_empty(src.trim())
}

fn bare_image_url(block: &str) -> Option<String> {
    let found = RE_BARE_IMAGE.find(block)?.as_str();
    non_empty(&decode_entities(found))
}

/// Read one attribute off a single start or empty tag.
fn tag_attribute(tag: &str, name: &str) -> Option<String> {
    let mut reader = Reader::from_str(tag);
    match reader.read_event() {
        Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
            let attr = e.try_get_attribute(name).ok()??;
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            non_empty(value.trim())
        }
        _ => None,
    }
}

// --- dates ---

/// Best-effort publish date parsing. `None` means the caller substitutes the
/// ingestion instant.
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(dt) = OffsetDateTime::parse(s, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
        .ok()
    {
        return DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%d/%m/%Y %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|n| n.and_utc())
}

// --- text helpers ---

fn strip_cdata(s: &str) -> String {
    s.replace("<![CDATA[", "").replace("]]>", "")
}

fn decode_entities(s: &str) -> String {
    html_escape::decode_html_entities(s).trim().to_string()
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Decode entities, strip markup, collapse whitespace and cap at `max_chars`.
pub fn clean_text(s: &str, max_chars: usize) -> String {
    let decoded = html_escape::decode_html_entities(&strip_cdata(s)).to_string();
    let stripped = RE_TAGS.replace_all(&decoded, " ");
    let collapsed = RE_WS.replace_all(&stripped, " ");
    truncate_chars(collapsed.trim(), max_chars)
}

/// Char-boundary safe truncation.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
