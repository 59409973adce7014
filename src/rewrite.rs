//! Resource-path rewriting for fetched fragments.
//!
//! Fragments are authored one directory below the page that hosts them, so
//! `src`/`href` values pointing into the top-level asset directories (and the
//! shared stylesheet) need a parent marker prepended. Only quoted `src`/`href`
//! attribute values inside tags are touched; comments, text content and every
//! other attribute pass through byte-for-byte.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::config::ResourceConfig;

/// Single-pass `src`/`href` rewriter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceRewriter {
    prefixes: Vec<String>,
    stylesheet: String,
    marker: String,
}

impl ResourceRewriter {
    pub fn new(
        prefixes: impl IntoIterator<Item = impl Into<String>>,
        stylesheet: impl Into<String>,
        marker: impl Into<String>,
    ) -> Self {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
            stylesheet: stylesheet.into(),
            marker: marker.into(),
        }
    }

    pub fn from_config(cfg: &ResourceConfig) -> Self {
        Self::new(
            cfg.path_prefixes.iter().cloned(),
            cfg.stylesheet.clone(),
            cfg.parent_marker.clone(),
        )
    }

    /// Rewrite every matching attribute value once.
    pub fn rewrite(&self, html: &str) -> String {
        self.rewrite_counted(html).0
    }

    /// Like [`Self::rewrite`], also returning how many values were prefixed.
    pub fn rewrite_counted(&self, html: &str) -> (String, usize) {
        let mut out = String::with_capacity(html.len() + 64);
        let mut count = 0usize;
        let mut reader = Reader::from_str(html);
        reader.config_mut().check_end_names = false;
        let mut last = 0usize;

        loop {
            let event = reader.read_event();
            let end = reader_offset(&reader).min(html.len());
            let Some(span) = html.get(last..end) else {
                count += self.rewrite_lenient(&html[last..], &mut out);
                return (out, count);
            };
            match event {
                Ok(Event::Start(_)) | Ok(Event::Empty(_)) => {
                    count += self.rewrite_tag(span, &mut out);
                }
                Ok(Event::Eof) => {
                    out.push_str(span);
                    last = end;
                    break;
                }
                Ok(_) => out.push_str(span),
                Err(err) => {
                    log::debug!(
                        "fragment tokenizer stopped at byte {} ({}); scanning remainder",
                        last,
                        err
                    );
                    count += self.rewrite_lenient(&html[last..], &mut out);
                    return (out, count);
                }
            }
            last = end;
        }

        out.push_str(&html[last..]);
        (out, count)
    }

    /// Whether an attribute value should get the parent marker.
    fn needs_marker(&self, value: &str) -> bool {
        if !self.stylesheet.is_empty() && value.starts_with(self.stylesheet.as_str()) {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            value
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// Rewrite the attributes of one complete tag (`<name ...>`).
    fn rewrite_tag(&self, tag: &str, out: &mut String) -> usize {
        let inserts = self.tag_insert_points(tag.as_bytes(), tag);
        splice_markers(tag, &inserts, &self.marker, out);
        inserts.len()
    }

    fn tag_insert_points(&self, bytes: &[u8], tag: &str) -> Vec<usize> {
        let mut inserts = Vec::new();
        let mut i = 1usize;
        // Element name.
        while i < bytes.len() && !is_tag_separator(bytes[i]) {
            i += 1;
        }
        while i < bytes.len() {
            while i < bytes.len() && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
                i += 1;
            }
            if i >= bytes.len() || bytes[i] == b'>' {
                break;
            }
            let name_start = i;
            while i < bytes.len() && !is_tag_separator(bytes[i]) && bytes[i] != b'=' {
                i += 1;
            }
            let name = &bytes[name_start..i];
            let name_end = i;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i >= bytes.len() || bytes[i] != b'=' {
                continue;
            }
            // Only the literal `src="…"` form counts; `src = "…"` is left alone.
            let mut spaced = i != name_end;
            i += 1;
            let value_at = i;
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            spaced |= i != value_at;
            if i >= bytes.len() {
                break;
            }
            let quote = bytes[i];
            if quote == b'"' || quote == b'\'' {
                let value_start = i + 1;
                let value_end = bytes[value_start..]
                    .iter()
                    .position(|b| *b == quote)
                    .map_or(bytes.len(), |p| value_start + p);
                if !spaced
                    && is_resource_attr(name)
                    && self.needs_marker(&tag[value_start..value_end])
                {
                    inserts.push(value_start);
                }
                i = (value_end + 1).min(bytes.len());
            } else {
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
            }
        }
        inserts
    }

    /// Attribute-anchored pattern scan for input the tokenizer rejects.
    fn rewrite_lenient(&self, html: &str, out: &mut String) -> usize {
        let bytes = html.as_bytes();
        let mut inserts = Vec::new();
        let mut i = 0usize;
        while i < bytes.len() {
            let name_len = if bytes[i..].starts_with(b"src=") {
                3
            } else if bytes[i..].starts_with(b"href=") {
                4
            } else {
                i += 1;
                continue;
            };
            let at_boundary = i == 0 || bytes[i - 1].is_ascii_whitespace();
            let quote_at = i + name_len + 1;
            match bytes.get(quote_at) {
                Some(b'"') | Some(b'\'') if at_boundary => {
                    let value_start = quote_at + 1;
                    if html
                        .get(value_start..)
                        .is_some_and(|rest| self.needs_marker(rest))
                    {
                        inserts.push(value_start);
                    }
                    i = value_start;
                }
                _ => i += name_len,
            }
        }
        splice_markers(html, &inserts, &self.marker, out);
        inserts.len()
    }
}

impl Default for ResourceRewriter {
    fn default() -> Self {
        Self::from_config(&ResourceConfig::default())
    }
}

fn reader_offset(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn is_tag_separator(b: u8) -> bool {
    b.is_ascii_whitespace() || b == b'/' || b == b'>'
}

fn is_resource_attr(name: &[u8]) -> bool {
    name == b"src" || name == b"href"
}

/// Copy `text` into `out`, inserting `marker` before each (ascending) offset.
fn splice_markers(text: &str, inserts: &[usize], marker: &str, out: &mut String) {
    let mut last = 0usize;
    for &at in inserts {
        out.push_str(&text[last..at]);
        out.push_str(marker);
        last = at;
    }
    out.push_str(&text[last..]);
}
