//! Fixed markup blocks and fragment text utilities.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::config::{ResourceConfig, UiConfig};

/// Loading placeholder shown while a fetch is in flight.
pub fn loading_placeholder(ui: &UiConfig) -> String {
    format!(
        "<p class=\"{}\">{}</p>",
        escape(ui.placeholder_class.as_str()),
        escape(ui.loading_text.as_str())
    )
}

/// Error block shown when a fragment is unavailable.
pub fn error_block(ui: &UiConfig, resources: &ResourceConfig) -> String {
    format!(
        concat!(
            "<div class=\"error-container\">",
            "<img src=\"{src}\" alt=\"{text}\">",
            "<div class=\"error-text\">{text}</div>",
            "</div>"
        ),
        src = escape(resources.error_image.as_str()),
        text = escape(ui.error_text.as_str()),
    )
}

/// Drop every whitespace-only line that is terminated by a line break.
///
/// A trailing whitespace-only line without a terminator is kept.
pub fn strip_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for line in text.split_inclusive('\n') {
        let terminated = line.ends_with('\n');
        if terminated && line.trim().is_empty() {
            continue;
        }
        out.push_str(line);
    }
    out
}

/// Counts of the elements the animation trigger acts on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FragmentOutline {
    /// `<section>` elements, at any depth.
    pub sections: usize,
    /// Elements carrying the cheer placeholder class.
    pub cheer_placeholders: usize,
}

/// Scan rendered markup for sections and cheer placeholders.
///
/// Scanning stops quietly at the first token the tokenizer rejects; whatever
/// was counted up to that point is returned.
pub fn outline(html: &str, cheer_class: &str) -> FragmentOutline {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;
    let mut found = FragmentOutline::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"section") {
                    found.sections += 1;
                }
                if has_class(&e, cheer_class) {
                    found.cheer_placeholders += 1;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                log::debug!("outline scan stopped: {}", err);
                break;
            }
        }
    }

    found
}

/// Replace the content of every element carrying `class` with `replacement`.
///
/// Self-closing placeholders are expanded into an open/close pair. Returns
/// the new markup and the number of placeholders filled. Markup after a
/// token the tokenizer rejects is copied unchanged.
pub fn fill_placeholders(html: &str, class: &str, replacement: &str) -> (String, usize) {
    let mut out = String::with_capacity(html.len() + replacement.len());
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;
    let mut last = 0usize;
    let mut filled = 0usize;
    // Open elements inside the placeholder being replaced.
    let mut skipping = 0usize;

    loop {
        let event = reader.read_event();
        let end = usize::try_from(reader.buffer_position())
            .unwrap_or(usize::MAX)
            .min(html.len());
        let Some(span) = html.get(last..end) else {
            break;
        };
        match event {
            Ok(Event::Start(e)) => {
                if skipping > 0 {
                    if !is_void(e.local_name().as_ref()) {
                        skipping += 1;
                    }
                } else if has_class(&e, class) {
                    out.push_str(span);
                    out.push_str(replacement);
                    filled += 1;
                    skipping = 1;
                } else {
                    out.push_str(span);
                }
            }
            Ok(Event::Empty(e)) => {
                if skipping == 0 && has_class(&e, class) {
                    let open = span.trim_end_matches('>').trim_end_matches('/').trim_end();
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    out.push_str(open);
                    out.push('>');
                    out.push_str(replacement);
                    out.push_str(&format!("</{}>", name));
                    filled += 1;
                } else if skipping == 0 {
                    out.push_str(span);
                }
            }
            Ok(Event::End(_)) => {
                if skipping > 1 {
                    skipping -= 1;
                } else {
                    skipping = 0;
                    out.push_str(span);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {
                if skipping == 0 {
                    out.push_str(span);
                }
            }
            Err(err) => {
                log::debug!("placeholder scan stopped at byte {}: {}", last, err);
                break;
            }
        }
        last = end;
    }

    out.push_str(&html[last..]);
    (out, filled)
}

const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"source", b"track", b"wbr",
];

/// HTML elements that never have an end tag.
pub(crate) fn is_void(name: &[u8]) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(name))
}

fn has_class(start: &BytesStart<'_>, class: &str) -> bool {
    if class.is_empty() {
        return false;
    }
    start.attributes().flatten().any(|attr| {
        attr.key.as_ref().eq_ignore_ascii_case(b"class")
            && std::str::from_utf8(&attr.value)
                .is_ok_and(|v| v.split_ascii_whitespace().any(|c| c == class))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_uses_configured_text() {
        let ui = UiConfig::default();
        assert_eq!(
            loading_placeholder(&ui),
            "<p class=\"placeholder-text\">載入中...</p>"
        );
    }

    #[test]
    fn error_block_carries_image_and_text() {
        let block = error_block(&UiConfig::default(), &ResourceConfig::default());
        assert!(block.contains("<img src=\"Emoji/NO SOURCE.png\" alt=\"找不到檔案\">"));
        assert!(block.contains("<div class=\"error-text\">找不到檔案</div>"));
    }

    #[test]
    fn error_block_escapes_configured_strings() {
        let mut ui = UiConfig::default();
        ui.error_text = "<gone> & \"lost\"".to_string();
        let block = error_block(&ui, &ResourceConfig::default());
        assert!(block.contains("&lt;gone&gt; &amp; &quot;lost&quot;"));
    }

    #[test]
    fn strip_blank_lines_removes_whitespace_only_lines() {
        let text = "\n  \n<p>a</p>\r\n\t\r\n<p>b</p>\n   ";
        assert_eq!(strip_blank_lines(text), "<p>a</p>\r\n<p>b</p>\n   ");
    }

    #[test]
    fn strip_blank_lines_keeps_indented_content() {
        let text = "  <p>a</p>\n";
        assert_eq!(strip_blank_lines(text), text);
    }

    #[test]
    fn outline_counts_sections_and_cheers() {
        let html = r#"<section><p>a <span class="x cheer-animate"></span></p></section>
<section><section></section><span class="cheer-animate"/></section><p class="cheer-animated"></p>"#;
        let found = outline(html, "cheer-animate");
        assert_eq!(
            found,
            FragmentOutline {
                sections: 3,
                cheer_placeholders: 2,
            }
        );
    }

    #[test]
    fn fill_placeholders_replaces_content() {
        let html = r#"<p>go <span class="cheer-animate">old <b>x</b></span> and <i class="cheer-animate"/>!</p>"#;
        let (out, n) = fill_placeholders(html, "cheer-animate", "<img>");
        assert_eq!(n, 2);
        assert_eq!(
            out,
            r#"<p>go <span class="cheer-animate"><img></span> and <i class="cheer-animate"><img></i>!</p>"#
        );
    }

    #[test]
    fn void_elements_inside_a_placeholder_do_not_swallow_the_rest() {
        let html = r#"<span class="cheer-animate"><img src="x.png"></span><p>after</p>"#;
        let (out, n) = fill_placeholders(html, "cheer-animate", "<b>!</b>");
        assert_eq!(n, 1);
        assert_eq!(out, r#"<span class="cheer-animate"><b>!</b></span><p>after</p>"#);
    }

    #[test]
    fn fill_placeholders_without_matches_is_identity() {
        let html = "<section><p>涅波</p></section>";
        assert_eq!(fill_placeholders(html, "cheer-animate", "<img>"), (html.to_string(), 0));
    }

    #[test]
    fn outline_of_plain_text_is_empty() {
        assert_eq!(outline("just text", "cheer-animate"), FragmentOutline::default());
    }
}
