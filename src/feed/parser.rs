use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt;

use super::FetchError;
use crate::util::unescape_html;

/// A decoded RSS document: the channel header and its items in document
/// order. All fields are raw strings; `pub_date` is never parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssFeed {
    pub title: String,
    pub link: String,
    pub description: String,
    pub items: Vec<RssItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RssItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub pub_date: String,
}

impl RssFeed {
    /// Decodes HTML entities left in every text field after XML decoding.
    fn unescape(&mut self) {
        unescape_in_place(&mut self.title);
        unescape_in_place(&mut self.link);
        unescape_in_place(&mut self.description);
        for item in &mut self.items {
            unescape_in_place(&mut item.title);
            unescape_in_place(&mut item.link);
            unescape_in_place(&mut item.description);
            unescape_in_place(&mut item.pub_date);
        }
    }
}

fn unescape_in_place(field: &mut String) {
    if let std::borrow::Cow::Owned(decoded) = unescape_html(field) {
        *field = decoded;
    }
}

impl fmt::Display for RssFeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Title:       {}", self.title)?;
        writeln!(f, "Link:        {}", self.link)?;
        writeln!(f, "Description: {}", self.description)?;
        writeln!(f, "Items:       {}", self.items.len())?;
        for item in &self.items {
            writeln!(f)?;
            write!(f, "{}", item)?;
        }
        Ok(())
    }
}

impl fmt::Display for RssItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "* {}", self.title)?;
        writeln!(f, "  Link:      {}", self.link)?;
        writeln!(f, "  Published: {}", self.pub_date)?;
        writeln!(f, "  {}", self.description)
    }
}

/// Which text field an open element feeds, if any.
#[derive(Clone, Copy)]
enum Slot {
    ChannelTitle,
    ChannelLink,
    ChannelDescription,
    ItemTitle,
    ItemLink,
    ItemDescription,
    ItemPubDate,
}

/// Maps an element path (below the root) to a field.
///
/// Only exact, unprefixed names match, so `atom:link` inside a channel is
/// ignored rather than overwriting the channel link.
fn slot_for(path: &[Vec<u8>]) -> Option<Slot> {
    let names: Vec<&[u8]> = path.iter().map(Vec::as_slice).collect();
    match names.as_slice() {
        [b"channel", b"title"] => Some(Slot::ChannelTitle),
        [b"channel", b"link"] => Some(Slot::ChannelLink),
        [b"channel", b"description"] => Some(Slot::ChannelDescription),
        [b"channel", b"item", b"title"] => Some(Slot::ItemTitle),
        [b"channel", b"item", b"link"] => Some(Slot::ItemLink),
        [b"channel", b"item", b"description"] => Some(Slot::ItemDescription),
        [b"channel", b"item", b"pubDate"] => Some(Slot::ItemPubDate),
        _ => None,
    }
}

fn is_item_path(path: &[Vec<u8>]) -> bool {
    path.len() == 2 && path[0] == b"channel" && path[1] == b"item"
}

fn store(feed: &mut RssFeed, item: Option<&mut RssItem>, slot: Slot, value: String) {
    match slot {
        Slot::ChannelTitle => feed.title = value,
        Slot::ChannelLink => feed.link = value,
        Slot::ChannelDescription => feed.description = value,
        item_slot => {
            if let Some(item) = item {
                match item_slot {
                    Slot::ItemTitle => item.title = value,
                    Slot::ItemLink => item.link = value,
                    Slot::ItemDescription => item.description = value,
                    Slot::ItemPubDate => item.pub_date = value,
                    _ => {}
                }
            }
        }
    }
}

/// Parses an RSS 2.0 document.
///
/// The root element's name is not checked; its `<channel>` child supplies
/// the header and items. Unknown elements are skipped. A field keeps its own
/// character data; markup nested inside it (`<b>`, `<i>`, ...) is skipped
/// without discarding the text around it. Text and CDATA are both accepted,
/// and HTML entities are decoded in every field.
///
/// # Errors
///
/// Returns [`FetchError::Decode`] for any XML syntax error, a mismatched or
/// missing end tag, or a document with no root element. Nothing is
/// returned from a partially decoded document.
pub fn parse_feed(bytes: &[u8]) -> Result<RssFeed, FetchError> {
    let mut reader = Reader::from_reader(bytes);

    let mut feed = RssFeed::default();
    let mut current_item: Option<RssItem> = None;
    // Open elements below the root, outermost first
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut depth: usize = 0;
    let mut seen_root = false;
    // Field being collected and the path length of its element
    let mut open_slot: Option<(Slot, usize)> = None;
    let mut text = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                if depth == 0 {
                    if seen_root {
                        return Err(FetchError::Decode(
                            "multiple root elements".to_string(),
                        ));
                    }
                    seen_root = true;
                } else {
                    path.push(e.name().as_ref().to_vec());
                    if is_item_path(&path) {
                        current_item = Some(RssItem::default());
                    } else if open_slot.is_none() {
                        if let Some(slot) = slot_for(&path) {
                            open_slot = Some((slot, path.len()));
                            text.clear();
                        }
                    }
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                if depth == 0 {
                    // A self-closing root is a valid, empty document
                    seen_root = true;
                } else {
                    path.push(e.name().as_ref().to_vec());
                    if is_item_path(&path) {
                        feed.items.push(RssItem::default());
                    }
                    path.pop();
                }
            }
            Ok(Event::Text(e)) => {
                if matches!(open_slot, Some((_, len)) if len == path.len()) {
                    let decoded = e
                        .unescape_with(resolve_html5_entity)
                        .map_err(|e| FetchError::Decode(e.to_string()))?;
                    text.push_str(&decoded);
                }
            }
            Ok(Event::CData(e)) => {
                if matches!(open_slot, Some((_, len)) if len == path.len()) {
                    let raw = std::str::from_utf8(&e).map_err(|e| {
                        FetchError::Decode(format!("invalid UTF-8 in CDATA: {}", e))
                    })?;
                    text.push_str(raw);
                }
            }
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                match open_slot {
                    Some((slot, len)) if len == path.len() => {
                        let value = text.trim().to_string();
                        text.clear();
                        store(&mut feed, current_item.as_mut(), slot, value);
                        open_slot = None;
                    }
                    // End of markup nested inside a field
                    Some(_) => {}
                    None => {
                        if is_item_path(&path) {
                            if let Some(item) = current_item.take() {
                                feed.items.push(item);
                            }
                        }
                    }
                }
                if depth > 0 {
                    path.pop();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FetchError::Decode(e.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(FetchError::Decode("document has no root element".to_string()));
    }
    if depth > 0 {
        return Err(FetchError::Decode(
            "unexpected end of document: unclosed element".to_string(),
        ));
    }

    feed.unescape();
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:atom="http://www.w3.org/2005/Atom">
  <channel>
    <title>Hacker News</title>
    <link>https://news.ycombinator.com/</link>
    <atom:link href="https://news.ycombinator.com/rss" rel="self" type="application/rss+xml"/>
    <description>Links for the intellectually curious, ranked by readers.</description>
    <item>
      <title>First &amp;amp; Foremost</title>
      <link>https://example.com/1</link>
      <pubDate>Mon, 06 Jan 2025 12:00:00 +0000</pubDate>
      <description><![CDATA[<p>Caf&eacute; review</p>]]></description>
      <comments>https://news.ycombinator.com/item?id=1</comments>
    </item>
    <item>
      <title>Second</title>
      <link>https://example.com/2</link>
      <pubDate>not a date</pubDate>
      <description>It&#8217;s here</description>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_channel_and_items() {
        let feed = parse_feed(SAMPLE_RSS.as_bytes()).unwrap();

        assert_eq!(feed.title, "Hacker News");
        assert_eq!(feed.link, "https://news.ycombinator.com/");
        assert_eq!(
            feed.description,
            "Links for the intellectually curious, ranked by readers."
        );
        assert_eq!(feed.items.len(), 2);

        let first = &feed.items[0];
        assert_eq!(first.title, "First & Foremost");
        assert_eq!(first.link, "https://example.com/1");
        assert_eq!(first.pub_date, "Mon, 06 Jan 2025 12:00:00 +0000");
        assert_eq!(first.description, "<p>Caf\u{e9} review</p>");

        let second = &feed.items[1];
        assert_eq!(second.title, "Second");
        assert_eq!(second.pub_date, "not a date");
        assert_eq!(second.description, "It\u{2019}s here");
    }

    #[test]
    fn test_atom_link_does_not_override_channel_link() {
        let feed = parse_feed(SAMPLE_RSS.as_bytes()).unwrap();
        assert_eq!(feed.link, "https://news.ycombinator.com/");
    }

    #[test]
    fn test_empty_channel() {
        let xml = r#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(feed, RssFeed::default());
    }

    #[test]
    fn test_items_after_other_elements_keep_order() {
        let xml = r#"<rss><channel>
            <item><title>A</title></item>
            <language>en</language>
            <item><title>B</title></item>
            <item/>
        </channel></rss>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();
        let titles: Vec<&str> = feed.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "B", ""]);
    }

    #[test]
    fn test_nested_item_fields_outside_channel_ignored() {
        let xml = r#"<rss><title>root title</title><channel><title>T</title></channel></rss>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();
        assert_eq!(feed.title, "T");
    }

    #[test]
    fn test_malformed_xml_is_decode_error() {
        let err = parse_feed(b"<not valid xml").unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)), "{:?}", err);
    }

    #[test]
    fn test_mismatched_end_tag_is_decode_error() {
        let xml = "<rss><channel><title>x</channel></rss>";
        assert!(matches!(
            parse_feed(xml.as_bytes()),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_truncated_document_is_decode_error() {
        let xml = "<rss><channel><item><title>cut off";
        assert!(matches!(
            parse_feed(xml.as_bytes()),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_empty_body_is_decode_error() {
        assert!(matches!(parse_feed(b""), Err(FetchError::Decode(_))));
        assert!(matches!(
            parse_feed(b"just some text"),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn test_nested_markup_keeps_surrounding_text() {
        let xml = r#"<rss><channel>
            <title>Lead <i>x</i> tail</title>
            <item><description>Hello <b>world</b></description></item>
        </channel></rss>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();

        assert_eq!(feed.title, "Lead  tail");
        assert_eq!(feed.items[0].description, "Hello");
    }

    #[test]
    fn test_nested_markup_does_not_leak_into_other_fields() {
        let xml = r#"<rss><channel>
            <item><title>T<b><title>inner</title></b></title><link>L</link></item>
        </channel></rss>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();

        assert_eq!(feed.items[0].title, "T");
        assert_eq!(feed.items[0].link, "L");
    }

    #[test]
    fn test_link_and_pub_date_are_unescaped() {
        let xml = r#"<rss><channel>
            <link>https://example.com/?a=1&amp;amp;b=2</link>
            <item>
              <link>https://example.com/post?x=1&amp;amp;y=2</link>
              <pubDate>Mon,&amp;#32;06 Jan 2025</pubDate>
            </item>
        </channel></rss>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();

        assert_eq!(feed.link, "https://example.com/?a=1&b=2");
        assert_eq!(feed.items[0].link, "https://example.com/post?x=1&y=2");
        assert_eq!(feed.items[0].pub_date, "Mon, 06 Jan 2025");
    }

    #[test]
    fn test_display_lists_items() {
        let feed = parse_feed(SAMPLE_RSS.as_bytes()).unwrap();
        let rendered = feed.to_string();
        assert!(rendered.contains("Title:       Hacker News"));
        assert!(rendered.contains("* First & Foremost"));
        assert!(rendered.contains("* Second"));
    }
}
