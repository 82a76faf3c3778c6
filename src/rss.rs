//! RSS 2.0 serialisation with the iTunes podcast extension.
//!
//! Produces the `<rss xmlns:itunes=...>` document podcast clients expect:
//! a channel with `<image>` and `<itunes:image>`, and items carrying an
//! `<enclosure>`, `<itunes:duration>` and `<itunes:image>`.

use anyhow::Context;
use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::models::{Feed, FeedImage, FeedItem};

pub const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const RSS_DOCS: &str = "http://blogs.law.harvard.edu/tech/rss";

type XmlWriter = Writer<Vec<u8>>;

/// Renders `feed` as an XML document.
pub fn to_xml(feed: &Feed) -> Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    write_document(&mut writer, feed).map_err(|e| Error::Xml(format!("{:#}", e)))?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Xml(e.to_string()))
}

/// Writes `feed` to `path` when it has at least one item. An empty feed
/// leaves any existing file untouched. Returns whether a file was written.
pub fn write_feed(feed: &Feed, path: &Path) -> Result<bool> {
    if feed.items.is_empty() {
        debug!("no items, not writing {}", path.display());
        return Ok(false);
    }
    let xml = to_xml(feed)?;
    std::fs::write(path, xml)?;
    info!(items = feed.items.len(), "wrote {}", path.display());
    Ok(true)
}

/// RFC 822 date as used by RSS 2.0.
pub fn rfc822(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn write_document(w: &mut XmlWriter, feed: &Feed) -> anyhow::Result<()> {
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("xmlns:itunes", ITUNES_NS));
    rss.push_attribute(("version", "2.0"));
    w.write_event(Event::Start(rss))?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;

    text_element(w, "title", &feed.title)?;
    text_element(w, "link", &feed.link)?;
    text_element(w, "description", &feed.description)?;
    text_element(w, "language", &feed.language)?;
    if let Some(image) = &feed.image {
        write_image(w, image)?;
    }
    text_element(w, "lastBuildDate", &rfc822(&feed.last_build_date))?;
    text_element(w, "generator", &feed.generator)?;
    text_element(w, "docs", RSS_DOCS)?;
    if let Some(image) = &feed.image {
        itunes_image(w, &image.url)?;
    }

    for item in &feed.items {
        write_item(w, item).with_context(|| format!("item {}", item.guid))?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;
    Ok(())
}

fn write_item(w: &mut XmlWriter, item: &FeedItem) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new("item")))?;
    text_element(w, "title", &item.title)?;
    if !item.link.is_empty() {
        text_element(w, "link", &item.link)?;
    }
    text_element(w, "description", &item.description)?;
    text_element(w, "author", &item.author)?;

    let mut guid = BytesStart::new("guid");
    guid.push_attribute(("isPermaLink", "true"));
    w.write_event(Event::Start(guid))?;
    w.write_event(Event::Text(BytesText::new(&item.guid)))?;
    w.write_event(Event::End(BytesEnd::new("guid")))?;

    text_element(w, "pubDate", &rfc822(&item.pub_date))?;

    let length = item.enclosure.length.to_string();
    let mut enclosure = BytesStart::new("enclosure");
    enclosure.push_attribute(("url", item.enclosure.url.as_str()));
    enclosure.push_attribute(("length", length.as_str()));
    enclosure.push_attribute(("type", item.enclosure.mime_type.as_str()));
    w.write_event(Event::Empty(enclosure))?;

    text_element(w, "itunes:duration", &item.duration)?;
    if let Some(image) = &item.image {
        itunes_image(w, &image.url)?;
    }
    w.write_event(Event::End(BytesEnd::new("item")))?;
    Ok(())
}

fn write_image(w: &mut XmlWriter, image: &FeedImage) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new("image")))?;
    text_element(w, "url", &image.url)?;
    text_element(w, "title", &image.title)?;
    if let Some(link) = &image.link {
        text_element(w, "link", link)?;
    }
    if let Some(description) = &image.description {
        text_element(w, "description", description)?;
    }
    w.write_event(Event::End(BytesEnd::new("image")))?;
    Ok(())
}

fn itunes_image(w: &mut XmlWriter, href: &str) -> anyhow::Result<()> {
    let mut image = BytesStart::new("itunes:image");
    image.push_attribute(("href", href));
    w.write_event(Event::Empty(image))?;
    Ok(())
}

fn text_element(w: &mut XmlWriter, name: &str, text: &str) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
