// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::io;
use std::str::from_utf8;

use quick_xml::events::BytesStart;

use super::model;
use crate::Node;

/// Parser is a trait for objects which can parse XML.
///
/// This trait only exists to fix the mismatch of
/// [quick_xml::Reader::read_event] when working on buffered data
/// and [quick_xml::Reader::read_event_into] when working on IO.
pub(super) trait Parser {
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>>;
}

/// IoParser implements [Parser] over an [std::io::BufRead].
pub(super) struct IoParser<R: io::BufRead>(quick_xml::Reader<R>, Vec<u8>);

impl<R: io::BufRead> IoParser<R> {
    #[inline]
    fn new(reader: R) -> Self {
        Self(quick_xml::Reader::from_reader(reader), Vec::default())
    }
}

impl<R: io::BufRead> Parser for IoParser<R> {
    #[inline]
    fn read_event<'a>(&'a mut self) -> quick_xml::Result<quick_xml::events::Event<'a>> {
        self.1.clear();
        self.0.read_event_into(&mut self.1)
    }
}

/// BufParser implements [Parser] over a slice of bytes (`&[u8]`).
pub(super) struct BufParser<'a>(quick_xml::Reader<&'a [u8]>);

impl<'a> BufParser<'a> {
    #[inline]
    fn new(data: &'a [u8]) -> Self {
        Self(quick_xml::Reader::from_reader(data))
    }
}

impl<'a> Parser for BufParser<'a> {
    #[inline]
    fn read_event<'b>(&'b mut self) -> quick_xml::Result<quick_xml::events::Event<'b>> {
        self.0.read_event()
    }
}

/// Reader reads osm [Features](model::Feature) from an XML file.
pub(super) struct Reader<P: Parser> {
    parser: P,
    eof: bool,
}

impl<P: Parser> Reader<P> {
    #[inline]
    fn new(parser: P) -> Self {
        Self { parser, eof: false }
    }
}

impl<P: Parser> Iterator for Reader<P> {
    type Item = Result<model::Feature, quick_xml::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut f: Option<model::Feature> = None;

        while !self.eof {
            let event = match self.parser.read_event() {
                Ok(e) => e,
                Err(e) => {
                    self.eof = true;
                    return Some(Err(e));
                }
            };

            match event {
                quick_xml::events::Event::Empty(start) => match start.local_name().as_ref() {
                    b"node" => {
                        if let Some(n) = parse_node(&start) {
                            return Some(Ok(model::Feature::Node(n)));
                        }
                    }
                    // "way" can't be self-closing
                    b"tag" => {
                        if let Some(tags) = feature_tags(&mut f) {
                            if let Some((k, v)) = parse_tag(&start) {
                                tags.insert(k, v);
                            }
                        }
                    }
                    b"nd" => {
                        if let Some(nodes) = feature_nodes(&mut f) {
                            if let Some(ref_) = parse_nd(&start) {
                                nodes.push(ref_);
                            }
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Start(start) => match start.local_name().as_ref() {
                    b"node" => f = parse_node(&start).map(model::Feature::Node),
                    b"way" => f = parse_way(&start).map(model::Feature::Way),
                    // Children of relations must not be attached to any feature
                    b"relation" => f = None,
                    // "tag" and "nd" must be self-closing
                    _ => {}
                },

                quick_xml::events::Event::End(end) => match end.local_name().as_ref() {
                    b"node" | b"way" => {
                        if let Some(f) = f.take() {
                            return Some(Ok(f));
                        }
                    }
                    _ => {}
                },

                quick_xml::events::Event::Eof => {
                    self.eof = true;
                }

                _ => {}
            }
        }

        f.map(Ok)
    }
}

impl<'a> Reader<BufParser<'a>> {
    #[inline]
    pub(super) fn from_buffer(data: &'a [u8]) -> Self {
        Self::new(BufParser::new(data))
    }
}

impl<R: io::BufRead> Reader<IoParser<R>> {
    #[inline]
    pub(super) fn from_io(reader: R) -> Self {
        Self::new(IoParser::new(reader))
    }
}

/// Returns the value of the attribute `key`, if present and valid UTF-8.
fn attribute(start: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    start
        .attributes()
        .filter_map(Result::ok)
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| from_utf8(&attr.value).ok().map(str::to_string))
}

fn parse_id(start: &BytesStart<'_>, key: &[u8]) -> Option<i64> {
    attribute(start, key)?.parse().ok().filter(|&id| id != 0)
}

fn parse_node(start: &BytesStart<'_>) -> Option<Node> {
    let id = parse_id(start, b"id");
    let lat = attribute(start, b"lat").and_then(|v| v.parse::<f64>().ok());
    let lon = attribute(start, b"lon").and_then(|v| v.parse::<f64>().ok());

    match (id, lat, lon) {
        (Some(id), Some(lat), Some(lon)) if lat.is_finite() && lon.is_finite() => {
            Some(Node { id, lat, lon })
        }
        _ => {
            log::warn!("skipping invalid node (id={id:?}, lat={lat:?}, lon={lon:?})");
            None
        }
    }
}

fn parse_way(start: &BytesStart<'_>) -> Option<model::Way> {
    match parse_id(start, b"id") {
        Some(id) => Some(model::Way {
            id,
            nodes: Vec::default(),
            tags: HashMap::default(),
        }),
        None => {
            log::warn!("skipping way without a valid id");
            None
        }
    }
}

fn parse_tag(start: &BytesStart<'_>) -> Option<(String, String)> {
    let k = attribute(start, b"k")?;
    let v = attribute(start, b"v").unwrap_or_default();
    Some((k, v))
}

fn parse_nd(start: &BytesStart<'_>) -> Option<i64> {
    let ref_ = parse_id(start, b"ref");
    if ref_.is_none() {
        log::trace!("skipping way node reference without a valid ref");
    }
    ref_
}

fn feature_tags(f: &mut Option<model::Feature>) -> Option<&mut HashMap<String, String>> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.tags),
        _ => None,
    }
}

fn feature_nodes(f: &mut Option<model::Feature>) -> Option<&mut Vec<i64>> {
    match f {
        Some(model::Feature::Way(ref mut w)) => Some(&mut w.nodes),
        _ => None,
    }
}
