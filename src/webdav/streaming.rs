//! Streaming scan of `207 Multi-Status` bodies.
//!
//! The scanner keeps a stack of recognized element names and copies the text of the
//! properties it knows into one [`ResponseNode`] per `<response>`. Namespace prefixes
//! are ignored, so `D:`, `d:` and unprefixed documents read the same.

use std::io::{BufRead, Cursor};

use anyhow::{Result, anyhow};
use quick_xml::Reader;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::Event;

use crate::webdav::xml::{ElementName, element_from_bytes, path_ends_with};

/// Raw property text of the first `propstat/prop` of a response.
///
/// A field is `Some` as soon as its element appears, even when it has no text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropValues {
    pub creationdate: Option<String>,
    pub displayname: Option<String>,
    pub getcontentlength: Option<String>,
    pub getlastmodified: Option<String>,
    /// Qualified name of the first child of `resourcetype`, e.g. `D:collection`.
    pub resourcetype: Option<String>,
    pub getetag: Option<String>,
    pub quota_available_bytes: Option<String>,
    pub quota_used_bytes: Option<String>,
}

impl PropValues {
    fn slot_mut(&mut self, element: ElementName) -> Option<&mut Option<String>> {
        Some(match element {
            ElementName::Creationdate => &mut self.creationdate,
            ElementName::Displayname => &mut self.displayname,
            ElementName::Getcontentlength => &mut self.getcontentlength,
            ElementName::Getlastmodified => &mut self.getlastmodified,
            ElementName::Getetag => &mut self.getetag,
            ElementName::QuotaAvailableBytes => &mut self.quota_available_bytes,
            ElementName::QuotaUsedBytes => &mut self.quota_used_bytes,
            _ => return None,
        })
    }

    fn trim(&mut self) {
        for slot in [
            &mut self.creationdate,
            &mut self.displayname,
            &mut self.getcontentlength,
            &mut self.getlastmodified,
            &mut self.getetag,
            &mut self.quota_available_bytes,
            &mut self.quota_used_bytes,
        ] {
            trim_in_place(slot);
        }
    }
}

/// One `<response>` of a multistatus document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseNode {
    /// Raw (still percent-encoded) href; `None` when the element is missing.
    pub href: Option<String>,
    /// Status line of the first propstat, or of the response itself.
    pub status: Option<String>,
    pub props: PropValues,
}

fn trim_in_place(slot: &mut Option<String>) {
    if let Some(value) = slot.as_mut() {
        let trimmed = value.trim();
        if trimmed.len() != value.len() {
            *value = trimmed.to_string();
        }
    }
}

struct MultistatusParser {
    stack: Vec<ElementName>,
    current: ResponseNode,
    propstats: usize,
    nodes: Vec<ResponseNode>,
}

impl MultistatusParser {
    fn new() -> Self {
        Self {
            stack: Vec::with_capacity(16),
            current: ResponseNode::default(),
            propstats: 0,
            nodes: Vec::new(),
        }
    }

    fn path_ends_with(&self, needle: &[ElementName]) -> bool {
        path_ends_with(&self.stack, needle)
    }

    fn in_first_prop(&self) -> bool {
        self.propstats == 1
            && self.path_ends_with(&[
                ElementName::Response,
                ElementName::Propstat,
                ElementName::Prop,
            ])
    }

    fn on_start(&mut self, raw: &[u8]) {
        let element = element_from_bytes(raw);

        // Direct child of resourcetype: remember the first one by qualified name.
        if element != ElementName::Response
            && self.propstats == 1
            && self.path_ends_with(&[
                ElementName::Response,
                ElementName::Propstat,
                ElementName::Prop,
                ElementName::Resourcetype,
            ])
            && self.current.props.resourcetype.is_none()
        {
            self.current.props.resourcetype = Some(String::from_utf8_lossy(raw).into_owned());
        }

        let first_prop = self.in_first_prop();
        self.stack.push(element);

        match element {
            ElementName::Response => {
                self.current = ResponseNode::default();
                self.propstats = 0;
            }
            ElementName::Href => {
                if self.path_ends_with(&[ElementName::Response, ElementName::Href])
                    && self.current.href.is_none()
                {
                    self.current.href = Some(String::new());
                }
            }
            ElementName::Propstat => {
                if self.path_ends_with(&[ElementName::Response, ElementName::Propstat]) {
                    self.propstats += 1;
                }
            }
            _ => {
                if first_prop
                    && let Some(slot) = self.current.props.slot_mut(element)
                    && slot.is_none()
                {
                    *slot = Some(String::new());
                }
            }
        }
    }

    fn on_end(&mut self) {
        if let Some(popped) = self.stack.pop()
            && popped == ElementName::Response
        {
            let mut finished = std::mem::take(&mut self.current);
            trim_in_place(&mut finished.href);
            trim_in_place(&mut finished.status);
            finished.props.trim();
            self.nodes.push(finished);
        }
    }

    fn on_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }

        if self.path_ends_with(&[ElementName::Response, ElementName::Href]) {
            if let Some(href) = self.current.href.as_mut() {
                href.push_str(text);
            }
            return;
        }

        if self.path_ends_with(&[ElementName::Response, ElementName::Status])
            || (self.propstats == 1
                && self.path_ends_with(&[
                    ElementName::Response,
                    ElementName::Propstat,
                    ElementName::Status,
                ]))
        {
            self.current
                .status
                .get_or_insert_with(String::new)
                .push_str(text);
            return;
        }

        let Some(element) = self.stack.last().copied() else {
            return;
        };
        if self.propstats == 1
            && self.path_ends_with(&[
                ElementName::Response,
                ElementName::Propstat,
                ElementName::Prop,
                element,
            ])
            && let Some(Some(value)) = self.current.props.slot_mut(element)
        {
            value.push_str(text);
        }
    }
}

fn scan_multistatus<R: BufRead>(reader: R) -> Result<Vec<ResponseNode>> {
    let mut xml = Reader::from_reader(reader);
    xml.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut parser = MultistatusParser::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.on_start(e.name().as_ref()),
            Ok(Event::Empty(e)) => {
                parser.on_start(e.name().as_ref());
                parser.on_end();
            }
            Ok(Event::Text(e)) => {
                let text = decode_text(e.as_ref())?;
                parser.on_text(&text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                parser.on_text(&text);
            }
            Ok(Event::GeneralRef(e)) => {
                let text = match e
                    .resolve_char_ref()
                    .map_err(|err| anyhow!("XML character reference error: {err}"))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = e
                            .decode()
                            .map_err(|err| anyhow!("XML decode error: {err}"))?;
                        match resolve_predefined_entity(&name) {
                            Some(value) => value.to_string(),
                            None => format!("&{name};"),
                        }
                    }
                };
                parser.on_text(&text);
            }
            Ok(Event::End(_)) => parser.on_end(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(parser.nodes)
}

/// Scan an aggregated multistatus body into one [`ResponseNode`] per `<response>`,
/// in document order.
///
/// Fails only when the document is not well-formed XML.
pub fn parse_multistatus(body: &[u8]) -> Result<Vec<ResponseNode>> {
    scan_multistatus(Cursor::new(body))
}

pub fn decode_text(raw: &[u8]) -> Result<String> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(unescape(s)
            .map_err(|err| anyhow!("XML decode error: {err}"))?
            .into_owned()),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}
