/// Elements of a `multistatus` document the scanner cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ElementName {
    Multistatus,
    Response,
    Propstat,
    Prop,
    Href,
    Status,
    Creationdate,
    Displayname,
    Getcontentlength,
    Getlastmodified,
    Resourcetype,
    Getetag,
    QuotaAvailableBytes,
    QuotaUsedBytes,
    Other,
}

/// Map a (possibly prefixed) element name to its local name, ignoring case.
pub(crate) fn element_from_bytes(raw: &[u8]) -> ElementName {
    let local = match raw.iter().position(|b| *b == b':') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };

    if local.eq_ignore_ascii_case(b"multistatus") {
        ElementName::Multistatus
    } else if local.eq_ignore_ascii_case(b"response") {
        ElementName::Response
    } else if local.eq_ignore_ascii_case(b"propstat") {
        ElementName::Propstat
    } else if local.eq_ignore_ascii_case(b"prop") {
        ElementName::Prop
    } else if local.eq_ignore_ascii_case(b"href") {
        ElementName::Href
    } else if local.eq_ignore_ascii_case(b"status") {
        ElementName::Status
    } else if local.eq_ignore_ascii_case(b"creationdate") {
        ElementName::Creationdate
    } else if local.eq_ignore_ascii_case(b"displayname") {
        ElementName::Displayname
    } else if local.eq_ignore_ascii_case(b"getcontentlength") {
        ElementName::Getcontentlength
    } else if local.eq_ignore_ascii_case(b"getlastmodified") {
        ElementName::Getlastmodified
    } else if local.eq_ignore_ascii_case(b"resourcetype") {
        ElementName::Resourcetype
    } else if local.eq_ignore_ascii_case(b"getetag") {
        ElementName::Getetag
    } else if local.eq_ignore_ascii_case(b"quota-available-bytes") {
        ElementName::QuotaAvailableBytes
    } else if local.eq_ignore_ascii_case(b"quota-used-bytes") {
        ElementName::QuotaUsedBytes
    } else {
        ElementName::Other
    }
}

pub(crate) fn path_ends_with<T: PartialEq>(stack: &[T], needle: &[T]) -> bool {
    stack.len() >= needle.len() && stack[stack.len() - needle.len()..] == needle[..]
}

/// Build a `PROPFIND` body asking for the given `DAV:` properties.
///
/// An empty list produces `<D:allprop/>`.
pub fn build_propfind_body(props: &[&str]) -> String {
    let mut body = String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#);
    body.push_str(r#"<D:propfind xmlns:D="DAV:">"#);
    if props.is_empty() {
        body.push_str("<D:allprop/>");
    } else {
        body.push_str("<D:prop>");
        for prop in props {
            body.push_str("<D:");
            body.push_str(prop);
            body.push_str("/>");
        }
        body.push_str("</D:prop>");
    }
    body.push_str("</D:propfind>");
    body
}
