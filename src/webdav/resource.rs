use chrono::NaiveDateTime;
use percent_encoding::percent_decode_str;

use crate::webdav::date::parse_http_date;
use crate::webdav::path::RemotePath;
use crate::webdav::streaming::ResponseNode;

/// A remote file or collection as described by a `PROPFIND` response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resource {
    /// Percent-decoded href exactly as the server reported it.
    pub href: String,
    pub display_name: Option<String>,
    /// `None` when missing or not a number.
    pub size: Option<u64>,
    /// Zone-naive, see [`parse_http_date`].
    pub modified: Option<NaiveDateTime>,
    pub created: Option<NaiveDateTime>,
    /// Qualified name of the resource type, e.g. `D:collection`; `None` for plain files.
    pub resource_type: Option<String>,
    pub etag: Option<String>,
}

impl Resource {
    /// Build a resource from one multistatus response.
    ///
    /// Returns `None` only when the response has no `href`. Every other missing or
    /// malformed property just leaves its field empty.
    pub fn from_node(node: &ResponseNode) -> Option<Resource> {
        let href = node.href.as_deref()?;
        let props = &node.props;

        Some(Resource {
            href: percent_decode_str(href).decode_utf8_lossy().into_owned(),
            display_name: props.displayname.clone(),
            size: props
                .getcontentlength
                .as_deref()
                .and_then(|raw| raw.parse().ok()),
            modified: props.getlastmodified.as_deref().and_then(parse_http_date),
            created: props.creationdate.as_deref().and_then(parse_http_date),
            resource_type: props.resourcetype.clone(),
            etag: props.getetag.clone(),
        })
    }

    pub fn is_collection(&self) -> bool {
        self.resource_type
            .as_deref()
            .is_some_and(|kind| kind.to_ascii_lowercase().contains("collection"))
    }

    /// The href as a [`RemotePath`]; absolute URLs are reduced to their path.
    pub fn path(&self) -> RemotePath {
        let href = strip_origin(&self.href);
        RemotePath::new(href, href.ends_with('/'))
    }
}

fn strip_origin(href: &str) -> &str {
    let Some((_, rest)) = href.split_once("://") else {
        return href;
    };
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "/",
    }
}
