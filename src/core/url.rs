//! Document URL parsing

use regex::Regex;
use std::sync::LazyLock;

use crate::core::errors::{ExportError, Result};
use crate::core::models::DocumentRef;

static DOCUMENT_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/documents/([^/]+)/[wv]/([^/]+)/e/([^/?#]+)").expect("valid document path pattern")
});

/// Extract the document, workspace (or version) and element ids from an Onshape URL
pub fn parse_document_url(url: &str) -> Result<DocumentRef> {
    let captures = DOCUMENT_PATH
        .captures(url)
        .ok_or_else(|| ExportError::InvalidUrl {
            url: url.to_string(),
        })?;

    Ok(DocumentRef::new(&captures[1], &captures[2], &captures[3]))
}
