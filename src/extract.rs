//! Image extraction from message payloads.
//!
//! Two sources, mutually exclusive per message: a direct image attachment
//! yields exactly one reference; a formatted (HTML) text body yields one
//! reference per embedded `<img>` with a resolvable content URI, in
//! document order. Extraction never fails — bad elements are skipped and
//! a broken parse degrades to whatever was found before the breakage.

use once_cell::sync::Lazy;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use tracing::debug;

use crate::error::ExtractError;
use crate::types::{ImageReference, MessageEvent};

/// Shape of a content URI: `mxc://<server>/<media-id>`.
static MXC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^mxc://.+/.+$").expect("content URI pattern is valid")
});

/// Whether a locator is addressable through the media repository.
pub fn is_content_uri(locator: &str) -> bool {
    MXC_RE.is_match(locator)
}

/// Extract the ordered image references contained in a message.
pub fn extract_images(event: &MessageEvent) -> Vec<ImageReference> {
    if event.is_image() {
        if let Some(locator) = &event.attachment {
            if is_content_uri(locator) {
                return vec![ImageReference {
                    locator: locator.clone(),
                    source_event: event.event_id.clone(),
                    position: 0,
                }];
            }
            debug!(locator = %locator, "Attachment locator is not a content URI; skipping");
        }
        return Vec::new();
    }

    match &event.formatted_body {
        Some(html) => extract_from_markup(html, &event.event_id),
        None => Vec::new(),
    }
}

/// Walk the markup and collect `<img>` locators in document order.
///
/// A per-element failure skips that element; a reader-level failure stops
/// the walk but keeps everything already collected.
fn extract_from_markup(html: &str, source_event: &str) -> Vec<ImageReference> {
    let mut reader = Reader::from_str(html);
    reader.config_mut().check_end_names = false;

    let mut refs = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref().eq_ignore_ascii_case(b"img") =>
            {
                match locator_from_img(&e) {
                    Ok(locator) => {
                        refs.push(ImageReference {
                            locator,
                            source_event: source_event.to_string(),
                            position: refs.len(),
                        });
                    }
                    Err(err) => {
                        debug!(error = %err, "Skipping unusable image element");
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(error = %err, "Markup parse failed; keeping images found so far");
                break;
            }
        }
    }
    refs
}

/// Pull the content URI out of an `<img>` element's `src` attribute.
fn locator_from_img(element: &BytesStart<'_>) -> Result<String, ExtractError> {
    for attr in element.html_attributes().with_checks(false) {
        let attr = attr.map_err(|e| ExtractError::Attributes(e.to_string()))?;
        if !attr.key.as_ref().eq_ignore_ascii_case(b"src") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| ExtractError::Attributes(e.to_string()))?;
        if !is_content_uri(&value) {
            return Err(ExtractError::NonContentLocator(value.into_owned()));
        }
        return Ok(value.into_owned());
    }
    Err(ExtractError::MissingLocator)
}
