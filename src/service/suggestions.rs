//! Search suggestion XML parsing

use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::errors::{IconError, IconResult};

/// Extract the `data` attribute of every `<suggestion>` element
///
/// The upstream toolbar format looks like
/// `<toplevel><CompleteSuggestion><suggestion data="rust"/></CompleteSuggestion></toplevel>`.
pub fn parse_suggestions(xml: &str) -> IconResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut suggestions = Vec::new();
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.name().as_ref() == b"suggestion" =>
            {
                if let Some(data) = data_attribute(e) {
                    suggestions.push(data);
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(IconError::decode(format!(
                    "Invalid suggestions XML at position {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
    }
    Ok(suggestions)
}

fn data_attribute(element: &BytesStart) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == b"data")
        .and_then(|attr| {
            let raw = std::str::from_utf8(&attr.value).ok()?;
            Some(
                unescape(raw)
                    .map(|value| value.into_owned())
                    .unwrap_or_else(|_| raw.to_string()),
            )
        })
}
