//! XML documents exchanged with the DCR REST API.
//!
//! ```text
//! <events isAccepting="True">
//!   <event id="Pay" label="Pay invoice" description="&lt;p&gt;weight: 3&lt;/p&gt;"
//!          enabled="true" pending="false" included="true" executed="false"/>
//! </events>
//!
//! <globalStore>
//!   <variable id="amount" value="250" isNull="false" type="int"/>
//! </globalStore>
//! ```
//!
//! Unknown elements and attributes are ignored.

use crate::ports::BackendError;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use shared_types::{DcrEvent, EnabledEvents, ExecutionResult};

/// Parse the enabled-events document.
pub fn parse_events(xml: &str) -> Result<EnabledEvents, BackendError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut seen_root = false;
    let mut result = EnabledEvents::default();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"events" => {
                    seen_root = true;
                    for (key, value) in attributes(&e)? {
                        if key == "isAccepting" {
                            result.is_accepting = parse_bool(&value);
                        }
                    }
                }
                b"event" if seen_root => result.events.push(parse_event(&e)?),
                _ => {}
            },
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(BackendError::Parse(format!(
                    "events XML at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    if !seen_root {
        return Err(BackendError::Parse("events XML has no <events> root".into()));
    }
    Ok(result)
}

fn parse_event(e: &BytesStart<'_>) -> Result<DcrEvent, BackendError> {
    let mut id = None;
    let mut label = None;
    let mut description = String::new();
    let mut enabled = false;
    let mut pending = false;

    for (key, value) in attributes(e)? {
        match key.as_str() {
            "id" => id = Some(value),
            "label" => label = Some(value),
            "description" => description = value,
            "enabled" => enabled = parse_bool(&value),
            "pending" => pending = parse_bool(&value),
            _ => {}
        }
    }

    let event_id = id.ok_or_else(|| BackendError::Parse("<event> without id".into()))?;
    Ok(DcrEvent {
        label: label.unwrap_or_else(|| event_id.clone()),
        event_id,
        description,
        enabled,
        pending,
    })
}

/// Parse a `<globalStore>` document into variable id → value.
///
/// An empty document is an empty store.
pub fn parse_global_store(xml: &str) -> Result<ExecutionResult, BackendError> {
    let mut store = ExecutionResult::new();
    if xml.trim().is_empty() {
        return Ok(store);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"variable" => {
                let mut id = None;
                let mut value = String::new();
                for (key, v) in attributes(&e)? {
                    match key.as_str() {
                        "id" => id = Some(v),
                        "value" => value = v,
                        _ => {}
                    }
                }
                let id = id.ok_or_else(|| BackendError::Parse("<variable> without id".into()))?;
                store.insert(id, value);
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(BackendError::Parse(format!(
                    "globalStore XML at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
        }
    }

    Ok(store)
}

/// Request body assigning `value` to the data event `event_id`.
pub fn global_store_xml(event_id: &str, value: &str) -> String {
    format!(
        r#"<globalStore><variable id="{}" value="{}" isNull="false" type="text"/></globalStore>"#,
        escape(event_id),
        escape(value)
    )
}

/// Decoded attribute name/value pairs of an element.
fn attributes(e: &BytesStart<'_>) -> Result<Vec<(String, String)>, BackendError> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| BackendError::Parse(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| BackendError::Parse(err.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

/// DCR writes booleans as `true`, `True` or `1`.
fn parse_bool(value: &str) -> bool {
    value.eq_ignore_ascii_case("true") || value == "1"
}
