/// XML to JSON-shaped value conversion
///
/// Elements become objects keyed by child name, attributes are stored as
/// `@name`, text-only elements collapse to plain strings, mixed content keeps
/// its text under `#text`, and repeated children turn into arrays. The result
/// can be addressed with the same path expressions and templates as JSON.

use crate::error::XmlError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

struct Frame {
    name: String,
    children: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(name: String, children: Map<String, Value>) -> Self {
        Self {
            name,
            children,
            text: String::new(),
        }
    }

    fn finish(self) -> (String, Value) {
        let value = if self.children.is_empty() {
            Value::String(self.text)
        } else {
            let mut children = self.children;
            if !self.text.is_empty() {
                children.insert("#text".to_string(), Value::String(self.text));
            }
            Value::Object(children)
        };
        (self.name, value)
    }
}

/// Parse an XML document into a nested value: `{root_name: {...}}`
pub fn to_value(text: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut stack = vec![Frame::new(String::new(), Map::new())];

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let attributes = read_attributes(&e)?;
                stack.push(Frame::new(element_name(&e), attributes));
            }
            Ok(Event::Empty(e)) => {
                let attributes = read_attributes(&e)?;
                let value = if attributes.is_empty() {
                    Value::String(String::new())
                } else {
                    Value::Object(attributes)
                };
                if let Some(parent) = stack.last_mut() {
                    insert_child(&mut parent.children, element_name(&e), value);
                }
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| XmlError(format!("bad text content: {}", err)))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(text.trim());
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::End(_)) => {
                if stack.len() < 2 {
                    return Err(XmlError("unexpected closing tag".to_string()));
                }
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.finish();
                    if let Some(parent) = stack.last_mut() {
                        insert_child(&mut parent.children, name, value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(XmlError(format!(
                    "error at position {}: {}",
                    reader.buffer_position(),
                    e
                )))
            }
        }
    }

    if stack.len() != 1 {
        return Err(XmlError("unexpected end of document".to_string()));
    }

    let root = stack.pop().map(|frame| frame.children).unwrap_or_default();
    if root.is_empty() {
        return Err(XmlError("document has no root element".to_string()));
    }
    Ok(Value::Object(root))
}

/// Extract text from a converted XML value (`"text"` or `{"#text": "text"}`)
pub fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get("#text").and_then(|t| t.as_str()).map(str::to_string),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn read_attributes(e: &BytesStart<'_>) -> Result<Map<String, Value>, XmlError> {
    let mut attributes = Map::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| XmlError(format!("bad attribute: {}", err)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError(format!("bad attribute value: {}", err)))?;
        attributes.insert(format!("@{}", key), Value::String(value.into_owned()));
    }
    Ok(attributes)
}

fn insert_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}
