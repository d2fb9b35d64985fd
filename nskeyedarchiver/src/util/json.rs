/*!
 Renders [`Value`]s as JSON for inspection and comparisons.
*/

use std::collections::HashSet;

use base64::{prelude::BASE64_STANDARD, Engine};
use json::{object::Object as JsonObject, JsonValue};

use crate::archiver::models::Value;

/// Render a [`Value`] as JSON
///
/// - [`Value::Bytes`] become standard base64 strings
/// - [`Value::Set`] becomes an array in insertion order
/// - [`Value::Dictionary`] keys that are not strings use their own JSON text
/// - [`Value::Object`] becomes an object with its class name under `$class`
/// - A reference back into an object that is still being rendered becomes `null`
pub fn to_json(value: &Value) -> JsonValue {
    JsonRenderer::default().render(value)
}

#[derive(Default)]
struct JsonRenderer {
    /// Composite values on the current path
    active: HashSet<usize>,
}

impl JsonRenderer {
    fn render(&mut self, value: &Value) -> JsonValue {
        match value {
            Value::Null => JsonValue::Null,
            Value::Bool(flag) => JsonValue::Boolean(*flag),
            Value::Int(number) => JsonValue::from(*number),
            Value::Double(number) | Value::Date(number) => JsonValue::from(*number),
            Value::String(text) | Value::Url(text) => JsonValue::from(text.as_str()),
            Value::Bytes(bytes) => JsonValue::from(BASE64_STANDARD.encode(bytes)),
            Value::Array(items) | Value::Set(items) => self.nested(items.id(), |renderer| {
                JsonValue::Array(items.borrow().iter().map(|item| renderer.render(item)).collect())
            }),
            Value::Dictionary(pairs) => self.nested(pairs.id(), |renderer| {
                let mut out = JsonObject::new();
                for (key, item) in pairs.borrow().iter() {
                    let key = match key {
                        Value::String(text) => text.clone(),
                        other => json::stringify(renderer.render(other)),
                    };
                    out.insert(&key, renderer.render(item));
                }
                JsonValue::Object(out)
            }),
            Value::Object(object) => self.nested(object.id(), |renderer| {
                let object = object.borrow();
                let mut out = JsonObject::new();
                out.insert("$class", JsonValue::from(object.class_name.as_str()));
                for (key, item) in &object.fields {
                    out.insert(key, renderer.render(item));
                }
                JsonValue::Object(out)
            }),
        }
    }

    fn nested(&mut self, id: usize, render: impl FnOnce(&mut Self) -> JsonValue) -> JsonValue {
        if !self.active.insert(id) {
            return JsonValue::Null;
        }
        let out = render(self);
        self.active.remove(&id);
        out
    }
}
