use serde_json::Value;

use crate::model::GeneratedImage;

/// Map a provider payload onto a uniform image list, preserving order.
///
/// Accepted shapes: a bare URL string, an array of URL strings, an object
/// with an `output` member holding either of those, and an object with a
/// `data` array whose items carry `url`, `b64_json` or `base64`. Anything
/// else normalises to an empty list.
pub fn normalize(payload: &Value) -> Vec<GeneratedImage> {
    let mut out = Vec::new();
    match payload {
        Value::Object(obj) => {
            if let Some(data) = obj.get("data") {
                collect(data, &mut out);
            } else if let Some(output) = obj.get("output") {
                collect(output, &mut out);
            } else {
                push_item(payload, &mut out);
            }
        }
        other => collect(other, &mut out),
    }
    out
}

fn collect(value: &Value, out: &mut Vec<GeneratedImage>) {
    match value {
        Value::Array(items) => {
            for item in items {
                push_item(item, out);
            }
        }
        other => push_item(other, out),
    }
}

fn push_item(item: &Value, out: &mut Vec<GeneratedImage>) {
    match item {
        Value::String(url) => {
            let url = url.trim();
            if !url.is_empty() {
                out.push(GeneratedImage::Url(url.to_string()));
            }
        }
        Value::Object(obj) => {
            let field = |key: &str| {
                obj.get(key)
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
            };
            if let Some(b64) = field("b64_json").or_else(|| field("base64")) {
                out.push(GeneratedImage::Base64(b64.to_string()));
            } else if let Some(url) = field("url") {
                out.push(GeneratedImage::Url(url.to_string()));
            }
        }
        _ => {}
    }
}
