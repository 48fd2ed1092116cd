//! Section content: an ordered item list whose first element is the title.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionContent {
    items: Vec<Value>,
}

impl SectionContent {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(title: impl Into<String>, data: Vec<Value>) -> Self {
        let mut items = Vec::with_capacity(data.len() + 1);
        items.push(Value::String(title.into()));
        items.extend(data);
        Self { items }
    }

    /// Parse a service response. Accepts a bare JSON array, an array inside a markdown
    /// code fence, or an object carrying `title` and `items`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let body = strip_code_fence(raw.trim());
        if body.is_empty() {
            return Err("response is empty".to_string());
        }

        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(first_err) => {
                let start = body.find('[');
                let end = body.rfind(']');
                match (start, end) {
                    (Some(start), Some(end)) if start < end => {
                        serde_json::from_str(&body[start..=end]).map_err(|e| e.to_string())?
                    }
                    _ => return Err(first_err.to_string()),
                }
            }
        };

        match value {
            Value::Array(items) => Self::from_array(items),
            Value::Object(mut map) => {
                let items = match map.remove("items") {
                    Some(Value::Array(items)) => items,
                    _ => return Err("object response has no `items` array".to_string()),
                };
                match map.remove("title") {
                    Some(Value::String(title)) => Ok(Self::new(title, items)),
                    _ => Self::from_array(items),
                }
            }
            _ => Err("response is neither an array nor an object".to_string()),
        }
    }

    fn from_array(items: Vec<Value>) -> Result<Self, String> {
        match items.first() {
            None => Err("item list is empty".to_string()),
            Some(Value::String(_)) => Ok(Self { items }),
            Some(Value::Object(obj)) => match obj.get("title").and_then(Value::as_str) {
                Some(title) if obj.len() == 1 => {
                    let title = title.to_string();
                    Ok(Self::new(title, items.into_iter().skip(1).collect()))
                }
                _ => Err("first item must be the section title".to_string()),
            },
            Some(_) => Err("first item must be the section title".to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn title(&self) -> Option<&str> {
        self.items.first().and_then(Value::as_str)
    }

    /// Items after the title.
    pub fn data(&self) -> &[Value] {
        self.items.get(1..).unwrap_or(&[])
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.items
    }

    /// Data items as plain strings; non-strings are reported by index.
    pub fn string_items(&self) -> (Vec<&str>, Vec<usize>) {
        let mut strings = Vec::new();
        let mut rejected = Vec::new();
        for (index, item) in self.data().iter().enumerate() {
            match item {
                Value::String(s) => strings.push(s.as_str()),
                Value::Object(obj) => match obj.get("question").and_then(Value::as_str) {
                    Some(q) => strings.push(q),
                    None => rejected.push(index + 1),
                },
                _ => rejected.push(index + 1),
            }
        }
        (strings, rejected)
    }

    /// Data items deserialized as `T`; failures are reported as (item position, reason).
    pub fn typed_items<T: DeserializeOwned>(&self) -> (Vec<T>, Vec<(usize, String)>) {
        let mut parsed = Vec::new();
        let mut failures = Vec::new();
        for (index, item) in self.data().iter().enumerate() {
            match serde_json::from_value::<T>(item.clone()) {
                Ok(value) => parsed.push(value),
                Err(err) => failures.push((index + 1, err.to_string())),
            }
        }
        (parsed, failures)
    }

    /// Every string reachable from the content, for text-level screening.
    pub fn all_text(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for item in &self.items {
            collect_strings(item, &mut out);
        }
        out
    }
}

fn collect_strings<'a>(value: &'a Value, out: &mut Vec<&'a str>) {
    match value {
        Value::String(s) => out.push(s),
        Value::Array(items) => items.iter().for_each(|v| collect_strings(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_strings(v, out)),
        _ => {}
    }
}

pub(crate) fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
