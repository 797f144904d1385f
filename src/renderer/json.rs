use log::warn;
use regex::Regex;
use std::sync::OnceLock;

struct Scope {
    close: &'static str,
    empty: bool,
}

/// A JSON document with a size limit.
///
/// The skeleton given to [`JsonBuffer::new`] is always written. Elements are
/// added whole or not at all: once one does not fit, every later element is
/// refused too. Closing brackets are reserved ahead of time, so the finished
/// document is always balanced.
pub struct JsonBuffer {
    text: String,
    limit: usize,
    scopes: Vec<Scope>,
    reserved: usize,
    truncated: bool,
}

impl JsonBuffer {
    pub fn new(limit: usize, open: &str, close: &'static str) -> Self {
        let mut text = String::with_capacity(limit.min(64 * 1024));
        text.push_str(open);
        Self {
            text,
            limit,
            scopes: vec![Scope { close, empty: true }],
            reserved: close.len(),
            truncated: false,
        }
    }

    /// Adds a complete element to the innermost scope.
    pub fn push(&mut self, element: &str) -> bool {
        if !self.fits(element.len()) {
            return false;
        }
        self.separate();
        self.text.push_str(element);
        true
    }

    /// Adds an element that opens a nested scope, e.g. `"kitchen":[`.
    pub fn open(&mut self, element: &str, close: &'static str) -> bool {
        if !self.fits(element.len() + close.len()) {
            return false;
        }
        self.separate();
        self.text.push_str(element);
        self.scopes.push(Scope { close, empty: true });
        self.reserved += close.len();
        true
    }

    /// Closes the innermost nested scope. The root scope is closed by `finish`.
    pub fn close(&mut self) {
        if self.scopes.len() > 1 {
            self.pop();
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }

    pub fn finish(mut self) -> String {
        while !self.scopes.is_empty() {
            self.pop();
        }
        if self.truncated {
            warn!("JSON response truncated to {} bytes", self.limit);
        }
        self.text
    }

    fn fits(&mut self, length: usize) -> bool {
        if self.truncated {
            return false;
        }
        let comma = match self.scopes.last() {
            Some(scope) if !scope.empty => 1,
            _ => 0,
        };
        if self.text.len() + comma + length + self.reserved > self.limit {
            self.truncated = true;
            return false;
        }
        true
    }

    fn separate(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            if !scope.empty {
                self.text.push(',');
            }
            scope.empty = false;
        }
    }

    fn pop(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            self.text.push_str(scope.close);
            self.reserved -= scope.close.len();
        }
    }
}

/// Quotes `text` as a JSON string.
pub fn quote(text: &str) -> String {
    serde_json::Value::from(text).to_string()
}

/// A sensor value as JSON: `null` when empty, the bare text when it is a JSON
/// number, a quoted string otherwise.
pub fn value(text: &str) -> String {
    if text.is_empty() {
        "null".to_string()
    } else if is_number(text) {
        text.to_string()
    } else {
        quote(text)
    }
}

fn is_number(text: &str) -> bool {
    static NUMBER: OnceLock<Regex> = OnceLock::new();
    NUMBER
        .get_or_init(|| {
            Regex::new(r"^-?(0|[1-9][0-9]*)(\.[0-9]+)?([eE][+-]?[0-9]+)?$")
                .expect("number pattern is valid")
        })
        .is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_forms() {
        assert_eq!(value(""), "null");
        assert_eq!(value("21.5"), "21.5");
        assert_eq!(value("-3"), "-3");
        assert_eq!(value("1e5"), "1e5");
        assert_eq!(value("open"), "\"open\"");
        assert_eq!(value("021"), "\"021\"");
        assert_eq!(value("1."), "\"1.\"");
        assert_eq!(value("NaN"), "\"NaN\"");
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a\"b"), "\"a\\\"b\"");
        assert_eq!(quote("kitchen"), "\"kitchen\"");
    }

    #[test]
    fn test_elements_are_comma_separated() {
        let mut json = JsonBuffer::new(1024, "{\"list\":[", "]}");
        assert!(json.push("1"));
        assert!(json.open("[", "]"));
        assert!(json.push("2"));
        assert!(json.push("3"));
        json.close();
        assert!(json.push("4"));

        assert!(!json.is_truncated());
        assert_eq!(json.finish(), "{\"list\":[1,[2,3],4]}");
    }

    #[test]
    fn test_truncation_keeps_document_balanced() {
        let mut json = JsonBuffer::new(20, "{\"list\":[", "]}");
        let mut pushed = 0;
        for _ in 0..10 {
            if json.push("\"xx\"") {
                pushed += 1;
            }
        }
        assert!(json.is_truncated());

        let text = json.finish();
        assert!(text.len() <= 20);
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["list"].as_array().unwrap().len(), pushed);
    }

    #[test]
    fn test_nested_scope_closed_on_finish() {
        let mut json = JsonBuffer::new(30, "{\"a\":{", "}}");
        assert!(json.open("\"b\":[", "]"));
        assert!(json.push("1"));
        assert!(!json.push("\"a long element that will not fit\""));
        assert!(!json.push("2"));

        assert_eq!(json.finish(), "{\"a\":{\"b\":[1]}}");
    }

    #[test]
    fn test_skeleton_survives_tiny_limit() {
        let json = JsonBuffer::new(2, "{\"list\":[", "]}");
        assert_eq!(json.finish(), "{\"list\":[]}");
    }
}
