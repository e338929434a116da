use crate::core::{Entity, QuotePolicy};
use crate::utils::error::Result;
use serde_json::Value;
use std::collections::HashSet;

const ROW_TERMINATOR: &str = "\r\n";

/// Serializes a collection of heterogeneous entities into CSV text.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvEncoder {
    quote_policy: QuotePolicy,
}

/// Union of all keys across `entities`, in first-seen order.
pub fn derive_header(entities: &[Entity]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut header = Vec::new();
    for entity in entities {
        for key in entity.data.keys() {
            if seen.insert(key.as_str()) {
                header.push(key.clone());
            }
        }
    }
    header
}

/// `deal_value` → `Deal Value`.
pub fn title_case(column: &str) -> String {
    column
        .replace('_', " ")
        .to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

impl CsvEncoder {
    pub fn new(quote_policy: QuotePolicy) -> Self {
        Self { quote_policy }
    }

    fn quote(&self, text: &str) -> String {
        match self.quote_policy {
            QuotePolicy::Escape => format!("\"{}\"", text.replace('"', "\"\"")),
            QuotePolicy::Fold => format!("\"{}\"", text.replace('"', "'")),
        }
    }

    /// Encodes one cell. Null is empty, numbers and booleans are literal,
    /// strings are quoted. Composite values are JSON text, quoted.
    pub fn encode_cell(&self, value: &Value) -> Result<String> {
        Ok(match value {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            Value::String(s) => self.quote(s),
            composite => self.quote(&serde_json::to_string(composite)?),
        })
    }

    fn encode_header_cell(&self, column: &str) -> String {
        let title = title_case(column);
        if title.contains([',', '"', '\r', '\n']) {
            self.quote(&title)
        } else {
            title
        }
    }

    /// Header row, then one row per entity. Every row ends with CRLF.
    /// Columns an entity lacks are written as empty cells.
    pub fn encode(&self, entities: &[Entity]) -> Result<String> {
        let header = derive_header(entities);

        let mut out = header
            .iter()
            .map(|column| self.encode_header_cell(column))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(ROW_TERMINATOR);

        for entity in entities {
            let row = header
                .iter()
                .map(|column| self.encode_cell(entity.data.get(column).unwrap_or(&Value::Null)))
                .collect::<Result<Vec<String>>>()?;
            out.push_str(&row.join(","));
            out.push_str(ROW_TERMINATOR);
        }

        Ok(out)
    }
}
