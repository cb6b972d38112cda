// Token dictionary JSON: flat object of token -> original

use std::path::Path;

use serde_json::{Map, Value as JsonValue};

use pseudogrid_engine::detokenize::Dictionary;

/// Parse a dictionary. Scalars are stringified; nested arrays or objects
/// reject the whole document.
pub fn parse(text: &str) -> Result<Dictionary, String> {
    let json: JsonValue = serde_json::from_str(text).map_err(|e| format!("Invalid dictionary JSON: {}", e))?;
    let JsonValue::Object(map) = json else {
        return Err("Dictionary must be a JSON object of token -> original".to_string());
    };

    let mut dict = Dictionary::new();
    for (token, value) in map {
        let original = match value {
            JsonValue::String(s) => s,
            JsonValue::Number(n) => n.to_string(),
            JsonValue::Bool(b) => b.to_string(),
            JsonValue::Null => String::new(),
            JsonValue::Array(_) | JsonValue::Object(_) => {
                return Err(format!("Dictionary entry '{}' is not a scalar value", token));
            }
        };
        dict.insert(token, original);
    }
    Ok(dict)
}

pub fn load(path: &Path) -> Result<Dictionary, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read dictionary '{}': {}", path.display(), e))?;
    let dict = parse(&text)?;
    log::debug!("loaded {} dictionary entries from {}", dict.len(), path.display());
    Ok(dict)
}

/// Pretty-printed JSON object, entries in the given order.
pub fn to_json(entries: &[(String, String)]) -> Result<String, String> {
    let map: Map<String, JsonValue> = entries
        .iter()
        .map(|(token, original)| (token.clone(), JsonValue::String(original.clone())))
        .collect();
    serde_json::to_string_pretty(&JsonValue::Object(map)).map_err(|e| e.to_string())
}
