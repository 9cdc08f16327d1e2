//! Canonical JSON minimal: claves de objeto ordenadas, sin espacios.
//! Dos documentos equivalentes producen el mismo texto y por tanto el mismo
//! hash de entrada.

use serde_json::Value;
use std::collections::BTreeMap;

pub fn to_canonical_json(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => serde_json::to_string(s).unwrap_or_default(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(to_canonical_json).collect();
            format!("[{}]", parts.join(","))
        }
        Value::Object(map) => {
            let ordered: BTreeMap<&String, &Value> = map.iter().collect();
            let parts: Vec<String> = ordered.into_iter()
                                            .map(|(k, v)| {
                                                format!("{}:{}",
                                                        serde_json::to_string(k).unwrap_or_default(),
                                                        to_canonical_json(v))
                                            })
                                            .collect();
            format!("{{{}}}", parts.join(","))
        }
    }
}
