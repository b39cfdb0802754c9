use serde_json::Value;

/// Print just the key answer from the output.
///
/// A single return prints its value. An analysis prints one line per
/// period: caption and cumulative TWR.
pub fn print_minimal(value: &Value) {
    for line in minimal_lines(value) {
        println!("{}", line);
    }
}

fn minimal_lines(value: &Value) -> Vec<String> {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    match result {
        Value::Array(rows) => rows
            .iter()
            .map(|row| {
                let caption = row.get("period_caption").map(format_minimal).unwrap_or_default();
                let twr = row
                    .get("cumulative_twr")
                    .map(format_minimal)
                    .unwrap_or_else(|| "null".to_string());
                format!("{}\t{}", caption, twr)
            })
            .collect(),
        Value::Object(map) => {
            if let Some(val) = map.get("return").filter(|v| !v.is_null()) {
                return vec![format_minimal(val)];
            }
            // Fall back to first field
            map.iter()
                .next()
                .map(|(key, val)| vec![format!("{}: {}", key, format_minimal(val))])
                .unwrap_or_default()
        }
        other => vec![format_minimal(other)],
    }
}

fn format_minimal(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
