// Localized message resolution.
//
// The API returns display strings as a list of `{"Culture", "Message"}`
// pairs, e.g. `[{"Culture":"nl","Message":"Nieuwpoort"},{"Culture":"en",...}]`.
// Some variants send a bare string instead. `resolve_message` flattens
// either shape into one string.

use serde_json::Value;

/// Preferred culture for display strings.
pub const PREFERRED_CULTURE: &str = "en";

/// Culture used when no preferred entry exists.
pub const FALLBACK_CULTURE: &str = "nl";

/// Pick a single display string out of a locale-pair sequence.
///
/// Priority: bare string as-is, then the `en` entry, then the `nl` entry,
/// then the first entry carrying any message, then `default`. Entries that
/// are not objects, or whose fields are not strings, are skipped.
pub fn resolve_message(value: Option<&Value>, default: &str) -> String {
    let entries = match value {
        Some(Value::String(s)) => return s.clone(),
        Some(Value::Array(entries)) if !entries.is_empty() => entries,
        _ => return default.to_owned(),
    };

    message_for_culture(entries, PREFERRED_CULTURE)
        .or_else(|| message_for_culture(entries, FALLBACK_CULTURE))
        .or_else(|| entries.iter().find_map(message_text))
        .map_or_else(|| default.to_owned(), str::to_owned)
}

fn message_for_culture<'a>(entries: &'a [Value], culture: &str) -> Option<&'a str> {
    entries
        .iter()
        .filter(|entry| entry.get("Culture").and_then(Value::as_str) == Some(culture))
        .find_map(message_text)
}

fn message_text(entry: &Value) -> Option<&str> {
    entry.get("Message").and_then(Value::as_str)
}
