// Canonical JSON: sorted keys, compact `,`/`:` separators, ASCII-escaped
// non-ASCII, single trailing newline (the newline is the caller's job —
// this module only produces the object text). Ported from the reference
// runner's `_canonical_dumps`, which was duplicated in both `spec.py` and
// `artifacts.py`; consolidated here into one function used by every
// artifact writer and by `ScenarioSpec::canonical_json`.
//
// Key sorting falls out of `serde_json::Value`'s `Map`, which is a
// `BTreeMap` as long as the `preserve_order` feature is not enabled (it
// isn't, here) — converting through `Value` before stringifying is what
// gives us sorted keys for free, matching Python's `sort_keys=True`.

use serde::Serialize;

pub fn canonical_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    let v = serde_json::to_value(value)?;
    let compact = serde_json::to_string(&v)?;
    Ok(escape_non_ascii(&compact))
}

fn escape_non_ascii(s: &str) -> String {
    if s.is_ascii() {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut buf = [0u16; 2];
    for c in s.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            for unit in c.encode_utf16(&mut buf) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
