//! A minimal TNetStrings encoder, used by the UDP/TNetStrings handler.
//!
//! TNetStrings are self-delimiting: every value is `<payload-length>:<payload><tag>`,
//! where the tag identifies the payload's type (`#` integer, `^` float, `,`
//! byte string, `}` dict, `]` list, `!` bool, `~` null). There is no external
//! crate in wide use for this format, so it is encoded by hand here rather
//! than through a dependency.

use serde_json::Value as JsonValue;

pub fn encode(value: &JsonValue) -> Vec<u8> {
    match value {
        JsonValue::Null => b"0:~".to_vec(),
        JsonValue::Bool(b) => {
            let payload = if *b { "true" } else { "false" };
            wrap(payload.as_bytes(), b'!')
        }
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                wrap(i.to_string().as_bytes(), b'#')
            } else {
                wrap(n.to_string().as_bytes(), b'^')
            }
        }
        JsonValue::String(s) => wrap(s.as_bytes(), b','),
        JsonValue::Array(items) => {
            let mut payload = Vec::new();
            for item in items {
                payload.extend(encode(item));
            }
            wrap(&payload, b']')
        }
        JsonValue::Object(map) => {
            let mut payload = Vec::new();
            for (key, val) in map {
                payload.extend(encode(&JsonValue::String(key.clone())));
                payload.extend(encode(val));
            }
            wrap(&payload, b'}')
        }
    }
}

fn wrap(payload: &[u8], tag: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 12);
    out.extend(payload.len().to_string().as_bytes());
    out.push(b':');
    out.extend(payload);
    out.push(tag);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encodes_string() {
        assert_eq!(encode(&json!("hello")), b"5:hello,");
    }

    #[test]
    fn encodes_integer() {
        assert_eq!(encode(&json!(42)), b"2:42#");
    }

    #[test]
    fn encodes_dict_in_insertion_order() {
        let value = json!({"a": 1});
        assert_eq!(encode(&value), b"8:1:a,1:1#}");
    }

    #[test]
    fn encodes_null_and_bool() {
        assert_eq!(encode(&json!(null)), b"0:~");
        assert_eq!(encode(&json!(true)), b"4:true!");
    }
}
