use std::time::{SystemTime, UNIX_EPOCH};

const HEX: &[u8; 16] = b"0123456789abcdef";
const CHATCMPL_ID_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const CHATCMPL_ID_RANDOM_LEN: usize = 29;

#[inline]
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Generate an OpenAI-shaped completion id: `chatcmpl-` followed by 29
/// random alphanumeric characters.
#[must_use]
pub fn generate_chatcmpl_id() -> String {
    let mut out = String::with_capacity(9 + CHATCMPL_ID_RANDOM_LEN);
    out.push_str("chatcmpl-");
    for _ in 0..CHATCMPL_ID_RANDOM_LEN {
        let idx = fastrand::usize(..CHATCMPL_ID_ALPHABET.len());
        out.push(char::from(CHATCMPL_ID_ALPHABET[idx]));
    }
    out
}

#[inline]
pub(crate) fn push_json_string_escaped(out: &mut String, value: &str) {
    let bytes = value.as_bytes();
    if bytes.iter().all(|&b| b >= 0x20 && b != b'"' && b != b'\\') {
        out.push('"');
        out.push_str(value);
        out.push('"');
        return;
    }

    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            c if c <= '\u{1f}' => {
                let control = c as u8;
                out.push_str("\\u00");
                out.push(char::from(HEX[(control >> 4) as usize]));
                out.push(char::from(HEX[(control & 0x0f) as usize]));
            }
            _ => out.push(ch),
        }
    }
    out.push('"');
}

#[inline]
pub(crate) fn push_u64_decimal(out: &mut String, mut n: u64) {
    if n == 0 {
        out.push('0');
        return;
    }

    let mut buf = [0u8; 20];
    let mut i = buf.len();
    while n > 0 {
        i -= 1;
        buf[i] = b'0' + ((n % 10) as u8);
        n /= 10;
    }
    let digits = std::str::from_utf8(&buf[i..]).unwrap_or("0");
    out.push_str(digits);
}

#[cfg(test)]
mod tests {
    use super::{generate_chatcmpl_id, push_json_string_escaped, push_u64_decimal};

    #[test]
    fn chatcmpl_id_shape() {
        let id = generate_chatcmpl_id();
        let suffix = id.strip_prefix("chatcmpl-").expect("prefix");
        assert_eq!(suffix.len(), 29);
        assert!(suffix.bytes().all(|b| b.is_ascii_alphanumeric()));
        assert_ne!(id, generate_chatcmpl_id());
    }

    #[test]
    fn push_u64_decimal_matches_formatter() {
        for n in [0_u64, 7, 10, 1_700_000_000, u64::MAX] {
            let mut out = String::new();
            push_u64_decimal(&mut out, n);
            assert_eq!(out, n.to_string());
        }
    }

    #[test]
    fn push_json_string_escaped_matches_serde_json() {
        let inputs = [
            "",
            "plain ascii",
            "quote \" and slash \\",
            "line\nbreak\r\n",
            "\u{08}\u{0c}\t",
            "control \u{001f} tail",
            "emoji 😀 café",
            "mix \"😀\\\n\t\r\u{0000}",
        ];

        for input in inputs {
            let mut out = String::new();
            push_json_string_escaped(&mut out, input);
            let expected = serde_json::to_string(input).expect("serialize");
            assert_eq!(out, expected);
        }
    }
}
