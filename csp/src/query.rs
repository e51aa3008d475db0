/// The query parameter map handed to executed scripts.
///
/// Pairs keep insertion order and are rebuilt fresh per query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Parse a `key=value&key2=value2` query string.
    pub fn parse(query: &str) -> Self {
        let bytes = query.as_bytes();
        let mut pos = 0;
        let mut pairs = Vec::new();
        while pos < bytes.len() {
            let key = parse_component(bytes, &mut pos, b'=');
            let value = parse_component(bytes, &mut pos, b'&');
            pairs.push((key, value));
        }
        QueryParams { pairs }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Re-serialize as `key=value&key2=value2`, decoded values as-is, for
    /// substitution into an execute command template.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Decode one key or value run up to `delim`, consuming the delimiter.
///
/// A `%` followed by two characters decodes to the byte `10*d1 + d2`,
/// treating both characters as base-10 digits. This is deliberately not
/// standard hexadecimal percent-encoding; it reproduces the established
/// wire behavior. A `%` cut short by end of input truncates the run.
fn parse_component(bytes: &[u8], pos: &mut usize, delim: u8) -> String {
    let mut out = Vec::new();

    while *pos < bytes.len() && bytes[*pos] != delim {
        if bytes[*pos] == b'%' {
            *pos += 1;
            let Some(&hi) = bytes.get(*pos) else { break };
            *pos += 1;
            let Some(&lo) = bytes.get(*pos) else { break };
            *pos += 1;
            let byte = hi
                .wrapping_sub(b'0')
                .wrapping_mul(10)
                .wrapping_add(lo.wrapping_sub(b'0'));
            out.push(byte);
        } else {
            out.push(bytes[*pos]);
            *pos += 1;
        }
    }

    if *pos < bytes.len() {
        *pos += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_pairs_in_order() {
        let q = QueryParams::parse("a=1&b=2");
        let pairs: Vec<_> = q.iter().collect();
        assert_eq!(pairs, vec![("a", "1"), ("b", "2")]);
    }

    #[test]
    fn percent_decoding_is_decimal_not_hex() {
        // %41 is byte 41 (')'), not 0x41 ('A').
        let q = QueryParams::parse("k=%41");
        assert_eq!(q.get("k"), Some(")"));
    }

    #[test]
    fn truncated_percent_sequence_ends_run() {
        let q = QueryParams::parse("k=ab%4");
        assert_eq!(q.get("k"), Some("ab"));

        let q = QueryParams::parse("k=ab%");
        assert_eq!(q.get("k"), Some("ab"));
    }

    #[test]
    fn percent_decodes_in_keys_too() {
        let q = QueryParams::parse("%97=x");
        assert_eq!(q.get("a"), Some("x"));
    }

    #[test]
    fn missing_value_is_empty() {
        let q = QueryParams::parse("k=");
        assert_eq!(q.get("k"), Some(""));
    }

    #[test]
    fn empty_query_is_empty_map() {
        assert!(QueryParams::parse("").is_empty());
    }

    #[test]
    fn round_trips_to_query_string() {
        let q = QueryParams::parse("hello=world&foo=bar");
        assert_eq!(q.to_query_string(), "hello=world&foo=bar");
    }
}
