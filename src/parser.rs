//! Line helpers shared by the session and node dump parsers

/// Placeholder `iscsiadm` prints for unset values
pub const EMPTY_VALUE: &str = "<empty>";

/// Turns raw `iscsiadm` output into typed records
///
/// Parsing never fails: unparsable lines and blocks are dropped, so wholly
/// invalid input yields an empty `Vec`.
pub trait OutputParser {
    type Record;

    fn parse(&self, data: &[u8]) -> Vec<Self::Record>;
}

/// Split `line` at the first `delimiter`, trimming both halves
///
/// Values may themselves contain the delimiter. Lines without it, or with
/// an empty key, are not key/value lines.
pub fn split_key_value(line: &str, delimiter: char) -> Option<(&str, &str)> {
    let (key, value) = line.split_once(delimiter)?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

/// Map the `<empty>` placeholder to an empty string
pub fn normalize_value(value: &str) -> String {
    if value == EMPTY_VALUE {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_equals() {
        assert_eq!(
            split_key_value("node.name = iqn.X", '='),
            Some(("node.name", "iqn.X"))
        );
    }

    #[test]
    fn test_split_colon() {
        assert_eq!(
            split_key_value("iSCSI Connection State: LOGGED IN", ':'),
            Some(("iSCSI Connection State", "LOGGED IN"))
        );
    }

    #[test]
    fn test_split_first_occurrence_only() {
        assert_eq!(
            split_key_value("\t\tIface Initiatorname: iqn.1993-08.org.debian:01:abc", ':'),
            Some(("Iface Initiatorname", "iqn.1993-08.org.debian:01:abc"))
        );
        assert_eq!(
            split_key_value("node.discovery_address = a=b", '='),
            Some(("node.discovery_address", "a=b"))
        );
    }

    #[test]
    fn test_split_rejects_non_pairs() {
        assert_eq!(split_key_value("**********", ':'), None);
        assert_eq!(split_key_value(": value", ':'), None);
        assert_eq!(split_key_value("", '='), None);
    }

    #[test]
    fn test_normalize_value() {
        assert_eq!(normalize_value("<empty>"), "");
        assert_eq!(normalize_value("tcp"), "tcp");
    }
}
