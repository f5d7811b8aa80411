//! iSCSI node database records
//!
//! Parses `iscsiadm -m node -o show`, which prints every record of the
//! iscsid node database as a block of `key = value` lines:
//!
//! ```text
//! # BEGIN RECORD 2.0-874
//! node.name = iqn.2015-10.com.dell:dellemc-foobar-123-a-7ceb34a3
//! node.tpgt = 1
//! node.conn[0].address = 192.168.1.1
//! node.conn[0].port = 3260
//! node.conn[0].iscsi.OFMarker = No
//! # END RECORD
//! ```

use crate::parser::{normalize_value, split_key_value, OutputParser};
use std::collections::BTreeMap;

/// Line prefix that opens a node block
pub const NODE_RECORD_MARKER: &str = "# BEGIN RECORD";
/// Line prefix that closes a node block
pub const NODE_RECORD_END: &str = "# END RECORD";

pub const NODE_NAME_KEY: &str = "node.name";
pub const NODE_ADDRESS_KEY: &str = "node.conn[0].address";
pub const NODE_PORT_KEY: &str = "node.conn[0].port";

/// One record from the iscsid node database
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IscsiNode {
    /// Target IQN, from `node.name`
    pub target: String,
    /// `address:port`, from `node.conn[0].address` and `node.conn[0].port`
    pub portal: String,
    /// Every key reported for the record, verbatim
    pub fields: BTreeMap<String, String>,
}

impl IscsiNode {
    /// Look up a raw field
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// Derive `target` and `portal` from the well-known keys
    fn finish(mut self) -> Self {
        if let Some(name) = self.fields.get(NODE_NAME_KEY) {
            self.target = name.clone();
        }
        if let Some(address) = self.fields.get(NODE_ADDRESS_KEY).filter(|a| !a.is_empty()) {
            self.portal = match self.fields.get(NODE_PORT_KEY).filter(|p| !p.is_empty()) {
                Some(port) if address.contains(':') => format!("[{}]:{}", address, port),
                Some(port) => format!("{}:{}", address, port),
                None => address.clone(),
            };
        }
        self
    }
}

#[derive(Debug)]
enum ScanState {
    ScanningForRecordStart,
    InRecord(IscsiNode),
}

impl ScanState {
    /// Close the open record, if any, into `out`
    fn flush(self, out: &mut Vec<IscsiNode>) {
        if let ScanState::InRecord(node) = self {
            out.push(node.finish());
        }
    }
}

/// Parser for `iscsiadm -m node -o show` output
#[derive(Debug, Default, Clone, Copy)]
pub struct NodeParser;

impl OutputParser for NodeParser {
    type Record = IscsiNode;

    fn parse(&self, data: &[u8]) -> Vec<IscsiNode> {
        let text = String::from_utf8_lossy(data);
        let mut nodes = Vec::new();
        let mut state = ScanState::ScanningForRecordStart;

        for line in text.lines() {
            let line = line.trim();
            if line.starts_with(NODE_RECORD_MARKER) {
                std::mem::replace(&mut state, ScanState::InRecord(IscsiNode::default()))
                    .flush(&mut nodes);
                continue;
            }
            if line.starts_with(NODE_RECORD_END) {
                std::mem::replace(&mut state, ScanState::ScanningForRecordStart)
                    .flush(&mut nodes);
                continue;
            }
            if line.starts_with('#') {
                continue;
            }

            if let ScanState::InRecord(node) = &mut state {
                if let Some((key, value)) = split_key_value(line, '=') {
                    // duplicate keys: last write wins
                    node.fields.insert(key.to_string(), normalize_value(value));
                }
            }
        }

        state.flush(&mut nodes);
        nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_NODES: &str = "\
# BEGIN RECORD 2.0-874
node.name = iqn.2015-10.com.dell:dellemc-foobar-123-a-7ceb34a3
node.tpgt = 1
node.startup = automatic
node.leading_login = No
iface.iscsi_ifacename = default
iface.transport_name = tcp
iface.initiatorname = <empty>
node.discovery_address = 192.168.1.1
node.discovery_port = 3260
node.session.auth.authmethod = None
node.session.auth.username = <empty>
node.session.auth.password = <empty>
node.conn[0].address = 192.168.1.1
node.conn[0].port = 3260
node.conn[0].startup = manual
node.conn[0].iscsi.HeaderDigest = None
node.conn[0].iscsi.IFMarker = No
node.conn[0].iscsi.OFMarker = No
# END RECORD
# BEGIN RECORD 2.0-874
node.name = iqn.2015-10.com.dell:dellemc-foobar-123-b-61ecc53a
node.tpgt = 1
node.startup = automatic
iface.transport_name = tcp
node.session.auth.authmethod = CHAP
node.session.auth.username = chapuser
node.session.auth.password = ********
node.conn[0].address = 192.168.1.2
node.conn[0].port = 3260
node.conn[0].iscsi.OFMarker = No
# END RECORD
";

    #[test]
    fn test_parse_two_nodes() {
        let nodes = NodeParser.parse(TWO_NODES.as_bytes());
        assert_eq!(nodes.len(), 2);

        let a = &nodes[0];
        assert_eq!(a.target, "iqn.2015-10.com.dell:dellemc-foobar-123-a-7ceb34a3");
        assert_eq!(a.portal, "192.168.1.1:3260");
        assert_eq!(a.field("node.name"), Some(a.target.as_str()));
        assert_eq!(a.field("node.conn[0].iscsi.OFMarker"), Some("No"));
        assert_eq!(a.field("iface.initiatorname"), Some(""));
        assert_eq!(a.fields.len(), 18);

        let b = &nodes[1];
        assert_eq!(b.target, "iqn.2015-10.com.dell:dellemc-foobar-123-b-61ecc53a");
        assert_eq!(b.portal, "192.168.1.2:3260");
        assert_eq!(b.field("node.name"), Some(b.target.as_str()));
        assert_eq!(b.field("node.conn[0].iscsi.OFMarker"), Some("No"));
        assert_eq!(b.field("node.session.auth.username"), Some("chapuser"));
    }

    #[test]
    fn test_invalid_input_is_empty() {
        assert!(NodeParser.parse(b"").is_empty());
        assert!(NodeParser.parse(b"iscsiadm: No records found\n").is_empty());
        assert!(NodeParser.parse(b"node.name = iqn.2015-10.com.dell:x\n").is_empty());
    }

    #[test]
    fn test_records_without_end_marker() {
        let nodes = NodeParser.parse(
            b"# BEGIN RECORD 2.1.4\nnode.name = iqn.a:1\n# BEGIN RECORD 2.1.4\nnode.name = iqn.b:2\n",
        );
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].target, "iqn.a:1");
        assert_eq!(nodes[1].target, "iqn.b:2");
        assert_eq!(nodes[1].portal, "");
    }

    #[test]
    fn test_lines_outside_records_ignored() {
        let nodes = NodeParser.parse(
            b"node.name = stray\n# BEGIN RECORD\nnode.name = iqn.a:1\ngarbage line\n# END RECORD\nnode.tpgt = 9\n",
        );
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].fields.len(), 1);
        assert_eq!(nodes[0].field("node.tpgt"), None);
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let nodes = NodeParser.parse(
            b"# BEGIN RECORD\nnode.startup = manual\nnode.startup = automatic\n# END RECORD\n",
        );
        assert_eq!(nodes[0].field("node.startup"), Some("automatic"));
    }

    #[test]
    fn test_portal_without_port_and_ipv6() {
        let nodes = NodeParser.parse(
            b"# BEGIN RECORD\nnode.conn[0].address = 10.0.0.5\n# END RECORD\n\
              # BEGIN RECORD\nnode.conn[0].port = 3260\nnode.conn[0].address = fe80::1\n# END RECORD\n",
        );
        assert_eq!(nodes[0].portal, "10.0.0.5");
        assert_eq!(nodes[1].portal, "[fe80::1]:3260");
    }
}
