//! Protocol router: classifies an inbound payload as JSON-RPC or MCP.
//!
//! In `auto` mode the router peeks at the start of the payload rather than
//! fully parsing it, so classification is cheap and happens before the C1
//! codec is invoked.

use vxd_config::ProtocolMode;

/// The wire protocol a payload was classified as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// JSON-RPC 2.0.
    JsonRpc,
    /// MCP tool-call envelope.
    Mcp,
}

/// Classify `payload` per `mode`. `Auto` peeks the payload's prefix;
/// `JsonRpc`/`Mcp` skip detection entirely.
#[must_use]
pub fn classify(payload: &[u8], mode: ProtocolMode) -> Protocol {
    match mode {
        ProtocolMode::JsonRpc => Protocol::JsonRpc,
        ProtocolMode::Mcp => Protocol::Mcp,
        ProtocolMode::Auto => classify_auto(payload),
    }
}

fn classify_auto(payload: &[u8]) -> Protocol {
    const JSONRPC_PREFIXES: [&[u8]; 3] = [br#"{"method"#, br#"{"id"#, br#"{"jsonrpc"#];
    const MCP_PREFIX: &[u8] = br#"{"tool"#;

    if JSONRPC_PREFIXES.iter().any(|p| payload.starts_with(p)) {
        return Protocol::JsonRpc;
    }
    if payload.starts_with(MCP_PREFIX) {
        return Protocol::Mcp;
    }
    // Starts with `{` but matches nothing above, or doesn't start with `{`
    // at all: default to JSON-RPC and let the codec report a parse error.
    Protocol::JsonRpc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_jsonrpc_by_method_field() {
        assert_eq!(classify(br#"{"method":"ping"}"#, ProtocolMode::Auto), Protocol::JsonRpc);
    }

    #[test]
    fn detects_jsonrpc_by_id_field() {
        assert_eq!(classify(br#"{"id":1}"#, ProtocolMode::Auto), Protocol::JsonRpc);
    }

    #[test]
    fn detects_mcp_by_tool_field() {
        assert_eq!(classify(br#"{"tool":"add_voxel"}"#, ProtocolMode::Auto), Protocol::Mcp);
    }

    #[test]
    fn unmatched_object_defaults_to_jsonrpc() {
        assert_eq!(classify(br#"{"foo":1}"#, ProtocolMode::Auto), Protocol::JsonRpc);
    }

    #[test]
    fn non_object_defaults_to_jsonrpc() {
        assert_eq!(classify(b"not json at all", ProtocolMode::Auto), Protocol::JsonRpc);
    }

    #[test]
    fn forced_mode_skips_detection() {
        assert_eq!(classify(br#"{"tool":"x"}"#, ProtocolMode::JsonRpc), Protocol::JsonRpc);
        assert_eq!(classify(br#"{"method":"x"}"#, ProtocolMode::Mcp), Protocol::Mcp);
    }
}
