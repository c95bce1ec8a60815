//! Wire-protocol version negotiation helpers.

/// The first wire version whose peers accept the unified command protocol. Servers at
/// or beyond this version are exactly those that implement the `find` and `getMore`
/// commands, so the same threshold decides both.
pub(crate) const COMMAND_PROTOCOL_WIRE_VERSION: i32 = 3;

/// Whether a peer advertising the inclusive wire version range
/// `[min_wire_version, max_wire_version]` can be sent commands over the command
/// protocol.
///
/// Evaluated per connection, never cached: different pooled connections may be talking
/// to peers at different versions during a rolling upgrade.
pub(crate) fn supports_command_protocol(min_wire_version: i32, max_wire_version: i32) -> bool {
    min_wire_version <= COMMAND_PROTOCOL_WIRE_VERSION
        && COMMAND_PROTOCOL_WIRE_VERSION <= max_wire_version
}

#[cfg(test)]
mod test {
    use super::supports_command_protocol;

    #[test]
    fn range_must_contain_the_threshold() {
        assert!(supports_command_protocol(0, 3));
        assert!(supports_command_protocol(0, 8));
        assert!(supports_command_protocol(3, 3));
        assert!(supports_command_protocol(2, 6));

        assert!(!supports_command_protocol(0, 2));
        assert!(!supports_command_protocol(4, 8));
    }
}
