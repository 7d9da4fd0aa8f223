//! Property-based tests for board address classification

use proptest::prelude::*;

use boardmon_core::{Transport, TransportError};

proptest! {
    /// Any all-digit suffix after the device prefix selects the debug bridge
    #[test]
    fn device_ids_select_debug_bridge(suffix in "[0-9]{1,6}") {
        let address = format!("SL16x{suffix}");
        let transport = Transport::for_address(Some(&address), 5, 10).unwrap();
        match transport {
            Transport::Adb(t) => prop_assert_eq!(t.device_id(), address),
            Transport::Ssh(_) => prop_assert!(false, "expected debug-bridge transport"),
        }
    }

    /// Any in-range dotted quad selects the network shell. Hosts are drawn
    /// from the TEST-NET documentation ranges so the master connection the
    /// transport opens never targets a routable address.
    #[test]
    fn dotted_quads_select_network_shell(
        prefix in prop::sample::select(vec!["192.0.2", "198.51.100", "203.0.113"]),
        d in 0u8..=255,
    ) {
        let address = format!("{prefix}.{d}");
        let transport = Transport::for_address(Some(&address), 5, 10).unwrap();
        prop_assert!(matches!(transport, Transport::Ssh(_)));
    }

    /// Anything containing a character outside both grammars is rejected
    #[test]
    fn foreign_characters_are_rejected(address in "[a-z ]{1,8}[!@#:/ ][a-z0-9 ]{0,8}") {
        let result = Transport::for_address(Some(&address), 5, 10);
        prop_assert!(matches!(result, Err(TransportError::InvalidAddress(_))));
    }

    /// Leading or trailing garbage defeats a valid device id
    #[test]
    fn embedded_device_ids_are_rejected(prefix in "[a-z]{1,4}", suffix in "[a-z]{1,4}") {
        for address in [format!("{prefix}SL16x0"), format!("SL16x0{suffix}")] {
            let result = Transport::for_address(Some(&address), 5, 10);
            prop_assert!(
                matches!(result, Err(TransportError::InvalidAddress(_))),
                "address {:?} should be rejected", address
            );
        }
    }
}
