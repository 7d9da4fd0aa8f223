//! Transport selection through the public API

use boardmon_core::{Transport, TransportError};

#[test]
fn test_default_device_over_debug_bridge() {
    let transport = Transport::for_address(None, 5, 10).unwrap();
    assert!(matches!(transport, Transport::Adb(_)));
}

#[test]
fn test_device_id_over_debug_bridge() {
    match Transport::for_address(Some("SL16x2"), 5, 10).unwrap() {
        Transport::Adb(t) => assert_eq!(t.device_id(), "SL16x2"),
        Transport::Ssh(_) => panic!("expected debug-bridge transport"),
    }
}

#[test]
fn test_ipv4_over_network_shell() {
    // TEST-NET address so the pooled master never targets a real host
    match Transport::for_address(Some("203.0.113.13"), 5, 10).unwrap() {
        Transport::Ssh(t) => assert_eq!(t.address(), "203.0.113.13"),
        Transport::Adb(_) => panic!("expected network-shell transport"),
    }
}

#[test]
fn test_rejected_addresses() {
    for addr in [
        "",
        "board",
        "SL16x",
        "sl16x0",
        "SL16x0 ",
        "192.168.1",
        "192.168.1.256",
        "192.168.1.10:22",
        "fe80::1",
    ] {
        let err = Transport::for_address(Some(addr), 5, 10).unwrap_err();
        assert!(
            matches!(err, TransportError::InvalidAddress(_)),
            "address {addr:?} should be rejected"
        );
    }
}

#[tokio::test]
async fn test_debug_bridge_refuses_shell_metacharacters() {
    let transport = Transport::for_address(None, 5, 10).unwrap();
    let err = transport.run("cat /proc/stat | head -1").await.unwrap_err();
    assert!(matches!(err, TransportError::UnsupportedSyntax { .. }));
}
