//! Switch controller integration tests
//!
//! Runs every controller operation against the in-memory switch controller
//! and checks the remote state it leaves behind.

use std::sync::Arc;

use dvs_mechd::{DvsError, SwitchController, DVS_PORTS_NUMBER, PORT_GROWTH_INCREMENT};
use dvs_test::{fixtures, FakeVim, SwitchVerifier};
use dvs_types::{Network, Port, Segment};
use dvs_vim::{FaultKind, VimError};
use pretty_assertions::assert_eq;

fn setup() -> (Arc<FakeVim>, SwitchController) {
    let vim = Arc::new(FakeVim::new().with_switch(fixtures::SWITCH_NAME));
    let controller = SwitchController::new(fixtures::SWITCH_NAME, vim.clone());
    (vim, controller)
}

fn first_segment(network: &Network) -> &Segment {
    network.segments.first().expect("fixture network has a segment")
}

/// Create then delete leaves no port-group behind
///
/// Scenario:
/// 1. Create the port-group for a VLAN network
/// 2. Delete it
/// 3. Delete it again: nothing to do, nothing sent
#[tokio::test]
async fn test_create_then_delete_leaves_nothing() {
    let (vim, controller) = setup();
    let verifier = SwitchVerifier::new(&vim);
    let net = fixtures::vlan_network("net-1", "web", 100);

    let created = controller
        .create_network(&net, first_segment(&net))
        .await
        .expect("create failed");
    assert!(created);
    verifier.assert_portgroup_exists("web-net-1").unwrap();
    verifier.assert_portgroup_vlan("web-net-1", 100).unwrap();
    verifier.assert_portgroup_blocked("web-net-1", false).unwrap();

    let pg = vim.portgroup("web-net-1").unwrap();
    assert_eq!(pg.num_ports, DVS_PORTS_NUMBER);
    assert_eq!(pg.description.as_deref(), Some(dvs_mechd::PORTGROUP_DESCRIPTION));

    assert!(controller.delete_network(&net).await.expect("delete failed"));
    verifier.assert_portgroup_absent("web-net-1").unwrap();

    vim.clear_calls();
    assert!(!controller.delete_network(&net).await.expect("second delete failed"));
    verifier.assert_call_count("destroy_portgroup", 0).unwrap();
}

#[tokio::test]
async fn test_admin_down_network_is_created_blocked() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100).with_admin_state_up(false);

    controller
        .create_network(&net, first_segment(&net))
        .await
        .unwrap();

    SwitchVerifier::new(&vim)
        .assert_portgroup_blocked("web-net-1", true)
        .unwrap();
}

#[tokio::test]
async fn test_create_existing_portgroup_reports_no_change() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);

    assert!(controller.create_network(&net, first_segment(&net)).await.unwrap());
    assert!(!controller.create_network(&net, first_segment(&net)).await.unwrap());
    assert_eq!(vim.portgroup_names(), vec!["web-net-1".to_string()]);
}

/// A create whose task wait timed out is safe to repeat
///
/// Scenario:
/// 1. Create is accepted remotely but waiting on the task times out
/// 2. The caller retries the create
/// 3. The retry sees DuplicateName and reports success without a second group
#[tokio::test]
async fn test_create_retry_after_wait_timeout() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    vim.fail_next("wait_for_task", VimError::timeout("wait_for_task"));

    let err = controller
        .create_network(&net, first_segment(&net))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let created = controller
        .create_network(&net, first_segment(&net))
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(vim.portgroup_names().len(), 1);
}

#[tokio::test]
async fn test_create_rejects_bad_input_without_remote_calls() {
    let (vim, controller) = setup();

    let out_of_range = Network::new("net-1", Some("web"))
        .with_segment(Segment::vlan("seg", fixtures::PHYSNET, 5000));
    let err = controller
        .create_network(&out_of_range, first_segment(&out_of_range))
        .await
        .unwrap_err();
    assert!(matches!(err, DvsError::InvalidSegment { .. }));

    let bad_name = fixtures::vlan_network("net-1", "web server", 100);
    let err = controller
        .create_network(&bad_name, first_segment(&bad_name))
        .await
        .unwrap_err();
    assert!(matches!(err, DvsError::InvalidName { .. }));

    assert!(vim.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_switch() {
    let vim = Arc::new(FakeVim::new().with_switch(fixtures::SWITCH_NAME));
    let controller = SwitchController::new("dvSwitch9", vim.clone());
    let net = fixtures::vlan_network("net-1", "web", 100);

    let err = controller
        .create_network(&net, first_segment(&net))
        .await
        .unwrap_err();
    assert!(matches!(err, DvsError::SwitchNotFound { .. }));
    assert_eq!(vim.mutation_count(), 0);
}

#[tokio::test]
async fn test_switch_in_second_datacenter_is_found() {
    let vim = Arc::new(
        FakeVim::new()
            .with_switch("dvSwitchA")
            .with_datacenter()
            .with_switch(fixtures::SWITCH_NAME),
    );
    let controller = SwitchController::new(fixtures::SWITCH_NAME, vim.clone());
    let net = fixtures::vlan_network("net-1", "web", 100);

    assert!(controller.create_network(&net, first_segment(&net)).await.unwrap());
    assert_eq!(vim.call_count("network_folder"), 2);
}

/// Repeating an update reconfigures at most once
///
/// Scenario:
/// 1. Network goes admin down: the port-group is blocked
/// 2. The same update is delivered again: nothing is sent
#[tokio::test]
async fn test_repeated_update_reconfigures_once() {
    let (vim, controller) = setup();
    let before = fixtures::vlan_network("net-1", "web", 100);
    let after = before.clone().with_admin_state_up(false);
    controller
        .create_network(&before, first_segment(&before))
        .await
        .unwrap();

    assert!(controller.update_network(&after, Some(&before)).await.unwrap());
    assert!(!controller.update_network(&after, Some(&before)).await.unwrap());

    assert_eq!(vim.call_count("reconfigure_portgroup"), 1);
    SwitchVerifier::new(&vim)
        .assert_portgroup_blocked("web-net-1", true)
        .unwrap();
}

#[tokio::test]
async fn test_update_without_admin_change_leaves_blocked_alone() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();

    let blocked = net.clone().with_admin_state_up(false);
    assert!(controller.update_network(&blocked, None).await.unwrap());

    // Admin state unchanged between original and current: remote value kept.
    assert!(!controller.update_network(&net, Some(&net)).await.unwrap());
    SwitchVerifier::new(&vim)
        .assert_portgroup_blocked("web-net-1", true)
        .unwrap();

    assert_eq!(vim.call_count("reconfigure_portgroup"), 1);
}

#[tokio::test]
async fn test_rename_follows_display_name() {
    let (vim, controller) = setup();
    let before = fixtures::vlan_network("net-1", "web", 100);
    let after = fixtures::vlan_network("net-1", "app", 100);
    controller
        .create_network(&before, first_segment(&before))
        .await
        .unwrap();

    assert!(controller.update_network(&after, Some(&before)).await.unwrap());

    let verifier = SwitchVerifier::new(&vim);
    verifier.assert_portgroup_absent("web-net-1").unwrap();
    verifier.assert_portgroup_exists("app-net-1").unwrap();
    verifier.assert_portgroup_vlan("app-net-1", 100).unwrap();

    // Delivered again after the rename went through.
    assert!(!controller.update_network(&after, Some(&before)).await.unwrap());
}

#[tokio::test]
async fn test_update_missing_portgroup() {
    let (_vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);

    let err = controller.update_network(&net, None).await.unwrap_err();
    assert!(matches!(err, DvsError::PortGroupNotFound { .. }));
    assert!(!err.is_retryable());
}

/// Booking and releasing are idempotent
///
/// Scenario:
/// 1. Book a port twice: same key, one lease
/// 2. Release twice: the second release sends nothing
#[tokio::test]
async fn test_book_and_release_are_idempotent() {
    let (vim, controller) = setup();
    let verifier = SwitchVerifier::new(&vim);
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();

    let port = fixtures::managed_port("port-1", "net-1");
    let key = controller.book_port(&net, &port).await.unwrap();
    let again = controller.book_port(&net, &port).await.unwrap();
    assert_eq!(key, again);
    assert_eq!(verifier.assert_port_leased("port-1").unwrap(), key);
    assert_eq!(vim.call_count("reconfigure_ports"), 1);

    assert!(controller.release_port(&port).await.unwrap());
    verifier.assert_no_lease("port-1").unwrap();

    vim.clear_calls();
    assert!(!controller.release_port(&port).await.unwrap());
    verifier.assert_call_count("reconfigure_ports", 0).unwrap();
}

#[tokio::test]
async fn test_distinct_ports_get_distinct_keys() {
    let (_vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();

    let a = fixtures::managed_port("port-a", "net-1");
    let b = fixtures::managed_port("port-b", "net-1");
    let a = controller.book_port(&net, &a).await.unwrap();
    let b = controller.book_port(&net, &b).await.unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_full_portgroup_grows_once() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();
    vim.occupy_all_ports("web-net-1");

    let port = fixtures::managed_port("port-1", "net-1");
    let key = controller.book_port(&net, &port).await.unwrap();

    let pg = vim.portgroup("web-net-1").unwrap();
    assert_eq!(pg.num_ports, DVS_PORTS_NUMBER + PORT_GROWTH_INCREMENT);
    assert_eq!(vim.ports_of("web-net-1").len() as u32, pg.num_ports);
    assert_eq!(SwitchVerifier::new(&vim).assert_port_leased("port-1").unwrap(), key);
}

#[tokio::test]
async fn test_book_without_portgroup() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);

    let port = fixtures::managed_port("port-1", "net-1");

    let err = controller.book_port(&net, &port).await.unwrap_err();
    assert!(matches!(err, DvsError::PortGroupNotFound { .. }));
    assert_eq!(vim.mutation_count(), 0);
}

#[tokio::test]
async fn test_stale_lease_write_is_transient() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();
    vim.fail_next(
        "reconfigure_ports",
        VimError::fault(FaultKind::ConcurrentAccess, "stale"),
    );

    let port = fixtures::managed_port("port-1", "net-1");

    let err = controller.book_port(&net, &port).await.unwrap_err();
    assert!(err.is_retryable());
    SwitchVerifier::new(&vim).assert_no_lease("port-1").unwrap();
}

#[tokio::test]
async fn test_port_blocked_state_follows_admin_state() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();
    let up = fixtures::managed_port("port-1", "net-1");
    controller.book_port(&net, &up).await.unwrap();

    let down = up.clone().with_admin_state_up(false);
    assert!(controller.switch_port_blocked_state(&down).await.unwrap());
    assert!(vim.leased_port("port-1").unwrap().blocked);
    assert!(!controller.switch_port_blocked_state(&down).await.unwrap());

    assert!(controller.switch_port_blocked_state(&up).await.unwrap());
    assert!(!vim.leased_port("port-1").unwrap().blocked);
}

#[tokio::test]
async fn test_admin_down_port_is_booked_blocked() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();
    let down = fixtures::managed_port("port-1", "net-1").with_admin_state_up(false);

    controller.book_port(&net, &down).await.unwrap();

    assert!(vim.leased_port("port-1").unwrap().blocked);
}

/// A recycled switch port does not inherit the previous holder's block
///
/// Scenario:
/// 1. Book a port for port-1, then block it (admin down)
/// 2. Release it
/// 3. Book for admin-up port-2: same switch port, unblocked
#[tokio::test]
async fn test_released_port_is_unblocked_for_next_lease() {
    let (vim, controller) = setup();
    let net = fixtures::vlan_network("net-1", "web", 100);
    controller.create_network(&net, first_segment(&net)).await.unwrap();
    let first = fixtures::managed_port("port-1", "net-1");

    let key = controller.book_port(&net, &first).await.unwrap();
    let down = first.clone().with_admin_state_up(false);
    assert!(controller.switch_port_blocked_state(&down).await.unwrap());
    assert!(controller.release_port(&down).await.unwrap());

    let second = fixtures::managed_port("port-2", "net-1");
    let reused = controller.book_port(&net, &second).await.unwrap();

    assert_eq!(reused, key);
    assert!(!vim.leased_port("port-2").unwrap().blocked);
}

#[tokio::test]
async fn test_blocked_state_of_unleased_port_is_noop() {
    let (vim, controller) = setup();
    let port = Port::new("port-9", "net-1").with_admin_state_up(false);

    assert!(!controller.switch_port_blocked_state(&port).await.unwrap());
    assert_eq!(vim.mutation_count(), 0);
}
