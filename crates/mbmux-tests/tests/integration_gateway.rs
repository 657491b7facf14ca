// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Concurrency tests: many clients sharing one device connection.

use std::time::Duration;

use mbmux_tests::common::{request_with_txn, txn_of, DeviceBehavior, MockDevice, ProxyHarness};

#[tokio::test]
async fn test_staggered_clients_are_served_in_arrival_order() {
    // Each request takes 40ms at the device while clients submit 50ms
    // apart, so later submissions overlap earlier ones in the queue.
    let device = MockDevice::spawn(DeviceBehavior::slow(Duration::from_millis(40))).await;
    let harness = ProxyHarness::start(device.addr()).await;

    let mut callers = Vec::new();
    for txn in 1u16..=6 {
        let mut client = harness.client().await;
        callers.push(tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50 * txn as u64)).await;
            let reply = client.exchange(&request_with_txn(txn)).await.unwrap();
            txn_of(&reply)
        }));
    }

    // Every client gets the reply to its own request.
    for (i, caller) in callers.into_iter().enumerate() {
        assert_eq!(caller.await.unwrap(), i as u16 + 1);
    }

    // Requests reached the device in submission order.
    assert_eq!(device.arrivals().await, (1u16..=6).collect::<Vec<_>>());
    harness.shutdown().await;
}

#[tokio::test]
async fn test_at_most_one_request_in_flight() {
    let device = MockDevice::spawn(DeviceBehavior::slow(Duration::from_millis(20))).await;
    let harness = ProxyHarness::start(device.addr()).await;

    let mut callers = Vec::new();
    for txn in 1u16..=8 {
        let mut client = harness.client().await;
        callers.push(tokio::spawn(async move {
            let reply = client.exchange(&request_with_txn(txn)).await.unwrap();
            txn_of(&reply)
        }));
    }

    for caller in callers {
        caller.await.unwrap();
    }

    assert_eq!(device.max_in_flight(), 1);
    assert_eq!(device.connection_count(), 1);
    harness.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_replies_are_never_crossed() {
    let device = MockDevice::spawn(DeviceBehavior::slow(Duration::from_millis(5))).await;
    let harness = ProxyHarness::start(device.addr()).await;

    let mut callers = Vec::new();
    for txn in 100u16..140 {
        let mut client = harness.client().await;
        callers.push(tokio::spawn(async move {
            let reply = client.exchange(&request_with_txn(txn)).await.unwrap();
            (txn, txn_of(&reply))
        }));
    }

    for caller in callers {
        let (sent, received) = caller.await.unwrap();
        assert_eq!(sent, received);
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_client_gone_mid_request_does_not_stall_the_queue() {
    let device = MockDevice::spawn(DeviceBehavior::slow(Duration::from_millis(80))).await;
    let harness = ProxyHarness::start(device.addr()).await;

    // First client disappears while its request is in service.
    let mut doomed = harness.client().await;
    doomed.send(&request_with_txn(1)).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    drop(doomed);

    // The device still answers it (into the void) and the next request
    // is served normally.
    let mut survivor = harness.client().await;
    let reply = survivor.exchange(&request_with_txn(2)).await.unwrap();
    assert_eq!(txn_of(&reply), 2);

    assert_eq!(device.arrivals().await, vec![1, 2]);
    drop(survivor);
    harness.shutdown().await;
}
