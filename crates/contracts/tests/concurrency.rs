//! Concurrent invocations racing on the same keys.

#![allow(clippy::expect_used, clippy::panic)]

use std::sync::Arc;

use electronics_ledger_contracts::{
    ContractError, ErrorKind,
    testutil::{DEALER, DISTRIBUTOR, MANUFACTURER, TestNetwork, new_device, order_transient},
};
use electronics_ledger_storage::StorageError;

#[tokio::test]
async fn test_concurrent_creates_first_commit_wins() {
    let network = TestNetwork::new();
    let first = network.begin(MANUFACTURER);
    let second = network.begin(MANUFACTURER);

    let devices = network.chaincode.devices();
    devices.create_device(&first, new_device("D1")).await.expect("first simulate");
    let mut late = new_device("D1");
    late.color = "white".to_owned();
    devices.create_device(&second, late).await.expect("second simulate");

    first.commit().expect("first commit");
    let err = second.commit().expect_err("second commit must conflict");
    assert!(matches!(err, StorageError::Conflict { .. }), "{err:?}");

    let device = devices.read_device(&network.begin(DEALER), "D1").await.expect("read");
    assert_eq!(device.color, "black");
    assert_eq!(network.ledger.height(), 1);
}

#[tokio::test]
async fn test_conflict_surfaces_as_ledger_io_through_submit() {
    let network = TestNetwork::new();
    let stale = network.begin(MANUFACTURER);
    network.chaincode.devices().create_device(&stale, new_device("D1")).await.expect("simulate");

    network.create_device("D1").await;

    let err: ContractError = stale.commit().expect_err("conflict").into();
    assert_eq!(err.kind(), ErrorKind::LedgerIo);
}

#[tokio::test]
async fn test_delete_racing_assignment_conflicts() {
    let network = TestNetwork::new();
    network.create_device("D1").await;

    let delete = network.begin(MANUFACTURER);
    let assign = network.begin(DISTRIBUTOR);
    network.chaincode.devices().delete_device(&delete, "D1").await.expect("delete");
    network
        .chaincode
        .assignments()
        .assign_device_to_retailer(&assign, "D1", "ShopCo", "1")
        .await
        .expect("assign");

    delete.commit().expect("delete commits first");
    assert!(matches!(assign.commit(), Err(StorageError::Conflict { .. })));
    assert_eq!(network.ledger.committed_state("assignment:D1"), None);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_orders_from_parallel_tasks() {
    let network = Arc::new(TestNetwork::new());
    let colors = ["red", "green", "blue", "black"];
    let mut handles = Vec::new();
    for color in colors {
        let network = Arc::clone(&network);
        handles.push(tokio::spawn(async move {
            let tx = network
                .begin(DEALER)
                .with_transient(order_transient("Acme", "phone", color, "BestDeals"));
            network.chaincode.orders().create_order(&tx, "O1").await?;
            tx.commit().map_err(ContractError::from)
        }));
    }

    let mut committed = 0;
    for handle in handles {
        match handle.await.expect("task") {
            Ok(()) => committed += 1,
            Err(e) if matches!(e.kind(), ErrorKind::LedgerIo | ErrorKind::AlreadyExists) => {},
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(committed, 1, "exactly one order creation may commit");

    let order =
        network.chaincode.orders().read_order(&network.begin(DEALER), "O1").await.expect("read");
    assert!(colors.contains(&order.color.as_str()));
}

#[tokio::test]
async fn test_read_only_invocations_do_not_conflict() {
    let network = TestNetwork::new();
    network.create_device("D1").await;

    let reader = network.begin(DEALER);
    network.chaincode.devices().read_device(&reader, "D1").await.expect("read");
    network.create_device("D2").await;
    reader.commit().expect("reads of untouched keys still validate");
}
