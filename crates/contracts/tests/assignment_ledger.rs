//! Assignment ledger behavior, including both key layouts.

#![allow(clippy::expect_used, clippy::panic)]

use electronics_ledger_contracts::{
    ContractConfig, ElectronicDevice, KeyLayout, Operation,
    assets::{ASSIGNMENT_ASSET_TYPE, DEVICE_ASSET_TYPE},
    assert_contract_error,
    testutil::{DEALER, DISTRIBUTOR, MANUFACTURER, TestNetwork},
};

fn shared_network() -> TestNetwork {
    let config = ContractConfig::builder().key_layout(KeyLayout::Shared).build().expect("config");
    TestNetwork::with_config(config)
}

async fn assign(network: &TestNetwork, device_id: &str, retailer: &str, quantity: &str) {
    let tx = network.begin(DISTRIBUTOR);
    network
        .chaincode
        .assignments()
        .assign_device_to_retailer(&tx, device_id, retailer, quantity)
        .await
        .expect("assign");
    tx.commit().expect("commit");
}

#[tokio::test]
async fn test_distributor_assigns_existing_device() {
    let network = TestNetwork::new();
    network.create_device("D1").await;

    let tx = network.begin(DISTRIBUTOR);
    let receipt = network
        .chaincode
        .assignments()
        .assign_device_to_retailer(&tx, "D1", "ShopCo", "12")
        .await
        .expect("assign");
    assert_eq!(receipt, "Device D1 assigned to retailer ShopCo with quantity 12");
    tx.commit().expect("commit");

    let tx = network.begin(DEALER);
    let assignment =
        network.chaincode.assignments().read_device_assignment(&tx, "D1").await.expect("read");
    assert_eq!(assignment.device_id, "D1");
    assert_eq!(assignment.retailer_name, "ShopCo");
    assert_eq!(assignment.quantity, "12");
}

#[tokio::test]
async fn test_assigning_missing_device_is_not_found() {
    let network = TestNetwork::new();
    let tx = network.begin(DISTRIBUTOR);
    let result =
        network.chaincode.assignments().assign_device_to_retailer(&tx, "D9", "ShopCo", "1").await;
    assert_contract_error!(result, NotFound);
    assert!(!tx.has_writes());
}

#[tokio::test]
async fn test_only_distributor_may_assign() {
    let network = TestNetwork::new();
    network.create_device("D1").await;

    for (org, device) in [(MANUFACTURER, "D1"), (MANUFACTURER, "D9"), (DEALER, "D1")] {
        let tx = network.begin(org);
        let result =
            network.chaincode.assignments().assign_device_to_retailer(&tx, device, "R", "1").await;
        assert_contract_error!(result, Authorization, format!("{org} assigning {device}"));
        assert!(!tx.has_writes());
    }
}

#[tokio::test]
async fn test_reading_assignment_requires_device_and_record() {
    let network = TestNetwork::new();
    let tx = network.begin(DEALER);
    let assignments = network.chaincode.assignments();
    assert_contract_error!(assignments.read_device_assignment(&tx, "D1").await, NotFound);

    network.create_device("D1").await;
    let tx = network.begin(DEALER);
    let err = assignments.read_device_assignment(&tx, "D1").await.expect_err("no assignment");
    assert_eq!(err.to_string(), "the assignment D1 does not exist");
}

#[tokio::test]
async fn test_later_assignment_replaces_earlier() {
    let network = TestNetwork::new();
    network.create_device("D1").await;
    assign(&network, "D1", "ShopCo", "1").await;
    assign(&network, "D1", "MegaMart", "7").await;

    let tx = network.begin(DEALER);
    let assignment =
        network.chaincode.assignments().read_device_assignment(&tx, "D1").await.expect("read");
    assert_eq!(assignment.retailer_name, "MegaMart");
    assert_eq!(assignment.quantity, "7");
}

#[tokio::test]
async fn test_namespaced_layout_keeps_device_and_assignment() {
    let network = TestNetwork::new();
    network.create_device("D1").await;
    assign(&network, "D1", "ShopCo", "2").await;

    let tx = network.begin(DEALER);
    let device = network.chaincode.devices().read_device(&tx, "D1").await.expect("device");
    assert_eq!(device.brand, "Acme");
    let assignment =
        network.chaincode.assignments().read_device_assignment(&tx, "D1").await.expect("read");
    assert_eq!(assignment.retailer_name, "ShopCo");
}

#[tokio::test]
async fn test_shared_layout_detects_record_of_wrong_type() {
    let network = shared_network();
    network.create_device("D1").await;

    let tx = network.begin(DEALER);
    let result = network.chaincode.assignments().read_device_assignment(&tx, "D1").await;
    assert_contract_error!(result, Deserialization);

    assign(&network, "D1", "ShopCo", "2").await;
    let tx = network.begin(DEALER);
    assert_contract_error!(
        network.chaincode.devices().read_device(&tx, "D1").await,
        Deserialization
    );
    let assignment =
        network.chaincode.assignments().read_device_assignment(&tx, "D1").await.expect("read");
    assert_eq!(assignment.retailer_name, "ShopCo");
}

#[tokio::test]
async fn test_shared_layout_listings_skip_assignments() {
    let network = shared_network();
    network.create_device("D1").await;
    network.create_device("D2").await;
    assign(&network, "D1", "ShopCo", "2").await;

    let tx = network.begin(DEALER);
    let devices = network.chaincode.devices();
    let ranged = devices.get_devices_by_range(&tx, "", "").await.expect("range");
    assert_eq!(ranged.len(), 1);
    assert_eq!(ranged[0].device_id, "D2");

    assert_eq!(network.ledger.open_iterators(), 0);
}

#[tokio::test]
async fn test_shared_layout_history_keeps_every_change() {
    let network = shared_network();
    network.create_device("D1").await;
    assign(&network, "D1", "ShopCo", "2").await;

    let tx = network.begin(MANUFACTURER);
    network.chaincode.devices().delete_device(&tx, "D1").await.expect("delete");
    tx.commit().expect("commit");

    let tx = network.begin(DEALER);
    let history = network.chaincode.devices().get_device_history(&tx, "D1").await.expect("history");
    assert_eq!(history.len(), 3);

    assert!(!history[0].is_delete);
    assert_eq!(history[0].record.asset_type, DEVICE_ASSET_TYPE);
    assert_eq!(history[0].record.brand, "Acme");

    assert!(!history[1].is_delete);
    assert_eq!(history[1].record, ElectronicDevice::snapshot_of("D1", ASSIGNMENT_ASSET_TYPE));

    assert!(history[2].is_delete);
    assert_eq!(history[2].record, ElectronicDevice::placeholder("D1"));
}

#[tokio::test]
async fn test_assignment_audit_carries_retailer_and_quantity() {
    let network = TestNetwork::new();
    network.create_device("D1").await;
    assign(&network, "D1", "ShopCo", "4").await;

    let events = network.audit.events();
    let event = events.last().expect("assignment event");
    assert_eq!(event.action, Operation::AssignDevice);
    assert_eq!(event.resource, "assignment:D1");
    assert_eq!(event.metadata.get("retailer").map(String::as_str), Some("ShopCo"));
    assert_eq!(event.metadata.get("quantity").map(String::as_str), Some("4"));
}
