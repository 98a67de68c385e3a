//! Name-based dispatch through `Chaincode::invoke`.

#![allow(clippy::expect_used, clippy::panic)]

use electronics_ledger_contracts::{
    ASSIGNMENT_CONTRACT, ContractError, DEVICE_CONTRACT, ORDER_CONTRACT, assert_contract_error,
    testutil::{DEALER, DISTRIBUTOR, MANUFACTURER, TestNetwork, order_transient},
};

const D1_ARGS: [&str; 6] = ["D1", "Acme", "phone", "black", "AcmeCorp", "2024-01-01"];

async fn network_with_device() -> TestNetwork {
    let network = TestNetwork::new();
    network.submit(MANUFACTURER, DEVICE_CONTRACT, "CreateDevice", &D1_ARGS).await.expect("create");
    network
}

#[tokio::test]
async fn test_create_and_read_device_by_name() {
    let network = network_with_device().await;
    let json =
        network.evaluate(DEALER, DEVICE_CONTRACT, "ReadDevice", &["D1"]).await.expect("read");
    assert_eq!(
        json,
        r#"{"assetType":"electronicDevice","deviceId":"D1","color":"black","dateOfManufacture":"2024-01-01","brand":"Acme","deviceType":"phone","ownedBy":"AcmeCorp","status":"In Factory"}"#
    );
}

#[tokio::test]
async fn test_exists_returns_json_bool() {
    let network = network_with_device().await;
    let yes = network.evaluate(DEALER, DEVICE_CONTRACT, "DeviceExists", &["D1"]).await;
    assert_eq!(yes.expect("exists"), "true");
    let no = network.evaluate(DEALER, ASSIGNMENT_CONTRACT, "DeviceExists", &["D2"]).await;
    assert_eq!(no.expect("exists"), "false");
}

#[tokio::test]
async fn test_listings_are_json_arrays() {
    let network = TestNetwork::new();
    let empty = network.evaluate(DEALER, DEVICE_CONTRACT, "GetAllDevices", &[]).await;
    assert_eq!(empty.expect("all"), "[]");

    network.submit(MANUFACTURER, DEVICE_CONTRACT, "CreateDevice", &D1_ARGS).await.expect("create");
    let ranged = network
        .evaluate(DEALER, DEVICE_CONTRACT, "GetDevicesByRange", &["", ""])
        .await
        .expect("range");
    let parsed: serde_json::Value = serde_json::from_str(&ranged).expect("json");
    assert_eq!(parsed.as_array().map(Vec::len), Some(1));
    assert_eq!(parsed[0]["deviceId"], "D1");
}

#[tokio::test]
async fn test_history_is_json_with_original_field_names() {
    let network = network_with_device().await;
    network.submit(MANUFACTURER, DEVICE_CONTRACT, "DeleteDevice", &["D1"]).await.expect("delete");

    let json = network
        .evaluate(DEALER, DEVICE_CONTRACT, "GetDeviceHistory", &["D1"])
        .await
        .expect("history");
    let parsed: serde_json::Value = serde_json::from_str(&json).expect("json");
    assert_eq!(parsed[0]["isDelete"], false);
    assert_eq!(parsed[1]["isDelete"], true);
    assert_eq!(parsed[1]["record"]["deviceId"], "D1");
    assert!(parsed[1]["txId"].as_str().is_some_and(|id| id.len() == 64));
    assert!(parsed[1]["timestamp"].as_str().is_some_and(|ts| ts.ends_with(" UTC")));
}

#[tokio::test]
async fn test_order_functions_by_name() {
    let network = TestNetwork::new();
    let transient = order_transient("Acme", "laptop", "silver", "BestDeals");
    network
        .submit_with_transient(DEALER, transient, ORDER_CONTRACT, "CreateOrder", &["O1"])
        .await
        .expect("create");

    let exists = network.evaluate(DISTRIBUTOR, ORDER_CONTRACT, "OrderExists", &["O1"]).await;
    assert_eq!(exists.expect("exists"), "true");

    let order = network.evaluate(DEALER, ORDER_CONTRACT, "ReadOrder", &["O1"]).await;
    assert_eq!(
        order.expect("read"),
        r#"{"assetType":"electronicsOrder","color":"silver","dealerName":"BestDeals","brand":"Acme","deviceType":"laptop","orderID":"O1"}"#
    );

    let all = network.evaluate(MANUFACTURER, ORDER_CONTRACT, "GetAllOrders", &[]).await;
    assert!(all.expect("all").contains(r#""orderID":"O1""#));
    let ranged =
        network.evaluate(MANUFACTURER, ORDER_CONTRACT, "GetOrdersByRange", &["", ""]).await;
    assert!(ranged.expect("range").contains(r#""orderID":"O1""#));
}

#[tokio::test]
async fn test_assignment_functions_by_name() {
    let network = network_with_device().await;
    let receipt = network
        .submit(DISTRIBUTOR, ASSIGNMENT_CONTRACT, "AssignDeviceToRetailer", &["D1", "ShopCo", "3"])
        .await
        .expect("assign");
    assert_eq!(receipt, "Device D1 assigned to retailer ShopCo with quantity 3");

    let json = network
        .evaluate(DEALER, ASSIGNMENT_CONTRACT, "ReadDeviceAssignment", &["D1"])
        .await
        .expect("read");
    assert_eq!(
        json,
        r#"{"assetType":"DeviceAssignment","deviceID":"D1","retailerName":"ShopCo","quantity":"3"}"#
    );
}

#[tokio::test]
async fn test_wrong_argument_count_is_validation() {
    let network = TestNetwork::new();
    let tx = network.begin(MANUFACTURER);
    let args = vec!["D1".to_owned(), "Acme".to_owned()];
    let result = network.chaincode.invoke(&tx, DEVICE_CONTRACT, "CreateDevice", &args).await;
    assert_contract_error!(result, Validation);
    assert!(!tx.has_writes());

    let result = network.evaluate(DEALER, DEVICE_CONTRACT, "GetAllDevices", &["extra"]).await;
    assert_contract_error!(result, Validation);
}

#[tokio::test]
async fn test_unknown_names_are_rejected() {
    let network = TestNetwork::new();
    let err = network
        .evaluate(DEALER, DEVICE_CONTRACT, "UpdateDevice", &["D1"])
        .await
        .expect_err("no such function");
    match err {
        ContractError::UnknownFunction { contract, function } => {
            assert_eq!(contract, DEVICE_CONTRACT);
            assert_eq!(function, "UpdateDevice");
        },
        other => panic!("expected UnknownFunction, got {other:?}"),
    }

    let result = network.evaluate(DEALER, "RetailerContract", "DeviceExists", &["D1"]).await;
    assert_contract_error!(result, UnknownFunction);

    let result = network.evaluate(DEALER, ORDER_CONTRACT, "DeviceExists", &["D1"]).await;
    assert_contract_error!(result, UnknownFunction);
}

#[tokio::test]
async fn test_qualified_names_default_to_device_contract() {
    let network = network_with_device().await;
    let tx = network.begin(DEALER);
    let args = vec!["D1".to_owned()];
    let chaincode = &network.chaincode;

    let bare = chaincode.invoke_qualified(&tx, "DeviceExists", &args).await.expect("bare");
    assert_eq!(bare, "true");
    let empty = chaincode.invoke_qualified(&tx, ":DeviceExists", &args).await.expect("empty");
    assert_eq!(empty, "true");
    let qualified = chaincode
        .invoke_qualified(&tx, "ElectronicsOrderContract:OrderExists", &args)
        .await
        .expect("qualified");
    assert_eq!(qualified, "false");
}

#[tokio::test]
async fn test_contract_errors_pass_through_dispatch() {
    let network = TestNetwork::new();
    let result = network.submit(DEALER, DEVICE_CONTRACT, "CreateDevice", &D1_ARGS).await;
    assert_contract_error!(result, Authorization);
    let result = network.evaluate(DEALER, DEVICE_CONTRACT, "ReadDevice", &["D1"]).await;
    assert_contract_error!(result, NotFound);
}
