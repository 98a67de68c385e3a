//! Name-based dispatch into the three contracts.
//!
//! Clients address a function by contract name and function name and pass
//! positional string arguments. Results come back as strings: receipts as
//! they are, everything else as JSON.
//!
//! | Contract | Functions |
//! |----------|-----------|
//! | `ElectronicDeviceContract` | `DeviceExists`, `CreateDevice`, `ReadDevice`, `DeleteDevice`, `GetAllDevices`, `GetDevicesByRange`, `GetDeviceHistory` |
//! | `ElectronicsOrderContract` | `OrderExists`, `CreateOrder`, `ReadOrder`, `DeleteOrder`, `GetAllOrders`, `GetOrdersByRange` |
//! | `ElectronicAssignmentContract` | `DeviceExists`, `AssignDeviceToRetailer`, `ReadDeviceAssignment` |

use electronics_ledger_storage::{StorageError, TransactionContext};
use serde::Serialize;

use crate::{
    assignment::ElectronicAssignmentContract,
    config::ContractConfig,
    device::{ElectronicDeviceContract, NewDevice},
    env::ContractEnv,
    error::{ContractError, ContractResult},
    order::ElectronicsOrderContract,
};

/// Name of the device registry contract.
pub const DEVICE_CONTRACT: &str = "ElectronicDeviceContract";

/// Name of the order vault contract.
pub const ORDER_CONTRACT: &str = "ElectronicsOrderContract";

/// Name of the assignment ledger contract.
pub const ASSIGNMENT_CONTRACT: &str = "ElectronicAssignmentContract";

/// The deployed contract set.
///
/// # Example
///
/// ```
/// use electronics_ledger_contracts::{Chaincode, ContractConfig};
/// use electronics_ledger_storage::{MemoryLedger, StaticIdentity};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let ledger = MemoryLedger::new();
/// let chaincode = Chaincode::new(ContractConfig::default());
///
/// let tx = ledger.begin(StaticIdentity::new("Org1MSP"));
/// let args: Vec<String> =
///     ["D1", "Acme", "phone", "black", "AcmeCorp", "2024-01-01"].map(String::from).into();
/// let receipt =
///     chaincode.invoke(&tx, "ElectronicDeviceContract", "CreateDevice", &args).await.unwrap();
/// assert_eq!(receipt, "Successfully added device D1");
/// tx.commit().unwrap();
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Chaincode {
    devices: ElectronicDeviceContract,
    orders: ElectronicsOrderContract,
    assignments: ElectronicAssignmentContract,
}

impl Chaincode {
    /// Contracts with the policy derived from `config` and no audit sink.
    #[must_use]
    pub fn new(config: ContractConfig) -> Self {
        Self::with_env(ContractEnv::new(config))
    }

    /// Contracts sharing `env`.
    #[must_use]
    pub fn with_env(env: ContractEnv) -> Self {
        Self {
            devices: ElectronicDeviceContract::new(env.clone()),
            orders: ElectronicsOrderContract::new(env.clone()),
            assignments: ElectronicAssignmentContract::new(env),
        }
    }

    /// Device registry.
    #[must_use]
    pub fn devices(&self) -> &ElectronicDeviceContract {
        &self.devices
    }

    /// Order vault.
    #[must_use]
    pub fn orders(&self) -> &ElectronicsOrderContract {
        &self.orders
    }

    /// Assignment ledger.
    #[must_use]
    pub fn assignments(&self) -> &ElectronicAssignmentContract {
        &self.assignments
    }

    /// Routes one call to a contract function.
    ///
    /// # Errors
    ///
    /// - [`ContractError::UnknownFunction`] for an unknown contract or function name
    /// - [`ContractError::Validation`] for a wrong argument count
    /// - whatever the contract function returns
    #[tracing::instrument(skip(self, ctx, args), fields(argc = args.len()))]
    pub async fn invoke<C>(
        &self,
        ctx: &C,
        contract: &str,
        function: &str,
        args: &[String],
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let result = match contract {
            DEVICE_CONTRACT => self.invoke_device(ctx, function, args).await,
            ORDER_CONTRACT => self.invoke_order(ctx, function, args).await,
            ASSIGNMENT_CONTRACT => self.invoke_assignment(ctx, function, args).await,
            _ => Err(unknown(contract, function)),
        };
        if let Err(e) = &result {
            tracing::debug!(error = %e, kind = %e.kind(), "invocation failed");
        }
        result
    }

    /// Routes a call addressed as `"Contract:Function"`.
    ///
    /// A name without a contract part goes to [`DEVICE_CONTRACT`], the
    /// default contract of the set.
    ///
    /// # Errors
    ///
    /// Same as [`invoke`](Self::invoke).
    pub async fn invoke_qualified<C>(
        &self,
        ctx: &C,
        name: &str,
        args: &[String],
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let (contract, function) = match name.split_once(':') {
            Some(("", function)) => (DEVICE_CONTRACT, function),
            Some((contract, function)) => (contract, function),
            None => (DEVICE_CONTRACT, name),
        };
        self.invoke(ctx, contract, function, args).await
    }

    async fn invoke_device<C>(
        &self,
        ctx: &C,
        function: &str,
        args: &[String],
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let devices = &self.devices;
        match function {
            "DeviceExists" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&devices.device_exists(ctx, id).await?)
            },
            "CreateDevice" => {
                let [id, brand, device_type, color, manufacturer, date] =
                    arity::<6>(function, args)?;
                let device = NewDevice::builder()
                    .device_id(id)
                    .brand(brand)
                    .device_type(device_type)
                    .color(color)
                    .manufacturer(manufacturer)
                    .date_of_manufacture(date)
                    .build();
                devices.create_device(ctx, device).await
            },
            "ReadDevice" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&devices.read_device(ctx, id).await?)
            },
            "DeleteDevice" => {
                let [id] = arity::<1>(function, args)?;
                devices.delete_device(ctx, id).await
            },
            "GetAllDevices" => {
                let [] = arity::<0>(function, args)?;
                to_json(&devices.get_all_devices(ctx).await?)
            },
            "GetDevicesByRange" => {
                let [start, end] = arity::<2>(function, args)?;
                to_json(&devices.get_devices_by_range(ctx, start, end).await?)
            },
            "GetDeviceHistory" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&devices.get_device_history(ctx, id).await?)
            },
            _ => Err(unknown(DEVICE_CONTRACT, function)),
        }
    }

    async fn invoke_order<C>(
        &self,
        ctx: &C,
        function: &str,
        args: &[String],
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let orders = &self.orders;
        match function {
            "OrderExists" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&orders.order_exists(ctx, id).await?)
            },
            "CreateOrder" => {
                let [id] = arity::<1>(function, args)?;
                orders.create_order(ctx, id).await
            },
            "ReadOrder" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&orders.read_order(ctx, id).await?)
            },
            "DeleteOrder" => {
                let [id] = arity::<1>(function, args)?;
                orders.delete_order(ctx, id).await.map(|()| String::new())
            },
            "GetAllOrders" => {
                let [] = arity::<0>(function, args)?;
                to_json(&orders.get_all_orders(ctx).await?)
            },
            "GetOrdersByRange" => {
                let [start, end] = arity::<2>(function, args)?;
                to_json(&orders.get_orders_by_range(ctx, start, end).await?)
            },
            _ => Err(unknown(ORDER_CONTRACT, function)),
        }
    }

    async fn invoke_assignment<C>(
        &self,
        ctx: &C,
        function: &str,
        args: &[String],
    ) -> ContractResult<String>
    where
        C: TransactionContext + ?Sized,
    {
        let assignments = &self.assignments;
        match function {
            "DeviceExists" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&assignments.device_exists(ctx, id).await?)
            },
            "AssignDeviceToRetailer" => {
                let [id, retailer, quantity] = arity::<3>(function, args)?;
                assignments.assign_device_to_retailer(ctx, id, retailer, quantity).await
            },
            "ReadDeviceAssignment" => {
                let [id] = arity::<1>(function, args)?;
                to_json(&assignments.read_device_assignment(ctx, id).await?)
            },
            _ => Err(unknown(ASSIGNMENT_CONTRACT, function)),
        }
    }
}

fn unknown(contract: &str, function: &str) -> ContractError {
    ContractError::UnknownFunction { contract: contract.to_owned(), function: function.to_owned() }
}

/// Checks the argument count and borrows the arguments as an array.
fn arity<'a, const N: usize>(function: &str, args: &'a [String]) -> ContractResult<[&'a str; N]> {
    if args.len() != N {
        return Err(ContractError::validation(format!(
            "{function} expects {N} argument(s), got {}",
            args.len()
        )));
    }
    Ok(std::array::from_fn(|i| args[i].as_str()))
}

fn to_json<T: Serialize>(value: &T) -> ContractResult<String> {
    serde_json::to_string(value).map_err(|e| {
        ContractError::from(StorageError::serialization_with_source("failed to encode result", e))
    })
}
