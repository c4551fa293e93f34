//! Privileged execution of migration units.
//!
//! Units are executed through `DependencyController.executeAsOwner`, which
//! only the owner of the Roles contract may call. Three paths cover every
//! deployment setup:
//!
//! 1. the deployer key is the owner: call directly;
//! 2. a development chain: fund the owner account and impersonate it;
//! 3. anything else (owner is a multisig): print the call for the
//!    operators and defer.

use alloy::network::TransactionBuilder;
use alloy::primitives::{Address, TxHash, U256};
use alloy::providers::Provider;
use alloy::rpc::types::TransactionRequest;
use anyhow::{bail, Context, Result};

use crate::chain::abi::{IDependencyController, IIsolatedLending};
use crate::chain::{require_success, Network, ADMIN_GAS_LIMIT};
use crate::model::resource::ContractKey;

/// How privileged calls reach the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    Direct,
    Impersonate,
    Manual,
}

impl Authority {
    pub fn resolve(deployer: Option<Address>, owner: Address, network: &Network) -> Authority {
        match deployer {
            Some(d) if d == owner => Authority::Direct,
            Some(_) if network.is_dev() => Authority::Impersonate,
            _ => Authority::Manual,
        }
    }
}

impl std::fmt::Display for Authority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Authority::Direct => "direct (deployer is owner)",
            Authority::Impersonate => "impersonated owner (dev chain)",
            Authority::Manual => "manual (owner instruction printed)",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOutcome {
    Executed(TxHash),
    /// The unit has no code: it self-destructed in an earlier run.
    AlreadyExecuted,
    /// Deployed but not executed; the owner instruction was printed.
    Deferred,
}

/// Executes deployed units under one authority. `wallet` signs as the
/// deployer; `reader` carries impersonated sends on dev chains (those go
/// out unsigned, the node signs for the impersonated account).
pub struct UnitExecutor<'a, W, R> {
    pub authority: Authority,
    pub wallet: Option<&'a W>,
    pub reader: &'a R,
    pub controller: Address,
    pub owner: Address,
}

impl<W: Provider, R: Provider> UnitExecutor<'_, W, R> {
    /// Run one migration unit through `executeAsOwner`, or print the
    /// owner instruction under manual authority.
    pub async fn execute(&self, unit: Address, name: ContractKey) -> Result<UnitOutcome> {
        if code_is_empty(self.reader, unit).await? {
            println!("  UNIT: {name} at {unit} has no code, already executed");
            return Ok(UnitOutcome::AlreadyExecuted);
        }

        match self.authority {
            Authority::Direct => {
                let wallet = self.wallet.context("direct execution requires a signer")?;
                let controller = IDependencyController::new(self.controller, wallet);
                let receipt = controller
                    .executeAsOwner(unit)
                    .gas(ADMIN_GAS_LIMIT)
                    .send()
                    .await
                    .with_context(|| format!("executeAsOwner({name})"))?
                    .get_receipt()
                    .await
                    .with_context(|| format!("receipt for {name}"))?;
                require_success(&receipt, name.as_str())?;
                self.verify_consumed(unit, name).await?;
                Ok(UnitOutcome::Executed(receipt.transaction_hash))
            }
            Authority::Impersonate => {
                let wallet = self
                    .wallet
                    .context("impersonated execution requires a funded deployer key")?;
                self.fund_owner(wallet).await?;
                impersonate(self.reader, self.owner, true).await?;
                let controller = IDependencyController::new(self.controller, self.reader);
                let receipt = controller
                    .executeAsOwner(unit)
                    .from(self.owner)
                    .gas(ADMIN_GAS_LIMIT)
                    .send()
                    .await
                    .with_context(|| format!("executeAsOwner({name}) as impersonated owner"))?
                    .get_receipt()
                    .await
                    .with_context(|| format!("receipt for {name}"))?;
                impersonate(self.reader, self.owner, false).await?;
                require_success(&receipt, name.as_str())?;
                self.verify_consumed(unit, name).await?;
                Ok(UnitOutcome::Executed(receipt.transaction_hash))
            }
            Authority::Manual => {
                print_execute_instruction(name.as_str(), self.controller, unit);
                Ok(UnitOutcome::Deferred)
            }
        }
    }

    /// One-time tranche slot registration on the lending contract. Not a
    /// unit: the owner calls the lending contract itself.
    pub async fn setup_tranche_slot(&self, lending: Address) -> Result<UnitOutcome> {
        match self.authority {
            Authority::Direct => {
                let wallet = self.wallet.context("direct execution requires a signer")?;
                let il = IIsolatedLending::new(lending, wallet);
                let receipt = il
                    .setupTrancheSlot()
                    .send()
                    .await
                    .context("setupTrancheSlot")?
                    .get_receipt()
                    .await
                    .context("setupTrancheSlot receipt")?;
                require_success(&receipt, "setupTrancheSlot")?;
                Ok(UnitOutcome::Executed(receipt.transaction_hash))
            }
            Authority::Impersonate => {
                let wallet = self
                    .wallet
                    .context("impersonated execution requires a funded deployer key")?;
                self.fund_owner(wallet).await?;
                impersonate(self.reader, self.owner, true).await?;
                let il = IIsolatedLending::new(lending, self.reader);
                let receipt = il
                    .setupTrancheSlot()
                    .from(self.owner)
                    .send()
                    .await
                    .context("setupTrancheSlot as impersonated owner")?
                    .get_receipt()
                    .await
                    .context("setupTrancheSlot receipt")?;
                impersonate(self.reader, self.owner, false).await?;
                require_success(&receipt, "setupTrancheSlot")?;
                Ok(UnitOutcome::Executed(receipt.transaction_hash))
            }
            Authority::Manual => {
                print_tranche_instruction(lending);
                Ok(UnitOutcome::Deferred)
            }
        }
    }

    /// Gift the owner account gas money before impersonating it. Dev
    /// chains only; the amount is a throwaway.
    async fn fund_owner(&self, wallet: &W) -> Result<()> {
        let tx = TransactionRequest::default()
            .with_to(self.owner)
            .with_value(U256::from(5u128 * 10u128.pow(18)));
        let receipt = wallet
            .send_transaction(tx)
            .await
            .context("funding owner for impersonation")?
            .get_receipt()
            .await
            .context("owner funding receipt")?;
        require_success(&receipt, "owner funding")?;
        Ok(())
    }

    /// Executed units must self-destruct; a unit that survives execution
    /// could be executed twice.
    async fn verify_consumed(&self, unit: Address, name: ContractKey) -> Result<()> {
        if !code_is_empty(self.reader, unit).await? {
            bail!("{name} at {unit} still has code after execution, expected self-destruct");
        }
        Ok(())
    }
}

pub async fn code_is_empty(provider: &impl Provider, addr: Address) -> Result<bool> {
    let code = provider.get_code_at(addr).await.context("eth_getCode")?;
    Ok(code.is_empty())
}

async fn impersonate(provider: &impl Provider, account: Address, start: bool) -> Result<()> {
    let method = if start {
        "anvil_impersonateAccount"
    } else {
        "anvil_stopImpersonatingAccount"
    };
    let _: () = provider
        .raw_request(method.into(), [account])
        .await
        .context(method)?;
    Ok(())
}

/// Owner instruction block for multisig operators. The wording is parsed
/// downstream; change nothing here without coordinating with the signers.
pub fn print_execute_instruction(name: &str, controller: Address, unit: Address) {
    println!();
    println!("##########################################");
    println!();
    println!("{name}:");
    println!("Call {controller} . execute ( {unit} )");
    println!();
    println!("##########################################");
    println!();
}

pub fn print_tranche_instruction(lending: Address) {
    println!();
    println!("##########################################");
    println!();
    println!("TrancheSlot:");
    println!("Call {lending} . setupTrancheSlot()");
    println!();
    println!("##########################################");
    println!();
}
