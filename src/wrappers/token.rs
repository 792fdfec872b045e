use alloy::primitives::{Address, U256};

use crate::abi::NeverminedToken;
use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::ContractProxy;
use crate::error::Result;
use crate::transaction::TxOptions;

/// The ERC-20 token used for payments.
#[derive(Debug, Clone)]
pub struct Token {
    contract: ContractProxy,
}

impl Token {
    pub const CONTRACT_NAME: &'static str = "NeverminedToken";

    pub fn new(ctx: &KeeperContext) -> Result<Self> {
        Ok(Self {
            contract: ctx.contract(Self::CONTRACT_NAME)?,
        })
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    pub async fn get_token_balance(&self, account: Address) -> Result<U256> {
        self.contract
            .call(NeverminedToken::balanceOfCall { account })
            .await
    }

    pub async fn get_allowance(&self, owner: Address, spender: Address) -> Result<U256> {
        self.contract
            .call(NeverminedToken::allowanceCall { owner, spender })
            .await
    }

    /// Allows `spender` to move up to `amount` tokens of `account`.
    pub async fn token_approve(&self, spender: Address, amount: U256, account: &Account) -> Result<bool> {
        log::debug!(
            "Approving {amount} tokens of {} for {}",
            account.address(),
            ContractProxy::to_checksum_address(spender)
        );
        self.contract
            .transact_and_confirm(
                NeverminedToken::approveCall { spender, amount },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn transfer(&self, recipient: Address, amount: U256, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NeverminedToken::transferCall { recipient, amount },
                TxOptions::from_account(account),
            )
            .await
    }

    pub async fn total_supply(&self) -> Result<U256> {
        self.contract.call(NeverminedToken::totalSupplyCall {}).await
    }

    pub async fn increase_allowance(
        &self,
        spender: Address,
        added_value: U256,
        owner: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NeverminedToken::increaseAllowanceCall {
                    spender,
                    addedValue: added_value,
                },
                TxOptions::from_account(owner),
            )
            .await
    }

    pub async fn decrease_allowance(
        &self,
        spender: Address,
        subtracted_value: U256,
        owner: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NeverminedToken::decreaseAllowanceCall {
                    spender,
                    subtractedValue: subtracted_value,
                },
                TxOptions::from_account(owner),
            )
            .await
    }
}
