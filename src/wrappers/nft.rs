//! ERC-1155 and ERC-721 contracts minting NFTs attached to DIDs.

use alloy::primitives::{Address, B256, Bytes, U256};

use crate::abi::{NFT721Upgradeable, NFTUpgradeable};
use crate::account::Account;
use crate::context::KeeperContext;
use crate::contract::ContractProxy;
use crate::error::Result;
use crate::transaction::TxOptions;
use crate::utils::did_to_token_id;

/// Multi-edition NFTs, one token id per DID.
#[derive(Debug, Clone)]
pub struct Nft1155 {
    contract: ContractProxy,
}

impl Nft1155 {
    pub const CONTRACT_NAME: &'static str = "NFTUpgradeable";

    pub fn new(ctx: &KeeperContext) -> Result<Self> {
        Ok(Self {
            contract: ctx.contract(Self::CONTRACT_NAME)?,
        })
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub async fn is_approved_for_all(&self, account: Address, operator: Address) -> Result<bool> {
        self.contract
            .call(NFTUpgradeable::isApprovedForAllCall { account, operator })
            .await
    }

    pub async fn set_proxy_approval(
        &self,
        operator: Address,
        approved: bool,
        from: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::setProxyApprovalCall { operator, approved },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn proxy_set_approval_for_all(
        &self,
        account: Address,
        operator: Address,
        approved: bool,
        from: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::proxySetApprovalForAllCall {
                    account,
                    operator,
                    approved,
                },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn set_approval_for_all(
        &self,
        operator: Address,
        approved: bool,
        from: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::setApprovalForAllCall { operator, approved },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn mint(
        &self,
        to: Address,
        did: B256,
        amount: U256,
        data: Bytes,
        from: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::mintCall {
                    to,
                    id: did_to_token_id(did),
                    amount,
                    data,
                },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn burn(&self, to: Address, did: B256, amount: U256, from: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::burnCall {
                    to,
                    id: did_to_token_id(did),
                    amount,
                },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn add_minter(&self, minter: Address, from: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::addMinterCall { account: minter },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn balance(&self, account: Address, did: B256) -> Result<U256> {
        self.contract
            .call(NFTUpgradeable::balanceOfCall {
                account,
                id: did_to_token_id(did),
            })
            .await
    }

    /// Moves `amount` editions of `did` from `account` to `to`.
    pub async fn transfer_nft(
        &self,
        did: B256,
        to: Address,
        amount: U256,
        account: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFTUpgradeable::safeTransferFromCall {
                    from: account.address(),
                    to,
                    id: did_to_token_id(did),
                    amount,
                    data: Bytes::new(),
                },
                TxOptions::from_account(account),
            )
            .await
    }
}

/// Single-edition NFTs, the token id being the DID.
#[derive(Debug, Clone)]
pub struct Nft721 {
    contract: ContractProxy,
}

impl Nft721 {
    pub const CONTRACT_NAME: &'static str = "NFT721Upgradeable";

    pub fn new(ctx: &KeeperContext) -> Result<Self> {
        Ok(Self {
            contract: ctx.contract(Self::CONTRACT_NAME)?,
        })
    }

    pub fn contract(&self) -> &ContractProxy {
        &self.contract
    }

    pub async fn is_approved_for_all(&self, owner: Address, operator: Address) -> Result<bool> {
        self.contract
            .call(NFT721Upgradeable::isApprovedForAllCall { owner, operator })
            .await
    }

    pub async fn approve(&self, to: Address, did: B256, from: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFT721Upgradeable::approveCall {
                    to,
                    tokenId: did_to_token_id(did),
                },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn set_approval_for_all(
        &self,
        operator: Address,
        approved: bool,
        from: &Account,
    ) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFT721Upgradeable::setApprovalForAllCall { operator, approved },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn mint(&self, did: B256, from: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFT721Upgradeable::mintCall {
                    to: from.address(),
                    tokenId: did_to_token_id(did),
                },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn burn(&self, did: B256, from: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFT721Upgradeable::burnCall {
                    tokenId: did_to_token_id(did),
                },
                TxOptions::from_account(from),
            )
            .await
    }

    pub async fn add_minter(&self, minter: Address, from: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFT721Upgradeable::addMinterCall { account: minter },
                TxOptions::from_account(from),
            )
            .await
    }

    /// Number of tokens held by `owner`.
    pub async fn balance(&self, owner: Address) -> Result<U256> {
        self.contract
            .call(NFT721Upgradeable::balanceOfCall { owner })
            .await
    }

    pub async fn owner(&self, did: B256) -> Result<Address> {
        self.contract
            .call(NFT721Upgradeable::ownerOfCall {
                tokenId: did_to_token_id(did),
            })
            .await
    }

    pub async fn transfer_nft(&self, did: B256, to: Address, account: &Account) -> Result<bool> {
        self.contract
            .transact_and_confirm(
                NFT721Upgradeable::safeTransferFromCall {
                    from: account.address(),
                    to,
                    tokenId: did_to_token_id(did),
                },
                TxOptions::from_account(account),
            )
            .await
    }
}
