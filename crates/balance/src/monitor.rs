use crate::{Balance, BalanceQuery, Monitor};
use alloy_primitives::{Address, U256};
use binding::{bank::ITokenBank, token::IERC20};
use client::{read_contract, Wallet, WalletError};
use eyre::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything the client shows for one token, read in one go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenSnapshot {
    pub token: Address,
    pub owner: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    /// Tokens held by the owner
    pub token_balance: U256,
    /// Tokens the bank holds for the owner
    pub bank_balance: U256,
    /// Allowance granted to Permit2
    pub permit2_allowance: U256,
    /// Allowance granted to the bank for plain deposits
    pub bank_allowance: U256,
}

/// Owner's wallet and bank balances of one token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balances {
    pub token_balance: U256,
    pub bank_balance: U256,
}

// Balance monitor implementation.
#[derive(Clone)]
pub struct BalanceMonitor<W> {
    wallet: W,
    bank: Address,
    permit2: Address,
}

impl<W> BalanceMonitor<W>
where
    W: Wallet + Clone,
{
    pub const fn new(wallet: W, bank: Address, permit2: Address) -> Self {
        Self {
            wallet,
            bank,
            permit2,
        }
    }

    pub const fn bank(&self) -> Address {
        self.bank
    }

    pub const fn permit2(&self) -> Address {
        self.permit2
    }

    pub async fn token_balance(&self, token: Address, holder: Address) -> Result<U256, WalletError> {
        debug!("Querying erc20 {} balance: address={}", token, holder);
        read_contract(&self.wallet, token, IERC20::balanceOfCall { account: holder }).await
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256, WalletError> {
        debug!(
            "Querying erc20 {} allowance: owner={}, spender={}",
            token, owner, spender
        );
        read_contract(&self.wallet, token, IERC20::allowanceCall { owner, spender }).await
    }

    pub async fn bank_balance(&self, token: Address, user: Address) -> Result<U256, WalletError> {
        debug!(
            "Querying bank balance: bank={}, token={}, user={}",
            self.bank, token, user
        );
        read_contract(&self.wallet, self.bank, ITokenBank::balancesCall { user, token }).await
    }

    /// Read wallet and bank balances concurrently.
    pub async fn balances(&self, token: Address, owner: Address) -> Result<Balances, WalletError> {
        let (token_balance, bank_balance) = tokio::try_join!(
            self.token_balance(token, owner),
            self.bank_balance(token, owner),
        )?;

        Ok(Balances {
            token_balance,
            bank_balance,
        })
    }

    /// Read token metadata, balances and both allowances.
    ///
    /// All reads run concurrently and the snapshot is all-or-nothing: the
    /// first failing read fails the whole snapshot.
    pub async fn snapshot(
        &self,
        token: Address,
        owner: Address,
    ) -> Result<TokenSnapshot, WalletError> {
        let (
            name,
            symbol,
            decimals,
            token_balance,
            bank_balance,
            permit2_allowance,
            bank_allowance,
        ) = tokio::try_join!(
            read_contract(&self.wallet, token, IERC20::nameCall {}),
            read_contract(&self.wallet, token, IERC20::symbolCall {}),
            read_contract(&self.wallet, token, IERC20::decimalsCall {}),
            self.token_balance(token, owner),
            self.bank_balance(token, owner),
            self.allowance(token, owner, self.permit2),
            self.allowance(token, owner, self.bank),
        )?;

        debug!(
            %token,
            %owner,
            %symbol,
            %token_balance,
            %bank_balance,
            %permit2_allowance,
            "Token snapshot read"
        );

        Ok(TokenSnapshot {
            token,
            owner,
            name,
            symbol,
            decimals,
            token_balance,
            bank_balance,
            permit2_allowance,
            bank_allowance,
        })
    }
}

impl<W> Monitor for BalanceMonitor<W>
where
    W: Wallet + Clone,
{
    async fn query_balance(&self, query: BalanceQuery) -> Result<Balance> {
        let balance = match query {
            BalanceQuery::ERC20Balance { token, holder } => Balance {
                holder,
                asset: token,
                amount: self.token_balance(token, holder).await?,
            },
            BalanceQuery::Allowance {
                token,
                owner,
                spender,
            } => Balance {
                holder: owner,
                asset: token,
                amount: self.allowance(token, owner, spender).await?,
            },
            BalanceQuery::BankBalance { bank, token, user } => {
                let call = ITokenBank::balancesCall { user, token };
                let amount = read_contract(&self.wallet, bank, call).await?;
                Balance {
                    holder: user,
                    asset: token,
                    amount,
                }
            }
        };

        Ok(balance)
    }
}
