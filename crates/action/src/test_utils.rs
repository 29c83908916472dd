//! In-memory wallet simulating an ERC20 token, Permit2 and the TokenBank.

use alloy_primitives::{keccak256, Address, Bytes, TxHash, U256};
use alloy_rpc_types::TransactionRequest;
use alloy_signer::{Signer, SignerSync};
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{Eip712Domain, SolCall, SolInterface, SolStruct};
use binding::{
    bank::ITokenBank::{self, ITokenBankCalls},
    permit2,
    token::IERC20::{self, IERC20Calls},
};
use client::{Receipt, Wallet, WalletError};
use permit::{permit2_domain, recover_signer, unix_now};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};

pub const CHAIN_ID: u64 = 80002;
pub const TOKEN: Address = Address::repeat_byte(0x22);
pub const BANK: Address = Address::repeat_byte(0xBB);
pub const PERMIT2: Address = Address::repeat_byte(0x99);

// anvil account #0
const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// Wallet interaction observed by the mock, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Read(&'static str),
    Send(&'static str),
    Sign {
        primary_type: String,
        domain: Eip712Domain,
    },
    Receipt(TxHash),
}

#[derive(Debug, Default)]
pub struct ChainState {
    pub chain_id: u64,
    pub block: u64,
    pub tx_count: u64,
    /// (token, holder) -> balance
    pub token_balances: HashMap<(Address, Address), U256>,
    /// (token, owner, spender) -> allowance
    pub allowances: HashMap<(Address, Address, Address), U256>,
    /// (user, token) -> bank balance
    pub bank_balances: HashMap<(Address, Address), U256>,
    /// (owner, nonce) pairs consumed by Permit2
    pub used_nonces: HashSet<(Address, U256)>,
    pub receipts: HashMap<TxHash, Receipt>,
    pub ops: Vec<Op>,
    pub reject_signatures: bool,
    pub reject_transactions: bool,
    /// Calls with this selector are included but revert
    pub revert_selector: Option<[u8; 4]>,
    /// Selectors whose reads fail
    pub failing_reads: HashSet<[u8; 4]>,
    /// Receipts are never delivered
    pub drop_receipts: bool,
}

#[derive(Clone)]
pub struct MockWallet {
    signer: PrivateKeySigner,
    state: Arc<Mutex<ChainState>>,
}

impl MockWallet {
    pub fn new() -> Self {
        let signer: PrivateKeySigner = OWNER_KEY.parse().expect("valid key");
        let state = ChainState {
            chain_id: CHAIN_ID,
            block: 100,
            ..Default::default()
        };

        Self {
            signer,
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn owner(&self) -> Address {
        self.signer.address()
    }

    pub fn with_state<R>(&self, f: impl FnOnce(&mut ChainState) -> R) -> R {
        let mut state = self.state.lock().expect("state lock");
        f(&mut state)
    }

    pub fn fund(&self, amount: u64) -> &Self {
        let owner = self.owner();
        self.with_state(|s| {
            s.token_balances.insert((TOKEN, owner), U256::from(amount));
        });
        self
    }

    pub fn approve(&self, spender: Address, amount: U256) -> &Self {
        let owner = self.owner();
        self.with_state(|s| {
            s.allowances.insert((TOKEN, owner, spender), amount);
        });
        self
    }

    pub fn bank_holds(&self, amount: u64) -> &Self {
        let owner = self.owner();
        self.with_state(|s| {
            s.bank_balances.insert((owner, TOKEN), U256::from(amount));
        });
        self
    }

    pub fn token_balance(&self) -> U256 {
        let owner = self.owner();
        self.with_state(|s| s.token_balances.get(&(TOKEN, owner)).copied().unwrap_or_default())
    }

    pub fn bank_balance(&self) -> U256 {
        let owner = self.owner();
        self.with_state(|s| s.bank_balances.get(&(owner, TOKEN)).copied().unwrap_or_default())
    }

    pub fn allowance(&self, spender: Address) -> U256 {
        let owner = self.owner();
        self.with_state(|s| {
            s.allowances
                .get(&(TOKEN, owner, spender))
                .copied()
                .unwrap_or_default()
        })
    }

    pub fn ops(&self) -> Vec<Op> {
        self.with_state(|s| s.ops.clone())
    }

    /// Names of the transactions sent so far.
    pub fn sends(&self) -> Vec<&'static str> {
        self.ops()
            .into_iter()
            .filter_map(|op| match op {
                Op::Send(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn signature_count(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, Op::Sign { .. }))
            .count()
    }
}

impl ChainState {
    fn balance(&self, token: Address, holder: Address) -> U256 {
        self.token_balances
            .get(&(token, holder))
            .copied()
            .unwrap_or_default()
    }

    fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    fn bank_balance(&self, user: Address, token: Address) -> U256 {
        self.bank_balances
            .get(&(user, token))
            .copied()
            .unwrap_or_default()
    }

    /// ERC20 `transferFrom` by `spender`, moving tokens from `owner` into the bank.
    fn pull_into_bank(
        &mut self,
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    ) -> bool {
        let allowance = self.allowance(token, owner, spender);
        let balance = self.balance(token, owner);
        if allowance < amount || balance < amount {
            return false;
        }

        if allowance != U256::MAX {
            self.allowances
                .insert((token, owner, spender), allowance - amount);
        }
        self.token_balances.insert((token, owner), balance - amount);
        let held = self.bank_balance(owner, token);
        self.bank_balances.insert((owner, token), held + amount);
        true
    }

    fn read(&mut self, to: Address, input: &[u8]) -> Result<Vec<u8>, WalletError> {
        if input.len() >= 4 && self.failing_reads.contains(&[input[0], input[1], input[2], input[3]])
        {
            return Err(WalletError::Read("execution reverted".into()));
        }

        if to == BANK {
            return match ITokenBankCalls::abi_decode(input) {
                Ok(ITokenBankCalls::balances(call)) => {
                    self.ops.push(Op::Read("balances"));
                    let held = self.bank_balance(call.user, call.token);
                    Ok(ITokenBank::balancesCall::abi_encode_returns(&held))
                }
                _ => Err(WalletError::Read("unsupported bank read".into())),
            };
        }

        match IERC20Calls::abi_decode(input) {
            Ok(IERC20Calls::name(_)) => {
                self.ops.push(Op::Read("name"));
                Ok(IERC20::nameCall::abi_encode_returns(&"Test Token".to_string()))
            }
            Ok(IERC20Calls::symbol(_)) => {
                self.ops.push(Op::Read("symbol"));
                Ok(IERC20::symbolCall::abi_encode_returns(&"TT".to_string()))
            }
            Ok(IERC20Calls::decimals(_)) => {
                self.ops.push(Op::Read("decimals"));
                Ok(IERC20::decimalsCall::abi_encode_returns(&18))
            }
            Ok(IERC20Calls::balanceOf(call)) => {
                self.ops.push(Op::Read("balanceOf"));
                Ok(IERC20::balanceOfCall::abi_encode_returns(
                    &self.balance(to, call.account),
                ))
            }
            Ok(IERC20Calls::allowance(call)) => {
                self.ops.push(Op::Read("allowance"));
                Ok(IERC20::allowanceCall::abi_encode_returns(
                    &self.allowance(to, call.owner, call.spender),
                ))
            }
            _ => Err(WalletError::Read("unsupported token read".into())),
        }
    }

    /// Apply a transaction and return (name, success).
    fn execute(&mut self, from: Address, to: Address, input: &[u8]) -> (&'static str, bool) {
        if to == BANK {
            return match ITokenBankCalls::abi_decode(input) {
                Ok(ITokenBankCalls::deposit(call)) => (
                    "deposit",
                    call.amount > U256::ZERO
                        && self.pull_into_bank(call.token, from, BANK, call.amount),
                ),
                Ok(ITokenBankCalls::withdraw(call)) => {
                    let held = self.bank_balance(from, call.token);
                    if call.amount.is_zero() || held < call.amount {
                        return ("withdraw", false);
                    }
                    self.bank_balances
                        .insert((from, call.token), held - call.amount);
                    let balance = self.balance(call.token, from);
                    self.token_balances
                        .insert((call.token, from), balance + call.amount);
                    ("withdraw", true)
                }
                Ok(ITokenBankCalls::depositWithPermit2(call)) => {
                    ("depositWithPermit2", self.permit_transfer(from, call))
                }
                _ => ("unknown", false),
            };
        }

        match IERC20Calls::abi_decode(input) {
            Ok(IERC20Calls::approve(call)) => {
                self.allowances
                    .insert((to, from, call.spender), call.amount);
                ("approve", true)
            }
            _ => ("unknown", false),
        }
    }

    /// Permit2 `permitTransferFrom` as invoked by the bank.
    fn permit_transfer(&mut self, owner: Address, call: ITokenBank::depositWithPermit2Call) -> bool {
        let permit = &call.permit;
        if permit.permitted.token != call.token || call.amount > permit.permitted.amount {
            return false;
        }
        if permit.deadline < U256::from(unix_now()) {
            return false;
        }
        if self.used_nonces.contains(&(owner, permit.nonce)) {
            return false;
        }

        // Permit2 hashes the permit with msg.sender (the bank) as spender
        let signed = permit2::PermitTransferFrom {
            permitted: permit2::TokenPermissions {
                token: permit.permitted.token,
                amount: permit.permitted.amount,
            },
            spender: BANK,
            nonce: permit.nonce,
            deadline: permit.deadline,
        };
        let domain = permit2_domain(self.chain_id, PERMIT2);
        match recover_signer(&signed, &domain, &call.signature) {
            Ok(signer) if signer == owner => {}
            _ => return false,
        }

        if !self.pull_into_bank(call.token, owner, PERMIT2, call.amount) {
            return false;
        }
        self.used_nonces.insert((owner, permit.nonce));
        true
    }
}

impl Wallet for MockWallet {
    fn address(&self) -> Address {
        self.signer.address()
    }

    async fn chain_id(&self) -> Result<u64, WalletError> {
        Ok(self.with_state(|s| s.chain_id))
    }

    async fn call(&self, tx: TransactionRequest) -> Result<Bytes, WalletError> {
        let to = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();
        self.with_state(|s| s.read(to, &input)).map(Bytes::from)
    }

    async fn send_transaction(&self, tx: TransactionRequest) -> Result<TxHash, WalletError> {
        let from = self.address();
        let to = tx.to.and_then(|kind| kind.to().copied()).unwrap_or_default();
        let input = tx.input.input().cloned().unwrap_or_default();

        self.with_state(|s| {
            if s.reject_transactions {
                return Err(WalletError::UserRejected);
            }

            s.tx_count += 1;
            let tx_hash = keccak256(s.tx_count.to_be_bytes());
            let forced_revert = s
                .revert_selector
                .is_some_and(|selector| input.starts_with(&selector));

            let (name, success) = if forced_revert {
                (call_name(&input), false)
            } else {
                s.execute(from, to, &input)
            };

            s.block += 1;
            s.receipts.insert(
                tx_hash,
                Receipt {
                    tx_hash,
                    block_number: Some(s.block),
                    gas_used: 50_000,
                    success,
                },
            );
            s.ops.push(Op::Send(name));
            Ok(tx_hash)
        })
    }

    async fn sign_typed_data<T>(
        &self,
        payload: &T,
        domain: &Eip712Domain,
    ) -> Result<Bytes, WalletError>
    where
        T: SolStruct + serde::Serialize + Send + Sync,
    {
        let rejected = self.with_state(|s| {
            s.ops.push(Op::Sign {
                primary_type: T::NAME.to_string(),
                domain: domain.clone(),
            });
            s.reject_signatures
        });
        if rejected {
            return Err(WalletError::UserRejected);
        }

        let signature = self
            .signer
            .sign_hash_sync(&payload.eip712_signing_hash(domain))
            .map_err(|e| WalletError::Signature(e.to_string()))?;
        Ok(Bytes::copy_from_slice(&signature.as_bytes()))
    }

    async fn wait_for_receipt(&self, tx_hash: TxHash) -> Result<Receipt, WalletError> {
        self.with_state(|s| {
            s.ops.push(Op::Receipt(tx_hash));
            if s.drop_receipts {
                return Err(WalletError::Receipt {
                    tx_hash,
                    reason: "timed out".into(),
                });
            }
            s.receipts.get(&tx_hash).copied().ok_or(WalletError::Receipt {
                tx_hash,
                reason: "unknown transaction".into(),
            })
        })
    }
}

fn call_name(input: &[u8]) -> &'static str {
    if let Ok(call) = ITokenBankCalls::abi_decode(input) {
        return match call {
            ITokenBankCalls::deposit(_) => "deposit",
            ITokenBankCalls::withdraw(_) => "withdraw",
            ITokenBankCalls::depositWithPermit2(_) => "depositWithPermit2",
            ITokenBankCalls::balances(_) => "balances",
        };
    }
    match IERC20Calls::abi_decode(input) {
        Ok(IERC20Calls::approve(_)) => "approve",
        _ => "unknown",
    }
}
