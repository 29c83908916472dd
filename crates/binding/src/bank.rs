//! TokenBank contract bindings.
//!
//! The bank custodies ERC20 balances per `(user, token)` and accepts deposits
//! either through a prior `approve` or through a Permit2 signature.

use crate::permit2;
use alloy_sol_types::sol;

sol! {
    /// TokenBank - custodial ERC20 bank
    #[sol(rpc)]
    interface ITokenBank {
        /// Permit2 `ISignatureTransfer.TokenPermissions`
        #[derive(Debug, PartialEq, Eq)]
        struct TokenPermissions {
            address token;
            uint256 amount;
        }

        /// Permit2 `ISignatureTransfer.PermitTransferFrom` as passed on-chain.
        /// The spender is implied by `msg.sender` and therefore absent.
        #[derive(Debug, PartialEq, Eq)]
        struct PermitTransferFrom {
            TokenPermissions permitted;
            uint256 nonce;
            uint256 deadline;
        }

        /// Emitted on a plain `deposit`
        event Deposit(
            address indexed user,
            address indexed token,
            uint256 amount,
            uint256 newBalance,
            uint256 totalDeposit
        );

        /// Emitted on `depositWithPermit2`
        event DepositWithPermit2(
            address indexed user,
            address indexed token,
            uint256 amount,
            uint256 nonce,
            uint256 deadline,
            uint256 newBalance,
            uint256 totalDeposit
        );

        /// Emitted when the bank starts accepting a token
        event TokenSupported(
            address indexed token,
            uint256 tokenCount
        );

        /// Emitted the first time a user deposits a given token
        event UserTokenAdded(
            address indexed user,
            address indexed token,
            uint256 userTokenCount
        );

        /// Emitted on `withdraw`
        event Withdraw(
            address indexed user,
            address indexed token,
            uint256 amount,
            uint256 newBalance,
            uint256 totalDeposit
        );

        /// Deposit previously approved tokens
        function deposit(address token, uint256 amount) external;

        /// Withdraw tokens held by the bank for msg.sender
        function withdraw(address token, uint256 amount) external;

        /// Deposit pulling tokens through Permit2 with an owner signature
        function depositWithPermit2(
            address token,
            uint256 amount,
            PermitTransferFrom calldata permit,
            bytes calldata signature
        ) external;

        /// Bank balance of `user` for `token`
        function balances(address user, address token) external view returns (uint256);
    }
}

impl From<&permit2::PermitTransferFrom> for ITokenBank::PermitTransferFrom {
    fn from(permit: &permit2::PermitTransferFrom) -> Self {
        Self {
            permitted: ITokenBank::TokenPermissions {
                token: permit.permitted.token,
                amount: permit.permitted.amount,
            },
            nonce: permit.nonce,
            deadline: permit.deadline,
        }
    }
}
