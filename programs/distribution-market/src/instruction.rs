use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    instruction::{AccountMeta, Instruction},
    program_error::ProgramError,
    pubkey::Pubkey,
    system_program,
};

use crate::{error::DistributionMarketError, math::Fixed18, state::MarketParams};

#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq)]
pub enum DistributionMarketInstruction {
    /// Create a market and its position book
    /// Accounts:
    /// 0. `[signer, writable]` Authority (payer)
    /// 1. `[writable]` Market PDA
    /// 2. `[writable]` Position book PDA
    /// 3. `[]` System program
    Initialize {
        market_id: u64,
        params: MarketParams,
    },

    /// Deposit a multiple of the pool's backing
    /// Accounts:
    /// 0. `[signer]` Provider
    /// 1. `[writable]` Market PDA
    /// 2. `[writable]` Position book PDA
    AddLiquidity {
        amount: Fixed18,
    },

    /// Burn liquidity shares against an LP position
    /// Accounts:
    /// 0. `[signer]` Provider
    /// 1. `[writable]` Market PDA
    /// 2. `[writable]` Position book PDA
    RemoveLiquidity {
        shares: Fixed18,
        position_id: u64,
    },

    /// Move the market curve
    /// Accounts:
    /// 0. `[signer]` Trader
    /// 1. `[writable]` Market PDA
    /// 2. `[writable]` Position book PDA
    Trade {
        amount: Fixed18,
        mu: Fixed18,
        sigma: Fixed18,
        lambda: Fixed18,
        critical_point: Fixed18,
    },

    /// Fix the outcome
    /// Accounts:
    /// 0. `[signer]` Authority
    /// 1. `[writable]` Market PDA
    Resolve {
        outcome: Fixed18,
    },

    /// Redeem a position after resolution
    /// Accounts:
    /// 0. `[signer]` Position owner
    /// 1. `[writable]` Market PDA
    /// 2. `[writable]` Position book PDA
    Withdraw {
        position_id: u64,
        amount: Fixed18,
    },
}

impl DistributionMarketInstruction {
    pub fn unpack(input: &[u8]) -> Result<Self, ProgramError> {
        Self::try_from_slice(input).map_err(|_| DistributionMarketError::InvalidInstruction.into())
    }
}

fn market_accounts(signer: &Pubkey, market: &Pubkey, position_book: &Pubkey) -> Vec<AccountMeta> {
    vec![
        AccountMeta::new_readonly(*signer, true),
        AccountMeta::new(*market, false),
        AccountMeta::new(*position_book, false),
    ]
}

// Helper functions to create instructions
pub fn initialize(
    program_id: &Pubkey,
    authority: &Pubkey,
    market: &Pubkey,
    position_book: &Pubkey,
    market_id: u64,
    params: MarketParams,
) -> Instruction {
    let accounts = vec![
        AccountMeta::new(*authority, true),
        AccountMeta::new(*market, false),
        AccountMeta::new(*position_book, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &DistributionMarketInstruction::Initialize { market_id, params },
        accounts,
    )
}

pub fn add_liquidity(
    program_id: &Pubkey,
    provider: &Pubkey,
    market: &Pubkey,
    position_book: &Pubkey,
    amount: Fixed18,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &DistributionMarketInstruction::AddLiquidity { amount },
        market_accounts(provider, market, position_book),
    )
}

pub fn remove_liquidity(
    program_id: &Pubkey,
    provider: &Pubkey,
    market: &Pubkey,
    position_book: &Pubkey,
    shares: Fixed18,
    position_id: u64,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &DistributionMarketInstruction::RemoveLiquidity { shares, position_id },
        market_accounts(provider, market, position_book),
    )
}

#[allow(clippy::too_many_arguments)]
pub fn trade(
    program_id: &Pubkey,
    trader: &Pubkey,
    market: &Pubkey,
    position_book: &Pubkey,
    amount: Fixed18,
    mu: Fixed18,
    sigma: Fixed18,
    lambda: Fixed18,
    critical_point: Fixed18,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &DistributionMarketInstruction::Trade {
            amount,
            mu,
            sigma,
            lambda,
            critical_point,
        },
        market_accounts(trader, market, position_book),
    )
}

pub fn resolve(program_id: &Pubkey, authority: &Pubkey, market: &Pubkey, outcome: Fixed18) -> Instruction {
    let accounts = vec![
        AccountMeta::new_readonly(*authority, true),
        AccountMeta::new(*market, false),
    ];

    Instruction::new_with_borsh(
        *program_id,
        &DistributionMarketInstruction::Resolve { outcome },
        accounts,
    )
}

pub fn withdraw(
    program_id: &Pubkey,
    owner: &Pubkey,
    market: &Pubkey,
    position_book: &Pubkey,
    position_id: u64,
    amount: Fixed18,
) -> Instruction {
    Instruction::new_with_borsh(
        *program_id,
        &DistributionMarketInstruction::Withdraw { position_id, amount },
        market_accounts(owner, market, position_book),
    )
}
