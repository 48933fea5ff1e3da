use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{program_error::ProgramError, pubkey::Pubkey};

use crate::{
    constants::MAX_POSITIONS,
    error::DistributionMarketError,
    math::Fixed18,
    state::Curve,
};

/// A liquidity or trade position
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub id: u64,

    pub owner: Pubkey,

    /// Remaining collateral, only ever decreases
    pub collateral: Fixed18,

    /// Curve before the action
    pub initial: Curve,

    /// Curve after the action, zero lambda for liquidity positions
    pub target: Curve,

    /// Paid out after resolution
    pub settled: bool,
}

impl Position {
    pub const LEN: usize = 8 + // id
        32 + // owner
        16 + // collateral
        Curve::LEN + // initial
        Curve::LEN + // target
        1; // settled

    pub fn is_lp(&self) -> bool {
        self.target.lambda.is_zero()
    }

    /// Open until settled. Trade positions also close once drained; a
    /// liquidity position stays open while its owner holds shares, whatever
    /// its collateral reads.
    pub fn is_open(&self) -> bool {
        !self.settled && (self.is_lp() || self.collateral.is_positive())
    }
}

/// Storage for positions; the engine only records and decrements through this
pub trait PositionLedger {
    /// Record a new position and return its id
    fn mint(&mut self, position: Position) -> Result<u64, ProgramError>;

    fn get(&self, id: u64) -> Result<&Position, ProgramError>;

    /// Reduce collateral, saturating at zero. Returns what is left.
    fn debit_collateral(&mut self, id: u64, amount: Fixed18) -> Result<Fixed18, ProgramError>;

    fn mark_settled(&mut self, id: u64) -> Result<(), ProgramError>;

    /// Settle every open liquidity position of `owner`
    fn close_liquidity(&mut self, owner: &Pubkey) -> Result<(), ProgramError>;
}

/// Position ledger account, one per market
#[derive(BorshSerialize, BorshDeserialize, Debug, Clone, PartialEq, Default)]
pub struct PositionBook {
    /// Account discriminator
    pub discriminator: [u8; 8],

    /// Is initialized
    pub is_initialized: bool,

    /// Market this book belongs to
    pub market: Pubkey,

    /// Ids are never reused
    pub next_position_id: u64,

    pub positions: Vec<Position>,

    /// PDA bump
    pub bump: u8,
}

impl PositionBook {
    pub const DISCRIMINATOR: [u8; 8] = [80, 79, 83, 95, 66, 79, 79, 75]; // "POS_BOOK"

    pub const LEN: usize = 8 + // discriminator
        1 + // is_initialized
        32 + // market
        8 + // next_position_id
        4 + (MAX_POSITIONS * Position::LEN) + // positions
        1; // bump

    pub fn new(market: Pubkey, bump: u8) -> Self {
        Self {
            discriminator: Self::DISCRIMINATOR,
            is_initialized: true,
            market,
            next_position_id: 0,
            positions: Vec::new(),
            bump,
        }
    }

    fn index_of(&self, id: u64) -> Result<usize, ProgramError> {
        self.positions
            .iter()
            .position(|position| position.id == id)
            .ok_or_else(|| DistributionMarketError::PositionNotFound.into())
    }

    /// Drop settled and drained positions to make room
    fn prune_closed(&mut self) {
        self.positions.retain(|position| position.is_open());
    }
}

impl PositionLedger for PositionBook {
    fn mint(&mut self, mut position: Position) -> Result<u64, ProgramError> {
        if self.positions.len() >= MAX_POSITIONS {
            self.prune_closed();
        }
        if self.positions.len() >= MAX_POSITIONS {
            return Err(DistributionMarketError::LedgerFull.into());
        }

        let id = self.next_position_id;
        self.next_position_id = id
            .checked_add(1)
            .ok_or(DistributionMarketError::ArithmeticOverflow)?;

        position.id = id;
        self.positions.push(position);
        Ok(id)
    }

    fn get(&self, id: u64) -> Result<&Position, ProgramError> {
        let index = self.index_of(id)?;
        Ok(&self.positions[index])
    }

    fn debit_collateral(&mut self, id: u64, amount: Fixed18) -> Result<Fixed18, ProgramError> {
        let index = self.index_of(id)?;
        let position = &mut self.positions[index];
        position.collateral = position
            .collateral
            .checked_sub(amount)?
            .max(Fixed18::ZERO);
        Ok(position.collateral)
    }

    fn mark_settled(&mut self, id: u64) -> Result<(), ProgramError> {
        let index = self.index_of(id)?;
        let position = &mut self.positions[index];
        if position.settled {
            return Err(DistributionMarketError::PositionSettled.into());
        }
        position.settled = true;
        Ok(())
    }

    fn close_liquidity(&mut self, owner: &Pubkey) -> Result<(), ProgramError> {
        self.positions
            .iter_mut()
            .filter(|position| position.owner == *owner && position.is_lp())
            .for_each(|position| position.settled = true);
        Ok(())
    }
}
