//! Program Derived Address (PDA) derivation functions

use solana_program::pubkey::Pubkey;

/// PDA seed constants
pub mod seeds {
    pub const MARKET: &[u8] = b"market";
    pub const POSITION_BOOK: &[u8] = b"positions";
}

/// Market PDA, one per (authority, market id)
pub struct MarketPDA;
impl MarketPDA {
    pub fn derive(program_id: &Pubkey, authority: &Pubkey, market_id: u64) -> (Pubkey, u8) {
        Pubkey::find_program_address(
            &[seeds::MARKET, authority.as_ref(), &market_id.to_le_bytes()],
            program_id,
        )
    }
}

/// Position book PDA, one per market
pub struct PositionBookPDA;
impl PositionBookPDA {
    pub fn derive(program_id: &Pubkey, market: &Pubkey) -> (Pubkey, u8) {
        Pubkey::find_program_address(&[seeds::POSITION_BOOK, market.as_ref()], program_id)
    }
}
