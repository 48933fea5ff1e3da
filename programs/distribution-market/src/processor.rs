use borsh::{BorshDeserialize, BorshSerialize};
use solana_program::{
    account_info::{next_account_info, AccountInfo},
    entrypoint::ProgramResult,
    msg,
    program::invoke_signed,
    program_error::ProgramError,
    pubkey::Pubkey,
    rent::Rent,
    system_instruction,
    sysvar::Sysvar,
};

use crate::{
    account_validation::{validate_owner, validate_pda, validate_signer, validate_writable},
    engine::InvariantEngine,
    error::DistributionMarketError,
    instruction::DistributionMarketInstruction,
    math::Fixed18,
    pda::{seeds, MarketPDA, PositionBookPDA},
    state::{Curve, MarketParams, MarketState, PositionBook},
};

pub fn process_instruction(
    program_id: &Pubkey,
    accounts: &[AccountInfo],
    instruction_data: &[u8],
) -> ProgramResult {
    Processor::process(program_id, accounts, instruction_data)
}

pub struct Processor;

impl Processor {
    fn borsh_deserialize_unchecked<T: BorshDeserialize>(data: &[u8]) -> Result<T, ProgramError> {
        let mut cursor: &[u8] = data;
        T::deserialize(&mut cursor).map_err(|_| DistributionMarketError::InvalidAccountData.into())
    }

    pub fn process(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        instruction_data: &[u8],
    ) -> ProgramResult {
        let instruction = DistributionMarketInstruction::unpack(instruction_data)?;

        match instruction {
            DistributionMarketInstruction::Initialize { market_id, params } => {
                msg!("Instruction: Initialize");
                Self::process_initialize(program_id, accounts, market_id, params)
            }
            DistributionMarketInstruction::AddLiquidity { amount } => {
                msg!("Instruction: AddLiquidity");
                Self::process_add_liquidity(program_id, accounts, amount)
            }
            DistributionMarketInstruction::RemoveLiquidity { shares, position_id } => {
                msg!("Instruction: RemoveLiquidity");
                Self::process_remove_liquidity(program_id, accounts, shares, position_id)
            }
            DistributionMarketInstruction::Trade {
                amount,
                mu,
                sigma,
                lambda,
                critical_point,
            } => {
                msg!("Instruction: Trade");
                Self::process_trade(
                    program_id,
                    accounts,
                    amount,
                    Curve::new(mu, sigma, lambda),
                    critical_point,
                )
            }
            DistributionMarketInstruction::Resolve { outcome } => {
                msg!("Instruction: Resolve");
                Self::process_resolve(program_id, accounts, outcome)
            }
            DistributionMarketInstruction::Withdraw { position_id, amount } => {
                msg!("Instruction: Withdraw");
                Self::process_withdraw(program_id, accounts, position_id, amount)
            }
        }
    }

    fn process_initialize(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        market_id: u64,
        params: MarketParams,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;
        let system_program = next_account_info(account_info_iter)?;

        validate_signer(authority_info)?;
        validate_writable(market_info)?;
        validate_writable(book_info)?;

        let (market_pda, market_bump) = MarketPDA::derive(program_id, authority_info.key, market_id);
        validate_pda(market_info, &market_pda)?;
        let (book_pda, book_bump) = PositionBookPDA::derive(program_id, market_info.key);
        validate_pda(book_info, &book_pda)?;

        if market_info.data_len() > 0 {
            return Err(DistributionMarketError::AlreadyInitialized.into());
        }

        // Run the engine before paying for any account
        let mut market = MarketState::default();
        let mut book = PositionBook::new(*market_info.key, book_bump);
        let position_id = InvariantEngine::initialize(
            &mut market,
            &mut book,
            authority_info.key,
            market_id,
            &params,
            market_bump,
        )?;

        let rent = Rent::get()?;

        invoke_signed(
            &system_instruction::create_account(
                authority_info.key,
                market_info.key,
                rent.minimum_balance(MarketState::LEN),
                MarketState::LEN as u64,
                program_id,
            ),
            &[authority_info.clone(), market_info.clone(), system_program.clone()],
            &[&[
                seeds::MARKET,
                authority_info.key.as_ref(),
                &market_id.to_le_bytes(),
                &[market_bump],
            ]],
        )?;

        invoke_signed(
            &system_instruction::create_account(
                authority_info.key,
                book_info.key,
                rent.minimum_balance(PositionBook::LEN),
                PositionBook::LEN as u64,
                program_id,
            ),
            &[authority_info.clone(), book_info.clone(), system_program.clone()],
            &[&[seeds::POSITION_BOOK, market_info.key.as_ref(), &[book_bump]]],
        )?;

        market.serialize(&mut &mut market_info.data.borrow_mut()[..])?;
        book.serialize(&mut &mut book_info.data.borrow_mut()[..])?;

        msg!("Market {} created, opening position {}", market_info.key, position_id);
        Ok(())
    }

    fn process_add_liquidity(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: Fixed18,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let provider_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;

        validate_signer(provider_info)?;
        let mut market = Self::load_market(program_id, market_info)?;
        let mut book = Self::load_position_book(program_id, market_info, book_info)?;

        InvariantEngine::add_liquidity(&mut market, &mut book, provider_info.key, amount)?;

        Self::store(&market, market_info)?;
        Self::store(&book, book_info)
    }

    fn process_remove_liquidity(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        shares: Fixed18,
        position_id: u64,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let provider_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;

        validate_signer(provider_info)?;
        let mut market = Self::load_market(program_id, market_info)?;
        let mut book = Self::load_position_book(program_id, market_info, book_info)?;

        InvariantEngine::remove_liquidity(&mut market, &mut book, provider_info.key, shares, position_id)?;

        Self::store(&market, market_info)?;
        Self::store(&book, book_info)
    }

    fn process_trade(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        amount: Fixed18,
        new_curve: Curve,
        critical_point: Fixed18,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let trader_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;

        validate_signer(trader_info)?;
        let mut market = Self::load_market(program_id, market_info)?;
        let mut book = Self::load_position_book(program_id, market_info, book_info)?;

        InvariantEngine::trade(
            &mut market,
            &mut book,
            trader_info.key,
            amount,
            new_curve,
            critical_point,
        )?;

        Self::store(&market, market_info)?;
        Self::store(&book, book_info)
    }

    fn process_resolve(program_id: &Pubkey, accounts: &[AccountInfo], outcome: Fixed18) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let authority_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;

        validate_signer(authority_info)?;
        let mut market = Self::load_market(program_id, market_info)?;

        InvariantEngine::resolve(&mut market, authority_info.key, outcome)?;

        Self::store(&market, market_info)
    }

    fn process_withdraw(
        program_id: &Pubkey,
        accounts: &[AccountInfo],
        position_id: u64,
        amount: Fixed18,
    ) -> ProgramResult {
        let account_info_iter = &mut accounts.iter();
        let owner_info = next_account_info(account_info_iter)?;
        let market_info = next_account_info(account_info_iter)?;
        let book_info = next_account_info(account_info_iter)?;

        validate_signer(owner_info)?;
        let mut market = Self::load_market(program_id, market_info)?;
        let mut book = Self::load_position_book(program_id, market_info, book_info)?;

        InvariantEngine::withdraw(&mut market, &mut book, owner_info.key, position_id, amount)?;

        Self::store(&market, market_info)?;
        Self::store(&book, book_info)
    }

    fn load_market(program_id: &Pubkey, market_info: &AccountInfo) -> Result<MarketState, ProgramError> {
        validate_owner(market_info, program_id)?;
        validate_writable(market_info)?;

        let market: MarketState = Self::borsh_deserialize_unchecked(&market_info.data.borrow())?;
        if market.discriminator != MarketState::DISCRIMINATOR || !market.is_initialized {
            return Err(DistributionMarketError::NotInitialized.into());
        }

        let (expected, _) = MarketPDA::derive(program_id, &market.authority, market.market_id);
        validate_pda(market_info, &expected)?;

        Ok(market)
    }

    fn load_position_book(
        program_id: &Pubkey,
        market_info: &AccountInfo,
        book_info: &AccountInfo,
    ) -> Result<PositionBook, ProgramError> {
        validate_owner(book_info, program_id)?;
        validate_writable(book_info)?;

        let (expected, _) = PositionBookPDA::derive(program_id, market_info.key);
        validate_pda(book_info, &expected)?;

        let book: PositionBook = Self::borsh_deserialize_unchecked(&book_info.data.borrow())?;
        if book.discriminator != PositionBook::DISCRIMINATOR || book.market != *market_info.key {
            return Err(DistributionMarketError::InvalidAccountData.into());
        }

        Ok(book)
    }

    fn store<T: BorshSerialize>(state: &T, account: &AccountInfo) -> ProgramResult {
        state.serialize(&mut &mut account.data.borrow_mut()[..])?;
        Ok(())
    }
}
