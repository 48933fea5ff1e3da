//! Account checks shared by every instruction

use solana_program::{
    account_info::AccountInfo,
    entrypoint::ProgramResult,
    msg,
    program_error::ProgramError,
    pubkey::Pubkey,
};

use crate::error::DistributionMarketError;

/// Validate that an account is owned by the expected program
pub fn validate_owner(account: &AccountInfo, expected_owner: &Pubkey) -> ProgramResult {
    if account.owner != expected_owner {
        msg!(
            "Account owner mismatch. Expected: {}, Actual: {}",
            expected_owner,
            account.owner
        );
        return Err(DistributionMarketError::InvalidAccountData.into());
    }
    Ok(())
}

/// Validate that an account is a signer
pub fn validate_signer(account: &AccountInfo) -> ProgramResult {
    if !account.is_signer {
        msg!("Account {} must be a signer", account.key);
        return Err(ProgramError::MissingRequiredSignature);
    }
    Ok(())
}

/// Validate that an account is writable
pub fn validate_writable(account: &AccountInfo) -> ProgramResult {
    if !account.is_writable {
        msg!("Account {} must be writable", account.key);
        return Err(DistributionMarketError::InvalidAccountData.into());
    }
    Ok(())
}

/// Validate that an account sits at the expected address
pub fn validate_pda(account: &AccountInfo, expected: &Pubkey) -> ProgramResult {
    if account.key != expected {
        msg!("Expected PDA {}, got {}", expected, account.key);
        return Err(DistributionMarketError::InvalidPDA.into());
    }
    Ok(())
}
