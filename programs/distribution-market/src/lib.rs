// Gaussian distribution market
// Native Solana implementation - NO ANCHOR

#[cfg(not(feature = "no-entrypoint"))]
use solana_program::entrypoint;

pub mod account_validation;
pub mod constants;
pub mod engine;
pub mod error;
pub mod instruction;
pub mod math;
pub mod pda;
pub mod processor;
pub mod state;

pub use engine::InvariantEngine;
pub use math::Fixed18;

#[cfg(not(feature = "no-entrypoint"))]
use processor::process_instruction;

// Declare program ID
solana_program::declare_id!("7ky2orshjQiX2XmSCk46aYiXcPep764tgpppyujzEswN");

#[cfg(not(feature = "no-entrypoint"))]
entrypoint!(process_instruction);
