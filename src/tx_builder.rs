//! tx_builder.rs
//! Instruction and transaction assembly for a token launch.
//! - create-mint + initialize-mint + create-metadata as one atomic transaction
//! - associated token account creation and supply mint
//! - every instruction comes from the SPL / Metaplex crates, nothing is hand-encoded

use mpl_token_metadata::{
    accounts::Metadata,
    instructions::{CreateMetadataAccountV3, CreateMetadataAccountV3InstructionArgs},
    types::DataV2,
};
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    pubkey::Pubkey,
    signature::{Keypair, Signer},
    transaction::Transaction,
};
use solana_system_interface::{instruction as system_instruction, program as system_program};
use spl_associated_token_account::{
    get_associated_token_address,
    instruction::create_associated_token_account_idempotent,
};
use spl_token::{instruction as token_instruction, solana_program::program_pack::Pack, state::Mint};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionBuilderError {
    #[error("Instruction building failed for {program}: {reason}")]
    InstructionBuild { program: String, reason: String },
}

/// Size of an SPL mint account, used for the rent query.
pub const MINT_ACCOUNT_LEN: usize = Mint::LEN;

/// Name/symbol/uri that end up in the on-chain metadata account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnChainMetadata {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    pub seller_fee_basis_points: u16,
    pub is_mutable: bool,
}

/// `total_supply * 10^decimals` in base units, `None` on u64 overflow.
pub fn base_units(total_supply: u64, decimals: u8) -> Option<u64> {
    10u64
        .checked_pow(u32::from(decimals))
        .and_then(|scale| total_supply.checked_mul(scale))
}

/// Metaplex metadata PDA for `mint`.
pub fn metadata_pda(mint: &Pubkey) -> Pubkey {
    Metadata::find_pda(mint).0
}

pub fn token_account_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    get_associated_token_address(owner, mint)
}

/// The three instructions of the token creation transaction, in order.
pub fn create_token_instructions(
    authority: &Pubkey,
    mint: &Pubkey,
    rent_lamports: u64,
    decimals: u8,
    disable_freeze: bool,
    metadata: &OnChainMetadata,
) -> Result<Vec<Instruction>, TransactionBuilderError> {
    let mut instructions = Vec::with_capacity(3);

    // 1. Create mint account
    instructions.push(system_instruction::create_account(
        authority,
        mint,
        rent_lamports,
        MINT_ACCOUNT_LEN as u64,
        &spl_token::id(),
    ));

    // 2. Initialize mint
    let freeze_authority = if disable_freeze { None } else { Some(authority) };
    instructions.push(
        token_instruction::initialize_mint2(
            &spl_token::id(),
            mint,
            authority,
            freeze_authority,
            decimals,
        )
        .map_err(|e| TransactionBuilderError::InstructionBuild {
            program: "spl-token".to_string(),
            reason: e.to_string(),
        })?,
    );

    // 3. Create metadata account
    instructions.push(create_metadata_instruction(authority, mint, metadata));

    Ok(instructions)
}

pub fn create_metadata_instruction(
    authority: &Pubkey,
    mint: &Pubkey,
    metadata: &OnChainMetadata,
) -> Instruction {
    CreateMetadataAccountV3 {
        metadata: metadata_pda(mint),
        mint: *mint,
        mint_authority: *authority,
        payer: *authority,
        update_authority: (*authority, true),
        system_program: system_program::ID,
        rent: None,
    }
    .instruction(CreateMetadataAccountV3InstructionArgs {
        data: DataV2 {
            name: metadata.name.clone(),
            symbol: metadata.symbol.clone(),
            uri: metadata.uri.clone(),
            seller_fee_basis_points: metadata.seller_fee_basis_points,
            creators: None,
            collection: None,
            uses: None,
        },
        is_mutable: metadata.is_mutable,
        collection_details: None,
    })
}

/// Succeeds as a no-op when the account already exists.
pub fn create_token_account_instruction(authority: &Pubkey, mint: &Pubkey) -> Instruction {
    create_associated_token_account_idempotent(authority, authority, mint, &spl_token::id())
}

pub fn mint_supply_instruction(
    authority: &Pubkey,
    mint: &Pubkey,
    token_account: &Pubkey,
    amount: u64,
) -> Result<Instruction, TransactionBuilderError> {
    token_instruction::mint_to(&spl_token::id(), mint, token_account, authority, &[], amount).map_err(
        |e| TransactionBuilderError::InstructionBuild {
            program: "spl-token".to_string(),
            reason: e.to_string(),
        },
    )
}

/// Sign `instructions` with `payer` first, then `co_signers`.
pub fn signed_transaction(
    instructions: &[Instruction],
    payer: &Keypair,
    co_signers: &[&Keypair],
    blockhash: Hash,
) -> Transaction {
    let mut signers: Vec<&Keypair> = Vec::with_capacity(co_signers.len() + 1);
    signers.push(payer);
    signers.extend_from_slice(co_signers);
    Transaction::new_signed_with_payer(instructions, Some(&payer.pubkey()), &signers, blockhash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use spl_token::instruction::TokenInstruction;

    fn sample_metadata() -> OnChainMetadata {
        OnChainMetadata {
            name: "Launch Token".to_string(),
            symbol: "LNCH".to_string(),
            uri: "https://gateway.pinata.cloud/ipfs/bafkreiabc123".to_string(),
            seller_fee_basis_points: 0,
            is_mutable: false,
        }
    }

    fn freeze_authority_of(ix: &Instruction) -> Option<Pubkey> {
        match TokenInstruction::unpack(&ix.data).unwrap() {
            TokenInstruction::InitializeMint2 { freeze_authority, .. } => freeze_authority.into(),
            other => panic!("unexpected instruction {:?}", other),
        }
    }

    #[test]
    fn base_units_scale_by_decimals() {
        assert_eq!(base_units(1_000_000, 9), Some(1_000_000_000_000_000));
        assert_eq!(base_units(42, 0), Some(42));
        assert_eq!(base_units(1, 20), None);
        assert_eq!(base_units(u64::MAX, 1), None);
    }

    #[test]
    fn create_token_instruction_order() {
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ixs = create_token_instructions(&authority, &mint, 1_461_600, 9, false, &sample_metadata()).unwrap();

        assert_eq!(ixs.len(), 3);
        assert_eq!(ixs[0].program_id, system_program::ID);
        assert_eq!(ixs[1].program_id, spl_token::id());
        assert_eq!(ixs[2].program_id, mpl_token_metadata::ID);
        assert_eq!(ixs[2].accounts[0].pubkey, metadata_pda(&mint));
    }

    #[test]
    fn freeze_authority_follows_flag() {
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let with_freeze = create_token_instructions(&authority, &mint, 1, 6, false, &sample_metadata()).unwrap();
        assert_eq!(freeze_authority_of(&with_freeze[1]), Some(authority));

        let without_freeze = create_token_instructions(&authority, &mint, 1, 6, true, &sample_metadata()).unwrap();
        assert_eq!(freeze_authority_of(&without_freeze[1]), None);
    }

    #[test]
    fn mint_instruction_carries_amount() {
        let authority = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let ata = token_account_address(&authority, &mint);

        let ix = mint_supply_instruction(&authority, &mint, &ata, 5_000).unwrap();
        match TokenInstruction::unpack(&ix.data).unwrap() {
            TokenInstruction::MintTo { amount } => assert_eq!(amount, 5_000),
            other => panic!("unexpected instruction {:?}", other),
        }
        assert_eq!(ix.accounts[1].pubkey, ata);
    }

    #[test]
    fn signed_transaction_has_both_signatures() {
        let payer = Keypair::new();
        let mint = Keypair::new();
        let ixs = create_token_instructions(&payer.pubkey(), &mint.pubkey(), 1, 9, false, &sample_metadata()).unwrap();

        let tx = signed_transaction(&ixs, &payer, &[&mint], Hash::new_unique());
        assert_eq!(tx.signatures.len(), 2);
        assert!(tx.is_signed());
        assert_eq!(tx.message.account_keys[0], payer.pubkey());
    }
}
