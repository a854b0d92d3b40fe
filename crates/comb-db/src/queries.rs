//! Database query functions organized by table.

pub mod claims;
pub mod movements;
pub mod pools;

use comb_types::Principal;

use crate::{DbError, Result};

pub(crate) fn principal_from_blob(column: &str, bytes: Vec<u8>) -> Result<Principal> {
    let len = bytes.len();
    let arr: [u8; 32] = bytes
        .try_into()
        .map_err(|_| DbError::Serialization(format!("{column}: expected 32 bytes, got {len}")))?;
    Ok(Principal::new(arr))
}
