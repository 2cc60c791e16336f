//! Readback comparison.

use crate::error::{Error, Result};

/// Compare readback against expected data.
///
/// Reports the first differing byte by absolute address; a readback that
/// agrees on every common byte but has a different length is a size
/// mismatch.
pub fn compare(base: u32, expected: &[u8], actual: &[u8]) -> Result<()> {
    if let Some((offset, (&e, &a))) = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (e, a))| e != a)
    {
        let address = u32::try_from(u64::from(base) + offset as u64).unwrap_or(u32::MAX);
        return Err(Error::VerifyMismatch {
            address,
            expected: e,
            actual: a,
        });
    }

    if expected.len() != actual.len() {
        return Err(Error::VerifySizeMismatch {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    Ok(())
}
