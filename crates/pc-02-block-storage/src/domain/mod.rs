//! Domain layer: records, per-channel bookkeeping, errors.

pub mod errors;
pub mod ledger;
pub mod record;

/// File name of block `number`: zero-padded so lexical order is numeric.
pub fn block_file_name(number: u64) -> String {
    format!("{:020}.block", number)
}

/// Inverse of `block_file_name`.
pub fn parse_block_file_name(name: &str) -> Option<u64> {
    let digits = name.strip_suffix(".block")?;
    if digits.len() != 20 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

pub const TEMP_SUFFIX: &str = ".tmp";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_file_names() {
        assert_eq!(block_file_name(7), "00000000000000000007.block");
        assert_eq!(parse_block_file_name(&block_file_name(u64::MAX)), Some(u64::MAX));
        assert_eq!(parse_block_file_name("7.block"), None);
        assert_eq!(parse_block_file_name("00000000000000000007.block.tmp"), None);
    }
}
