//! Calldata encoding from function signatures.

use alloy::dyn_abi::{DynSolType, DynSolValue};
use alloy::primitives::keccak256;

use super::ChainError;

/// Parse a function signature like "balanceOf(address)(uint256)" into
/// selector and output type.
pub fn parse_function_signature(sig: &str) -> Result<([u8; 4], DynSolType), ChainError> {
    let (input_sig, output_sig) = match sig.rfind(")(") {
        Some(idx) if sig.ends_with(')') => {
            // Strip exactly the outer parens; the output may itself be a
            // parenthesized tuple.
            let input = sig[..=idx].to_string();
            let output = &sig[idx + 2..sig.len() - 1];
            (input, output)
        }
        _ => {
            return Err(ChainError::Decode(format!(
                "Invalid function signature, missing output type: {}",
                sig
            )))
        }
    };

    // Selector is the first 4 bytes of keccak256 of the input signature
    let selector_bytes = keccak256(input_sig.as_bytes());
    let mut selector = [0u8; 4];
    selector.copy_from_slice(&selector_bytes[..4]);

    let output_type = DynSolType::parse(&format!("({})", output_sig)).map_err(|e| {
        ChainError::Decode(format!("Failed to parse output type '{}': {}", output_sig, e))
    })?;

    Ok((selector, output_type))
}

/// Encode calldata for an eth_call.
pub fn encode_calldata(selector: &[u8; 4], params: &[DynSolValue]) -> Vec<u8> {
    let mut calldata = selector.to_vec();

    if !params.is_empty() {
        let tuple = DynSolValue::Tuple(params.to_vec());
        calldata.extend(tuple.abi_encode_params());
    }

    calldata
}
