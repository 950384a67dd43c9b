//! Protocol-wide numeric constants.

/// vTokens are minted with 8 decimals regardless of the underlying token.
pub const VTOKEN_DECIMALS: u32 = 8;

/// Scale of mantissa-encoded rates and indices.
pub const MANTISSA_DECIMALS: u32 = 18;
