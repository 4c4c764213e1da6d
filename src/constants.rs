/// Decimal precision for return calculations
pub const DECIMAL_PRECISION: u32 = 6;

/// Decimal precision for display
pub const DISPLAY_DECIMAL_PRECISION: u32 = 2;

/// Day-count basis for cash-flow weighting and XIRR discounting
pub const DAYS_PER_YEAR: i64 = 365;
