/// Data source identifiers
pub const DATA_SOURCE_STOOQ: &str = "STOOQ";
pub const DATA_SOURCE_TWSE: &str = "TWSE";
pub const DATA_SOURCE_YAHOO: &str = "YAHOO";
pub const DATA_SOURCE_MANUAL: &str = "MANUAL";

/// Data type identifiers for year-end cache entries
pub const DATA_TYPE_STOCK_PRICE: &str = "STOCK_PRICE";
pub const DATA_TYPE_EXCHANGE_RATE: &str = "EXCHANGE_RATE";

/// Lookback window when hunting for the nearest trading day on or before
/// a requested date
pub const TRADING_DAY_LOOKBACK_DAYS: i64 = 10;
