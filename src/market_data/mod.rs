pub(crate) mod market_data_constants;
pub(crate) mod market_data_errors;
pub(crate) mod market_data_model;
pub(crate) mod market_data_repository;
pub(crate) mod market_data_service;
pub(crate) mod market_data_traits;
pub(crate) mod providers;


// Re-export the public interface
pub use market_data_constants::*;
pub use market_data_model::{
    DataSource, DataType, HistoricalExchangeRate, HistoricalExchangeRateDB,
    HistoricalYearEndData, HistoricalYearEndDataDB, Resolution, ResolvedValue,
};
pub use market_data_repository::{ExchangeRateCacheRepository, YearEndDataRepository};
pub use market_data_service::MarketDataService;
pub use market_data_traits::{
    ExchangeRateCacheRepositoryTrait, MarketDataServiceTrait, YearEndDataRepositoryTrait,
};

// Re-export provider types
pub use providers::{
    FxProvider, PriceProvider, ProviderPrice, ProviderRate, ProviderRegistry, StooqProvider,
    TwseProvider, YahooProvider,
};

// Re-export error types for convenience
pub use market_data_errors::MarketDataError;
