pub(crate) mod performance_model;
pub(crate) mod performance_service;
pub(crate) mod returns_calculator;


// Re-export the public interface
pub use performance_model::{
    AggregatePerformance, MissingExchangeRate, MissingPrice, MissingPriceCollector,
    PortfolioPerformance, ReturnCashFlow, ReturnValuationSnapshot, XirrResult,
    PRICE_TYPE_EXCHANGE_RATE, PRICE_TYPE_YEAR_END, PRICE_TYPE_YEAR_START,
};
pub use performance_service::{PerformanceService, PerformanceServiceTrait};
pub use returns_calculator::{modified_dietz, simple_return, time_weighted, xirr};
