pub(crate) mod market_data_provider;
pub(crate) mod models;
pub(crate) mod provider_registry;
pub(crate) mod stooq_provider;
pub(crate) mod twse_provider;
pub(crate) mod yahoo_provider;

pub use market_data_provider::{FxProvider, PriceProvider};
pub use models::{ProviderPrice, ProviderRate};
pub use provider_registry::ProviderRegistry;
pub use stooq_provider::StooqProvider;
pub use twse_provider::TwseProvider;
pub use yahoo_provider::YahooProvider;
