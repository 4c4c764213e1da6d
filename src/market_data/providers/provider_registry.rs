use std::sync::Arc;

use crate::market_data::market_data_errors::MarketDataError;
use crate::transactions::Market;

use super::market_data_provider::{FxProvider, PriceProvider};
use super::stooq_provider::StooqProvider;
use super::twse_provider::TwseProvider;
use super::yahoo_provider::YahooProvider;

/// Selects the provider for an instrument class by its `Market` tag.
///
/// Taiwan listings go to the TWSE report endpoint, US/UK listings to
/// Stooq, Euronext listings to Yahoo. When the selected provider fails,
/// the cache surfaces the lookup as unresolved and the value can be
/// entered manually.
pub struct ProviderRegistry {
    taiwan: Arc<dyn PriceProvider>,
    default: Arc<dyn PriceProvider>,
    european: Arc<dyn PriceProvider>,
    fx: Arc<dyn FxProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Result<Self, MarketDataError> {
        let stooq = Arc::new(StooqProvider::new());
        Ok(Self {
            taiwan: Arc::new(TwseProvider::new()),
            default: stooq.clone(),
            european: Arc::new(YahooProvider::new()?),
            fx: stooq,
        })
    }

    /// Assemble a registry from explicit parts. Used by tests and by
    /// callers that need to swap a provider out.
    pub fn from_parts(
        taiwan: Arc<dyn PriceProvider>,
        default: Arc<dyn PriceProvider>,
        european: Arc<dyn PriceProvider>,
        fx: Arc<dyn FxProvider>,
    ) -> Self {
        Self {
            taiwan,
            default,
            european,
            fx,
        }
    }

    pub fn price_provider(&self, market: Market) -> &Arc<dyn PriceProvider> {
        match market {
            Market::Tw => &self.taiwan,
            Market::Us | Market::Uk => &self.default,
            Market::Eu => &self.european,
        }
    }

    pub fn fx_provider(&self) -> &Arc<dyn FxProvider> {
        &self.fx
    }
}
