//! Portfolio aggregation services module.

pub mod aggregate;
pub mod balance;
pub mod planner;
pub mod prices;
pub mod pricing;
pub mod refresh;
pub mod symbols;

pub use aggregate::Aggregator;
pub use balance::BalanceFetcher;
pub use prices::{ProtocolPriceFetcher, QuoteFetcher};
pub use pricing::{ProtocolPricer, ProtocolRegistry, TokenInstance, YearnPricer};
pub use refresh::{PortfolioEngine, Snapshot};
