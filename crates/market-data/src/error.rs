use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("No market data has ever arrived for symbol: {0}")]
    UnknownSymbol(String),
}
