pub mod candle;
pub mod market;
pub mod orderbook;
pub mod portfolio;
pub mod transaction;

pub use candle::*;
pub use market::*;
pub use orderbook::*;
pub use portfolio::*;
pub use transaction::*;
