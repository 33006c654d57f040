pub mod news;
pub mod preferences;
pub mod price;
pub mod research;
pub mod watchlist;

pub use news::NewsTool;
pub use preferences::PreferencesTool;
pub use price::PriceTool;
pub use research::ResearchTool;
pub use watchlist::WatchlistTool;
