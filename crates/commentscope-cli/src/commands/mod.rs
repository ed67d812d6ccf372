pub mod completion;
pub mod scrape;
