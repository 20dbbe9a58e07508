pub mod config;
pub mod error;
pub mod models {
    pub mod index;
    pub mod report;
}
pub mod storage {
    pub mod client;
    pub mod keys;
    pub mod memory;
}
pub mod indexing {
    pub mod hashtags;
    pub mod news_urls;
    pub mod normalize;
}
pub mod reports {
    pub mod repository;
}
