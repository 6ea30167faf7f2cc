pub mod category_feed;

pub use category_feed::CategoryFeed;
