mod article;
mod sentiment;
mod timestamp;

pub use article::{Article, FeedItem, Sentiment};
pub use sentiment::{round_confidence, ClassificationResult, Polarity};
pub use timestamp::{InvalidTimestamp, Timestamp};
