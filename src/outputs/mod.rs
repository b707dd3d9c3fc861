//! Feed documents written and read by the pipeline.
//!
//! # Submodules
//!
//! - [`rss`]: RSS 2.0 formatting and tolerant parsing of existing feed files
//!
//! # Output Structure
//!
//! ```text
//! ./
//! ├── articles.xml      # full archive, newest first
//! ├── daily_feed.xml    # digest, first batch (or the placeholder)
//! ├── daily_feed_2.xml  # digest overflow, empty when there is none
//! └── last_seen.json    # watermark
//! ```

pub mod rss;
