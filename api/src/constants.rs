//! Application constants

/// Threads Graph API base URL
pub const THREADS_API_BASE: &str = "https://graph.threads.net/v1.0";

/// Wait between container creation and publish so the platform can process media
pub const PUBLISH_SETTLE_SECS: u64 = 3;

/// Trailing window in which identical content counts as a duplicate
pub const DEDUP_WINDOW_MINUTES: i64 = 60;

/// Delay before each publish attempt; its length is the attempt budget
pub const RETRY_BACKOFF_SECS: [u64; 3] = [0, 10, 30];

/// Bounds (inclusive) of the random pre-publish delay for automations using it
pub const INTELLIGENT_DELAY_MIN_SECS: u64 = 5;
pub const INTELLIGENT_DELAY_MAX_SECS: u64 = 20;

/// Carousel image count bounds
pub const CAROUSEL_MIN_IMAGES: usize = 2;
pub const CAROUSEL_MAX_IMAGES: usize = 10;

/// Run the periodic post cycle at second 0 of every minute
pub const DEFAULT_CRON_SCHEDULE: &str = "0 * * * * *";

/// Default page size for history listing
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Maximum page size for history listing
pub const MAX_PAGE_SIZE: i64 = 100;

/// History message written when a cycle is cancelled for duplicate content
pub const DUPLICATE_SKIP_MESSAGE: &str =
    "Execution cancelled: identical content was posted recently";
