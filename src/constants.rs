// src/constants.rs
//! Domain constants that define the operational boundaries of the pipeline.
//!
//! Each constant is named for the concept it constrains: how long a listing
//! request may take, how many steps run at once, which literals the upstream
//! API uses as sentinels.

use std::time::Duration;

// ---------------------------------------------------------------------------
// Upstream API boundaries
// ---------------------------------------------------------------------------

/// Field holding the item collection of a standard listing page.
pub const LISTING_ITEMS_FIELD: &str = "value";

/// Field holding the item collection of a staged listing page.
pub const STAGED_ITEMS_FIELD: &str = "stages";

/// Field holding the continuation address of a listing page.
pub const NEXT_LINK_FIELD: &str = "@odata.nextLink";

/// Older endpoints report the continuation address without the OData prefix.
pub const LEGACY_NEXT_LINK_FIELD: &str = "nextLink";

/// Query parameter carrying the alternate API version.
pub const API_VERSION_PARAM: &str = "api-version";

/// Default time budget for a single listing request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Default time budget for walking one whole listing, every page included.
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time budget for establishing a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// How many times a retryable request is attempted before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// First backoff delay between retry attempts.
pub const RETRY_INITIAL_DELAY: Duration = Duration::from_millis(250);

/// Upper bound for the exponential backoff delay.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(8);

// ---------------------------------------------------------------------------
// Scheduling boundaries
// ---------------------------------------------------------------------------

/// Upper bound on steps executing at the same time.
///
/// Steps are I/O bound, but each one may itself fan out many requests, so the
/// worker limit stays modest.
pub const MAX_STEP_CONCURRENCY: usize = 16;

// ---------------------------------------------------------------------------
// Relationship building
// ---------------------------------------------------------------------------

/// Endpoint-list literal meaning "every entity of the target type".
pub const SENTINEL_ALL: &str = "All";

/// Endpoint-list literal meaning "nothing"; processing stops when it is seen.
pub const SENTINEL_NONE: &str = "None";

/// Separator between the parts of a relationship key.
pub const RELATIONSHIP_KEY_SEPARATOR: char = '|';

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Name of the warn event published when a listing is denied.
pub const MISSING_PERMISSION_EVENT: &str = "MISSING_PERMISSION";

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Environment variable holding the bearer token.
pub const ACCESS_TOKEN_ENV: &str = "INVENTORY_API_TOKEN";

/// Inventory API root used when `--base-url` is not given.
pub const DEFAULT_BASE_URL: &str = "https://graph.microsoft.com/v1.0/";

/// Largest accepted `--max-attempts`.
pub const MAX_RETRY_ATTEMPTS: u32 = 10;

/// Largest accepted `--request-timeout`, in seconds.
pub const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// Largest accepted `--listing-timeout`, in seconds.
pub const MAX_LISTING_TIMEOUT_SECS: u64 = 3600;
