pub mod rate_limit {

    pub const MAX_REQUESTS_PER_WINDOW: u32 = 10;

    pub const WINDOW_SECONDS: u64 = 15 * 60;
}

pub mod lockout {

    pub const MAX_FAILURES: u32 = 5;

    pub const COOLDOWN_SECONDS: u64 = 5 * 60;
}

pub mod tokens {

    pub const TTL_SECONDS: u64 = 60 * 60;

    /// Tokens with less than this much lifetime left are due for rotation.
    pub const REFRESH_THRESHOLD_SECONDS: u64 = 5 * 60;

    /// Random bytes per token value (256 bits).
    pub const TOKEN_BYTES: usize = 32;
}

pub mod audit {

    pub const DEFAULT_PAGE: usize = 1;

    pub const DEFAULT_PAGE_SIZE: usize = 50;

    pub const MAX_PAGE_SIZE: usize = 500;

    pub const MAX_ENTRIES: usize = 1_000_000;

    /// Entries without an account (rejected tokens, unknown users) allowed
    /// per origin inside one window.
    pub const UNATTRIBUTED_PER_ORIGIN: u32 = 20;

    pub const UNATTRIBUTED_WINDOW_SECONDS: u64 = 60;

    /// Unattributed entries stop once the log is within `max_entries / N`
    /// of its capacity.
    pub const RESERVE_DIVISOR: usize = 10;
}

pub mod limits {

    pub const MAX_USERNAME_LEN: usize = 64;

    pub const MAX_SECRET_LEN: usize = 1024;

    pub const MAX_RESOURCE_ID_LEN: usize = 128;
}

pub const UNKNOWN_AGENT: &str = "unknown";

pub const UNKNOWN_ORIGIN: &str = "unknown";
