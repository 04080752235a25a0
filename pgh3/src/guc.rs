//! Extension configuration.
//!
//! A single setting, `pgh3.polyfill_mem`, bounds the size of the result
//! buffers built for polygon filling and compaction, in megabytes. Those
//! are the only places where a single call can ask for an amount of memory
//! proportional to the cell estimate rather than to the input.

use crate::error::{PgH3Error, PgH3Result};
use pgrx::guc::{GucContext, GucFlags, GucRegistry, GucSetting};
#[cfg(any(test, feature = "pg_test"))]
use pgrx::prelude::*;

pub const POLYFILL_MEM_SETTING_NAME: &str = "pgh3.polyfill_mem";

/// Upper limit in MB for polyfill/compact result buffers. Zero falls back
/// to PostgreSQL's `MaxAllocSize`.
static POLYFILL_MEM_MB: GucSetting<i32> = GucSetting::<i32>::new(0);

/// PostgreSQL's MaxAllocSize; the allocator refuses more than this anyway.
const MAX_ALLOC_SIZE: usize = 0x3fff_ffff;

/// Register the GUCs. Called from `_PG_init`.
pub fn init() {
    GucRegistry::define_int_guc(
        c"pgh3.polyfill_mem",
        c"Upper limit in MB for memory allocated by h3_polyfill and h3_compact.",
        c"Zero means the PostgreSQL maximum allocation size (roughly 1GB).",
        &POLYFILL_MEM_MB,
        0,
        i32::MAX,
        GucContext::Userset,
        GucFlags::UNIT_MB,
    );
}

fn limit_bytes() -> usize {
    let mb = POLYFILL_MEM_MB.get();
    if mb <= 0 {
        MAX_ALLOC_SIZE
    } else {
        (mb as usize).saturating_mul(1024 * 1024)
    }
}

/// Validate a result-buffer allocation against `pgh3.polyfill_mem`.
pub fn check_polyfill_alloc(size: usize) -> PgH3Result<()> {
    let limit = limit_bytes();

    pgrx::debug1!(
        "{}: using {} of the possible {}MB",
        POLYFILL_MEM_SETTING_NAME,
        human_byte_size(size),
        limit / 1024 / 1024
    );

    if size > limit {
        return Err(PgH3Error::PolyfillMemExceeded {
            requested: human_byte_size(size),
            limit_mb: limit / 1024 / 1024,
        });
    }
    Ok(())
}

/// Result-buffer size for `count` cells.
pub fn cell_buffer_size(count: usize) -> usize {
    count.saturating_mul(std::mem::size_of::<h3o::CellIndex>())
}

fn human_byte_size(size: usize) -> String {
    const SUFFIX: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut value = size as f64;
    let mut i = 0;
    while value > 1024.0 && i < SUFFIX.len() - 1 {
        value /= 1024.0;
        i += 1;
    }
    format!("{value:.2}{}", SUFFIX[i])
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_human_byte_size() {
        assert_eq!(human_byte_size(512), "512.00B");
        assert_eq!(human_byte_size(1024), "1024.00B");
        assert_eq!(human_byte_size(2048), "2.00KB");
        assert_eq!(human_byte_size(3 * 1024 * 1024), "3.00MB");
    }

    #[pg_test]
    fn test_limit_defaults_to_max_alloc_size() {
        Spi::run("SET pgh3.polyfill_mem = 0").unwrap();
        assert!(check_polyfill_alloc(MAX_ALLOC_SIZE).is_ok());
        assert!(check_polyfill_alloc(MAX_ALLOC_SIZE + 1).is_err());
    }

    #[pg_test]
    fn test_limit_follows_setting() {
        Spi::run("SET pgh3.polyfill_mem = 1").unwrap();
        assert!(check_polyfill_alloc(1024 * 1024).is_ok());
        assert!(check_polyfill_alloc(1024 * 1024 + 1).is_err());
    }

    #[pg_test]
    fn test_setting_accepts_memory_unit_suffix() {
        Spi::run("SET pgh3.polyfill_mem = '2MB'").unwrap();
        assert!(check_polyfill_alloc(2 * 1024 * 1024).is_ok());
        assert!(check_polyfill_alloc(2 * 1024 * 1024 + 1).is_err());
    }
}
