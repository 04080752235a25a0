//! pgh3: PostgreSQL bindings for the H3 hexagonal grid system.
//!
//! Every grid operation is delegated to the `h3o` crate; this extension
//! only marshals between PostgreSQL types (text indexes, points, polygons,
//! arrays, set-returning functions) and H3's native representations.

use pgrx::prelude::*;

mod compact;
pub mod error;
pub mod geometry;
pub mod guc;
mod hierarchy;
mod index;
mod misc;
mod neighbor;
mod region;

pg_module_magic!();

#[pg_guard]
extern "C-unwind" fn _PG_init() {
    guc::init();
}

/// Version of this extension (not of H3 itself).
#[pg_extern(immutable, parallel_safe)]
fn h3_ext_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use pgrx::prelude::*;

    #[pg_test]
    fn test_ext_version() {
        let version = Spi::get_one::<String>("SELECT h3_ext_version()")
            .unwrap()
            .unwrap();
        assert_eq!(version, env!("CARGO_PKG_VERSION"));
    }
}

#[cfg(test)]
pub mod pg_test {
    pub fn setup(_options: Vec<&str>) {
        // noop
    }

    pub fn postgresql_conf_options() -> Vec<&'static str> {
        vec![]
    }
}
