//! Average cell metrics per resolution.

use crate::error::ReportableError;
use crate::index::parse_resolution;
use pgrx::prelude::*;

/// Average hexagon area in square kilometers at the given resolution.
#[pg_extern(immutable, parallel_safe)]
fn h3_hexagon_area_km2(resolution: i32) -> f64 {
    parse_resolution(resolution)
        .map(|r| r.area_km2())
        .report_unwrap()
}

/// Average hexagon area in square meters at the given resolution.
#[pg_extern(immutable, parallel_safe)]
fn h3_hexagon_area_m2(resolution: i32) -> f64 {
    parse_resolution(resolution)
        .map(|r| r.area_m2())
        .report_unwrap()
}

/// Average hexagon edge length in kilometers at the given resolution.
#[pg_extern(immutable, parallel_safe)]
fn h3_edge_length_km(resolution: i32) -> f64 {
    parse_resolution(resolution)
        .map(|r| r.edge_length_km())
        .report_unwrap()
}

/// Average hexagon edge length in meters at the given resolution.
#[pg_extern(immutable, parallel_safe)]
fn h3_edge_length_m(resolution: i32) -> f64 {
    parse_resolution(resolution)
        .map(|r| r.edge_length_m())
        .report_unwrap()
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_areas_shrink_with_finer_resolutions() {
        for resolution in 0..15 {
            let coarse = Spi::get_one::<f64>(&format!(
                "SELECT h3_hexagon_area_km2({resolution})"
            ))
            .unwrap()
            .unwrap();
            let fine = Spi::get_one::<f64>(&format!(
                "SELECT h3_hexagon_area_km2({})",
                resolution + 1
            ))
            .unwrap()
            .unwrap();
            assert!(coarse > fine);
            assert!(fine > 0.0);
        }
    }

    #[pg_test]
    fn test_unit_conversions_are_consistent() {
        let km2 = Spi::get_one::<f64>("SELECT h3_hexagon_area_km2(5)")
            .unwrap()
            .unwrap();
        let m2 = Spi::get_one::<f64>("SELECT h3_hexagon_area_m2(5)")
            .unwrap()
            .unwrap();
        assert!((m2 / km2 - 1_000_000.0).abs() / 1_000_000.0 < 0.01);

        let km = Spi::get_one::<f64>("SELECT h3_edge_length_km(5)")
            .unwrap()
            .unwrap();
        let m = Spi::get_one::<f64>("SELECT h3_edge_length_m(5)")
            .unwrap()
            .unwrap();
        assert!((m / km - 1_000.0).abs() / 1_000.0 < 0.01);
    }

    #[pg_test]
    fn test_out_of_range_resolution_errors() {
        assert!(parse_resolution(16).is_err());
    }
}
