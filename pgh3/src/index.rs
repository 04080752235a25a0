//! Conversions between H3 indexes, coordinates and cell properties.

use crate::error::{PgH3Error, PgH3Result, ReportableError};
use crate::geometry::{latlng_to_point, point_to_latlng, PgPolygon};
use h3o::{CellIndex, Resolution};
use pgrx::prelude::*;

/// Parse the 15-character textual form of an H3 index.
pub(crate) fn parse_index(value: &str) -> PgH3Result<CellIndex> {
    value
        .parse::<CellIndex>()
        .map_err(|_| PgH3Error::InvalidIndex(value.to_string()))
}

pub(crate) fn parse_resolution(resolution: i32) -> PgH3Result<Resolution> {
    u8::try_from(resolution)
        .ok()
        .and_then(|r| Resolution::try_from(r).ok())
        .ok_or(PgH3Error::InvalidResolution(resolution))
}

/// Find the H3 index for a coordinate pair.
///
/// The point is interpreted as (longitude, latitude) in degrees, the index
/// is returned in its string representation.
#[pg_extern(immutable, parallel_safe)]
fn h3_geo_to_h3index(location: pg_sys::Point, resolution: i32) -> String {
    geo_to_index(location, resolution).report_unwrap()
}

fn geo_to_index(location: pg_sys::Point, resolution: i32) -> PgH3Result<String> {
    let resolution = parse_resolution(resolution)?;
    let coord = point_to_latlng(location)?;
    Ok(coord.to_cell(resolution).to_string())
}

/// Return the centroid of the given H3 index as a native point.
#[pg_extern(immutable, parallel_safe)]
fn h3_h3index_to_geo(index: &str) -> pg_sys::Point {
    parse_index(index)
        .map(|cell| latlng_to_point(h3o::LatLng::from(cell)))
        .report_unwrap()
}

/// Return the boundary of the given H3 index as a native polygon.
#[pg_extern(immutable, parallel_safe)]
fn h3_h3index_to_geoboundary(index: &str) -> PgPolygon {
    parse_index(index)
        .map(|cell| {
            PgPolygon::new(
                cell.boundary()
                    .iter()
                    .map(|vertex| latlng_to_point(*vertex))
                    .collect(),
            )
        })
        .report_unwrap()
}

/// True when the textual value is a valid H3 cell index.
#[pg_extern(immutable, parallel_safe)]
fn h3_h3index_is_valid(index: &str) -> bool {
    parse_index(index).is_ok()
}

/// Resolution of the given H3 index.
#[pg_extern(immutable, parallel_safe)]
fn h3_get_resolution(index: &str) -> i32 {
    parse_index(index)
        .map(|cell| i32::from(u8::from(cell.resolution())))
        .report_unwrap()
}

/// Base cell number of the given H3 index.
#[pg_extern(immutable, parallel_safe)]
fn h3_get_basecell(index: &str) -> i32 {
    parse_index(index)
        .map(|cell| i32::from(u8::from(cell.base_cell())))
        .report_unwrap()
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    // res-9 hexagon in San Francisco, straight from the H3 documentation
    const SF_INDEX: &str = "8928308280fffff";

    #[pg_test]
    fn test_index_text_roundtrip_is_stable() {
        let cell = parse_index(SF_INDEX).unwrap();
        assert_eq!(cell.to_string(), SF_INDEX);
    }

    #[pg_test]
    fn test_invalid_index_is_rejected() {
        assert!(parse_index("no-such-index").is_err());
        assert!(parse_index("").is_err());
    }

    #[pg_test]
    fn test_is_valid_via_spi() {
        let valid = Spi::get_one::<bool>("SELECT h3_h3index_is_valid('8928308280fffff')")
            .unwrap()
            .unwrap();
        assert!(valid);

        let invalid = Spi::get_one::<bool>("SELECT h3_h3index_is_valid('zzzzzzzzzzzzzzz')")
            .unwrap()
            .unwrap();
        assert!(!invalid);
    }

    #[pg_test]
    fn test_geo_to_index_and_back() {
        // index the cell centroid again; it must map to the same cell
        let reindexed = Spi::get_one::<String>(
            "SELECT h3_geo_to_h3index(h3_h3index_to_geo('8928308280fffff'), 9)",
        )
        .unwrap()
        .unwrap();
        assert_eq!(reindexed, SF_INDEX);
    }

    #[pg_test]
    fn test_centroid_is_near_input_point() {
        let center = Spi::get_one::<pg_sys::Point>(
            "SELECT h3_h3index_to_geo(h3_geo_to_h3index(point(-122.419, 37.775), 9))",
        )
        .unwrap()
        .unwrap();
        assert!((center.x - -122.419).abs() < 0.01);
        assert!((center.y - 37.775).abs() < 0.01);
    }

    #[pg_test]
    fn test_boundary_is_a_hexagon() {
        let npoints = Spi::get_one::<i32>(
            "SELECT npoints(h3_h3index_to_geoboundary('8928308280fffff'))",
        )
        .unwrap()
        .unwrap();
        assert_eq!(npoints, 6);
    }

    #[pg_test]
    fn test_resolution_and_basecell() {
        let resolution = Spi::get_one::<i32>("SELECT h3_get_resolution('8928308280fffff')")
            .unwrap()
            .unwrap();
        assert_eq!(resolution, 9);

        let basecell = Spi::get_one::<i32>("SELECT h3_get_basecell('8928308280fffff')")
            .unwrap()
            .unwrap();
        assert!((0..122).contains(&basecell));
    }

    #[pg_test]
    fn test_resolution_out_of_range() {
        assert!(parse_resolution(-1).is_err());
        assert!(parse_resolution(16).is_err());
        assert!(parse_resolution(0).is_ok());
        assert!(parse_resolution(15).is_ok());
    }
}
