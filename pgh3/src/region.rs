//! Polygon filling: the set of cells whose centroids fall inside a region.

use crate::error::{PgH3Result, ReportableError};
use crate::geometry::{PgPolygon, PgPolygonList};
use crate::guc;
use crate::index::parse_resolution;
use h3o::geom::{PolyfillConfig, Polygon, ToCells};
use pgrx::prelude::*;

/// Assemble the H3 region polygon from the exterior ring and the optional
/// interior rings (holes).
fn build_region(
    exterior_ring: &PgPolygon,
    interior_rings: Option<&PgPolygonList>,
) -> PgH3Result<Polygon> {
    let holes = interior_rings
        .map(|rings| rings.0.iter().map(|ring| ring.ring()).collect())
        .unwrap_or_default();
    let polygon = geo_types::Polygon::new(exterior_ring.ring(), holes);
    Ok(Polygon::from_degrees(polygon)?)
}

/// Fill the given region with H3 indexes of the given resolution.
///
/// The first argument is the exterior ring; a null exterior yields no
/// rows. The second may be null, empty, or a 1-dimensional array of
/// interior rings cut out of the region.
#[pg_extern(immutable, parallel_safe)]
fn h3_polyfill(
    exterior_ring: Option<PgPolygon>,
    interior_rings: Option<PgPolygonList>,
    resolution: i32,
) -> SetOfIterator<'static, String> {
    match exterior_ring {
        // early exit when the exterior ring is null
        None => SetOfIterator::new(std::iter::empty()),
        Some(ring) => polyfill(&ring, interior_rings.as_ref(), resolution).report_unwrap(),
    }
}

fn polyfill(
    exterior_ring: &PgPolygon,
    interior_rings: Option<&PgPolygonList>,
    resolution: i32,
) -> PgH3Result<SetOfIterator<'static, String>> {
    let config = PolyfillConfig::new(parse_resolution(resolution)?);
    let region = build_region(exterior_ring, interior_rings)?;

    let estimate = region.max_cells_count(config);
    pgrx::debug1!(
        "generating an estimated number of {} H3 hexagons at resolution {}",
        estimate,
        resolution
    );
    guc::check_polyfill_alloc(guc::cell_buffer_size(estimate))?;

    let cells: Vec<String> = region
        .to_cells(config)
        .map(|cell| cell.to_string())
        .collect();
    pgrx::debug1!(
        "generated exactly {} H3 hexagons at resolution {}",
        cells.len(),
        resolution
    );

    Ok(SetOfIterator::new(cells.into_iter()))
}

/// Estimate the number of H3 indexes `h3_polyfill` would generate for the
/// given region. The estimate is an upper bound of the actual count.
#[pg_extern(immutable, parallel_safe)]
fn h3_polyfill_estimate(
    exterior_ring: Option<PgPolygon>,
    interior_rings: Option<PgPolygonList>,
    resolution: i32,
) -> Option<i32> {
    let ring = exterior_ring?;
    Some(polyfill_estimate(&ring, interior_rings.as_ref(), resolution).report_unwrap())
}

fn polyfill_estimate(
    exterior_ring: &PgPolygon,
    interior_rings: Option<&PgPolygonList>,
    resolution: i32,
) -> PgH3Result<i32> {
    let config = PolyfillConfig::new(parse_resolution(resolution)?);
    let region = build_region(exterior_ring, interior_rings)?;
    Ok(i32::try_from(region.max_cells_count(config)).unwrap_or(i32::MAX))
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    // roughly 10km x 10km around Munich
    const EXTERIOR: &str = "polygon '((11.48,48.08),(11.48,48.22),(11.66,48.22),(11.66,48.08))'";
    // a hole in the middle of that square
    const HOLE: &str = "polygon '((11.54,48.12),(11.54,48.18),(11.60,48.18),(11.60,48.12))'";

    #[pg_test]
    fn test_polyfill_returns_cells() {
        let count = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, NULL, 7)"
        ))
        .unwrap()
        .unwrap();
        assert!(count > 0);

        // all produced indexes carry the requested resolution
        let bad = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, NULL, 7) AS c \
             WHERE h3_get_resolution(c) <> 7"
        ))
        .unwrap()
        .unwrap();
        assert_eq!(bad, 0);
    }

    #[pg_test]
    fn test_estimate_is_an_upper_bound() {
        let count = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, NULL, 8)"
        ))
        .unwrap()
        .unwrap();
        let estimate = Spi::get_one::<i32>(&format!(
            "SELECT h3_polyfill_estimate({EXTERIOR}, NULL, 8)"
        ))
        .unwrap()
        .unwrap();
        assert!(i64::from(estimate) >= count);
    }

    #[pg_test]
    fn test_holes_reduce_the_fill() {
        let full = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, NULL, 8)"
        ))
        .unwrap()
        .unwrap();
        let holed = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, ARRAY[{HOLE}], 8)"
        ))
        .unwrap()
        .unwrap();
        assert!(holed < full);
        assert!(holed > 0);
    }

    #[pg_test]
    fn test_null_exterior_ring_yields_no_rows() {
        let count = Spi::get_one::<i64>("SELECT count(*) FROM h3_polyfill(NULL, NULL, 7)")
            .unwrap()
            .unwrap();
        assert_eq!(count, 0);

        let estimate =
            Spi::get_one::<i32>("SELECT h3_polyfill_estimate(NULL, NULL, 7)").unwrap();
        assert_eq!(estimate, None);
    }

    #[pg_test]
    fn test_empty_interior_array_matches_null() {
        let with_null = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, NULL, 7)"
        ))
        .unwrap()
        .unwrap();
        let with_empty = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_polyfill({EXTERIOR}, ARRAY[]::polygon[], 7)"
        ))
        .unwrap()
        .unwrap();
        assert_eq!(with_null, with_empty);
    }

    #[pg_test]
    fn test_polyfill_mem_limit_is_enforced() {
        use crate::error::PgH3Error;

        Spi::run("SET pgh3.polyfill_mem = 1").unwrap();

        // a quarter-hemisphere fill at resolution 11 overshoots 1MB by
        // orders of magnitude before any cell is generated
        let exterior = PgPolygon::new(vec![
            pg_sys::Point { x: -90.0, y: 0.0 },
            pg_sys::Point { x: -90.0, y: 60.0 },
            pg_sys::Point { x: 0.0, y: 60.0 },
            pg_sys::Point { x: 0.0, y: 0.0 },
        ]);
        match polyfill(&exterior, None, 11) {
            Err(PgH3Error::PolyfillMemExceeded { .. }) => {}
            other => panic!("expected the memory limit to trip, got {:?}", other.is_ok()),
        }
    }
}
