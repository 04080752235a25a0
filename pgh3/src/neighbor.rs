//! K-ring neighborhood enumeration.

use crate::error::{PgH3Error, PgH3Result, ReportableError};
use crate::index::parse_index;
use h3o::CellIndex;
use pgrx::prelude::*;

/// Return all indexes within grid distance `distance` of the given index,
/// the index itself included.
#[pg_extern(immutable, parallel_safe)]
fn h3_kring(index: &str, distance: i32) -> SetOfIterator<'static, String> {
    kring(index, distance).report_unwrap()
}

fn kring(index: &str, distance: i32) -> PgH3Result<SetOfIterator<'static, String>> {
    let center = parse_index(index)?;
    let k = u32::try_from(distance).map_err(|_| PgH3Error::NegativeDistance)?;

    let neighbors: Vec<CellIndex> = center.grid_disk(k);
    pgrx::debug1!(
        "generated {} H3 hexagons within distance {}",
        neighbors.len(),
        k
    );

    Ok(SetOfIterator::new(
        neighbors.into_iter().map(|cell| cell.to_string()),
    ))
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_kring_zero_returns_exactly_the_origin() {
        let rows = Spi::get_one::<i64>("SELECT count(*) FROM h3_kring('8928308280fffff', 0)")
            .unwrap()
            .unwrap();
        assert_eq!(rows, 1);

        let origin = Spi::get_one::<String>("SELECT * FROM h3_kring('8928308280fffff', 0)")
            .unwrap()
            .unwrap();
        assert_eq!(origin, "8928308280fffff");
    }

    #[pg_test]
    fn test_kring_one_around_hexagon_has_seven_cells() {
        let rows = Spi::get_one::<i64>("SELECT count(*) FROM h3_kring('8928308280fffff', 1)")
            .unwrap()
            .unwrap();
        assert_eq!(rows, 7);
    }

    #[pg_test]
    fn test_kring_contains_origin() {
        let rows = Spi::get_one::<i64>(
            "SELECT count(*) FROM h3_kring('8928308280fffff', 2) AS c \
             WHERE c = '8928308280fffff'",
        )
        .unwrap()
        .unwrap();
        assert_eq!(rows, 1);
    }

    #[pg_test]
    fn test_negative_distance_errors() {
        assert!(kring("8928308280fffff", -1).is_err());
    }
}
