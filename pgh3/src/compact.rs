//! Compaction of H3 index sets into coarser covering sets.

use crate::error::{PgH3Error, PgH3Result, ReportableError};
use crate::guc;
use crate::index::parse_index;
use h3o::CellIndex;
use pgrx::prelude::*;
use pgrx::Array;

/// Compact the given set of H3 indexes into the minimal set of indexes
/// covering the same area. All input indexes must share one resolution and
/// contain no duplicates.
#[pg_extern(immutable, parallel_safe)]
fn h3_compact<'a>(indexes: Array<'a, &'a str>) -> SetOfIterator<'static, String> {
    compact(&indexes).report_unwrap()
}

fn compact(indexes: &Array<&str>) -> PgH3Result<SetOfIterator<'static, String>> {
    let mut cells: Vec<CellIndex> = Vec::with_capacity(indexes.len());
    for (position, value) in indexes.iter().enumerate() {
        let value = value.ok_or(PgH3Error::NullArrayElement(position + 1))?;
        cells.push(parse_index(value)?);
    }

    guc::check_polyfill_alloc(guc::cell_buffer_size(cells.len()))?;

    let uncompacted = cells.len();
    let compacted: Vec<String> = CellIndex::compact(cells)?
        .into_iter()
        .map(|cell| cell.to_string())
        .collect();
    pgrx::debug1!("compacted {} H3 hexagons to {}", uncompacted, compacted.len());

    Ok(SetOfIterator::new(compacted.into_iter()))
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_complete_child_set_compacts_to_parent() {
        let compacted = Spi::get_one::<String>(
            "SELECT * FROM h3_compact(\
                (SELECT array_agg(c) FROM h3_to_children('8928308280fffff', 10) AS c))",
        )
        .unwrap()
        .unwrap();
        assert_eq!(compacted, "8928308280fffff");

        let count = Spi::get_one::<i64>(
            "SELECT count(*) FROM h3_compact(\
                (SELECT array_agg(c) FROM h3_to_children('8928308280fffff', 10) AS c))",
        )
        .unwrap()
        .unwrap();
        assert_eq!(count, 1);
    }

    #[pg_test]
    fn test_partial_child_set_stays_uncompacted() {
        // drop one child; the remaining six cannot be merged
        let count = Spi::get_one::<i64>(
            "SELECT count(*) FROM h3_compact(\
                (SELECT array_agg(c) FROM h3_to_children('8928308280fffff', 10) AS c \
                 WHERE c <> (SELECT min(x) FROM h3_to_children('8928308280fffff', 10) AS x)))",
        )
        .unwrap()
        .unwrap();
        assert_eq!(count, 6);
    }

    #[pg_test]
    fn test_single_index_compacts_to_itself() {
        let compacted =
            Spi::get_one::<String>("SELECT * FROM h3_compact(ARRAY['8928308280fffff'])")
                .unwrap()
                .unwrap();
        assert_eq!(compacted, "8928308280fffff");
    }

    #[pg_test]
    fn test_empty_array_yields_empty_set() {
        let count = Spi::get_one::<i64>("SELECT count(*) FROM h3_compact(ARRAY[]::text[])")
            .unwrap()
            .unwrap();
        assert_eq!(count, 0);
    }

    #[pg_test]
    fn test_duplicate_indexes_error() {
        let duplicated: Vec<&str> = vec!["8928308280fffff", "8928308280fffff"];
        let result = CellIndex::compact(
            duplicated
                .into_iter()
                .map(|v| parse_index(v).unwrap())
                .collect::<Vec<_>>(),
        );
        assert!(result.is_err());
    }
}
