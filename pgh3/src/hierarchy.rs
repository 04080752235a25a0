//! Parent/child navigation in the H3 resolution hierarchy.

use crate::error::{PgH3Error, PgH3Result, ReportableError};
use crate::index::{parse_index, parse_resolution};
use pgrx::prelude::*;

/// Return the parent (coarser) index containing the given index.
#[pg_extern(immutable, parallel_safe)]
fn h3_to_parent(index: &str, resolution: i32) -> String {
    to_parent(index, resolution).report_unwrap()
}

fn to_parent(index: &str, resolution: i32) -> PgH3Result<String> {
    let cell = parse_index(index)?;
    let parent_resolution = parse_resolution(resolution)?;
    cell.parent(parent_resolution)
        .map(|parent| parent.to_string())
        .ok_or_else(|| PgH3Error::NoParent {
            index: index.to_string(),
            resolution,
        })
}

/// Return the child (finer) indexes contained in the given index at the
/// given resolution. Yields nothing when the resolution is coarser than
/// the index's own.
#[pg_extern(immutable, parallel_safe)]
fn h3_to_children(index: &str, resolution: i32) -> SetOfIterator<'static, String> {
    to_children(index, resolution).report_unwrap()
}

fn to_children(index: &str, resolution: i32) -> PgH3Result<SetOfIterator<'static, String>> {
    let cell = parse_index(index)?;
    let child_resolution = parse_resolution(resolution)?;

    pgrx::debug1!(
        "generating {} H3 child hexagons at resolution {}",
        cell.children_count(child_resolution),
        resolution
    );

    let children: Vec<String> = cell
        .children(child_resolution)
        .map(|child| child.to_string())
        .collect();
    Ok(SetOfIterator::new(children.into_iter()))
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    #[pg_test]
    fn test_parent_of_child_is_consistent() {
        let parent = Spi::get_one::<String>("SELECT h3_to_parent('8928308280fffff', 8)")
            .unwrap()
            .unwrap();
        assert_eq!(parent.len(), 15);

        // every child of that parent must map back to it
        let mismatches = Spi::get_one::<i64>(&format!(
            "SELECT count(*) FROM h3_to_children('{parent}', 9) AS child \
             WHERE h3_to_parent(child, 8) <> '{parent}'"
        ))
        .unwrap()
        .unwrap();
        assert_eq!(mismatches, 0);
    }

    #[pg_test]
    fn test_hexagon_has_seven_children() {
        let count = Spi::get_one::<i64>(
            "SELECT count(*) FROM h3_to_children('8928308280fffff', 10)",
        )
        .unwrap()
        .unwrap();
        assert_eq!(count, 7);
    }

    #[pg_test]
    fn test_children_contain_original_index() {
        let count = Spi::get_one::<i64>(
            "SELECT count(*) FROM h3_to_children(h3_to_parent('8928308280fffff', 8), 9) AS c \
             WHERE c = '8928308280fffff'",
        )
        .unwrap()
        .unwrap();
        assert_eq!(count, 1);
    }

    #[pg_test]
    fn test_children_at_coarser_resolution_is_empty() {
        let count = Spi::get_one::<i64>(
            "SELECT count(*) FROM h3_to_children('8928308280fffff', 5)",
        )
        .unwrap()
        .unwrap();
        assert_eq!(count, 0);
    }

    #[pg_test]
    fn test_parent_above_own_resolution_errors() {
        assert!(to_parent("8928308280fffff", 10).is_err());
    }
}
