//! Datum bindings for the native PostgreSQL geometry types.
//!
//! pgrx ships support for `point` (`pg_sys::Point`) out of the box, but the
//! varlena `polygon` type and `polygon[]` arrays have to be marshaled by
//! hand. Nothing in here knows about H3; it is pure wire conversion.

use crate::error::{PgH3Error, PgH3Result};
use h3o::LatLng;
use pgrx::callconv::{Arg, ArgAbi, BoxRet, FcInfo};
use pgrx::datum::{Datum, FromDatum, IntoDatum};
use pgrx::pgrx_sql_entity_graph::metadata::{
    ArgumentError, Returns, ReturnsError, SqlMapping, SqlTranslatable,
};
use pgrx::prelude::*;
use pgrx::{ereport, PgLogLevel};

/// An owned copy of a PostgreSQL `polygon` value.
///
/// Vertices keep the PostgreSQL convention: `x` is the longitude and `y` is
/// the latitude, both in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct PgPolygon {
    pub points: Vec<pg_sys::Point>,
}

impl PgPolygon {
    pub fn new(points: Vec<pg_sys::Point>) -> Self {
        Self { points }
    }

    /// The vertices as a `geo-types` ring, ready for `h3o::geom`.
    pub fn ring(&self) -> geo_types::LineString<f64> {
        geo_types::LineString::from(
            self.points
                .iter()
                .map(|p| geo_types::Coord { x: p.x, y: p.y })
                .collect::<Vec<_>>(),
        )
    }
}

/// Convert a PostgreSQL point (lon/lat degrees) into an H3 coordinate.
pub(crate) fn point_to_latlng(p: pg_sys::Point) -> PgH3Result<LatLng> {
    LatLng::new(p.y, p.x).map_err(|source| PgH3Error::InvalidCoordinates {
        x: p.x,
        y: p.y,
        source,
    })
}

/// Convert an H3 coordinate back into a PostgreSQL point.
pub(crate) fn latlng_to_point(coord: LatLng) -> pg_sys::Point {
    pg_sys::Point {
        x: coord.lng(),
        y: coord.lat(),
    }
}

/// Smallest bounding box enclosing the vertices, as PostgreSQL stores it
/// inside every `polygon` value.
fn bound_box(points: &[pg_sys::Point]) -> pg_sys::BOX {
    let first = points.first().copied().unwrap_or(pg_sys::Point { x: 0.0, y: 0.0 });
    let mut low = first;
    let mut high = first;
    for p in points.iter().skip(1) {
        low.x = low.x.min(p.x);
        low.y = low.y.min(p.y);
        high.x = high.x.max(p.x);
        high.y = high.y.max(p.y);
    }
    pg_sys::BOX { high, low }
}

impl FromDatum for PgPolygon {
    unsafe fn from_polymorphic_datum(
        datum: pg_sys::Datum,
        is_null: bool,
        _typoid: pg_sys::Oid,
    ) -> Option<Self> {
        if is_null {
            return None;
        }
        let poly = pg_sys::pg_detoast_datum(datum.cast_mut_ptr()) as *mut pg_sys::POLYGON;
        let npts = (*poly).npts as usize;
        let points = (*poly).p.as_slice(npts).to_vec();
        Some(PgPolygon { points })
    }
}

impl IntoDatum for PgPolygon {
    fn into_datum(self) -> Option<pg_sys::Datum> {
        let npts = self.points.len();
        let size = std::mem::size_of::<pg_sys::POLYGON>()
            + npts * std::mem::size_of::<pg_sys::Point>();
        unsafe {
            let poly = pg_sys::palloc0(size) as *mut pg_sys::POLYGON;
            pgrx::varlena::set_varsize_4b(poly.cast(), size as i32);
            (*poly).npts = npts as i32;
            (*poly).p.as_mut_slice(npts).copy_from_slice(&self.points);
            (*poly).boundbox = bound_box(&self.points);
            Some(pg_sys::Datum::from(poly))
        }
    }

    fn type_oid() -> pg_sys::Oid {
        pg_sys::POLYGONOID
    }
}

unsafe impl SqlTranslatable for PgPolygon {
    fn argument_sql() -> Result<SqlMapping, ArgumentError> {
        Ok(SqlMapping::literal("polygon"))
    }

    fn return_sql() -> Result<Returns, ReturnsError> {
        Ok(Returns::One(SqlMapping::literal("polygon")))
    }
}

unsafe impl<'fcx> ArgAbi<'fcx> for PgPolygon {
    unsafe fn unbox_arg_unchecked(arg: Arg<'_, 'fcx>) -> Self {
        unsafe { arg.unbox_arg_using_from_datum() }
            .expect("polygon argument must not be null")
    }
}

unsafe impl BoxRet for PgPolygon {
    unsafe fn box_into<'fcx>(self, fcinfo: &mut FcInfo<'fcx>) -> Datum<'fcx> {
        match self.into_datum() {
            Some(datum) => unsafe { fcinfo.return_raw_datum(datum) },
            None => fcinfo.return_null(),
        }
    }
}

/// A `polygon[]` argument.
///
/// The original interface requires a 1-dimensional array of `polygon`
/// values with no null elements, so the conversion enforces exactly that
/// instead of relying on the generic pgrx array machinery.
#[derive(Debug, Clone, PartialEq)]
pub struct PgPolygonList(pub Vec<PgPolygon>);

impl FromDatum for PgPolygonList {
    unsafe fn from_polymorphic_datum(
        datum: pg_sys::Datum,
        is_null: bool,
        _typoid: pg_sys::Oid,
    ) -> Option<Self> {
        if is_null {
            return None;
        }
        let array = pg_sys::pg_detoast_datum(datum.cast_mut_ptr()) as *mut pg_sys::ArrayType;
        let ndim = (*array).ndim;
        if ndim == 0 {
            // empty array literals come through with zero dimensions
            return Some(PgPolygonList(Vec::new()));
        }
        if ndim != 1 {
            ereport!(
                PgLogLevel::ERROR,
                PgSqlErrorCode::ERRCODE_ARRAY_ELEMENT_ERROR,
                "the array of polygons must be null, an empty array or a 1-dimensional array"
            );
        }
        if (*array).elemtype != pg_sys::POLYGONOID {
            ereport!(
                PgLogLevel::ERROR,
                PgSqlErrorCode::ERRCODE_DATATYPE_MISMATCH,
                "the element type of the polygon array must be the polygon type"
            );
        }

        let mut elems: *mut pg_sys::Datum = std::ptr::null_mut();
        let mut nulls: *mut bool = std::ptr::null_mut();
        let mut nelems: std::os::raw::c_int = 0;
        pg_sys::deconstruct_array(
            array,
            pg_sys::POLYGONOID,
            -1,
            false,
            pg_sys::TYPALIGN_DOUBLE as std::os::raw::c_char,
            &mut elems,
            &mut nulls,
            &mut nelems,
        );

        let mut polygons = Vec::with_capacity(nelems as usize);
        for i in 0..nelems as usize {
            if *nulls.add(i) {
                ereport!(
                    PgLogLevel::ERROR,
                    PgSqlErrorCode::ERRCODE_NULL_VALUE_NOT_ALLOWED,
                    format!("polygon at array position {} is null", i + 1)
                );
            }
            let polygon =
                PgPolygon::from_polymorphic_datum(*elems.add(i), false, pg_sys::POLYGONOID)
                    .expect("polygon array element");
            polygons.push(polygon);
        }
        Some(PgPolygonList(polygons))
    }
}

unsafe impl SqlTranslatable for PgPolygonList {
    fn argument_sql() -> Result<SqlMapping, ArgumentError> {
        Ok(SqlMapping::literal("polygon[]"))
    }

    fn return_sql() -> Result<Returns, ReturnsError> {
        Ok(Returns::One(SqlMapping::literal("polygon[]")))
    }
}

unsafe impl<'fcx> ArgAbi<'fcx> for PgPolygonList {
    unsafe fn unbox_arg_unchecked(arg: Arg<'_, 'fcx>) -> Self {
        unsafe { arg.unbox_arg_using_from_datum() }
            .expect("polygon array argument must not be null")
    }
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;

    fn pt(x: f64, y: f64) -> pg_sys::Point {
        pg_sys::Point { x, y }
    }

    #[pg_test]
    fn test_bound_box() {
        let bb = bound_box(&[pt(1.0, 4.0), pt(-2.0, 0.5), pt(3.0, 2.0)]);
        assert_eq!(bb.low.x, -2.0);
        assert_eq!(bb.low.y, 0.5);
        assert_eq!(bb.high.x, 3.0);
        assert_eq!(bb.high.y, 4.0);
    }

    #[pg_test]
    fn test_ring_keeps_lon_lat_order() {
        let poly = PgPolygon::new(vec![pt(11.5, 48.1), pt(11.6, 48.1), pt(11.6, 48.2)]);
        let ring = poly.ring();
        assert_eq!(ring.0.len(), 3);
        assert_eq!(ring.0[0].x, 11.5);
        assert_eq!(ring.0[0].y, 48.1);
    }

    #[pg_test]
    fn test_point_latlng_roundtrip() {
        let coord = point_to_latlng(pt(11.54, 48.15)).unwrap();
        let back = latlng_to_point(coord);
        assert!((back.x - 11.54).abs() < 1e-9);
        assert!((back.y - 48.15).abs() < 1e-9);
    }

    #[pg_test]
    fn test_point_latlng_rejects_out_of_range() {
        assert!(point_to_latlng(pt(11.54, 123.0)).is_err());
    }

    #[pg_test]
    fn test_polygon_datum_roundtrip_via_spi() {
        let poly = Spi::get_one::<PgPolygon>("SELECT polygon '((0,0),(0,1),(1,1),(1,0))'")
            .expect("SPI should succeed")
            .unwrap();
        assert_eq!(poly.points.len(), 4);
        assert_eq!(poly.points[2].x, 1.0);
        assert_eq!(poly.points[2].y, 1.0);
    }
}
