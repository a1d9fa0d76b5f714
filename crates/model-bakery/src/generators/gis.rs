//! Well-known-text geometry generators.

use rand::Rng;

fn coordinate() -> (f64, f64) {
	let mut rng = rand::thread_rng();
	(rng.gen_range(-180.0..180.0), rng.gen_range(-90.0..90.0))
}

fn coordinates(count: usize) -> String {
	(0..count)
		.map(|_| {
			let (x, y) = coordinate();
			format!("{x} {y}")
		})
		.collect::<Vec<_>>()
		.join(", ")
}

fn ring() -> String {
	let (x, y) = coordinate();
	format!("({x} {y}, {}, {x} {y})", coordinates(2))
}

/// `POINT (x y)`.
pub fn gen_point() -> String {
	format!("POINT ({})", coordinates(1))
}

/// `LINESTRING (x y, x y)`.
pub fn gen_line_string() -> String {
	format!("LINESTRING ({})", coordinates(2))
}

/// `POLYGON` with one closed ring.
pub fn gen_polygon() -> String {
	format!("POLYGON ({})", ring())
}

/// `MULTIPOINT` with one point.
pub fn gen_multi_point() -> String {
	format!("MULTIPOINT (({}))", coordinates(1))
}

/// `MULTILINESTRING` with one line.
pub fn gen_multi_line_string() -> String {
	format!("MULTILINESTRING (({}))", coordinates(2))
}

/// `MULTIPOLYGON` with one polygon.
pub fn gen_multi_polygon() -> String {
	format!("MULTIPOLYGON (({}))", ring())
}

/// `GEOMETRYCOLLECTION` of a point and a line.
pub fn gen_geometry_collection() -> String {
	format!(
		"GEOMETRYCOLLECTION ({}, {})",
		gen_point(),
		gen_line_string()
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(gen_point(), "POINT (")]
	#[case(gen_polygon(), "POLYGON ((")]
	#[case(gen_multi_polygon(), "MULTIPOLYGON (((")]
	#[case(gen_geometry_collection(), "GEOMETRYCOLLECTION (POINT")]
	fn test_wkt_prefix(#[case] wkt: String, #[case] prefix: &str) {
		assert!(wkt.starts_with(prefix), "{wkt}");
	}

	#[rstest]
	fn test_polygon_ring_is_closed() {
		let wkt = gen_polygon();
		let inner = wkt
			.trim_start_matches("POLYGON ((")
			.trim_end_matches("))");
		let points: Vec<&str> = inner.split(", ").collect();
		assert_eq!(points.len(), 4);
		assert_eq!(points.first(), points.last());
	}
}
