use std::collections::BTreeSet;

use indexmap::IndexMap;

use super::{not_configured, require_column};
use crate::dataset::{DataTable, format_number};
use crate::error::CheckError;
use crate::manifest::{GeospatialConfig, Manifest};
use crate::stats::{iqr_outliers, percentage};
use crate::validation::{Finding, Severity, Validator};

const NAME: &str = "geospatial";

/// Minimum number of coordinate pairs before the IQR rule is applied.
const MIN_IQR_POINTS: usize = 10;

/// Null coordinates above this share of rows are MAJOR.
const NULL_MAJOR_RATIO: f64 = 0.05;

/// Bounding box, duplicate location, statistical outlier and suspicious point checks.
pub struct GeospatialValidator;

impl Validator for GeospatialValidator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn validate(&self, table: &DataTable, manifest: &Manifest) -> Result<Vec<Finding>, CheckError> {
        let Some(geo) = &manifest.geospatial else {
            return Ok(vec![not_configured(NAME, "geospatial")]);
        };

        let lat_col = require_column(table, "geospatial", &geo.lat_column)?;
        let lon_col = require_column(table, "geospatial", &geo.lon_column)?;

        let mut points = Vec::new();
        let mut null_rows = BTreeSet::new();
        for row in table.rows() {
            let (lat, lon) = (&row.values[lat_col], &row.values[lon_col]);
            if lat.is_null() || lon.is_null() {
                null_rows.insert(row.index);
                continue;
            }
            // Unparsable coordinates are reported by the parsing check
            if let (Some(lat), Some(lon)) = (lat.as_f64(), lon.as_f64()) {
                points.push(Point {
                    row: row.index,
                    lat,
                    lon,
                });
            }
        }

        let mut findings = Vec::new();
        findings.extend(null_coordinates(table, &null_rows));
        findings.extend(out_of_bounds(geo, &points));
        if geo.check_duplicates {
            findings.extend(duplicate_locations(&points));
        }
        findings.extend(statistical_outliers(geo, &points));
        findings.extend(suspicious_points(&points));

        if findings.is_empty() {
            findings.push(Finding::new(
                NAME,
                Severity::Info,
                format!("{} coordinate pairs checked, no issues", points.len()),
            ));
        }

        Ok(findings)
    }
}

#[derive(Debug, Clone, Copy)]
struct Point {
    row: usize,
    lat: f64,
    lon: f64,
}

impl Point {
    fn describe(&self) -> String {
        format!(
            "row {}: lat={}, lon={}",
            self.row,
            format_number(self.lat),
            format_number(self.lon)
        )
    }
}

fn null_coordinates(table: &DataTable, null_rows: &BTreeSet<usize>) -> Option<Finding> {
    if null_rows.is_empty() {
        return None;
    }
    let ratio = null_rows.len() as f64 / table.row_count() as f64;
    let severity = if ratio > NULL_MAJOR_RATIO {
        Severity::Major
    } else {
        Severity::Minor
    };
    Some(
        Finding::new(
            NAME,
            severity,
            format!(
                "{} rows ({:.1}%) have no coordinates",
                null_rows.len(),
                ratio * 100.0
            ),
        )
        .with_rows(null_rows.iter().copied()),
    )
}

fn out_of_bounds(geo: &GeospatialConfig, points: &[Point]) -> Vec<Finding> {
    let bbox = &geo.bounding_box;
    let outside: Vec<&Point> = points
        .iter()
        .filter(|p| !bbox.contains(p.lat, p.lon))
        .collect();
    if outside.is_empty() {
        return Vec::new();
    }

    let swapped = outside.iter().filter(|p| bbox.contains(p.lon, p.lat)).count();
    let rows: BTreeSet<usize> = outside.iter().map(|p| p.row).collect();

    let mut message = format!(
        "{} rows outside the expected bounding box (lat [{}, {}], lon [{}, {}])",
        outside.len(),
        format_number(bbox.lat_min),
        format_number(bbox.lat_max),
        format_number(bbox.lon_min),
        format_number(bbox.lon_max)
    );
    if swapped > 0 {
        message.push_str(&format!("; {} of them are likely swapped coordinates", swapped));
    }

    let evidence = outside.iter().map(|p| {
        if bbox.contains(p.lon, p.lat) {
            format!("{} (likely swapped coordinates)", p.describe())
        } else {
            p.describe()
        }
    });

    vec![
        Finding::new(NAME, Severity::Minor, message)
            .with_rows(rows.iter().copied())
            .with_evidence(evidence),
        Finding::new(
            NAME,
            Severity::Minor,
            format!("geographic outlier: {} rows fall outside the expected region", rows.len()),
        )
        .with_rows(rows),
    ]
}

fn duplicate_locations(points: &[Point]) -> Option<Finding> {
    // -0.0 and 0.0 are the same location
    let key = |v: f64| if v == 0.0 { 0u64 } else { v.to_bits() };

    let mut groups: IndexMap<(u64, u64), Vec<&Point>> = IndexMap::new();
    for p in points {
        groups.entry((key(p.lat), key(p.lon))).or_default().push(p);
    }

    let duplicated: Vec<&Vec<&Point>> = groups.values().filter(|g| g.len() > 1).collect();
    if duplicated.is_empty() {
        return None;
    }

    let rows: BTreeSet<usize> = duplicated.iter().flat_map(|g| g.iter().map(|p| p.row)).collect();
    Some(
        Finding::new(
            NAME,
            Severity::Info,
            format!(
                "{} rows share {} duplicated coordinate pairs",
                rows.len(),
                duplicated.len()
            ),
        )
        .with_rows(rows)
        .with_evidence(duplicated.iter().map(|g| {
            format!(
                "({}, {}): {} rows",
                format_number(g[0].lat),
                format_number(g[0].lon),
                g.len()
            )
        })),
    )
}

fn statistical_outliers(geo: &GeospatialConfig, points: &[Point]) -> Option<Finding> {
    if points.len() < MIN_IQR_POINTS {
        return None;
    }

    let lats: Vec<f64> = points.iter().map(|p| p.lat).collect();
    let lons: Vec<f64> = points.iter().map(|p| p.lon).collect();
    let lat_out = iqr_outliers(&lats, geo.iqr_multiplier);
    let lon_out = iqr_outliers(&lons, geo.iqr_multiplier);

    let positions: BTreeSet<usize> = lat_out.union(&lon_out).copied().collect();
    if positions.is_empty() {
        return None;
    }

    let evidence = positions.iter().map(|&i| {
        let axis = match (lat_out.contains(&i), lon_out.contains(&i)) {
            (true, true) => "lat and lon",
            (true, false) => "lat",
            _ => "lon",
        };
        format!("{} ({} outlier)", points[i].describe(), axis)
    });

    Some(
        Finding::new(
            NAME,
            Severity::Minor,
            format!(
                "{} rows ({:.1}%) are statistical outliers (IQR rule, k={})",
                positions.len(),
                percentage(positions.len(), points.len()),
                geo.iqr_multiplier
            ),
        )
        .with_evidence(evidence)
        .with_rows(positions.iter().map(|&i| points[i].row)),
    )
}

fn suspicious_points(points: &[Point]) -> Option<Finding> {
    let suspicious: Vec<&Point> = points
        .iter()
        .filter(|p| {
            let origin = p.lat == 0.0 && p.lon == 0.0;
            origin || (p.lat.fract() == 0.0 && p.lon.fract() == 0.0)
        })
        .collect();
    if suspicious.is_empty() {
        return None;
    }

    Some(
        Finding::new(
            NAME,
            Severity::Minor,
            format!(
                "{} rows have suspicious coordinates ((0, 0) or whole-number latitude and longitude)",
                suspicious.len()
            ),
        )
        .with_rows(suspicious.iter().map(|p| p.row))
        .with_evidence(suspicious.iter().map(|p| p.describe())),
    )
}
