//! SVG charts rendered with Plotters
//!
//! Charts are drawn from filled polygons only, so no font backend is needed;
//! numbers and legends are rendered by the surrounding HTML.

use crate::batch::BucketCounts;
use crate::types::prediction::RiskBucket;
use plotters::prelude::*;
use std::f64::consts::PI;

const TRACK_COLOR: RGBColor = RGBColor(42, 42, 58);
const ACCENT_COLOR: RGBColor = RGBColor(139, 92, 246);

/// Gauge size in pixels
pub const GAUGE_SIZE: (u32, u32) = (320, 180);
/// Pie chart size in pixels
pub const PIE_SIZE: (u32, u32) = (300, 300);
/// Donut hole as a fraction of the pie radius
const PIE_HOLE: f64 = 0.45;

/// Display color for a risk bucket
pub fn bucket_color(bucket: RiskBucket) -> RGBColor {
    match bucket {
        RiskBucket::Low => RGBColor(34, 197, 94),
        RiskBucket::Medium => RGBColor(245, 158, 11),
        RiskBucket::High => RGBColor(239, 68, 68),
    }
}

/// Hex form of a color for use in CSS
pub fn css_color(color: RGBColor) -> String {
    format!("#{:02X}{:02X}{:02X}", color.0, color.1, color.2)
}

/// Half-circle gauge for a value on the 0-100 axis
pub fn gauge_svg(value: f64) -> anyhow::Result<String> {
    let fraction = (value / 100.0).clamp(0.0, 1.0);
    let (width, height) = GAUGE_SIZE;
    let center = (width as i32 / 2, height as i32 - 20);
    let (inner, outer) = (100.0, 140.0);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, GAUGE_SIZE).into_drawing_area();

        root.draw(&Polygon::new(
            arc_band(center, inner, outer, PI, 0.0),
            TRACK_COLOR.filled(),
        ))?;

        if fraction > 0.0 {
            root.draw(&Polygon::new(
                arc_band(center, inner, outer, PI, PI * (1.0 - fraction)),
                ACCENT_COLOR.filled(),
            ))?;
        }

        root.present()?;
    }

    Ok(svg)
}

/// Donut chart of customers per risk bucket, starting at twelve o'clock
pub fn risk_pie_svg(counts: &BucketCounts) -> anyhow::Result<String> {
    let (width, height) = PIE_SIZE;
    let center = (width as i32 / 2, height as i32 / 2);
    let outer = (width.min(height) as f64 / 2.0) - 10.0;
    let inner = outer * PIE_HOLE;
    let total = counts.total();

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PIE_SIZE).into_drawing_area();

        let mut start = PI / 2.0;
        for (bucket, count) in counts.present() {
            let sweep = 2.0 * PI * count as f64 / total as f64;
            let end = start - sweep;
            root.draw(&Polygon::new(
                arc_band(center, inner, outer, start, end),
                bucket_color(bucket).filled(),
            ))?;
            start = end;
        }

        root.present()?;
    }

    Ok(svg)
}

/// Closed outline of a ring segment between two angles (radians, y up)
fn arc_band(center: (i32, i32), inner: f64, outer: f64, start: f64, end: f64) -> Vec<(i32, i32)> {
    let steps = (((start - end).abs() / (2.0 * PI)) * 128.0).ceil().max(2.0) as usize;
    let point = |radius: f64, angle: f64| {
        (
            center.0 + (radius * angle.cos()).round() as i32,
            center.1 - (radius * angle.sin()).round() as i32,
        )
    };

    let mut points = Vec::with_capacity(2 * (steps + 1));
    for i in 0..=steps {
        let angle = start + (end - start) * i as f64 / steps as f64;
        points.push(point(outer, angle));
    }
    for i in (0..=steps).rev() {
        let angle = start + (end - start) * i as f64 / steps as f64;
        points.push(point(inner, angle));
    }
    points
}
