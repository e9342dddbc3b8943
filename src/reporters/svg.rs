//! SVG reporter
//!
//! Draws the classic 2x3 grid of scatter plots:
//!
//! ```text
//! Groundtruth   Annotator 1   Annotator 2
//! Predictions   Annotator 3   Annotator 4
//! ```
//!
//! Samples are plotted on the first two features, class 0 as blue crosses
//! and class 1 as red crosses. Panels for annotators that do not exist are
//! left out.

use crate::pipeline::DemoRun;
use anyhow::Result;
use chrono::Local;
use std::fmt::Write;

const PANEL: f64 = 280.0;
const GAP: f64 = 40.0;
const TITLE_HEIGHT: f64 = 24.0;
const COLUMNS: usize = 3;
const ROWS: usize = 2;
const MARKER: f64 = 4.0;

const CLASS_COLORS: [&str; 2] = ["blue", "red"];

/// One scatter panel
struct Panel<'a> {
    title: String,
    labels: &'a [u8],
}

/// Data-space bounds shared by every panel
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bounds {
    min_x: f64,
    max_x: f64,
    min_y: f64,
    max_y: f64,
}

impl Bounds {
    fn from_points(points: &[(f64, f64)]) -> Self {
        let mut b = Bounds {
            min_x: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            min_y: f64::INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for &(x, y) in points {
            b.min_x = b.min_x.min(x);
            b.max_x = b.max_x.max(x);
            b.min_y = b.min_y.min(y);
            b.max_y = b.max_y.max(y);
        }
        if !b.min_x.is_finite() {
            return Bounds {
                min_x: -1.0,
                max_x: 1.0,
                min_y: -1.0,
                max_y: 1.0,
            };
        }
        b.pad()
    }

    /// Widen by 5% on every side, and to a unit range when flat
    fn pad(self) -> Self {
        let (min_x, max_x) = pad_range(self.min_x, self.max_x);
        let (min_y, max_y) = pad_range(self.min_y, self.max_y);
        Bounds {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    /// Map a data point into a panel whose top-left corner is (ox, oy)
    fn project(&self, (x, y): (f64, f64), ox: f64, oy: f64) -> (f64, f64) {
        let px = ox + (x - self.min_x) / (self.max_x - self.min_x) * PANEL;
        // SVG y grows downwards
        let py = oy + PANEL - (y - self.min_y) / (self.max_y - self.min_y) * PANEL;
        (px, py)
    }
}

fn pad_range(min: f64, max: f64) -> (f64, f64) {
    let span = max - min;
    if span <= f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min - span * 0.05, max + span * 0.05)
    }
}

/// Render run as a standalone SVG document
pub fn render(run: &DemoRun) -> Result<String> {
    let dataset = &run.data.dataset;
    let features = dataset.features();
    let points: Vec<(f64, f64)> = (0..dataset.n_samples())
        .map(|i| {
            let y = if features.ncols() > 1 { features[(i, 1)] } else { 0.0 };
            (features[(i, 0)], y)
        })
        .collect();
    let bounds = Bounds::from_points(&points);

    let labels = &run.data.annotator_labels;
    let annotator = |t: usize| {
        (t < labels.n_annotators()).then(|| Panel {
            title: format!("Annotator {}", t + 1),
            labels: labels.row(t),
        })
    };
    // Grid slots in reading order
    let slots: [Option<Panel<'_>>; COLUMNS * ROWS] = [
        Some(Panel {
            title: "Groundtruth".to_string(),
            labels: dataset.labels(),
        }),
        annotator(0),
        annotator(1),
        Some(Panel {
            title: "Predictions".to_string(),
            labels: &run.predictions,
        }),
        annotator(2),
        annotator(3),
    ];

    let width = COLUMNS as f64 * (PANEL + GAP) + GAP;
    let height = ROWS as f64 * (PANEL + GAP + TITLE_HEIGHT) + GAP;

    let mut svg = String::new();
    writeln!(svg, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = width,
        h = height
    )?;
    writeln!(
        svg,
        "<!-- passive-crowd: {} samples, {} annotators, generated {} -->",
        dataset.n_samples(),
        labels.n_annotators(),
        Local::now().format("%Y-%m-%d %H:%M:%S")
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

    for (slot, panel) in slots.iter().enumerate() {
        let Some(panel) = panel else { continue };
        let col = slot % COLUMNS;
        let row = slot / COLUMNS;
        let ox = GAP + col as f64 * (PANEL + GAP);
        let oy = GAP + TITLE_HEIGHT + row as f64 * (PANEL + GAP + TITLE_HEIGHT);
        render_panel(&mut svg, panel, &points, &bounds, ox, oy)?;
    }

    writeln!(svg, "</svg>")?;
    Ok(svg)
}

fn render_panel(
    svg: &mut String,
    panel: &Panel<'_>,
    points: &[(f64, f64)],
    bounds: &Bounds,
    ox: f64,
    oy: f64,
) -> std::fmt::Result {
    writeln!(svg, r#"<g class="panel">"#)?;
    writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-family="sans-serif" font-size="14" text-anchor="middle">{}</text>"#,
        ox + PANEL / 2.0,
        oy - 8.0,
        xml_escape(&panel.title)
    )?;
    writeln!(
        svg,
        r##"<rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#888"/>"##,
        ox, oy, PANEL, PANEL
    )?;

    for (&point, &label) in points.iter().zip(panel.labels) {
        let (px, py) = bounds.project(point, ox, oy);
        let color = CLASS_COLORS[usize::from(label.min(1))];
        writeln!(
            svg,
            r#"<path d="M{:.1} {:.1}L{:.1} {:.1}M{:.1} {:.1}L{:.1} {:.1}" stroke="{}" stroke-width="1.5"/>"#,
            px - MARKER,
            py - MARKER,
            px + MARKER,
            py + MARKER,
            px - MARKER,
            py + MARKER,
            px + MARKER,
            py - MARKER,
            color
        )?;
    }

    writeln!(svg, "</g>")
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
