use crate::config::{AppConfig, FigureConfig};
use crate::figure::{Extent, Figure};
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

pub const PAGE_TITLE: &str = "District-Level Population Change in Peru (2007-2021)";

// Layout in pixels
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;
const LEGEND_WIDTH: f64 = 180.0;
const LEGEND_ROW_MIN: f64 = 16.0;

const OUTLINE_COLOR: &str = "grey";
const OUTLINE_WIDTH: f64 = 0.5;
const MARKER_LINE_COLOR: &str = "white";
const MARKER_LINE_WIDTH: f64 = 0.5;
const FONT_FAMILY: &str = "Arial, sans-serif";

/// Write the SVG figure and the HTML page to the configured output paths.
pub fn write_outputs(config: &AppConfig, figure: &Figure) -> Result<()> {
    let svg = render_svg(figure, &config.figure);
    let page = render_page(&svg);

    write_file(&config.output.svg, &svg)?;
    write_file(&config.output.html, &page)?;

    info!(
        "Wrote {:?} and {:?}",
        config.output.svg, config.output.html
    );
    Ok(())
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))
}

/// Maps projected coordinates into canvas pixels with one scale for both
/// axes, centered in the plot area and with y pointing down.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    range: Extent,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    plot_width: f64,
    plot_height: f64,
}

impl Viewport {
    pub fn new(range: Extent, canvas: &FigureConfig) -> Self {
        let plot_width = (canvas.width as f64 - LEGEND_WIDTH).max(1.0);
        let plot_height = (canvas.height as f64 - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);

        let data_width = if range.width() > 0.0 { range.width() } else { 1.0 };
        let data_height = if range.height() > 0.0 { range.height() } else { 1.0 };
        let scale = (plot_width / data_width).min(plot_height / data_height);

        Self {
            range,
            scale,
            offset_x: (plot_width - range.width() * scale) / 2.0,
            offset_y: MARGIN_TOP + (plot_height - range.height() * scale) / 2.0,
            plot_width,
            plot_height,
        }
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.offset_x + (x - self.range.min_x) * self.scale,
            self.offset_y + (self.range.max_y - y) * self.scale,
        )
    }

    /// Paper coordinates (fractions of the plot area, y up) to pixels.
    pub fn paper_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        (
            x * self.plot_width,
            MARGIN_TOP + (1.0 - y) * self.plot_height,
        )
    }
}

pub fn render_svg(figure: &Figure, canvas: &FigureConfig) -> String {
    let viewport = Viewport::new(figure.range, canvas);
    let mut svg = SvgBuilder::new(canvas.width, canvas.height);

    svg.add_title(figure.title);
    svg.add_outlines(figure, &viewport);
    svg.add_markers(figure, &viewport);
    svg.add_legend(figure, canvas);
    svg.add_caption(figure, &viewport, canvas);

    svg.finish()
}

struct SvgBuilder {
    content: String,
    height: f64,
}

impl SvgBuilder {
    fn new(width: u32, height: u32) -> Self {
        let mut content = String::new();
        content.push_str(&format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" preserveAspectRatio="xMidYMid meet" font-family="{font}">"#,
            w = width,
            h = height,
            font = FONT_FAMILY,
        ));
        content.push('\n');
        content.push_str(r#"<rect width="100%" height="100%" fill="white"/>"#);
        content.push('\n');
        Self {
            content,
            height: height as f64,
        }
    }

    fn add_title(&mut self, title: &str) {
        self.content.push_str(&format!(
            r#"<text x="10" y="26" font-size="17" fill="black">{}</text>"#,
            escape_xml(title)
        ));
        self.content.push('\n');
    }

    fn add_outlines(&mut self, figure: &Figure, viewport: &Viewport) {
        self.content.push_str(&format!(
            r#"<g class="outlines" fill="none" stroke="{}" stroke-width="{}" pointer-events="none">"#,
            OUTLINE_COLOR, OUTLINE_WIDTH
        ));
        self.content.push('\n');

        for outline in &figure.outlines {
            let mut d = String::new();
            for (i, coord) in outline.points.iter().enumerate() {
                let (x, y) = viewport.to_pixel(coord.x, coord.y);
                let command = if i == 0 { 'M' } else { 'L' };
                d.push_str(&format!("{}{:.2} {:.2}", command, x, y));
            }
            if d.is_empty() {
                continue;
            }
            d.push('Z');
            self.content.push_str(&format!(r#"<path d="{}"/>"#, d));
            self.content.push('\n');
        }

        self.content.push_str("</g>\n");
    }

    fn add_markers(&mut self, figure: &Figure, viewport: &Viewport) {
        self.content.push_str(&format!(
            r#"<g class="markers" stroke="{}" stroke-width="{}">"#,
            MARKER_LINE_COLOR, MARKER_LINE_WIDTH
        ));
        self.content.push('\n');

        for marker in &figure.markers {
            let (x, y) = viewport.to_pixel(marker.position.x(), marker.position.y());
            self.content.push_str(&format!(
                r#"<circle cx="{:.2}" cy="{:.2}" r="{:.3}" fill="{}"><title>{}</title></circle>"#,
                x,
                y,
                marker.size / 2.0,
                marker.color.css(),
                escape_xml(&marker.hover)
            ));
            self.content.push('\n');
        }

        self.content.push_str("</g>\n");
    }

    fn add_legend(&mut self, figure: &Figure, canvas: &FigureConfig) {
        let left = canvas.width as f64 - LEGEND_WIDTH + 10.0;
        let mut y = MARGIN_TOP + 10.0;

        self.content.push_str(r#"<g class="legend" font-size="12" fill="black">"#);
        self.content.push('\n');
        self.content.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}">{}</text>"#,
            left,
            y,
            escape_xml(figure.legend_title)
        ));
        self.content.push('\n');
        y += 10.0;

        for entry in &figure.legend {
            let row = entry.size.max(LEGEND_ROW_MIN);
            let center = y + row / 2.0;
            self.content.push_str(&format!(
                r#"<circle cx="{:.1}" cy="{:.1}" r="{:.3}" fill="{}" stroke="{}" stroke-width="{}"/>"#,
                left + 20.0,
                center,
                entry.size / 2.0,
                entry.color.css(),
                MARKER_LINE_COLOR,
                MARKER_LINE_WIDTH
            ));
            self.content.push_str(&format!(
                r#"<text x="{:.1}" y="{:.1}" dominant-baseline="middle">{}</text>"#,
                left + 45.0,
                center,
                escape_xml(entry.label)
            ));
            self.content.push('\n');
            y += row + 6.0;
        }

        self.content.push_str("</g>\n");
    }

    fn add_caption(&mut self, figure: &Figure, viewport: &Viewport, canvas: &FigureConfig) {
        let (ax, ay) = figure.caption_anchor;
        let (x, y) = viewport.paper_to_pixel(ax, ay);
        // Keep the baseline inside the bottom margin
        let y = y.min(self.height - 6.0);
        let x = x.min(canvas.width as f64);
        self.content.push_str(&format!(
            r#"<text x="{:.1}" y="{:.1}" font-size="12" fill="black">{}</text>"#,
            x,
            y,
            escape_xml(figure.caption)
        ));
        self.content.push('\n');
    }

    fn finish(mut self) -> String {
        self.content.push_str("</svg>\n");
        self.content
    }
}

/// Single page embedding the figure at 90% of the viewport height.
/// Wheel zooms and dragging pans by moving the SVG viewBox.
pub fn render_page(svg: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
html, body {{ margin: 0; height: 100%; }}
#map {{ height: 90vh; width: 100%; }}
#map svg {{ width: 100%; height: 100%; cursor: grab; }}
</style>
</head>
<body>
<div id="map">
{svg}</div>
<script>
{script}</script>
</body>
</html>
"#,
        title = escape_xml(PAGE_TITLE),
        svg = svg,
        script = PAN_ZOOM_SCRIPT,
    )
}

const PAN_ZOOM_SCRIPT: &str = r#"(function () {
  var svg = document.querySelector('#map svg');
  if (!svg) return;
  var vb = svg.viewBox.baseVal;
  var home = [vb.x, vb.y, vb.width, vb.height];
  svg.addEventListener('wheel', function (e) {
    e.preventDefault();
    var p = svg.createSVGPoint();
    p.x = e.clientX; p.y = e.clientY;
    var c = p.matrixTransform(svg.getScreenCTM().inverse());
    var k = e.deltaY < 0 ? 0.8 : 1.25;
    vb.x = c.x - (c.x - vb.x) * k;
    vb.y = c.y - (c.y - vb.y) * k;
    vb.width *= k; vb.height *= k;
  }, { passive: false });
  var drag = null;
  svg.addEventListener('mousedown', function (e) { drag = { x: e.clientX, y: e.clientY }; });
  window.addEventListener('mouseup', function () { drag = null; });
  window.addEventListener('mousemove', function (e) {
    if (!drag) return;
    var m = svg.getScreenCTM();
    vb.x -= (e.clientX - drag.x) / m.a;
    vb.y -= (e.clientY - drag.y) / m.d;
    drag = { x: e.clientX, y: e.clientY };
  });
  svg.addEventListener('dblclick', function () {
    vb.x = home[0]; vb.y = home[1]; vb.width = home[2]; vb.height = home[3];
  });
})();
"#;

pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::figure::{build_figure, Extent};
    use crate::processing::join_districts;
    use crate::types::{Crs, DistrictGeometry, DistrictRecord};
    use geo::{polygon, MultiPolygon};

    fn canvas() -> FigureConfig {
        FigureConfig {
            width: 1180,
            height: 580,
        }
    }

    fn sample_figure() -> Figure {
        let districts = join_districts(
            vec![
                DistrictGeometry {
                    id: "010101".to_string(),
                    name: None,
                    boundary: MultiPolygon::new(vec![polygon![
                        (x: 0.0, y: 0.0),
                        (x: 100.0, y: 0.0),
                        (x: 100.0, y: 100.0),
                        (x: 0.0, y: 100.0),
                    ]]),
                    crs: Crs::WebMercator,
                },
                DistrictGeometry {
                    id: "010102".to_string(),
                    name: None,
                    boundary: MultiPolygon::new(vec![polygon![
                        (x: 100.0, y: 0.0),
                        (x: 200.0, y: 0.0),
                        (x: 200.0, y: 100.0),
                        (x: 100.0, y: 100.0),
                    ]]),
                    crs: Crs::WebMercator,
                },
            ],
            vec![DistrictRecord {
                id: "010101".to_string(),
                name: "Peña & Río".to_string(),
                change: Some(-250.0),
            }],
        );
        build_figure(&districts)
    }

    #[test]
    fn test_viewport_keeps_aspect_and_flips_y() {
        // 1000 x 500 plot area for a 2:1 extent
        let viewport = Viewport::new(Extent::new(0.0, 0.0, 200.0, 100.0), &canvas());

        assert_eq!(viewport.to_pixel(0.0, 100.0), (0.0, MARGIN_TOP));
        assert_eq!(viewport.to_pixel(200.0, 0.0), (1000.0, MARGIN_TOP + 500.0));
        assert_eq!(viewport.to_pixel(100.0, 50.0), (500.0, MARGIN_TOP + 250.0));
    }

    #[test]
    fn test_viewport_centers_narrow_extent() {
        let viewport = Viewport::new(Extent::new(0.0, 0.0, 100.0, 100.0), &canvas());

        // 500 px square centered in a 1000 px wide plot
        assert_eq!(viewport.to_pixel(0.0, 100.0), (250.0, MARGIN_TOP));
        assert_eq!(viewport.to_pixel(100.0, 0.0), (750.0, MARGIN_TOP + 500.0));
    }

    #[test]
    fn test_degenerate_extent_does_not_divide_by_zero() {
        let viewport = Viewport::new(Extent::default(), &canvas());
        let (x, y) = viewport.to_pixel(0.0, 0.0);
        assert!(x.is_finite() && y.is_finite());
    }

    #[test]
    fn test_svg_contents() {
        let svg = render_svg(&sample_figure(), &canvas());

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<path ").count(), 2);
        assert_eq!(svg.matches("<g class=\"markers\"").count(), 1);
        assert!(svg.contains("<title>Peña &amp; Río: -250</title>"));
        assert!(svg.contains("<title>010102: 0</title>"));
        assert!(svg.contains("District-Level Population Change in Peru (2007-2022)"));
        assert!(svg.contains("Source: INEI"));
        assert!(svg.contains("- Population change -"));
        assert!(svg.contains("+50,000"));
        assert!(svg.contains(r#"fill="blue""#));
        assert!(svg.contains(r#"stroke="grey""#));
    }

    #[test]
    fn test_page_embeds_svg() {
        let svg = render_svg(&sample_figure(), &canvas());
        let page = render_page(&svg);

        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains(&format!("<title>{}</title>", PAGE_TITLE)));
        assert!(page.contains("height: 90vh"));
        assert!(page.contains(&svg));
        assert_eq!(page.matches("<svg").count(), 1);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml("a<b>&\"c'"), "a&lt;b&gt;&amp;&quot;c&apos;");
        assert_eq!(escape_xml("Huánuco"), "Huánuco");
    }

    #[test]
    fn test_write_outputs_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let mut config: AppConfig = toml::from_str(
            "[input]\ntable = \"a.csv\"\ngeometry = \"b.geojson\"\n",
        )
        .unwrap();
        config.output.svg = dir.path().join("out/map.svg");
        config.output.html = dir.path().join("out/index.html");

        write_outputs(&config, &sample_figure()).unwrap();

        let svg = fs::read_to_string(&config.output.svg).unwrap();
        let html = fs::read_to_string(&config.output.html).unwrap();
        assert!(html.contains(&svg));
    }
}
