// Choropleth map of the regional results, in SVG.

use std::fs::File;
use std::io::{BufWriter, Write};

use geo::{BoundingRect, Coord, CoordsIter, LineString, MultiPolygon, Rect};

use referendum::MapResult;

use crate::refmap::*;

/// Fill of the regions where choice B has all the expressed ballots.
const COLOR_CHOICE_B: (u8, u8, u8) = (0xd7, 0x30, 0x27);
/// Fill of a tie.
const COLOR_TIE: (u8, u8, u8) = (0xf7, 0xf7, 0xf7);
/// Fill of the regions where choice A has all the expressed ballots.
const COLOR_CHOICE_A: (u8, u8, u8) = (0x45, 0x75, 0xb4);
/// Fill of the regions without expressed ballots.
pub const COLOR_UNDEFINED: &str = "#9ca3af";

const MARGIN: f64 = 10.0;

/// Maps a ratio in [0, 1] to a color between the choice B color (0) and the
/// choice A color (1), through a neutral color at 0.5.
pub fn ratio_color(ratio: Option<f64>) -> String {
    let r = match ratio {
        Some(r) if r.is_finite() => r.clamp(0.0, 1.0),
        _ => return COLOR_UNDEFINED.to_string(),
    };
    let (from, to, t) = if r < 0.5 {
        (COLOR_CHOICE_B, COLOR_TIE, r * 2.0)
    } else {
        (COLOR_TIE, COLOR_CHOICE_A, (r - 0.5) * 2.0)
    };
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
    format!(
        "#{:02x}{:02x}{:02x}",
        lerp(from.0, to.0),
        lerp(from.1, to.1),
        lerp(from.2, to.2)
    )
}

/// Equirectangular projection of the region boundaries onto the canvas.
#[derive(PartialEq, Debug, Clone, Copy)]
pub struct Layout {
    pub bounds: Rect<f64>,
    pub width: f64,
    pub height: f64,
    pub scale: f64,
}

impl Layout {
    /// The layout fitting all the boundaries in `width` pixels. `None` when
    /// there is nothing to draw.
    pub fn fit(map: &[MapResult], width: u32) -> Option<Layout> {
        let bounds = map
            .iter()
            .filter_map(|m| m.boundary.as_ref())
            .filter_map(|b| b.bounding_rect())
            .reduce(|a, b| {
                Rect::new(
                    Coord {
                        x: a.min().x.min(b.min().x),
                        y: a.min().y.min(b.min().y),
                    },
                    Coord {
                        x: a.max().x.max(b.max().x),
                        y: a.max().y.max(b.max().y),
                    },
                )
            })?;
        let width = width as f64;
        let scale = if bounds.width() > 0.0 {
            (width - 2.0 * MARGIN) / bounds.width()
        } else {
            1.0
        };
        let height = bounds.height() * scale + 2.0 * MARGIN;
        Some(Layout {
            bounds,
            width,
            height,
            scale,
        })
    }

    /// lon/lat -> SVG coords (x, y). The y axis points down.
    pub fn project(&self, c: &Coord<f64>) -> (f64, f64) {
        (
            MARGIN + (c.x - self.bounds.min().x) * self.scale,
            MARGIN + (self.bounds.max().y - c.y) * self.scale,
        )
    }
}

pub struct SvgWriter<W: Write> {
    writer: W,
}

/// Implement std::io::Write so `write!` / `writeln!` work.
impl<W: Write> Write for SvgWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl<W: Write> SvgWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write the SVG header, including the XML declaration and opening <svg> tag.
    pub fn write_header(&mut self, layout: &Layout) -> std::io::Result<()> {
        writeln!(
            self,
            r##"<?xml version="1.0" encoding="UTF-8" standalone="no"?>"##
        )?;
        writeln!(
            self,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.3} {h:.3}">"##,
            w = layout.width,
            h = layout.height,
        )?;
        writeln!(self, r##"<rect width="100%" height="100%" fill="#ffffff"/>"##)?;
        Ok(())
    }

    pub fn write_styles(&mut self) -> std::io::Result<()> {
        writeln!(
            self,
            r##"<defs>
<style>
    .reg {{ stroke: #111827; stroke-width: 0.5; fill-rule: evenodd; }}
</style>
</defs>"##
        )
    }

    /// Draw one region, with its name and ratio as a tooltip.
    pub fn write_region(&mut self, m: &MapResult, layout: &Layout) -> std::io::Result<()> {
        let boundary = match &m.boundary {
            Some(b) => b,
            None => return Ok(()),
        };
        let label = match m.ratio {
            Some(r) => format!("{}: {:.2}%", m.result.name_reg, r * 100.0),
            None => format!("{}: no expressed ballot", m.result.name_reg),
        };
        writeln!(
            self,
            r#"<path class="reg" data-code="{}" d="{}" style="fill:{}"><title>{}</title></path>"#,
            escape_xml(&m.result.code_reg),
            multipolygon_to_path(boundary, layout),
            ratio_color(m.ratio),
            escape_xml(&label),
        )
    }

    pub fn write_footer(&mut self) -> std::io::Result<()> {
        writeln!(self, "</svg>")
    }
}

/// Writes the full map. The regions without boundary are not drawn.
pub fn write_choropleth<W: Write>(
    writer: W,
    map: &[MapResult],
    layout: &Layout,
) -> std::io::Result<()> {
    let mut svg = SvgWriter::new(writer);
    svg.write_header(layout)?;
    svg.write_styles()?;
    for m in map.iter() {
        svg.write_region(m, layout)?;
    }
    svg.write_footer()?;
    svg.flush()
}

pub fn to_svg(path: &str, map: &[MapResult], width: u32) -> RefmapResult<()> {
    let layout = Layout::fit(map, width).context(NothingToDrawSnafu {})?;
    let file = File::create(path).context(WritingFileSnafu { path })?;
    write_choropleth(BufWriter::new(file), map, &layout).context(WritingFileSnafu { path })?;
    info!("to_svg: map written to {}", path);
    Ok(())
}

/// Build a compact SVG path string for a MultiPolygon (exteriors + holes).
fn multipolygon_to_path(shape: &MultiPolygon<f64>, layout: &Layout) -> String {
    let mut out = String::new();
    for polygon in &shape.0 {
        out.push_str(&ring_to_path(polygon.exterior(), layout));
        for interior in polygon.interiors() {
            out.push_str(&ring_to_path(interior, layout));
        }
    }
    out
}

/// Build a compact SVG path string for a LineString (ring).
fn ring_to_path(ring: &LineString<f64>, layout: &Layout) -> String {
    let mut out = String::new();
    let mut coords = ring.coords_iter().map(|coord| layout.project(&coord));
    if let Some((x, y)) = coords.next() {
        out.push_str(&format!(" M{x:.3},{y:.3}"));
        for (x, y) in coords {
            out.push_str(&format!(" L{x:.3},{y:.3}"));
        }
        out.push('Z');
    }
    out
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
