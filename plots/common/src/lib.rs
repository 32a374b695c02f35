use std::{
    fmt::Display,
    ops::Range,
    path::{Path, PathBuf},
};

use common::{
    dataset::Line,
    plot::{ImageFormat, ensure_parent_dir},
};
use eyre::{Context, Report, Result, eyre};
use plotters::{coord::Shift, prelude::*};
use tracing::debug;

pub const X_LABEL: &str = "load factor";
pub const Y_LABEL: &str = "operations";

/// One sub-plot: a titled set of lines sharing axes.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: String,
    pub lines: Vec<Line>,
    /// Legend entry for lines without meta bits
    pub fallback_label: String,
}

impl Panel {
    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.points.is_empty())
    }
}

/// One image file: its panels and how many columns they are laid out in.
#[derive(Debug, Clone)]
pub struct ChartJob {
    pub filepath: PathBuf,
    pub panels: Vec<Panel>,
    pub columns: usize,
}

fn draw_error<E: Display>(err: E) -> Report {
    eyre!("Drawing failed: {err}")
}

/// `(rows, columns)` for `panels` sub-plots laid out `columns` wide.
pub fn grid_shape(panels: usize, columns: usize) -> (usize, usize) {
    let columns = columns.max(1).min(panels.max(1));
    (panels.div_ceil(columns).max(1), columns)
}

/// Points a log-scaled axis can show: finite, with a positive value.
pub fn drawable_points(line: &Line) -> Vec<(f64, f64)> {
    line.points
        .iter()
        .copied()
        .filter(|(x, y)| x.is_finite() && y.is_finite() && *y > 0.0)
        .collect()
}

/// Axis ranges covering every drawable point.
pub fn bounds(lines: &[Line]) -> Option<(Range<f64>, Range<f64>)> {
    let points = lines.iter().flat_map(drawable_points).collect::<Vec<_>>();
    if points.is_empty() {
        return None;
    }
    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
    let y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);

    let x = if x_max > x_min {
        x_min..x_max
    } else {
        let pad = (x_min.abs() * 0.05).max(0.01);
        (x_min - pad)..(x_max + pad)
    };
    let y = (y_min / 1.25)..(y_max * 1.25);
    Some((x, y))
}

/// Renders every job, returning the files written.
pub fn render_jobs(
    jobs: &[ChartJob],
    format: ImageFormat,
    size: (u32, u32),
) -> Result<Vec<PathBuf>> {
    jobs.iter()
        .map(|job| {
            render_grid(&job.filepath, format, size, &job.panels, job.columns)
                .context(format!("Rendering {:?}", job.filepath))?;
            Ok(job.filepath.clone())
        })
        .collect()
}

/// Writes `panels` as a grid of sub-plots, `columns` wide.
pub fn render_grid(
    filepath: &Path,
    format: ImageFormat,
    size: (u32, u32),
    panels: &[Panel],
    columns: usize,
) -> Result<()> {
    ensure_parent_dir(filepath)?;
    debug!("Rendering {} panels to {filepath:?}", panels.len());

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(filepath, size).into_drawing_area();
            draw_panels(&root, panels, columns)?;
            root.present().map_err(draw_error)?;
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(filepath, size).into_drawing_area();
            draw_panels(&root, panels, columns)?;
            root.present().map_err(draw_error)?;
        }
    }
    Ok(())
}

fn draw_panels<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    panels: &[Panel],
    columns: usize,
) -> Result<()> {
    root.fill(&WHITE).map_err(draw_error)?;
    let cells = root.split_evenly(grid_shape(panels.len(), columns));
    for (area, panel) in cells.iter().zip(panels) {
        draw_panel(area, panel)?;
    }
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> Result<()> {
    let Some((x_range, y_range)) = bounds(&panel.lines) else {
        debug!("{}: nothing to draw", panel.title);
        area.titled(&panel.title, ("sans-serif", 20))
            .map_err(draw_error)?;
        return Ok(());
    };

    let mut chart = ChartBuilder::on(area)
        .caption(&panel.title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range.log_scale())
        .map_err(draw_error)?;

    chart
        .configure_mesh()
        .x_desc(X_LABEL)
        .y_desc(Y_LABEL)
        .draw()
        .map_err(draw_error)?;

    for (idx, line) in panel.lines.iter().enumerate() {
        let label = line.label(&panel.fallback_label);
        let points = drawable_points(line);
        if points.is_empty() {
            debug!(
                "{}: {label} has no drawable points, leaving it out",
                panel.title
            );
            continue;
        }
        let dropped = line.points.len() - points.len();
        if dropped > 0 {
            debug!(
                "{}: dropping {dropped} non-positive or non-finite points from {label}",
                panel.title
            );
        }

        let color = Palette99::pick(idx).to_rgba();
        chart
            .draw_series(LineSeries::new(points, color.stroke_width(2)))
            .map_err(draw_error)?
            .label(label)
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(draw_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn line(meta_bits: u32, points: &[(f64, f64)]) -> Line {
        Line {
            meta_bits: Some(meta_bits),
            points: points.to_vec(),
        }
    }

    #[test]
    fn grid_is_two_columns_wide() {
        assert_eq!(grid_shape(4, 2), (2, 2));
        assert_eq!(grid_shape(8, 2), (4, 2));
        assert_eq!(grid_shape(3, 2), (2, 2));
        assert_eq!(grid_shape(1, 2), (1, 1));
        assert_eq!(grid_shape(1, 1), (1, 1));
    }

    #[test]
    fn bounds_ignore_non_positive_values() {
        let lines = vec![
            line(4, &[(0.1, 0.0), (0.5, 2.0), (0.9, 8.0)]),
            line(8, &[(0.2, 1.0), (0.6, -3.0)]),
        ];
        let (x, y) = bounds(&lines).unwrap();
        assert_eq!(x, 0.2..0.9);
        assert!(y.start < 1.0 && y.start > 0.0);
        assert!(y.end > 8.0);
    }

    #[test]
    fn bounds_pad_a_single_load_factor() {
        let (x, _) = bounds(&[line(4, &[(0.5, 3.0)])]).unwrap();
        assert!(x.start < 0.5 && x.end > 0.5);
    }

    #[test]
    fn nothing_to_draw() {
        assert!(bounds(&[]).is_none());
        assert!(bounds(&[line(4, &[(0.5, 0.0)])]).is_none());
        let panel = Panel {
            title: "Mean".to_owned(),
            lines: vec![],
            fallback_label: "probes".to_owned(),
        };
        assert!(panel.is_empty());
    }

    #[test]
    fn infinite_values_are_not_drawable() {
        let l = line(
            4,
            &[(0.1, f64::INFINITY), (0.5, 2.0), (f64::NAN, 3.0), (0.9, 0.0)],
        );
        assert_eq!(drawable_points(&l), vec![(0.5, 2.0)]);
        let (_, y) = bounds(&[l]).unwrap();
        assert!(y.end.is_finite());
    }

    fn panel(title: &str, lines: Vec<Line>) -> Panel {
        Panel {
            title: title.to_owned(),
            lines,
            fallback_label: "probes".to_owned(),
        }
    }

    #[test]
    fn legend_leaves_out_lines_with_nothing_to_draw() {
        let dir = tempfile::tempdir().unwrap();
        let filepath = dir.path().join("robinhood").join("churn_probes.svg");
        let lines = vec![
            line(4, &[(0.1, 1.0), (0.5, 2.0)]),
            line(8, &[(0.1, 0.0), (0.5, 0.0)]),
        ];
        let panels = [panel("Mean", lines.clone()), panel("Tail", lines)];

        render_grid(&filepath, ImageFormat::Svg, (640, 480), &panels, 2).unwrap();
        let svg = fs::read_to_string(&filepath).unwrap();
        assert!(svg.contains("Mean"));
        assert!(svg.contains("Tail"));
        assert!(svg.contains("4 meta bits"));
        assert!(!svg.contains("8 meta bits"));
    }

    #[test]
    fn render_creates_directories_and_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let job = |title: &str| ChartJob {
            filepath: dir.path().join("cuckoo").join("probe_present.png"),
            panels: vec![panel(title, vec![line(4, &[(0.1, 1.0), (0.9, 5.0)])])],
            columns: 2,
        };

        let written = render_jobs(&[job("Mean")], ImageFormat::Png, (320, 240)).unwrap();
        assert_eq!(
            written,
            vec![dir.path().join("cuckoo").join("probe_present.png")]
        );
        let first = fs::metadata(&written[0]).unwrap().len();
        assert!(first > 0);

        let again = render_jobs(&[job("99th")], ImageFormat::Png, (320, 240)).unwrap();
        assert_eq!(again, written);
        assert!(fs::metadata(&again[0]).unwrap().len() > 0);
        assert_eq!(fs::read_dir(dir.path().join("cuckoo")).unwrap().count(), 1);
    }
}
