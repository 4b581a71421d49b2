use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;

/// Labels drawn bold blue.
pub const CALENDAR_LABELS: [&str; 13] = [
    "Sunday ",
    "March ",
    "June ",
    "January ",
    "February ",
    "April ",
    "May ",
    "July ",
    "August ",
    "September ",
    "October ",
    "November ",
    "December ",
];

/// Labels drawn in the default style; every other non-calendar label is bold red.
pub const PLAIN_LABELS: [&str; 2] = ["exercise ", "exrecise "];

pub const LABEL_FONT_SIZE: f64 = 18.0;

const CANVAS_SIZE: (u32, u32) = (1200, 1200);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelColor {
    Black,
    Blue,
    Red,
}

impl LabelColor {
    fn rgb(self) -> RGBColor {
        match self {
            LabelColor::Black => BLACK,
            LabelColor::Blue => BLUE,
            LabelColor::Red => RED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub bold: bool,
    pub size: f64,
    pub color: LabelColor,
}

impl LabelStyle {
    fn text_style(&self) -> TextStyle<'static> {
        let weight = if self.bold { FontStyle::Bold } else { FontStyle::Normal };
        FontDesc::new(FontFamily::SansSerif, self.size, weight).color(&self.color.rgb())
    }
}

/// Style of one word label. Labels keep the trailing separator they were embedded with.
pub fn label_style(label: &str) -> LabelStyle {
    if CALENDAR_LABELS.contains(&label) {
        LabelStyle {
            bold: true,
            size: LABEL_FONT_SIZE,
            color: LabelColor::Blue,
        }
    } else if PLAIN_LABELS.contains(&label) {
        LabelStyle {
            bold: false,
            size: LABEL_FONT_SIZE,
            color: LabelColor::Black,
        }
    } else {
        LabelStyle {
            bold: true,
            size: LABEL_FONT_SIZE,
            color: LabelColor::Red,
        }
    }
}

/// Min-max scale each axis to [0, 1]. A constant axis maps to 0.5.
pub fn normalize_unit(points: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let mut min = [f64::INFINITY; 2];
    let mut max = [f64::NEG_INFINITY; 2];
    for point in points {
        for axis in 0..2 {
            min[axis] = min[axis].min(point[axis]);
            max[axis] = max[axis].max(point[axis]);
        }
    }

    points
        .iter()
        .map(|point| {
            let mut scaled = [0.5; 2];
            for axis in 0..2 {
                let range = max[axis] - min[axis];
                if range > 0.0 {
                    scaled[axis] = (point[axis] - min[axis]) / range;
                }
            }
            scaled
        })
        .collect()
}

/// Scatter the projected words as text labels.
/// Writes SVG when `output_path` ends in `.svg`, PNG otherwise.
pub fn plot_word_embedding(
    points: &[[f64; 2]],
    labels: &[String],
    title: Option<&str>,
    output_path: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if points.len() != labels.len() {
        return Err(format!(
            "{} points but {} labels",
            points.len(),
            labels.len()
        )
        .into());
    }

    let normalized = normalize_unit(points);
    let is_svg = Path::new(output_path)
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));

    if is_svg {
        let root = SVGBackend::new(output_path, CANVAS_SIZE).into_drawing_area();
        draw_labels(&root, &normalized, labels, title)?;
        root.present()?;
    } else {
        let root = BitMapBackend::new(output_path, CANVAS_SIZE).into_drawing_area();
        draw_labels(&root, &normalized, labels, title)?;
        root.present()?;
    }

    println!("📊 Word embedding plot saved to: {}", output_path);
    Ok(())
}

fn draw_labels<DB>(
    root: &DrawingArea<DB, Shift>,
    normalized: &[[f64; 2]],
    labels: &[String],
    title: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(root);
    builder.margin(20);
    if let Some(title) = title {
        builder.caption(title, ("sans-serif", 30).into_font());
    }
    // Labels are anchored at their top-left corner, leave room on the right.
    let mut chart = builder.build_cartesian_2d(-0.05f64..1.15f64, -0.05f64..1.05f64)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(0)
        .y_labels(0)
        .draw()?;

    chart.draw_series(normalized.iter().zip(labels.iter()).map(|(point, label)| {
        Text::new(
            label.clone(),
            (point[0], point[1]),
            label_style(label).text_style(),
        )
    }))?;

    Ok(())
}
