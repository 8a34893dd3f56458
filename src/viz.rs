//! Scatter plot rendering of segmentation results using Plotters

use crate::data::{INCOME_COLUMN, SCORE_COLUMN};
use crate::model::{ClusterLabels, ClusteringResult};
use plotters::prelude::*;
use tracing::info;

/// Color palette for clusters, assigned by rank of first appearance
pub const CLUSTER_COLORS: [RGBColor; 5] = [
    RED,
    BLUE,
    GREEN,
    RGBColor(128, 0, 128), // purple
    RGBColor(255, 165, 0), // orange
];

/// Explicit mapping from cluster id to palette entry
///
/// The n-th cluster id to appear gets the n-th palette color, so ids that are
/// not a dense `0..k` range still map inside the palette. Ranks past the end
/// of the palette wrap around.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorAssignment {
    entries: Vec<(usize, RGBColor)>,
}

impl ColorAssignment {
    pub fn from_labels(labels: &ClusterLabels) -> Self {
        let entries = labels
            .ids()
            .enumerate()
            .map(|(rank, id)| (id, CLUSTER_COLORS[rank % CLUSTER_COLORS.len()]))
            .collect();
        Self { entries }
    }

    pub fn from_result(result: &ClusteringResult) -> Self {
        Self::from_labels(result.labels())
    }

    pub fn color_for(&self, cluster: usize) -> Option<RGBColor> {
        self.entries
            .iter()
            .find(|(id, _)| *id == cluster)
            .map(|(_, color)| *color)
    }
}

/// Points of one cluster ready for plotting
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSeries {
    pub cluster: usize,
    pub label: String,
    pub color: RGBColor,
    /// (annual income, spending score) pairs
    pub points: Vec<(f64, f64)>,
}

/// Group the combined rows by cluster, in first-seen order
pub fn cluster_series(result: &ClusteringResult) -> Vec<ClusterSeries> {
    let colors = ColorAssignment::from_result(result);

    result
        .labels()
        .iter()
        .map(|(cluster, label)| ClusterSeries {
            cluster,
            label: label.to_string(),
            color: colors.color_for(cluster).unwrap_or(BLACK),
            points: result
                .iter()
                .filter(|(_, id)| *id == cluster)
                .map(|(o, _)| (o.annual_income, o.spending_score))
                .collect(),
        })
        .collect()
}

/// Cluster labels one per line, in first-seen order
pub fn cluster_summary(result: &ClusteringResult) -> String {
    result
        .labels()
        .iter()
        .map(|(_, label)| label)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render an income vs. spending score scatter plot colored by cluster
///
/// # Arguments
/// * `result` - Segmentation result to draw
/// * `output_path` - Path to save the PNG plot
/// * `plot_title` - Title for the plot
pub fn render_scatter(
    result: &ClusteringResult,
    output_path: &str,
    plot_title: Option<&str>,
) -> crate::Result<()> {
    let title = plot_title.unwrap_or("Customer Segmentation");
    let series = cluster_series(result);

    let incomes = result.observations().iter().map(|o| o.annual_income);
    let scores = result.observations().iter().map(|o| o.spending_score);
    let (income_min, income_max) = padded_bounds(incomes, 5.0);
    let (score_min, score_max) = padded_bounds(scores, 5.0);

    let root = BitMapBackend::new(output_path, (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(income_min..income_max, score_min..score_max)?;

    chart
        .configure_mesh()
        .x_desc(INCOME_COLUMN)
        .y_desc(SCORE_COLUMN)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for cluster in &series {
        let color = cluster.color;
        chart
            .draw_series(
                cluster
                    .points
                    .iter()
                    .map(|&point| Circle::new(point, 4, color.filled())),
            )?
            .label(cluster.label.as_str())
            .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
    }

    // Ring around the customer that was just entered
    let newest = result.observations()[result.new_observation_index()];
    chart
        .draw_series(std::iter::once(Circle::new(
            (newest.annual_income, newest.spending_score),
            8,
            BLACK.stroke_width(2),
        )))?
        .label("New customer")
        .legend(|(x, y)| Circle::new((x, y), 6, BLACK.stroke_width(2)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!(path = output_path, clusters = series.len(), "Cluster plot saved");

    Ok(())
}

/// Min and max of `values` widened by `padding` on both sides
fn padded_bounds(values: impl Iterator<Item = f64>, padding: f64) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if min.is_finite() && max.is_finite() {
        (min - padding, max + padding)
    } else {
        (0.0, 1.0)
    }
}
