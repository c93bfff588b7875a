use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;

use crate::report::RunSummary;

const PLOT_SIZE: (u32, u32) = (1024, 768);

/// Score per game as a scatter plot, the best game highlighted, plus the average series
pub fn plot_scores(summary: &RunSummary, file: &Path) -> Result<()> {
    let root = SVGBackend::new(file, PLOT_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let games = summary.len().max(1) as f64;
    let top = summary.max_score().map_or(1, |(score, _)| score.max(1)) as f64;

    let mut chart = ChartBuilder::on(&root)
        .caption("Flappy Q-learning", ("sans-serif", 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..games + 1.0, 0.0..top * 1.05)?;

    chart
        .configure_mesh()
        .x_desc("Game")
        .y_desc("Score")
        .draw()?;

    chart.draw_series(
        summary
            .scores
            .iter()
            .enumerate()
            .map(|(idx, &score)| Circle::new((idx as f64 + 1.0, score as f64), 2, BLACK.filled())),
    )?;

    chart
        .draw_series(LineSeries::new(
            summary.averages.iter().enumerate().map(|(idx, &average)| (idx as f64 + 1.0, average)),
            BLUE.stroke_width(2),
        ))?
        .label(summary.average_kind.to_string())
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE.stroke_width(2)));

    if let Some((score, game)) = summary.max_score() {
        chart
            .draw_series(std::iter::once(Circle::new((game as f64, score as f64), 5, RED.filled())))?
            .label("Max score")
            .legend(|(x, y)| Circle::new((x + 10, y), 5, RED.filled()));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    log::debug!("plot written to {}", file.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_plot_scores() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("scores.svg");
        plot_scores(&RunSummary::with_smoothed_averages(vec![0, 2, 17, 3, 9]), &file)?;
        let svg = fs::read_to_string(&file)?;
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Weighted mean"));
        assert!(svg.contains("Max score"));
        Ok(())
    }

    #[test]
    fn test_plot_empty_run() -> Result<()> {
        let dir = tempdir()?;
        let file = dir.path().join("scores.svg");
        plot_scores(&RunSummary::new(), &file)?;
        assert!(file.exists());
        Ok(())
    }
}
