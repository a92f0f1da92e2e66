use std::ops::Range;
use std::path::Path;

use log::debug;
use plotters::prelude::*;

use crate::{
    error::{Result, StorageError},
    table::{Table, TIME_COLUMN},
    types::Float,
};

/// Layout of a rendered table chart.
#[derive(Debug, Clone)]
pub struct PlotOptions {
    pub width: u32,
    /// Height of each stacked subplot.
    pub subplot_height: u32,
    pub caption: Option<String>,
    /// Columns to draw; all non-time columns when `None`.
    pub columns: Option<Vec<String>>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        PlotOptions {
            width: 640,
            subplot_height: 240,
            caption: None,
            columns: None,
        }
    }
}

/// Positions of the columns to draw: every data column after the time index,
/// or the caller's picks in the order given.
fn selected_columns(table: &Table, options: &PlotOptions) -> Result<Vec<usize>> {
    let columns: Vec<usize> = match &options.columns {
        Some(names) => names
            .iter()
            .map(|name| {
                table
                    .column_position(name)
                    .ok_or_else(|| StorageError::UnknownColumn(name.clone()))
            })
            .collect::<Result<_>>()?,
        None => (1..table.column_count()).collect(),
    };

    if columns.is_empty() {
        return Err(StorageError::plot("table has no data columns to draw"));
    }
    if table.is_empty() {
        return Err(StorageError::plot("table has no rows to draw"));
    }
    Ok(columns)
}

/// Axis range covering all values, widened when the values are all equal.
fn axis_range(values: &[Float]) -> Range<Float> {
    let min = values.iter().cloned().fold(Float::INFINITY, Float::min);
    let max = values.iter().cloned().fold(Float::NEG_INFINITY, Float::max);
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    if max - min <= Float::EPSILON * max.abs().max(1.0) {
        return (min - 0.5)..(max + 0.5);
    }
    min..max
}

/// Render one subplot per column, stacked vertically, with time on the x-axis.
pub fn plot_table(table: &Table, path: impl AsRef<Path>, options: &PlotOptions) -> Result<()> {
    let columns = selected_columns(table, options)?;
    let path = path.as_ref();
    let height = u32::try_from(columns.len())
        .ok()
        .and_then(|n| options.subplot_height.checked_mul(n))
        .ok_or_else(|| {
            StorageError::plot(format!(
                "{} subplots of height {} overflow the image size",
                columns.len(),
                options.subplot_height
            ))
        })?;

    let root = BitMapBackend::new(path, (options.width, height)).into_drawing_area();
    root.fill(&WHITE).map_err(StorageError::plot)?;
    let root = match &options.caption {
        Some(caption) => root
            .titled(caption, ("sans-serif", 20))
            .map_err(StorageError::plot)?,
        None => root,
    };

    let x_range = axis_range(table.index());
    let areas = root.split_evenly((columns.len(), 1));
    for (area, &j) in areas.iter().zip(columns.iter()) {
        let name = &table.column_names()[j];
        let data = table
            .column_at(j)
            .ok_or_else(|| StorageError::UnknownColumn(name.clone()))?;
        let y_range = axis_range(&data);

        let mut chart = ChartBuilder::on(area)
            .caption(name, ("sans-serif", 16))
            .margin(5)
            .x_label_area_size(30)
            .y_label_area_size(50)
            .build_cartesian_2d(x_range.clone(), y_range)
            .map_err(StorageError::plot)?;

        chart
            .configure_mesh()
            .x_desc(TIME_COLUMN)
            .draw()
            .map_err(StorageError::plot)?;

        chart
            .draw_series(LineSeries::new(
                table.index().iter().cloned().zip(data),
                &BLUE,
            ))
            .map_err(StorageError::plot)?;
    }

    root.present().map_err(StorageError::plot)?;
    debug!("plotted {} columns to {}", columns.len(), path.display());
    Ok(())
}
