use std::path::PathBuf;

use clap::Parser;
use log::info;
use sto_table::{
    plot::{plot_table, PlotOptions},
    read_table, Storage,
};

/// Read a storage file into a time-indexed table and plot every column
/// against time.
#[derive(Parser)]
struct Args {
    /// Storage file to read
    #[clap(default_value = "state.sto")]
    input: PathBuf,
    /// Where to write the chart
    #[clap(long, default_value = "plot.png")]
    output: PathBuf,
    /// Comma separated subset of columns to plot
    #[clap(long, value_delimiter = ',')]
    columns: Option<Vec<String>>,
    #[clap(long, default_value_t = 640)]
    width: u32,
    #[clap(long, default_value_t = 240)]
    subplot_height: u32,
}

pub fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let storage = Storage::from_path(&args.input)?;
    let table = read_table(&storage)?;

    println!(
        "{}: {} rows x {} columns",
        args.input.display(),
        table.row_count(),
        table.column_count()
    );
    println!("columns: {}", table.column_names().join(", "));
    if let (Some(first), Some(last)) = (table.index().first(), table.index().last()) {
        println!("time: {} .. {}", first, last);
    }

    let options = PlotOptions {
        width: args.width,
        subplot_height: args.subplot_height,
        caption: storage.name().map(str::to_string),
        columns: args.columns,
    };
    plot_table(&table, &args.output, &options)?;
    info!("chart written to {}", args.output.display());

    Ok(())
}
