use std::path::PathBuf;

use clap::Parser;
use log::info;
use sto_table::{neuron::LeakyNeuron, types::Float};

/// Write the membrane potential of a leaky integrate-and-fire neuron under
/// constant current to a storage file.
#[derive(Parser)]
struct Args {
    #[clap(long, default_value = "state.sto")]
    output: PathBuf,
    /// Input current in amperes
    #[clap(long, default_value_t = 150e-12)]
    current: Float,
    #[clap(long, default_value_t = 0.5)]
    final_time: Float,
    #[clap(long, default_value_t = 0.001)]
    dt: Float,
}

pub fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let neuron = LeakyNeuron::default();
    match neuron.firing_period(args.current) {
        Some(period) => info!("firing period: {} s", period),
        None => info!("current too weak to reach threshold"),
    }

    let storage = neuron.trace(args.current, args.final_time, args.dt)?;
    storage.write_to_path(&args.output)?;
    println!("wrote {}", args.output.display());

    Ok(())
}
