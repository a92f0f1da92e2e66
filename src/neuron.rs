use log::debug;

use crate::{
    error::{Result, StorageError},
    storage::Storage,
    types::Float,
};

/// Label of the membrane potential column in a neuron trace.
pub const POTENTIAL_LABEL: &str = "/neuron/v";

/// Upper bound on the number of samples a single trace may hold.
pub const MAX_TRACE_SAMPLES: usize = 10_000_000;

/// Leaky integrate-and-fire neuron driven by a constant current.
///
/// Between spikes the membrane charges as an RC circuit,
///
/// C dv/dt = -(v - v_rest) / R + I
///
/// and the potential is reset to v_rest whenever it reaches v_threshold.
/// The charging curve has a closed form, so traces are sampled directly.
#[derive(Debug, Clone, PartialEq)]
pub struct LeakyNeuron {
    pub resistance: Float,
    pub capacitance: Float,
    pub v_rest: Float,
    pub v_threshold: Float,
}

impl Default for LeakyNeuron {
    fn default() -> Self {
        LeakyNeuron {
            resistance: 100e6,
            capacitance: 200e-12,
            v_rest: -70e-3,
            v_threshold: -60e-3,
        }
    }
}

impl LeakyNeuron {
    /// RC time constant
    pub fn time_constant(&self) -> Float {
        self.resistance * self.capacitance
    }

    /// Time between resets under a constant current, or `None` if the
    /// steady-state potential never reaches the threshold.
    pub fn firing_period(&self, current: Float) -> Option<Float> {
        let drive = current * self.resistance;
        let gap = self.v_threshold - self.v_rest;
        if drive <= gap {
            return None;
        }
        Some(-self.time_constant() * (1.0 - gap / drive).ln())
    }

    /// Membrane potential at time `t`, starting from rest at t = 0.
    pub fn membrane_potential(&self, current: Float, t: Float) -> Float {
        let since_reset = match self.firing_period(current) {
            Some(period) => t.rem_euclid(period),
            None => t,
        };
        let drive = current * self.resistance;
        self.v_rest + drive * (1.0 - (-since_reset / self.time_constant()).exp())
    }

    /// Sample the membrane potential at `0, dt, 2 dt, ...` up to `final_time`
    /// into a storage with a single `/neuron/v` column.
    pub fn trace(&self, current: Float, final_time: Float, dt: Float) -> Result<Storage> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(StorageError::invalid_argument(format!(
                "time step must be positive, got {}",
                dt
            )));
        }
        if !(final_time.is_finite() && final_time >= 0.0) {
            return Err(StorageError::invalid_argument(format!(
                "final time must be non-negative, got {}",
                final_time
            )));
        }
        if !(self.resistance > 0.0 && self.capacitance > 0.0) {
            return Err(StorageError::invalid_argument(
                "resistance and capacitance must be positive",
            ));
        }

        // Tolerate rounding in final_time / dt so the last sample is not lost
        let steps = (final_time / dt + 1e-9).floor();
        if !(steps.is_finite() && steps < MAX_TRACE_SAMPLES as Float) {
            return Err(StorageError::invalid_argument(format!(
                "{} / {} needs more than {} samples",
                final_time, dt, MAX_TRACE_SAMPLES
            )));
        }
        let num_steps = steps as usize;
        let times: Vec<Float> = (0..=num_steps).map(|i| i as Float * dt).collect();
        let rows = times
            .iter()
            .map(|&t| vec![self.membrane_potential(current, t)])
            .collect();

        debug!(
            "neuron trace: {} samples, period {:?}",
            times.len(),
            self.firing_period(current)
        );
        Ok(
            Storage::new(vec![POTENTIAL_LABEL.to_string()], times, rows)?
                .with_name("state")?
                .with_header_entry("inDegrees", "no"),
        )
    }
}
