use anyhow::Result;
use potts_common::{CoolingCurve, SimParams, TemperatureMode};
use rand::Rng;

/// Metropolis criterion.
///
/// Downhill moves are always taken. Otherwise one uniform draw `u` in `[0, 1)` is made and the
/// move is taken iff `u < exp(-(candidate - current) / temperature)`.
pub fn accept<R: Rng + ?Sized>(current: f64, candidate: f64, temperature: f64, rng: &mut R) -> bool {
    if candidate < current {
        return true;
    }
    let delta = candidate - current;
    let probability = (-delta / temperature).exp();
    rng.random::<f64>() < probability
}

/// Temperature as a function of the step number.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum TemperatureSchedule {
    Constant(f64),
    /// Runs from `initial` at step 0 to `last` at the final step.
    Cooling { initial: f64, last: f64, curve: CoolingCurve },
}

impl TemperatureSchedule {
    /// Fails in cooling mode without a configured curve.
    pub fn from_params(params: &SimParams) -> Result<Self> {
        let schedule = match params.temperature_mode {
            TemperatureMode::Constant => TemperatureSchedule::Constant(params.temp_constant),
            TemperatureMode::Cooling => {
                let Some(curve) = params.cooling_curve else {
                    anyhow::bail!("Cooling mode needs a cooling_curve.");
                };
                TemperatureSchedule::Cooling { initial: params.temp_init, last: params.temp_final, curve }
            }
        };
        Ok(schedule)
    }

    /// Temperature at `step` of a run with `steps` as its last step.
    pub fn temperature_at(&self, step: u64, steps: u64) -> f64 {
        match *self {
            TemperatureSchedule::Constant(t) => t,
            TemperatureSchedule::Cooling { initial, last, curve } => {
                if steps == 0 {
                    return initial;
                }
                let progress = step.min(steps) as f64 / steps as f64;
                match curve {
                    CoolingCurve::Linear => initial + (last - initial) * progress,
                    CoolingCurve::Geometric => initial * (last / initial).powf(progress),
                }
            }
        }
    }
}
