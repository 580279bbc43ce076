use ant_trails_core::{SimConfig, World};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

/// PyO3 module exposing ant-trails-core experiments to Python.
#[pyfunction]
fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[pyfunction]
fn default_config_json() -> PyResult<String> {
    serde_json::to_string(&SimConfig::default())
        .map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Build a world from `config_json`, run it and return the run summary as JSON.
#[pyfunction]
#[pyo3(signature = (config_json, frames, frame_dt = 1.0 / 60.0, sample_every = 60))]
fn run_experiment_json(
    config_json: &str,
    frames: usize,
    frame_dt: f64,
    sample_every: usize,
) -> PyResult<String> {
    let config: SimConfig = serde_json::from_str(config_json)
        .map_err(|e| PyValueError::new_err(format!("invalid config json: {e}")))?;
    let mut world = World::try_new(config).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let summary = world
        .try_run_experiment(frames, frame_dt, sample_every)
        .map_err(|e| PyValueError::new_err(e.to_string()))?;
    serde_json::to_string(&summary).map_err(|e| PyValueError::new_err(e.to_string()))
}

#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(version, m)?)?;
    m.add_function(wrap_pyfunction!(default_config_json, m)?)?;
    m.add_function(wrap_pyfunction!(run_experiment_json, m)?)?;
    Ok(())
}
