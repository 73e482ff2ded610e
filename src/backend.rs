//! Backend abstraction
//!
//! Training runs on the NdArray (CPU) backend. The device is returned as a
//! value and passed explicitly to loaders and model construction.

use burn::backend::Autodiff;

#[cfg(feature = "ndarray")]
pub type DefaultBackend = burn_ndarray::NdArray;

#[cfg(not(feature = "ndarray"))]
compile_error!("The ndarray backend feature must be enabled!");

/// The default autodiff backend for training
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Device handle of the default backend
pub type Device = <DefaultBackend as burn::tensor::backend::Backend>::Device;

/// Get the default device (CPU)
pub fn default_device() -> Device {
    Device::default()
}

/// Get a human-readable name for the current backend
pub fn backend_name() -> &'static str {
    "NdArray (CPU)"
}
