//! Upload of rate sets to Yokoy

pub mod client;
pub mod payload;

pub use client::{ErrorDetail, FailureKind, UploadResult, YokoyClient};
pub use payload::UploadPayload;
