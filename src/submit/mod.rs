//! Job Submit Descriptions
//!
//! - [`options`]: typed submit options, merging and rendering
//! - [`descriptor`]: job descriptors and the per-session registry

pub mod descriptor;
pub mod options;

pub use descriptor::{JobDescriptor, JobDescriptorBuilder, JobSource};
pub use options::{
    Attributes, SubmitOptions, TransferFiles, TransferOutput, BASE_SUBMIT_OPTIONS, UNORDERED_KEY,
};
