pub mod client;
pub mod config;
pub mod error;
pub mod load;
pub mod materialize;
pub mod parse;
pub mod registry;

pub use client::{SwaggerClient, Transport};
pub use error::{ExecError, MaterializeError};
pub use load::{LoadedSpec, SpecDocument};
pub use materialize::{MaterializeOptions, MaterializedRequest, ParameterBag, RequestOptions};
pub use registry::{
    HttpMethod, OperationDescriptor, OperationKey, OperationRegistry, ParameterDescriptor,
};
