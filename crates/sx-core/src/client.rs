use std::future::Future;

use crate::error::{ExecError, MaterializeError};
use crate::load::{LoadedSpec, SpecDocument};
use crate::materialize::{
    self, MaterializeOptions, MaterializedRequest, ParameterBag, RequestOptions,
};
use crate::registry::{OperationDescriptor, OperationRegistry};

/// Performs the network I/O for a materialized request.
pub trait Transport {
    type Response;
    type Error;

    fn fetch(
        &self,
        url: String,
        options: RequestOptions,
    ) -> impl Future<Output = Result<Self::Response, Self::Error>> + Send;
}

/// Resolves operations of one loaded document and hands materialized
/// requests to a transport.
#[derive(Debug, Clone)]
pub struct SwaggerClient<T> {
    registry: OperationRegistry,
    document: SpecDocument,
    transport: T,
    options: MaterializeOptions,
}

impl<T> SwaggerClient<T> {
    pub fn new(registry: OperationRegistry, document: SpecDocument, transport: T) -> Self {
        Self {
            registry,
            document,
            transport,
            options: MaterializeOptions::default(),
        }
    }

    pub fn from_loaded(loaded: LoadedSpec, transport: T) -> Self {
        Self::new(loaded.registry, loaded.document, transport)
    }

    pub fn with_options(mut self, options: MaterializeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &OperationRegistry {
        &self.registry
    }

    pub fn document(&self) -> &SpecDocument {
        &self.document
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn operation(&self, name: &str) -> Result<&OperationDescriptor, MaterializeError> {
        self.registry.resolve(name)
    }

    pub fn build_url(&self, name: &str, params: &ParameterBag) -> Result<String, MaterializeError> {
        let op = self.operation(name)?;
        materialize::build_url(&self.document, op, params, &self.options)
    }

    pub fn build_request_options(
        &self,
        name: &str,
        params: &ParameterBag,
    ) -> Result<RequestOptions, MaterializeError> {
        let op = self.operation(name)?;
        Ok(materialize::build_request_options(op, params))
    }

    pub fn materialize(
        &self,
        name: &str,
        params: &ParameterBag,
    ) -> Result<MaterializedRequest, MaterializeError> {
        let op = self.operation(name)?;
        materialize::materialize(&self.document, op, params, &self.options)
    }
}

impl<T: Transport> SwaggerClient<T> {
    /// Materialize `name` with `params` and pass the result to the transport.
    pub async fn exec(
        &self,
        name: &str,
        params: &ParameterBag,
    ) -> Result<T::Response, ExecError<T::Error>> {
        let MaterializedRequest { url, options } = self.materialize(name, params)?;
        self.transport
            .fetch(url, options)
            .await
            .map_err(ExecError::Transport)
    }
}
