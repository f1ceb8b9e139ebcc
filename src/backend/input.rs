use burn::tensor::backend::Backend;

use crate::error::{Error, Result};
use crate::tensor::{DynTensor, StaticShape};

/// Declared shape of a model input.
///
/// Binding a concrete tensor to the spec checks it against the declared
/// shape and replaces its static metadata, so a dimension declared unknown
/// stays unknown downstream (e.g. a `None` time axis forces the dynamic loop).
#[derive(Clone, Debug, PartialEq)]
pub struct InputSpec {
    shape: StaticShape,
    name: Option<String>,
    sparse: bool,
    ragged: bool,
}

impl InputSpec {
    pub fn new(shape: StaticShape) -> Self {
        Self {
            shape,
            name: None,
            sparse: false,
            ragged: false,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    pub fn with_ragged(mut self, ragged: bool) -> Self {
        self.ragged = ragged;
        self
    }

    pub fn shape(&self) -> &StaticShape {
        &self.shape
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn bind<B: Backend>(&self, tensor: DynTensor<B>) -> Result<DynTensor<B>> {
        if self.sparse {
            return Err(Error::unsupported("sparse placeholders"));
        }
        if self.ragged {
            return Err(Error::unsupported("ragged inputs"));
        }
        if tensor.rank() != self.shape.rank() {
            return Err(Error::RankMismatch {
                context: "input spec",
                expected: self.shape.rank(),
                got: tensor.rank(),
            });
        }
        tracing::trace!(name = ?self.name, shape = %self.shape, "binding input");
        tensor.with_static_shape(self.shape.clone())
    }
}
