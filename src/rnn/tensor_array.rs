use burn::tensor::backend::Backend;

use crate::error::{Error, Result};
use crate::tensor::{DynTensor, StaticShape};

/// Time-indexed buffer of per-step tensors.
///
/// A pre-sized arena: slot `i` holds the value written for step `i`. Writing
/// an index again overwrites it, which is how a size-1 array keeps only the
/// latest step. The element shape is fixed by the first write unless a fully
/// known hint was given at allocation.
#[derive(Clone, Debug)]
pub struct TensorArray<B: Backend> {
    slots: Vec<Option<DynTensor<B>>>,
    static_size: Option<usize>,
    element_shape: Option<StaticShape>,
}

impl<B: Backend> TensorArray<B> {
    /// Empty array with `size` slots.
    ///
    /// `static_size` is the size as known statically (`None` when the time
    /// extent is only known at runtime); it becomes the leading static dim of
    /// [`TensorArray::read_all`].
    pub fn allocate(
        size: usize,
        static_size: Option<usize>,
        element_shape: Option<StaticShape>,
    ) -> Self {
        Self {
            slots: vec![None; size],
            static_size,
            element_shape,
        }
    }

    /// Array pre-filled with the slices of `sequence` along axis 0.
    pub fn unstack(sequence: &DynTensor<B>) -> Result<Self> {
        let slices = sequence.unstack()?;
        let static_size = sequence.static_shape().dim(0);
        let element_shape = Some(sequence.static_shape().drop_leading());
        Ok(Self {
            slots: slices.into_iter().map(Some).collect(),
            static_size,
            element_shape,
        })
    }

    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Number of slots holding a value.
    pub fn written(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn element_shape(&self) -> Option<&StaticShape> {
        self.element_shape.as_ref()
    }

    /// Store `value` at `index`, replacing anything already there.
    pub fn write(&mut self, index: usize, value: DynTensor<B>) -> Result<()> {
        let len = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?;
        let dims = value.dims();
        if let Some(shape) = &self.element_shape {
            if !shape.is_compatible_with(&dims) {
                return Err(Error::ShapeMismatch {
                    context: "tensor array write",
                    expected: shape.clone(),
                    got: StaticShape::known(&dims),
                });
            }
        }
        *slot = Some(value);
        // First concrete write pins any dims the hint left open.
        self.element_shape = Some(StaticShape::known(&dims));
        Ok(())
    }

    pub fn read(&self, index: usize) -> Result<DynTensor<B>> {
        let len = self.slots.len();
        self.slots
            .get(index)
            .ok_or(Error::IndexOutOfBounds { index, len })?
            .clone()
            .ok_or_else(|| Error::EmptyAccumulator(format!("slot {index} was never written")))
    }

    /// Written slots stacked along a new leading axis, in index order.
    pub fn read_all(&self) -> Result<DynTensor<B>> {
        let values: Vec<DynTensor<B>> = self.slots.iter().flatten().cloned().collect();
        if values.is_empty() {
            return Err(Error::EmptyAccumulator(format!(
                "none of {} slots were written",
                self.slots.len()
            )));
        }
        let stacked = DynTensor::stack(&values)?;
        let count = values.len();
        let leading = if count == self.slots.len() {
            self.static_size
        } else {
            Some(count)
        };
        let shape = stacked.static_shape().clone().with_dim(0, leading);
        stacked.with_static_shape(shape)
    }
}
