//! Rank-erased tensor handles.
//!
//! Nested state and output bundles mix tensors of different ranks, which Burn's
//! const-generic `Tensor<B, D>` cannot express in a single collection. A
//! [`DynTensor`] stores every tensor as `Tensor<B, MAX_RANK>` with its logical
//! dimensions right-aligned and the leading axes set to one:
//!
//! ```text
//! logical [batch, features]        -> physical [1, 1, 1, 1, batch, features]
//! logical [time, batch, features]  -> physical [1, 1, 1, time, batch, features]
//! ```
//!
//! Right alignment keeps numpy broadcasting and batched matmul correct, and
//! stacking along a new leading axis is a plain concatenation on the padded
//! axis just before the logical ones.
//!
//! Each handle also carries a [`StaticShape`]: the shape as it is known while
//! the computation is being described. Dimensions may be unknown there even
//! though the engine always knows the runtime extent.

use std::fmt;

use burn::tensor::backend::Backend;
use burn::tensor::{activation, BasicOps, Bool, Float, Shape, Tensor, TensorData, TensorKind};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest logical rank a [`DynTensor`] can hold.
pub const MAX_RANK: usize = 6;

/// Rank-erased boolean tensor.
pub type DynMask<B> = DynTensor<B, Bool>;

/// Shape metadata with possibly unknown dimensions.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StaticShape(Vec<Option<usize>>);

impl StaticShape {
    pub fn new(dims: Vec<Option<usize>>) -> Self {
        Self(dims)
    }

    /// Fully known shape.
    pub fn known(dims: &[usize]) -> Self {
        Self(dims.iter().map(|&d| Some(d)).collect())
    }

    /// Shape of the given rank with every dimension unknown.
    pub fn unknown(rank: usize) -> Self {
        Self(vec![None; rank])
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    pub fn dims(&self) -> &[Option<usize>] {
        &self.0
    }

    /// Static extent of axis `i`, `None` when unknown or out of range.
    pub fn dim(&self, i: usize) -> Option<usize> {
        self.0.get(i).copied().flatten()
    }

    pub fn is_fully_defined(&self) -> bool {
        self.0.iter().all(Option::is_some)
    }

    pub fn with_dim(mut self, i: usize, d: Option<usize>) -> Self {
        if let Some(slot) = self.0.get_mut(i) {
            *slot = d;
        }
        self
    }

    /// Whether a concrete runtime shape satisfies this static shape.
    pub fn is_compatible_with(&self, dims: &[usize]) -> bool {
        self.0.len() == dims.len()
            && self
                .0
                .iter()
                .zip(dims)
                .all(|(s, &d)| s.map_or(true, |s| s == d))
    }

    /// Shape with axis 0 removed.
    pub fn drop_leading(&self) -> Self {
        Self(self.0.iter().skip(1).copied().collect())
    }

    /// Shape with `d` prepended.
    pub fn prepend(&self, d: Option<usize>) -> Self {
        let mut dims = Vec::with_capacity(self.0.len() + 1);
        dims.push(d);
        dims.extend_from_slice(&self.0);
        Self(dims)
    }

    fn swapped(&self, a: usize, b: usize) -> Self {
        let mut dims = self.0.clone();
        dims.swap(a, b);
        Self(dims)
    }

    /// Static shape of a broadcasting binary op.
    pub fn broadcast(a: &Self, b: &Self) -> Self {
        let rank = a.rank().max(b.rank());
        let pad = |s: &Self| -> Vec<Option<usize>> {
            let mut dims = vec![Some(1); rank - s.rank()];
            dims.extend_from_slice(&s.0);
            dims
        };
        let (a, b) = (pad(a), pad(b));
        Self(
            a.into_iter()
                .zip(b)
                .map(|pair| match pair {
                    (Some(1), other) | (other, Some(1)) => other,
                    (Some(x), _) | (_, Some(x)) => Some(x),
                    (None, None) => None,
                })
                .collect(),
        )
    }
}

impl fmt::Display for StaticShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match d {
                Some(d) => write!(f, "{d}")?,
                None => write!(f, "?")?,
            }
        }
        write!(f, "]")
    }
}

/// Pad logical dims on the left with ones up to [`MAX_RANK`].
fn padded(dims: &[usize]) -> Result<[usize; MAX_RANK]> {
    if dims.len() > MAX_RANK {
        return Err(Error::RankTooLarge {
            rank: dims.len(),
            max: MAX_RANK,
        });
    }
    let mut out = [1; MAX_RANK];
    out[MAX_RANK - dims.len()..].copy_from_slice(dims);
    Ok(out)
}

/// An n-dimensional tensor of logical rank `0..=MAX_RANK` on backend `B`.
///
/// Cloning is cheap: Burn tensor primitives are reference counted.
pub struct DynTensor<B: Backend, K: TensorKind<B> = Float> {
    inner: Tensor<B, MAX_RANK, K>,
    rank: usize,
    static_shape: StaticShape,
}

impl<B: Backend, K: TensorKind<B>> Clone for DynTensor<B, K> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            rank: self.rank,
            static_shape: self.static_shape.clone(),
        }
    }
}

impl<B: Backend, K: BasicOps<B>> fmt::Debug for DynTensor<B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynTensor")
            .field("dims", &self.dims())
            .field("static_shape", &format_args!("{}", self.static_shape))
            .finish()
    }
}

impl<B: Backend, K: BasicOps<B>> DynTensor<B, K> {
    fn from_padded(inner: Tensor<B, MAX_RANK, K>, rank: usize, static_shape: StaticShape) -> Self {
        Self {
            inner,
            rank,
            static_shape,
        }
    }

    /// Wrap a const-rank Burn tensor.
    pub fn from_tensor<const D: usize>(tensor: Tensor<B, D, K>) -> Result<Self> {
        let dims = tensor.dims();
        let inner = tensor.reshape(padded(&dims)?);
        Ok(Self::from_padded(inner, D, StaticShape::known(&dims)))
    }

    /// Unwrap into a const-rank Burn tensor; `D` must equal the logical rank.
    pub fn into_tensor<const D: usize>(self) -> Result<Tensor<B, D, K>> {
        if D != self.rank {
            return Err(Error::RankMismatch {
                context: "into_tensor",
                expected: D,
                got: self.rank,
            });
        }
        let mut dims = [1; D];
        dims.copy_from_slice(&self.dims());
        Ok(self.inner.reshape(dims))
    }

    /// Build from raw data with the given logical dims.
    pub fn from_data(data: TensorData, dims: &[usize], device: &B::Device) -> Result<Self> {
        let count: usize = dims.iter().product();
        if data.num_elements() != count {
            crate::bail!(
                "element count mismatch: dims {dims:?} need {count} elements, got {}",
                data.num_elements()
            );
        }
        let inner = Tensor::<B, 1, K>::from_data(data, device).reshape(padded(dims)?);
        Ok(Self::from_padded(inner, dims.len(), StaticShape::known(dims)))
    }

    /// Runtime extents of the logical axes.
    pub fn dims(&self) -> Vec<usize> {
        self.inner.dims()[MAX_RANK - self.rank..].to_vec()
    }

    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn static_shape(&self) -> &StaticShape {
        &self.static_shape
    }

    pub fn device(&self) -> B::Device {
        self.inner.device()
    }

    /// Replace the static shape metadata; it must be compatible with the runtime dims.
    pub fn with_static_shape(mut self, shape: StaticShape) -> Result<Self> {
        let dims = self.dims();
        if !shape.is_compatible_with(&dims) {
            return Err(Error::ShapeMismatch {
                context: "with_static_shape",
                expected: shape,
                got: StaticShape::known(&dims),
            });
        }
        self.static_shape = shape;
        Ok(self)
    }

    /// Mark axis `axis` as statically unknown.
    pub fn forget_dim(mut self, axis: usize) -> Result<Self> {
        self.check_axis(axis)?;
        self.static_shape = self.static_shape.with_dim(axis, None);
        Ok(self)
    }

    /// Stamp a known extent onto axis `axis`. `None` leaves the metadata as is.
    pub(crate) fn merge_static_dim(mut self, axis: usize, d: Option<usize>) -> Result<Self> {
        self.check_axis(axis)?;
        if let Some(d) = d {
            let runtime = self.dims()[axis];
            if runtime != d {
                return Err(Error::ShapeMismatch {
                    context: "static shape stamp",
                    expected: self.static_shape.clone().with_dim(axis, Some(d)),
                    got: StaticShape::known(&self.dims()),
                });
            }
            self.static_shape = self.static_shape.with_dim(axis, Some(d));
        }
        Ok(self)
    }

    fn check_axis(&self, axis: usize) -> Result<()> {
        if axis >= self.rank {
            return Err(Error::IndexOutOfBounds {
                index: axis,
                len: self.rank,
            });
        }
        Ok(())
    }

    fn physical(&self, axis: usize) -> usize {
        MAX_RANK - self.rank + axis
    }

    /// Normalise a possibly negative axis.
    pub fn axis(&self, axis: isize) -> Result<usize> {
        let rank = self.rank as isize;
        let normalized = if axis < 0 { axis + rank } else { axis };
        if normalized < 0 || normalized >= rank {
            return Err(Error::IndexOutOfBounds {
                index: axis.unsigned_abs(),
                len: self.rank,
            });
        }
        Ok(normalized as usize)
    }

    /// Transpose two logical axes.
    pub fn swap_axes(&self, a: usize, b: usize) -> Result<Self> {
        self.check_axis(a)?;
        self.check_axis(b)?;
        let inner = self
            .inner
            .clone()
            .swap_dims(self.physical(a), self.physical(b));
        Ok(Self::from_padded(
            inner,
            self.rank,
            self.static_shape.swapped(a, b),
        ))
    }

    /// Slice `t` of axis 0, dropping that axis.
    pub fn index_axis0(&self, t: usize) -> Result<Self> {
        if self.rank == 0 {
            return Err(Error::RankMismatch {
                context: "index_axis0",
                expected: 1,
                got: 0,
            });
        }
        let len = self.dims()[0];
        if t >= len {
            return Err(Error::IndexOutOfBounds { index: t, len });
        }
        // The narrowed axis keeps extent 1, which is already the padded
        // layout of the rank below.
        let inner = self.inner.clone().narrow(self.physical(0), t, 1);
        Ok(Self::from_padded(
            inner,
            self.rank - 1,
            self.static_shape.drop_leading(),
        ))
    }

    /// Split along axis 0.
    pub fn unstack(&self) -> Result<Vec<Self>> {
        let len = self.dims().first().copied().unwrap_or(0);
        (0..len).map(|t| self.index_axis0(t)).collect()
    }

    /// Stack equally shaped tensors along a new leading axis.
    pub fn stack(items: &[Self]) -> Result<Self> {
        let first = items
            .first()
            .ok_or_else(|| Error::msg("cannot stack an empty list of tensors"))?;
        let rank = first.rank;
        if rank + 1 > MAX_RANK {
            return Err(Error::RankTooLarge {
                rank: rank + 1,
                max: MAX_RANK,
            });
        }
        let dims = first.dims();
        for item in &items[1..] {
            if item.dims() != dims {
                return Err(Error::shape("stack", &dims, &item.dims()));
            }
        }
        let axis = MAX_RANK - rank - 1;
        let inner = Tensor::cat(items.iter().map(|t| t.inner.clone()).collect(), axis);
        Ok(Self::from_padded(
            inner,
            rank + 1,
            first.static_shape.prepend(Some(items.len())),
        ))
    }

    /// Concatenate along an existing axis.
    pub fn concat(items: &[Self], axis: usize) -> Result<Self> {
        let first = items
            .first()
            .ok_or_else(|| Error::msg("cannot concatenate an empty list of tensors"))?;
        first.check_axis(axis)?;
        let dims = first.dims();
        let mut total = 0;
        for item in items {
            let other = item.dims();
            let agrees = other.len() == dims.len()
                && other
                    .iter()
                    .zip(&dims)
                    .enumerate()
                    .all(|(i, (a, b))| i == axis || a == b);
            if !agrees {
                return Err(Error::shape("concatenate", &dims, &other));
            }
            total += other[axis];
        }
        let inner = Tensor::cat(
            items.iter().map(|t| t.inner.clone()).collect(),
            first.physical(axis),
        );
        let all_known = items.iter().all(|t| t.static_shape.dim(axis).is_some());
        let static_shape = first
            .static_shape
            .clone()
            .with_dim(axis, all_known.then_some(total));
        Ok(Self::from_padded(inner, first.rank, static_shape))
    }

    /// Reverse the order along axis 0.
    pub fn reverse_axis0(&self) -> Result<Self> {
        let mut slices = self.unstack()?;
        slices.reverse();
        Ok(Self::stack(&slices)?.with_static_shape_of(self))
    }

    fn with_static_shape_of(mut self, other: &Self) -> Self {
        self.static_shape = other.static_shape.clone();
        self
    }

    /// Reshape to new logical dims with the same element count.
    pub fn reshape(&self, dims: &[usize]) -> Result<Self> {
        let from: usize = self.dims().iter().product();
        let to: usize = dims.iter().product();
        if from != to {
            return Err(Error::shape("reshape", &self.dims(), dims));
        }
        let inner = self.inner.clone().reshape(padded(dims)?);
        Ok(Self::from_padded(inner, dims.len(), StaticShape::known(dims)))
    }

    /// Append `n` trailing singleton axes.
    pub fn expand_trailing(&self, n: usize) -> Result<Self> {
        let mut dims = self.dims();
        dims.extend(std::iter::repeat(1).take(n));
        let inner = self.inner.clone().reshape(padded(&dims)?);
        let mut static_dims = self.static_shape.dims().to_vec();
        static_dims.extend(std::iter::repeat(Some(1)).take(n));
        Ok(Self::from_padded(
            inner,
            dims.len(),
            StaticShape::new(static_dims),
        ))
    }

    /// Broadcast to `dims` (numpy rules: right-aligned, size-1 axes repeat).
    pub fn broadcast_to(&self, dims: &[usize]) -> Result<Self> {
        let own = self.dims();
        if dims.len() < own.len() {
            return Err(Error::shape("broadcast", dims, &own));
        }
        let offset = dims.len() - own.len();
        let ok = own
            .iter()
            .zip(&dims[offset..])
            .all(|(&a, &b)| a == b || a == 1);
        if !ok {
            return Err(Error::shape("broadcast", dims, &own));
        }
        let inner: Tensor<B, MAX_RANK, K> =
            self.inner.clone().expand(Shape::new(padded(dims)?));
        Ok(Self::from_padded(
            inner,
            dims.len(),
            StaticShape::known(dims),
        ))
    }
}

impl<B: Backend> DynTensor<B> {
    pub fn zeros(dims: &[usize], device: &B::Device) -> Result<Self> {
        let inner = Tensor::zeros(padded(dims)?, device);
        Ok(Self::from_padded(inner, dims.len(), StaticShape::known(dims)))
    }

    pub fn ones(dims: &[usize], device: &B::Device) -> Result<Self> {
        let inner = Tensor::ones(padded(dims)?, device);
        Ok(Self::from_padded(inner, dims.len(), StaticShape::known(dims)))
    }

    /// Build a float tensor from row-major values.
    pub fn from_floats(values: Vec<f32>, dims: &[usize], device: &B::Device) -> Result<Self> {
        let len = values.len();
        Self::from_data(TensorData::new(values, [len]), dims, device)
    }

    pub fn zeros_like(&self) -> Self {
        Self::from_padded(
            self.inner.zeros_like(),
            self.rank,
            self.static_shape.clone(),
        )
    }

    /// Read the values back in row-major order.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        self.inner
            .clone()
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| Error::Data(format!("{e:?}")))
    }

    /// Coerce to a boolean mask: non-zero is `true`.
    pub fn to_mask(&self) -> DynMask<B> {
        DynMask::from_padded(
            self.inner.clone().not_equal_elem(0.0),
            self.rank,
            self.static_shape.clone(),
        )
    }

    /// Element-wise `mask ? on_true : on_false`. All three shapes must agree.
    pub fn select(mask: &DynMask<B>, on_true: &Self, on_false: &Self) -> Result<Self> {
        let dims = on_true.dims();
        if on_false.dims() != dims {
            return Err(Error::shape("select", &dims, &on_false.dims()));
        }
        if mask.dims() != dims {
            return Err(Error::shape("select mask", &dims, &mask.dims()));
        }
        let inner = on_false
            .inner
            .clone()
            .mask_where(mask.inner.clone(), on_true.inner.clone());
        Ok(Self::from_padded(
            inner,
            on_true.rank,
            on_true.static_shape.clone(),
        ))
    }

    fn binary(
        &self,
        rhs: &Self,
        op: impl FnOnce(Tensor<B, MAX_RANK>, Tensor<B, MAX_RANK>) -> Tensor<B, MAX_RANK>,
    ) -> Self {
        let inner = op(self.inner.clone(), rhs.inner.clone());
        let static_shape = StaticShape::broadcast(&self.static_shape, &rhs.static_shape);
        Self::from_padded(inner, self.rank.max(rhs.rank), static_shape)
    }

    fn unary(&self, op: impl FnOnce(Tensor<B, MAX_RANK>) -> Tensor<B, MAX_RANK>) -> Self {
        Self::from_padded(
            op(self.inner.clone()),
            self.rank,
            self.static_shape.clone(),
        )
    }

    /// Apply an element-wise op to the padded tensor; the op must keep the shape.
    pub fn map_padded(
        &self,
        op: impl FnOnce(Tensor<B, MAX_RANK>) -> Tensor<B, MAX_RANK>,
    ) -> Result<Self> {
        let out = self.unary(op);
        if out.inner.dims() != self.inner.dims() {
            return Err(Error::shape("element-wise op", &self.dims(), &out.dims()));
        }
        Ok(out)
    }

    pub fn add(&self, rhs: &Self) -> Self {
        self.binary(rhs, |a, b| a + b)
    }

    pub fn sub(&self, rhs: &Self) -> Self {
        self.binary(rhs, |a, b| a - b)
    }

    pub fn mul(&self, rhs: &Self) -> Self {
        self.binary(rhs, |a, b| a * b)
    }

    pub fn add_scalar(&self, value: f32) -> Self {
        self.unary(|t| t.add_scalar(value))
    }

    pub fn mul_scalar(&self, value: f32) -> Self {
        self.unary(|t| t.mul_scalar(value))
    }

    pub fn neg(&self) -> Self {
        self.unary(|t| t.neg())
    }

    pub fn exp(&self) -> Self {
        self.unary(|t| t.exp())
    }

    pub fn tanh(&self) -> Self {
        self.unary(|t| t.tanh())
    }

    pub fn sigmoid(&self) -> Self {
        self.unary(activation::sigmoid)
    }

    /// Matrix product over the last two axes, broadcasting the leading ones.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        if self.rank < 2 || rhs.rank < 2 {
            return Err(Error::RankMismatch {
                context: "matmul",
                expected: 2,
                got: self.rank.min(rhs.rank),
            });
        }
        let (ld, rd) = (self.dims(), rhs.dims());
        if ld[ld.len() - 1] != rd[rd.len() - 2] {
            return Err(Error::shape("matmul", &ld, &rd));
        }
        let inner = self.inner.clone().matmul(rhs.inner.clone());
        let rank = self.rank.max(rhs.rank);
        let dims = inner.dims()[MAX_RANK - rank..].to_vec();
        Ok(Self::from_padded(inner, rank, StaticShape::known(&dims)))
    }

    /// Mean over one axis.
    pub fn mean_axis(&self, axis: isize, keepdims: bool) -> Result<Self> {
        let axis = self.axis(axis)?;
        let reduced = self.inner.clone().mean_dim(self.physical(axis));
        let kept = Self::from_padded(
            reduced,
            self.rank,
            self.static_shape.clone().with_dim(axis, Some(1)),
        );
        if keepdims {
            return Ok(kept);
        }
        let mut dims = kept.dims();
        dims.remove(axis);
        let mut static_dims = kept.static_shape.dims().to_vec();
        static_dims.remove(axis);
        kept.reshape(&dims)?
            .with_static_shape(StaticShape::new(static_dims))
    }
}

impl<B: Backend> DynMask<B> {
    /// Build a boolean tensor from row-major values.
    pub fn from_bools(values: Vec<bool>, dims: &[usize], device: &B::Device) -> Result<Self> {
        let len = values.len();
        Self::from_data(TensorData::new(values, [len]), dims, device)
    }

    pub fn to_bool_vec(&self) -> Result<Vec<bool>> {
        self.inner
            .clone()
            .into_data()
            .to_vec::<bool>()
            .map_err(|e| Error::Data(format!("{e:?}")))
    }

    /// Cast to float: `true -> 1.0`, `false -> 0.0`.
    pub fn to_float(&self) -> DynTensor<B> {
        DynTensor::from_padded(
            self.inner.clone().float(),
            self.rank,
            self.static_shape.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn seq(device: &<TestBackend as Backend>::Device) -> DynTensor<TestBackend> {
        // [time=3, batch=2, features=1]
        DynTensor::from_floats(vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0], &[3, 2, 1], device).unwrap()
    }

    #[test]
    fn test_from_tensor_round_trip_keeps_dims() {
        let device = Default::default();
        let t = Tensor::<TestBackend, 3>::ones([2, 3, 4], &device);
        let d = DynTensor::from_tensor(t).unwrap();
        assert_eq!(d.rank(), 3);
        assert_eq!(d.dims(), vec![2, 3, 4]);
        let back: Tensor<TestBackend, 3> = d.into_tensor().unwrap();
        assert_eq!(back.dims(), [2, 3, 4]);
    }

    #[test]
    fn test_into_tensor_wrong_rank() {
        let device = Default::default();
        let d = DynTensor::<TestBackend>::zeros(&[2, 3], &device).unwrap();
        assert!(matches!(
            d.into_tensor::<3>(),
            Err(Error::RankMismatch { .. })
        ));
    }

    #[test]
    fn test_index_and_stack() {
        let device = Default::default();
        let s = seq(&device);
        let step = s.index_axis0(1).unwrap();
        assert_eq!(step.dims(), vec![2, 1]);
        assert_eq!(step.to_f32_vec().unwrap(), vec![2.0, 20.0]);

        let parts = s.unstack().unwrap();
        assert_eq!(parts.len(), 3);
        let restacked = DynTensor::stack(&parts).unwrap();
        assert_eq!(restacked.dims(), vec![3, 2, 1]);
        assert_eq!(restacked.to_f32_vec().unwrap(), s.to_f32_vec().unwrap());
    }

    #[test]
    fn test_swap_axes() {
        let device = Default::default();
        let s = seq(&device).swap_axes(0, 1).unwrap();
        assert_eq!(s.dims(), vec![2, 3, 1]);
        assert_eq!(
            s.to_f32_vec().unwrap(),
            vec![1.0, 2.0, 3.0, 10.0, 20.0, 30.0]
        );
    }

    #[test]
    fn test_reverse_axis0() {
        let device = Default::default();
        let r = seq(&device).reverse_axis0().unwrap();
        assert_eq!(
            r.to_f32_vec().unwrap(),
            vec![3.0, 30.0, 2.0, 20.0, 1.0, 10.0]
        );
    }

    #[test]
    fn test_broadcast_and_select() {
        let device = Default::default();
        let mask = DynMask::<TestBackend>::from_bools(vec![true, false], &[2, 1], &device).unwrap();
        let mask = mask.broadcast_to(&[2, 3]).unwrap();
        let a = DynTensor::ones(&[2, 3], &device).unwrap();
        let b = DynTensor::zeros(&[2, 3], &device).unwrap();
        let out = DynTensor::select(&mask, &a, &b).unwrap();
        assert_eq!(
            out.to_f32_vec().unwrap(),
            vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0]
        );
    }

    #[test]
    fn test_broadcast_rejects_incompatible() {
        let device = Default::default();
        let t = DynTensor::<TestBackend>::zeros(&[2, 3], &device).unwrap();
        assert!(t.broadcast_to(&[2, 4]).is_err());
    }

    #[test]
    fn test_rank_too_large() {
        let device = Default::default();
        let result = DynTensor::<TestBackend>::zeros(&[1, 1, 1, 1, 1, 1, 1], &device);
        assert!(matches!(result, Err(Error::RankTooLarge { rank: 7, .. })));
    }

    #[test]
    fn test_matmul_rank_two() {
        let device = Default::default();
        let x = DynTensor::<TestBackend>::from_floats(vec![1.0, 2.0], &[1, 2], &device).unwrap();
        let w = DynTensor::from_floats(vec![1.0, 0.0, 1.0, 0.0, 1.0, 1.0], &[2, 3], &device)
            .unwrap();
        let y = x.matmul(&w).unwrap();
        assert_eq!(y.dims(), vec![1, 3]);
        assert_eq!(y.to_f32_vec().unwrap(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_static_shape_tracking() {
        let device = Default::default();
        let s = seq(&device).forget_dim(0).unwrap();
        assert_eq!(s.static_shape().dim(0), None);
        assert_eq!(s.static_shape().to_string(), "[?, 2, 1]");
        let swapped = s.swap_axes(0, 1).unwrap();
        assert_eq!(swapped.static_shape().to_string(), "[2, ?, 1]");
        let step = s.index_axis0(0).unwrap();
        assert!(step.static_shape().is_fully_defined());
    }

    #[test]
    fn test_static_broadcast_rules() {
        let a = StaticShape::new(vec![None, Some(1)]);
        let b = StaticShape::known(&[4, 5]);
        assert_eq!(
            StaticShape::broadcast(&a, &b),
            StaticShape::new(vec![Some(4), Some(5)])
        );
        let c = StaticShape::new(vec![None]);
        assert_eq!(
            StaticShape::broadcast(&c, &StaticShape::new(vec![None])),
            StaticShape::new(vec![None])
        );
    }

    #[test]
    fn test_mean_axis_drops_dim() {
        let device = Default::default();
        let t = DynTensor::<TestBackend>::from_floats(vec![1.0, 3.0, 5.0, 7.0], &[2, 2], &device)
            .unwrap();
        let m = t.mean_axis(-1, false).unwrap();
        assert_eq!(m.dims(), vec![2]);
        assert_eq!(m.to_f32_vec().unwrap(), vec![2.0, 6.0]);
        let kept = t.mean_axis(0, true).unwrap();
        assert_eq!(kept.dims(), vec![1, 2]);
    }

    #[test]
    fn test_to_mask_coerces_non_zero() {
        let device = Default::default();
        let t = DynTensor::<TestBackend>::from_floats(vec![0.0, 2.0, -1.0], &[3], &device).unwrap();
        assert_eq!(t.to_mask().to_bool_vec().unwrap(), vec![false, true, true]);
    }
}
