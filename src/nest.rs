//! Nested bundles of tensors.
//!
//! Recurrent state and step outputs are arbitrary trees: a single tensor, an
//! ordered list (e.g. LSTM `(h, c)`), or a keyed record. [`Nest`] is that tree.
//! Algorithms work on the flattened leaf list and rebuild the original shape
//! with [`Nest::pack_as`], which checks the structure instead of trusting it.
//!
//! Leaves are visited depth first; `Map` entries in key order.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::tensor::DynTensor;

/// Nested bundle of rank-erased float tensors.
pub type TensorNest<B> = Nest<DynTensor<B>>;

/// A recursively defined tree of values.
#[derive(Clone, Debug, PartialEq)]
pub enum Nest<T> {
    Leaf(T),
    Seq(Vec<Nest<T>>),
    Map(BTreeMap<String, Nest<T>>),
}

impl<T> Nest<T> {
    pub fn leaf(value: T) -> Self {
        Nest::Leaf(value)
    }

    /// Ordered collection of leaves.
    pub fn seq(values: impl IntoIterator<Item = T>) -> Self {
        Nest::Seq(values.into_iter().map(Nest::Leaf).collect())
    }

    /// Keyed collection of subtrees.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Nest<T>)>) -> Self {
        Nest::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// `true` for anything but a single leaf.
    pub fn is_nested(&self) -> bool {
        !matches!(self, Nest::Leaf(_))
    }

    pub fn leaf_count(&self) -> usize {
        match self {
            Nest::Leaf(_) => 1,
            Nest::Seq(items) => items.iter().map(Nest::leaf_count).sum(),
            Nest::Map(items) => items.values().map(Nest::leaf_count).sum(),
        }
    }

    /// Borrow the single leaf, or fail if this is a composite.
    pub fn as_leaf(&self) -> Result<&T> {
        match self {
            Nest::Leaf(value) => Ok(value),
            other => Err(Error::structure(format!(
                "expected a single tensor, got a composite with {} leaves",
                other.leaf_count()
            ))),
        }
    }

    pub fn into_leaf(self) -> Result<T> {
        match self {
            Nest::Leaf(value) => Ok(value),
            other => Err(Error::structure(format!(
                "expected a single tensor, got a composite with {} leaves",
                other.leaf_count()
            ))),
        }
    }

    /// Leaves in depth-first order.
    pub fn flatten(&self) -> Vec<&T> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Nest::Leaf(value) => out.push(value),
            Nest::Seq(items) => items.iter().for_each(|n| n.collect_refs(out)),
            Nest::Map(items) => items.values().for_each(|n| n.collect_refs(out)),
        }
    }

    /// Consume into leaves in depth-first order.
    pub fn into_flat(self) -> Vec<T> {
        let mut out = Vec::with_capacity(self.leaf_count());
        self.collect_owned(&mut out);
        out
    }

    fn collect_owned(self, out: &mut Vec<T>) {
        match self {
            Nest::Leaf(value) => out.push(value),
            Nest::Seq(items) => items.into_iter().for_each(|n| n.collect_owned(out)),
            Nest::Map(items) => items.into_values().for_each(|n| n.collect_owned(out)),
        }
    }

    /// Rebuild `flat` into the structure of `self`.
    ///
    /// Fails when the number of leaves differs.
    pub fn pack_as<U>(&self, flat: Vec<U>) -> Result<Nest<U>> {
        let expected = self.leaf_count();
        if flat.len() != expected {
            return Err(Error::structure(format!(
                "cannot pack {} values into a structure with {} leaves",
                flat.len(),
                expected
            )));
        }
        let mut iter = flat.into_iter();
        self.pack_from(&mut iter)
    }

    fn pack_from<U>(&self, iter: &mut impl Iterator<Item = U>) -> Result<Nest<U>> {
        Ok(match self {
            Nest::Leaf(_) => Nest::Leaf(
                iter.next()
                    .ok_or_else(|| Error::structure("ran out of values while packing"))?,
            ),
            Nest::Seq(items) => Nest::Seq(
                items
                    .iter()
                    .map(|n| n.pack_from(iter))
                    .collect::<Result<_>>()?,
            ),
            Nest::Map(items) => Nest::Map(
                items
                    .iter()
                    .map(|(k, n)| Ok((k.clone(), n.pack_from(iter)?)))
                    .collect::<Result<_>>()?,
            ),
        })
    }

    /// Apply `f` to every leaf, keeping the structure.
    pub fn map_leaves<U>(&self, mut f: impl FnMut(&T) -> U) -> Nest<U> {
        self.map_with(&mut f)
    }

    fn map_with<U>(&self, f: &mut impl FnMut(&T) -> U) -> Nest<U> {
        match self {
            Nest::Leaf(value) => Nest::Leaf(f(value)),
            Nest::Seq(items) => Nest::Seq(items.iter().map(|n| n.map_with(f)).collect()),
            Nest::Map(items) => Nest::Map(
                items
                    .iter()
                    .map(|(k, n)| (k.clone(), n.map_with(f)))
                    .collect(),
            ),
        }
    }

    /// Fallible [`Nest::map_leaves`].
    pub fn try_map<U>(&self, mut f: impl FnMut(&T) -> Result<U>) -> Result<Nest<U>> {
        let mapped = self
            .flatten()
            .into_iter()
            .map(&mut f)
            .collect::<Result<Vec<_>>>()?;
        self.pack_as(mapped)
    }

    /// Same tree shape (kinds, lengths and keys), ignoring leaf values.
    pub fn same_structure<U>(&self, other: &Nest<U>) -> bool {
        match (self, other) {
            (Nest::Leaf(_), Nest::Leaf(_)) => true,
            (Nest::Seq(a), Nest::Seq(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_structure(y))
            }
            (Nest::Map(a), Nest::Map(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .zip(b)
                        .all(|((ka, x), (kb, y))| ka == kb && x.same_structure(y))
            }
            _ => false,
        }
    }

    pub fn assert_same_structure<U>(&self, other: &Nest<U>, what: &str) -> Result<()> {
        if self.same_structure(other) {
            Ok(())
        } else {
            Err(Error::structure(format!(
                "{what}: expected {}, got {}",
                self.describe(),
                other.describe()
            )))
        }
    }

    /// Compact structural description, e.g. `(*, {c: *, h: *})`.
    pub fn describe(&self) -> String {
        match self {
            Nest::Leaf(_) => "*".to_string(),
            Nest::Seq(items) => format!(
                "({})",
                items.iter().map(Nest::describe).collect::<Vec<_>>().join(", ")
            ),
            Nest::Map(items) => format!(
                "{{{}}}",
                items
                    .iter()
                    .map(|(k, n)| format!("{k}: {}", n.describe()))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
}
