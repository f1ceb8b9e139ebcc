//! Naming and config serialization shared by layers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use burn::tensor::backend::Backend;

/// `"CamelCase"` to `"camel_case"`.
///
/// An underscore goes before every uppercase letter except the first
/// character and letters directly after a digit, so `"Conv2DTranspose"`
/// becomes `"conv2d_transpose"`.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev: Option<char> = None;
    for c in name.chars() {
        let after_digit = prev.is_some_and(|p| p.is_ascii_digit());
        if prev.is_some() && c.is_uppercase() && !after_digit {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }
    out
}

/// Arguments common to every layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerArgs {
    pub name: Option<String>,
    pub trainable: bool,
    pub dtype: String,
}

impl Default for LayerArgs {
    fn default() -> Self {
        Self {
            name: None,
            trainable: true,
            dtype: "float32".to_string(),
        }
    }
}

impl LayerArgs {
    /// Args named `"<snake_class>_<uid>"` from the context's counters.
    pub fn named<B: Backend>(ctx: &mut ExecutionContext<B>, class_name: &str) -> Self {
        Self {
            name: Some(ctx.unique_name(&to_snake_case(class_name))),
            ..Self::default()
        }
    }
}

/// Layer whose configuration can be written out and read back.
pub trait Configurable {
    type Config: Serialize + DeserializeOwned;

    fn get_config(&self) -> Self::Config;

    /// Type name without module path or generics.
    fn class_name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        let base = full.split('<').next().unwrap_or(full);
        base.rsplit("::").next().unwrap_or(base)
    }
}

/// `{ "class_name": ..., "config": ... }` envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub class_name: String,
    pub config: serde_json::Value,
}

impl LayerConfig {
    /// Decode the inner config as `C`.
    pub fn decode<C: DeserializeOwned>(&self) -> Result<C> {
        serde_json::from_value(self.config.clone())
            .map_err(|e| Error::msg(format!("invalid {} config: {e}", self.class_name)))
    }
}

pub fn serialize_layer_to_config<L: Configurable + ?Sized>(layer: &L) -> Result<LayerConfig> {
    let config = serde_json::to_value(layer.get_config())
        .map_err(|e| Error::msg(format!("cannot serialize {}: {e}", layer.class_name())))?;
    Ok(LayerConfig {
        class_name: layer.class_name().to_string(),
        config,
    })
}
