//! Dynamically keyed configuration store.
//!
//! The surrounding application hands parameters over as string-keyed
//! options. Values live in a closed tagged union ([`ConfigOption`]);
//! an immutable [`ConfigDef`] registry supplies the kind, default and
//! metadata per key, and a [`DynamicConfig`] holds the actual values
//! with creation on demand from those defaults.

mod option;

pub use option::{ConfigOption, OptionKind};

use crate::pad::{EmbedObject, PadConfig};
use crate::support::SupportConfig;
use crate::{CoordF, Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable metadata for one option key.
#[derive(Debug, Clone)]
pub struct ConfigOptionDef {
    pub kind: OptionKind,
    pub default: ConfigOption,
    /// Key of the option a percent value is taken over.
    pub ratio_over: Option<String>,
    /// Allowed values for [`OptionKind::Enum`] options.
    pub enum_keys: Vec<String>,
}

impl ConfigOptionDef {
    pub fn new(default: ConfigOption) -> Self {
        Self {
            kind: default.kind(),
            default,
            ratio_over: None,
            enum_keys: Vec::new(),
        }
    }

    pub fn ratio_over(mut self, key: &str) -> Self {
        self.ratio_over = Some(key.to_string());
        self
    }

    pub fn enum_keys(mut self, keys: &[&str]) -> Self {
        self.enum_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

/// Registry of option definitions.
#[derive(Debug, Clone, Default)]
pub struct ConfigDef {
    options: HashMap<String, ConfigOptionDef>,
}

impl ConfigDef {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, key: &str, def: ConfigOptionDef) -> &mut Self {
        self.options.insert(key.to_string(), def);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ConfigOptionDef> {
        self.options.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!("missing option '{}'", key))
}

fn wrong_kind(key: &str, want: &str) -> Error {
    Error::Config(format!("option '{}' is not {}", key, want))
}

/// String-keyed option values bound to a [`ConfigDef`].
#[derive(Debug, Clone)]
pub struct DynamicConfig {
    def: Arc<ConfigDef>,
    options: HashMap<String, ConfigOption>,
}

impl DynamicConfig {
    pub fn new(def: Arc<ConfigDef>) -> Self {
        Self {
            def,
            options: HashMap::new(),
        }
    }

    pub fn def(&self) -> &ConfigDef {
        &self.def
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    pub fn has(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    pub fn option(&self, key: &str) -> Option<&ConfigOption> {
        self.options.get(key)
    }

    /// The value for `key`, created from its registered default when
    /// not yet present. Unknown keys are a configuration error.
    pub fn option_create(&mut self, key: &str) -> Result<&mut ConfigOption> {
        if !self.options.contains_key(key) {
            let def = self.def.get(key).ok_or_else(|| missing(key))?;
            self.options.insert(key.to_string(), def.default.clone());
        }
        Ok(self.options.get_mut(key).expect("inserted above"))
    }

    pub fn set(&mut self, key: &str, value: ConfigOption) -> Result<()> {
        let def = self.def.get(key).ok_or_else(|| missing(key))?;
        if def.kind != value.kind() {
            return Err(wrong_kind(key, def.kind.name()));
        }
        self.options.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get_float(&self, key: &str) -> Result<CoordF> {
        match self.option(key) {
            Some(ConfigOption::Float(v)) => Ok(*v),
            Some(ConfigOption::Int(v)) => Ok(*v as CoordF),
            Some(_) => Err(wrong_kind(key, "a number")),
            None => Err(missing(key)),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        match self.option(key) {
            Some(ConfigOption::Int(v)) => Ok(*v),
            Some(_) => Err(wrong_kind(key, "an integer")),
            None => Err(missing(key)),
        }
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        match self.option(key) {
            Some(ConfigOption::Bool(v)) => Ok(*v),
            Some(_) => Err(wrong_kind(key, "a boolean")),
            None => Err(missing(key)),
        }
    }

    /// Resolve a value that may be a percentage of another option.
    ///
    /// Percent values resolve against the option named by their
    /// definition's `ratio_over`; a percent option without one is a
    /// configuration error.
    pub fn get_abs_value(&self, key: &str) -> Result<CoordF> {
        match self.option(key) {
            Some(ConfigOption::Float(v)) => Ok(*v),
            Some(ConfigOption::Int(v)) => Ok(*v as CoordF),
            Some(ConfigOption::Percent(p)) => self.resolve_ratio(key, *p),
            Some(ConfigOption::FloatOrPercent { value, percent }) => {
                if *percent {
                    self.resolve_ratio(key, *value)
                } else {
                    Ok(*value)
                }
            }
            Some(_) => Err(wrong_kind(key, "a number or percentage")),
            None => Err(missing(key)),
        }
    }

    fn resolve_ratio(&self, key: &str, percent: CoordF) -> Result<CoordF> {
        let over = self
            .def
            .get(key)
            .and_then(|d| d.ratio_over.as_deref())
            .ok_or_else(|| {
                Error::Config(format!("option '{}' has no ratio_over reference", key))
            })?;
        Ok(self.get_abs_value(over)? * percent / 100.0)
    }

    pub fn serialize(&self, key: &str) -> Option<String> {
        self.option(key).map(ConfigOption::serialize)
    }

    /// Parse a string value into the option for `key`, creating it
    /// from the default first when absent.
    pub fn set_deserialize(&mut self, key: &str, value: &str) -> Result<()> {
        let enum_keys = self
            .def
            .get(key)
            .map(|d| d.enum_keys.clone())
            .unwrap_or_default();
        let option = self.option_create(key)?;
        option.deserialize(value).map_err(|e| {
            Error::Config(format!("option '{}': {}", key, e))
        })?;
        if let ConfigOption::Enum(v) = option {
            if !enum_keys.is_empty() && !enum_keys.contains(v) {
                return Err(Error::Config(format!(
                    "option '{}': '{}' is not one of {:?}",
                    key, v, enum_keys
                )));
            }
        }
        Ok(())
    }

    /// Serialize the option map (not the definition) to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(&self.options).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load options from a JSON object produced by [`Self::to_json`].
    /// Every key must be known to this config's definition.
    pub fn load_json(&mut self, json: &str) -> Result<()> {
        let parsed: HashMap<String, ConfigOption> =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        for (key, value) in parsed {
            self.set(&key, value)?;
        }
        Ok(())
    }

    /// Copy every option present in `other` into this config.
    ///
    /// Keys unknown to this config's definition are an error unless
    /// `ignore_nonexistent` is set. Values travel through their string
    /// form, so the two configs need not share definition instances.
    pub fn apply(&mut self, other: &DynamicConfig, ignore_nonexistent: bool) -> Result<()> {
        let mut keys: Vec<&str> = other.keys().collect();
        keys.sort_unstable();
        for key in keys {
            if !self.def.has(key) {
                if ignore_nonexistent {
                    continue;
                }
                return Err(missing(key));
            }
            let serialized = other.serialize(key).expect("key came from other");
            self.set_deserialize(key, &serialized)?;
        }
        Ok(())
    }
}

/// Definition registry for the support lattice options.
pub fn support_config_def() -> Arc<ConfigDef> {
    let defaults = SupportConfig::default();
    let mut def = ConfigDef::new();
    def.define(
        "object_elevation_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.object_elevation_mm)),
    )
    .define(
        "base_height_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.base_height_mm)),
    )
    .define(
        "head_penetration_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.head_penetration_mm)),
    )
    .define(
        "head_front_radius_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.head_front_radius_mm)),
    )
    .define(
        "max_solo_pillar_height_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.max_solo_pillar_height_mm)),
    )
    .define(
        "max_dual_pillar_height_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.max_dual_pillar_height_mm)),
    )
    .define(
        "pillar_cascade_neighbors",
        ConfigOptionDef::new(ConfigOption::Int(defaults.pillar_cascade_neighbors as i64)),
    )
    .define(
        "max_bridges_on_pillar",
        ConfigOptionDef::new(ConfigOption::Int(defaults.max_bridges_on_pillar as i64)),
    )
    .define(
        "bridge_slope",
        ConfigOptionDef::new(ConfigOption::Float(defaults.bridge_slope)),
    )
    .define(
        "max_bridge_length_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.max_bridge_length_mm)),
    )
    .define(
        "max_pillar_link_distance_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.max_pillar_link_distance_mm)),
    );
    Arc::new(def)
}

/// Definition registry for the pad options.
pub fn pad_config_def() -> Arc<ConfigDef> {
    let defaults = PadConfig::default();
    let mut def = ConfigDef::new();
    def.define(
        "pad_thickness_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.thickness_mm)),
    )
    .define(
        "pad_wall_height_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.wall_height_mm)),
    )
    .define(
        "pad_wall_thickness_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.wall_thickness_mm)),
    )
    .define(
        "pad_brim_size_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.brim_size_mm)),
    )
    .define(
        "pad_max_merge_distance_mm",
        ConfigOptionDef::new(ConfigOption::Float(defaults.max_merge_distance_mm)),
    )
    .define(
        "pad_around_object",
        ConfigOptionDef::new(ConfigOption::Bool(defaults.embed.enabled)),
    )
    .define(
        "pad_around_object_everywhere",
        ConfigOptionDef::new(ConfigOption::Bool(defaults.embed.everywhere)),
    );
    Arc::new(def)
}

impl SupportConfig {
    /// Read a [`SupportConfig`] out of a dynamic option store; every
    /// option must be present.
    pub fn from_config(config: &DynamicConfig) -> Result<Self> {
        Ok(Self {
            object_elevation_mm: config.get_float("object_elevation_mm")?,
            base_height_mm: config.get_float("base_height_mm")?,
            head_penetration_mm: config.get_float("head_penetration_mm")?,
            head_front_radius_mm: config.get_float("head_front_radius_mm")?,
            max_solo_pillar_height_mm: config.get_float("max_solo_pillar_height_mm")?,
            max_dual_pillar_height_mm: config.get_float("max_dual_pillar_height_mm")?,
            pillar_cascade_neighbors: config.get_int("pillar_cascade_neighbors")? as u32,
            max_bridges_on_pillar: config.get_int("max_bridges_on_pillar")? as u32,
            bridge_slope: config.get_float("bridge_slope")?,
            max_bridge_length_mm: config.get_float("max_bridge_length_mm")?,
            max_pillar_link_distance_mm: config.get_float("max_pillar_link_distance_mm")?,
        })
    }
}

impl PadConfig {
    /// Read a [`PadConfig`] out of a dynamic option store.
    pub fn from_config(config: &DynamicConfig) -> Result<Self> {
        Ok(Self {
            thickness_mm: config.get_float("pad_thickness_mm")?,
            wall_height_mm: config.get_float("pad_wall_height_mm")?,
            wall_thickness_mm: config.get_float("pad_wall_thickness_mm")?,
            brim_size_mm: config.get_float("pad_brim_size_mm")?,
            max_merge_distance_mm: config.get_float("pad_max_merge_distance_mm")?,
            embed: EmbedObject {
                enabled: config.get_bool("pad_around_object")?,
                everywhere: config.get_bool("pad_around_object_everywhere")?,
            },
        })
    }
}

/// A config with every defined option present at its default value.
pub fn with_defaults(def: Arc<ConfigDef>) -> DynamicConfig {
    let keys: Vec<String> = def.keys().map(str::to_string).collect();
    let mut config = DynamicConfig::new(def);
    for key in keys {
        // Keys come from the definition itself.
        let _ = config.option_create(&key);
    }
    config
}
