//! Registrable processing units and their declarative metadata.
//!
//! Every discovered plugin becomes one unit, named after its URI: a filter
//! when it takes audio input, a producer otherwise.  A generic `lv2` filter
//! binds whatever its configuration names.

use std::sync::Arc;

use serde::Serialize;

use crate::error::RackError;
use crate::filter::{FilterSlot, SlotKind};
use crate::plugin::classify::{bounds, default_value};
use crate::plugin::{InstanceManager, PluginDescriptor, PluginRegistry, PortDescriptor};
use crate::properties::{DEFAULT_SAMPLE_RATE, INSTANCES_KEY, SlotConfig, WETNESS_KEY};

/// Identifier of the generic unit.
pub const GENERIC_ID: &str = "lv2";

const PREFIX: &str = "lv2.";

/// `lv2.` followed by the URI with every `:` replaced by `<`.
pub fn service_id(uri: &str) -> String {
    format!("{}{}", PREFIX, uri.replace(':', "<"))
}

/// The plugin URI behind a per-plugin identifier.
pub fn uri_from_service_id(id: &str) -> Option<String> {
    id.strip_prefix(PREFIX).map(|rest| rest.replace('<', ":"))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceEntry {
    pub kind: ServiceKind,
    pub id: String,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Filter,
    Producer,
}

impl From<ServiceKind> for SlotKind {
    fn from(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::Filter => SlotKind::Filter,
            ServiceKind::Producer => SlotKind::Producer,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    Integer,
    Float,
    Boolean,
    String,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ParameterMeta {
    pub identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: ParameterType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub mutable: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub animation: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub readonly: bool,
}

impl ParameterMeta {
    fn new(identifier: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            identifier: identifier.into(),
            title: None,
            description: None,
            kind,
            default: None,
            minimum: None,
            maximum: None,
            scale: None,
            mutable: false,
            animation: false,
            readonly: false,
        }
    }

    /// Entry for a control or status port.
    fn for_port(identifier: String, port: &PortDescriptor, sample_rate: f32) -> Self {
        let hints = &port.hints;
        let default = default_value(hints, sample_rate) as f64;
        let (lower, upper) = bounds(hints, sample_rate);
        let (lower, upper) = (lower.map(f64::from), upper.map(f64::from));

        let mut meta = if hints.integer {
            let mut m = Self::new(identifier, ParameterType::Integer);
            m.default = Some(default.trunc());
            m.minimum = lower.map(f64::trunc);
            m.maximum = upper.map(f64::trunc);
            m
        } else if hints.toggled {
            let mut m = Self::new(identifier, ParameterType::Boolean);
            m.default = Some(if default > 0.0 { 1.0 } else { 0.0 });
            m
        } else {
            let mut m = Self::new(identifier, ParameterType::Float);
            m.default = Some(default);
            m.minimum = lower;
            m.maximum = upper;
            m
        };

        meta.title = Some(port.name.clone());
        if hints.logarithmic {
            meta.scale = Some("log".to_string());
        }
        meta.mutable = true;
        meta.animation = true;
        meta
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ServiceMetadata {
    pub identifier: String,
    pub title: String,
    pub creator: String,
    pub description: String,
    pub parameters: Vec<ParameterMeta>,
}

/// Builds units and describes them.
pub struct ServiceFactory {
    registry: Arc<PluginRegistry>,
    instances: Arc<InstanceManager>,
    /// Rate used for sample-rate-relative defaults in metadata.
    sample_rate: f64,
}

impl ServiceFactory {
    pub fn new(registry: Arc<PluginRegistry>, instances: Arc<InstanceManager>) -> Self {
        Self {
            registry,
            instances,
            sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: f64) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Every unit this factory can build.
    pub fn services(&self) -> Vec<ServiceEntry> {
        let mut out: Vec<ServiceEntry> = self
            .registry
            .plugins()
            .iter()
            .map(|desc| ServiceEntry {
                kind: if desc.has_input {
                    ServiceKind::Filter
                } else {
                    ServiceKind::Producer
                },
                id: service_id(&desc.uri),
            })
            .collect();
        out.push(ServiceEntry {
            kind: ServiceKind::Filter,
            id: GENERIC_ID.to_string(),
        });
        out
    }

    /// Build a unit.  For the generic unit `arg` names a rack preset; for
    /// a per-plugin unit it optionally does, and takes precedence over the
    /// plugin itself.
    pub fn create(
        &self,
        kind: ServiceKind,
        id: &str,
        arg: Option<&str>,
    ) -> Result<FilterSlot, RackError> {
        let mut config = SlotConfig {
            resource: arg.map(Into::into),
            sample_rate: self.sample_rate,
            ..Default::default()
        };

        if let Some(uri) = uri_from_service_id(id) {
            if self.registry.find(&uri).is_none() {
                return Err(RackError::DescriptorNotFound { uri });
            }
            config.plugin_id = Some(uri);
        } else if id != GENERIC_ID {
            return Err(RackError::DescriptorNotFound { uri: id.to_string() });
        }

        Ok(self.create_from_config(kind, config))
    }

    /// Build a unit bound to whatever `config` names.
    pub fn create_from_config(&self, kind: ServiceKind, config: SlotConfig) -> FilterSlot {
        FilterSlot::new(
            kind.into(),
            config,
            Arc::clone(&self.registry),
            Arc::clone(&self.instances),
        )
    }

    pub fn metadata(&self, kind: ServiceKind, id: &str) -> Option<ServiceMetadata> {
        if id == GENERIC_ID {
            return Some(self.generic_metadata());
        }
        let uri = uri_from_service_id(id)?;
        let desc = self.registry.find(&uri)?;
        Some(self.plugin_metadata(kind, id, desc))
    }

    fn plugin_metadata(
        &self,
        kind: ServiceKind,
        id: &str,
        desc: &PluginDescriptor,
    ) -> ServiceMetadata {
        let rate = self.sample_rate as f32;
        let mut parameters = Vec::new();

        for &index in &desc.control_port_indices {
            if let Some(port) = desc.port(index) {
                parameters.push(ParameterMeta::for_port(index.to_string(), port, rate));
            }
        }
        for &index in &desc.status_port_indices {
            if let Some(port) = desc.port(index) {
                let mut meta = ParameterMeta::for_port(format!("{}[*]", index), port, rate);
                meta.readonly = true;
                parameters.push(meta);
            }
        }

        let mut instances = ParameterMeta::new(INSTANCES_KEY, ParameterType::Integer);
        instances.title = Some("Instances".to_string());
        instances.description = Some(
            "The number of instances of the plugin in use; one per group of channels \
             the plugin covers. Status parameters are reported per instance as \
             <port>[<instance>], e.g. 9[0] for status port 9 of the first instance."
                .to_string(),
        );
        instances.readonly = true;
        parameters.push(instances);

        if kind == ServiceKind::Filter {
            let mut wetness = ParameterMeta::new(WETNESS_KEY, ParameterType::Float);
            wetness.title = Some("Wet/Dry".to_string());
            wetness.default = Some(1.0);
            wetness.minimum = Some(0.0);
            wetness.maximum = Some(1.0);
            wetness.mutable = true;
            wetness.animation = true;
            parameters.push(wetness);
        }

        ServiceMetadata {
            identifier: id.to_string(),
            title: desc.name.clone(),
            creator: desc.maker.clone().unwrap_or_else(|| "unknown".to_string()),
            description: "LV2 plugin".to_string(),
            parameters,
        }
    }

    fn generic_metadata(&self) -> ServiceMetadata {
        let mut resource = ParameterMeta::new("resource", ParameterType::String);
        resource.title = Some("Rack preset".to_string());
        resource.description = Some("Path of a JSON rack preset to load.".to_string());

        ServiceMetadata {
            identifier: GENERIC_ID.to_string(),
            title: "LV2 rack".to_string(),
            creator: "unknown".to_string(),
            description: "Runs a chain of LV2 plugins loaded from a rack preset.".to_string(),
            parameters: vec![resource],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::backend::mock::{MockBackend, MockEffect};
    use crate::plugin::classify::classify;
    use crate::plugin::{DefaultHint, RangeHints, RawPort};

    fn factory() -> ServiceFactory {
        let eq = classify(
            "http://example.org/eq:stereo",
            "EQ",
            Some("Example Audio".into()),
            vec![
                RawPort::audio_input("In"),
                RawPort::audio_output("Out"),
                RawPort::control_input(
                    "Bands",
                    RangeHints {
                        lower: Some(1.0),
                        upper: Some(8.7),
                        default: DefaultHint::Value(4.6),
                        integer: true,
                        ..Default::default()
                    },
                ),
                RawPort::control_input(
                    "Bypass",
                    RangeHints {
                        default: DefaultHint::One,
                        toggled: true,
                        ..Default::default()
                    },
                ),
                RawPort::control_input(
                    "Freq",
                    RangeHints {
                        lower: Some(20.0),
                        upper: Some(20000.0),
                        default: DefaultHint::FourForty,
                        logarithmic: true,
                        ..Default::default()
                    },
                ),
                RawPort::control_output("Level", RangeHints::default()),
            ],
        );
        let tone = classify(
            "urn:tone",
            "Tone",
            None,
            vec![RawPort::audio_output("Out")],
        );
        let registry = Arc::new(PluginRegistry::new(vec![eq, tone]));
        let manager = Arc::new(InstanceManager::new(Arc::new(MockBackend::new(
            MockEffect::Identity,
        ))));
        ServiceFactory::new(registry, manager)
    }

    #[test]
    fn test_service_id_round_trip() {
        let id = service_id("http://example.org/eq:stereo");
        assert_eq!(id, "lv2.http<//example.org/eq<stereo");
        assert_eq!(
            uri_from_service_id(&id).as_deref(),
            Some("http://example.org/eq:stereo")
        );
        assert_eq!(uri_from_service_id("volume"), None);
    }

    #[test]
    fn test_services_split_filters_and_producers() {
        let services = factory().services();
        assert_eq!(
            services,
            vec![
                ServiceEntry {
                    kind: ServiceKind::Filter,
                    id: "lv2.http<//example.org/eq<stereo".into(),
                },
                ServiceEntry {
                    kind: ServiceKind::Producer,
                    id: "lv2.urn<tone".into(),
                },
                ServiceEntry {
                    kind: ServiceKind::Filter,
                    id: GENERIC_ID.into(),
                },
            ]
        );
    }

    #[test]
    fn test_create_binds_plugin_id() {
        let f = factory();
        let slot = f
            .create(ServiceKind::Filter, "lv2.http<//example.org/eq<stereo", None)
            .unwrap();
        assert_eq!(
            slot.config().plugin_id.as_deref(),
            Some("http://example.org/eq:stereo")
        );
        assert_eq!(slot.kind(), SlotKind::Filter);

        let generic = f
            .create(ServiceKind::Filter, GENERIC_ID, Some("/tmp/rack.json"))
            .unwrap();
        assert!(generic.config().plugin_id.is_none());
        assert!(generic.config().resource.is_some());
    }

    #[test]
    fn test_create_unknown_plugin() {
        let err = factory()
            .create(ServiceKind::Filter, "lv2.urn<missing", None)
            .err()
            .unwrap();
        assert!(matches!(err, RackError::DescriptorNotFound { uri } if uri == "urn:missing"));
    }

    #[test]
    fn test_filter_metadata() {
        let meta = factory()
            .metadata(ServiceKind::Filter, "lv2.http<//example.org/eq<stereo")
            .unwrap();
        assert_eq!(meta.title, "EQ");
        assert_eq!(meta.creator, "Example Audio");

        let ids: Vec<_> = meta.parameters.iter().map(|p| p.identifier.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "4", "5[*]", "instances", "wetness"]);

        let bands = &meta.parameters[0];
        assert_eq!(bands.kind, ParameterType::Integer);
        assert_eq!(bands.default, Some(4.0));
        assert_eq!(bands.maximum, Some(8.0));

        let bypass = &meta.parameters[1];
        assert_eq!(bypass.kind, ParameterType::Boolean);
        assert_eq!(bypass.default, Some(1.0));

        let freq = &meta.parameters[2];
        assert_eq!(freq.kind, ParameterType::Float);
        assert_eq!(freq.scale.as_deref(), Some("log"));
        assert_eq!(freq.default, Some(440.0));
        assert!(freq.mutable && freq.animation && !freq.readonly);

        assert!(meta.parameters[3].readonly);
        assert!(meta.parameters[4].readonly);
        assert_eq!(meta.parameters[5].default, Some(1.0));
    }

    #[test]
    fn test_producer_metadata_has_no_wetness() {
        let meta = factory()
            .metadata(ServiceKind::Producer, "lv2.urn<tone")
            .unwrap();
        assert_eq!(meta.creator, "unknown");
        assert!(meta.parameters.iter().all(|p| p.identifier != WETNESS_KEY));
        assert_eq!(meta.parameters.last().unwrap().identifier, INSTANCES_KEY);
    }

    #[test]
    fn test_metadata_serializes_type_field() {
        let meta = factory().metadata(ServiceKind::Filter, GENERIC_ID).unwrap();
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["parameters"][0]["type"], "string");
        assert!(json["parameters"][0].get("readonly").is_none());
        assert!(factory().metadata(ServiceKind::Filter, "lv2.urn<nope").is_none());
    }
}
