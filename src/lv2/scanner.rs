use lilv::World;

use super::urid::PROVIDED_FEATURES;
use crate::plugin::classify::classify;
use crate::plugin::{DefaultHint, PluginDescriptor, RangeHints, RawPort};

const LV2_CORE: &str = "http://lv2plug.in/ns/lv2core#";
const PORT_PROPS: &str = "http://lv2plug.in/ns/ext/port-props#";

pub fn scan_plugins() -> Vec<PluginDescriptor> {
    let world = World::with_load_all();
    scan_plugins_with_world(&world)
}

/// `Some(v)` unless lilv reported the bound as unset (NaN).
fn declared(v: f32) -> Option<f32> {
    (!v.is_nan()).then_some(v)
}

pub fn scan_plugins_with_world(world: &World) -> Vec<PluginDescriptor> {
    let input_class = world.new_uri(&format!("{LV2_CORE}InputPort"));
    let output_class = world.new_uri(&format!("{LV2_CORE}OutputPort"));
    let audio_class = world.new_uri(&format!("{LV2_CORE}AudioPort"));
    let control_class = world.new_uri(&format!("{LV2_CORE}ControlPort"));
    let atom_class = world.new_uri("http://lv2plug.in/ns/ext/atom#AtomPort");

    let integer_prop = world.new_uri(&format!("{LV2_CORE}integer"));
    let toggled_prop = world.new_uri(&format!("{LV2_CORE}toggled"));
    let sample_rate_prop = world.new_uri(&format!("{LV2_CORE}sampleRate"));
    let logarithmic_prop = world.new_uri(&format!("{PORT_PROPS}logarithmic"));

    let mut plugins = Vec::new();

    for plugin in world.plugins().iter() {
        if !plugin.verify() {
            continue;
        }

        let uri = match plugin.uri().as_uri() {
            Some(u) => u.to_string(),
            None => continue,
        };

        let name = match plugin.name().as_str() {
            Some(n) => n.to_string(),
            None => continue,
        };

        let unsupported: Vec<String> = plugin
            .required_features()
            .iter()
            .filter_map(|n| n.as_uri().map(String::from))
            .filter(|req| !PROVIDED_FEATURES.contains(&req.as_str()))
            .collect();
        if !unsupported.is_empty() {
            log::debug!(
                "LV2: Skipping {}: requires unsupported features {:?}",
                uri,
                unsupported
            );
            continue;
        }

        let maker = plugin
            .author_name()
            .and_then(|n| n.as_str().map(String::from));

        let mut ports = Vec::new();
        let mut complete = true;

        for (i, range) in plugin.port_ranges_float().iter().enumerate() {
            let Some(port) = plugin.port_by_index(i) else {
                complete = false;
                break;
            };

            let symbol = port
                .symbol()
                .and_then(|s| s.as_str().map(String::from))
                .unwrap_or_else(|| format!("port_{}", i));

            let name = port
                .name()
                .and_then(|n| n.as_str().map(String::from))
                .unwrap_or_else(|| symbol.clone());

            let hints = RangeHints {
                lower: declared(range.min),
                upper: declared(range.max),
                default: declared(range.default).map_or(DefaultHint::None, DefaultHint::Value),
                logarithmic: port.has_property(&logarithmic_prop),
                sample_rate: port.has_property(&sample_rate_prop),
                integer: port.has_property(&integer_prop),
                toggled: port.has_property(&toggled_prop),
            };

            ports.push(RawPort {
                symbol,
                name,
                is_audio: port.is_a(&audio_class),
                is_control: port.is_a(&control_class),
                is_atom: port.is_a(&atom_class),
                is_input: port.is_a(&input_class),
                is_output: port.is_a(&output_class),
                hints,
            });
        }

        if !complete {
            log::warn!("LV2: Skipping {}: port list could not be read", uri);
            continue;
        }

        let desc = classify(uri, name, maker, ports);
        if !desc.is_hostable() {
            log::debug!(
                "LV2: Skipping {}: unsupported port types at {:?}",
                desc.uri,
                desc.unsupported_port_indices
            );
            continue;
        }
        plugins.push(desc);
    }

    log::info!("LV2: Found {} plugins", plugins.len());
    plugins
}
