use planar_kernel::{DebugProbe, EngineState, SceneRegistry};
use serde_json::Value;

const MISSING: &str = "<missing>";

/// One probe resolved to display text.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeReading {
    pub name: String,
    pub value: String,
}

/// Resolve every visible probe against the scene.
pub fn read_probes(state: &EngineState) -> Vec<ProbeReading> {
    state
        .debug()
        .probes
        .iter()
        .filter(|p| p.is_visible())
        .map(|p| read_probe(state.scene(), p))
        .collect()
}

pub fn read_probe(scene: &SceneRegistry, probe: &DebugProbe) -> ProbeReading {
    let value = scene
        .get(probe.target)
        .and_then(|object| serde_json::to_value(object).ok())
        .and_then(|root| walk(&root, &probe.path).map(format_value))
        .unwrap_or_else(|| MISSING.to_string());
    ProbeReading {
        name: probe.name.clone(),
        value,
    }
}

fn walk<'a>(root: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(root, |node, key| match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => items.get(key.parse::<usize>().ok()?),
        _ => None,
    })
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Array(items) if items.len() == 2 => match (items[0].as_f64(), items[1].as_f64()) {
            (Some(x), Some(y)) => format!("({x:.2}, {y:.2})"),
            _ => value.to_string(),
        },
        Value::Number(n) => match n.as_f64() {
            Some(v) if n.is_f64() => format!("{v:.2}"),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use planar_common::{EntityId, Vec2};
    use planar_kernel::SceneObject;

    fn scene_with(object: SceneObject) -> SceneRegistry {
        let mut scene = SceneRegistry::new();
        scene.add(object, 2).unwrap();
        scene
    }

    #[test]
    fn vectors_render_as_pairs() {
        let object = SceneObject::new("ball", Vec2::new(1.0, 2.5));
        let probe = DebugProbe::new("pos", object.entity, ["position"]);
        let reading = read_probe(&scene_with(object), &probe);
        assert_eq!(reading.value, "(1.00, 2.50)");
    }

    #[test]
    fn paths_index_into_arrays_and_fields() {
        let object = SceneObject::new("ball", Vec2::new(1.0, 2.5));
        let scene = scene_with(object.clone());
        let x = DebugProbe::new("x", object.entity, ["position", "0"]);
        assert_eq!(read_probe(&scene, &x).value, "1.00");
        let layer = DebugProbe::new("layer", object.entity, ["layer"]);
        assert_eq!(read_probe(&scene, &layer).value, "2");
        let name = DebugProbe::new("name", object.entity, ["name"]);
        assert_eq!(read_probe(&scene, &name).value, "ball");
    }

    #[test]
    fn missing_targets_and_paths_are_marked() {
        let object = SceneObject::new("ball", Vec2::ZERO);
        let scene = scene_with(object.clone());
        let bad_path = DebugProbe::new("nope", object.entity, ["mood"]);
        assert_eq!(read_probe(&scene, &bad_path).value, MISSING);
        let gone = DebugProbe::new("gone", EntityId::new(), ["name"]);
        assert_eq!(read_probe(&scene, &gone).value, MISSING);
    }
}
