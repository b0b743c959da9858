#![cfg(feature = "serde")]

use std::collections::BTreeMap;

use crawl_bt::{BtStatus, Branch, Cursor, LeafHandler, LeafRegistry, NodeId, TreeDef, TreeError};

#[derive(Debug, Clone, PartialEq)]
enum Leaf {
    FearAbove(f32),
    Flee,
    Wander,
}

struct Registry;

impl LeafRegistry<Leaf> for Registry {
    fn leaf(&self, name: &str, params: &BTreeMap<String, f32>) -> Result<Leaf, TreeError> {
        match name {
            "fear_above" => params
                .get("threshold")
                .copied()
                .map(Leaf::FearAbove)
                .ok_or_else(|| TreeError::BadLeafParams {
                    leaf: name.into(),
                    detail: "missing threshold".into(),
                }),
            "flee" => Ok(Leaf::Flee),
            "wander" => Ok(Leaf::Wander),
            other => Err(TreeError::UnknownLeaf(other.into())),
        }
    }

    fn key(&self, _name: &str) -> Option<u64> {
        None
    }
}

const PRESET: &str = r#"
name: coward
root:
  selector:
    reactive: true
    children:
      - sequence:
          branch: survive
          children:
            - leaf: { name: fear_above, params: { threshold: 0.8 } }
            - leaf: { name: flee }
      - decorator:
          decorator: { time_limit: { ticks: 5 } }
          branch: explore
          child:
            leaf: { name: wander }
"#;

fn parse(yaml: &str) -> TreeDef {
    serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(yaml))
        .expect("yaml")
}

struct Fear(f32);

impl LeafHandler<Leaf> for Fear {
    fn tick(&mut self, _node: NodeId, leaf: &Leaf) -> BtStatus {
        match leaf {
            Leaf::FearAbove(t) if self.0 > *t => BtStatus::Success,
            Leaf::FearAbove(_) => BtStatus::Failure,
            Leaf::Flee | Leaf::Wander => BtStatus::Running,
        }
    }

    fn cancel(&mut self, _node: NodeId, _leaf: &Leaf) {}
}

#[test]
fn yaml_preset_compiles_and_runs() {
    let def: TreeDef = parse(PRESET);
    let tree = def.compile_preset(&Registry).expect("preset");
    assert_eq!(tree.name(), "coward");

    let mut cursor = Cursor::new();
    let r = tree.tick(&mut cursor, &mut Fear(0.2), 0);
    assert_eq!(r.branch, Some(Branch::Explore));
    let r = tree.tick(&mut cursor, &mut Fear(0.9), 1);
    assert_eq!(r.branch, Some(Branch::Survive));
    assert_eq!(tree.leaf(cursor.running().expect("running")), Some(&Leaf::Flee));
}

#[test]
fn missing_leaf_params_are_reported() {
    let yaml = PRESET.replace("params: { threshold: 0.8 }", "params: {}");
    let def: TreeDef = parse(&yaml);
    assert!(matches!(
        def.compile_preset(&Registry),
        Err(TreeError::BadLeafParams { .. })
    ));
}

#[test]
fn cursor_roundtrips_and_tolerates_missing_fields() {
    let def: TreeDef = parse(PRESET);
    let tree = def.compile_preset(&Registry).expect("preset");
    let mut cursor = Cursor::new();
    tree.tick(&mut cursor, &mut Fear(0.0), 3);

    let json = serde_json::to_string(&cursor).expect("serialize");
    let back: Cursor = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back, cursor);

    let sparse: Cursor = serde_json::from_str(r#"{"path":[]}"#).expect("defaults");
    assert!(sparse.is_idle());
}
