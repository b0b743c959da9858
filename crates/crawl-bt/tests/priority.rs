use std::collections::BTreeMap;

use crawl_bt::{Branch, NodeDef, LeafRegistry, TreeBuilder, TreeDef, TreeError};

struct Names;

impl LeafRegistry<String> for Names {
    fn leaf(&self, name: &str, _params: &BTreeMap<String, f32>) -> Result<String, TreeError> {
        match name {
            "flee" | "attack" | "wander" | "wait" | "hurt" => Ok(name.to_string()),
            other => Err(TreeError::UnknownLeaf(other.to_string())),
        }
    }

    fn key(&self, name: &str) -> Option<u64> {
        (name == "enemy").then_some(1)
    }
}

fn leaf(name: &str, branch: Option<Branch>) -> NodeDef {
    NodeDef::Leaf {
        name: name.to_string(),
        params: BTreeMap::new(),
        branch,
    }
}

fn root(reactive: bool, children: Vec<NodeDef>) -> TreeDef {
    TreeDef {
        name: "t".to_string(),
        root: NodeDef::Selector {
            reactive,
            branch: None,
            children,
        },
    }
}

#[test]
fn well_ordered_preset_compiles() {
    let def = root(
        true,
        vec![
            leaf("flee", Some(Branch::Survive)),
            leaf("attack", Some(Branch::Attack)),
            leaf("attack", Some(Branch::Attack)),
            leaf("wander", Some(Branch::Explore)),
            leaf("wait", Some(Branch::Idle)),
        ],
    );
    let tree = def.compile_preset::<String, _>(&Names).expect("ordered");
    assert_eq!(tree.len(), 6);
    assert_eq!(tree.branch(tree.root()), None);
}

#[test]
fn out_of_order_branches_are_rejected() {
    let def = root(
        true,
        vec![
            leaf("wander", Some(Branch::Explore)),
            leaf("attack", Some(Branch::Attack)),
        ],
    );
    assert_eq!(
        def.compile_preset::<String, _>(&Names).unwrap_err(),
        TreeError::PriorityOrder {
            earlier: Branch::Explore,
            later: Branch::Attack
        }
    );
    // Plain compilation does not enforce the contract.
    assert!(def.compile::<String, _>(&Names).is_ok());
}

#[test]
fn root_must_be_reactive_and_children_labelled() {
    let def = root(false, vec![leaf("flee", Some(Branch::Survive))]);
    assert_eq!(
        def.compile_preset::<String, _>(&Names).unwrap_err(),
        TreeError::RootNotPrioritySelector
    );

    let def = root(true, vec![leaf("flee", Some(Branch::Survive)), leaf("wait", None)]);
    assert_eq!(
        def.compile_preset::<String, _>(&Names).unwrap_err(),
        TreeError::UnlabelledBranch { index: 1 }
    );
}

#[test]
fn unknown_names_are_data_errors() {
    let def = root(true, vec![leaf("teleport_home", Some(Branch::Survive))]);
    let err = def.compile_preset::<String, _>(&Names).unwrap_err();
    assert_eq!(err, TreeError::UnknownLeaf("teleport_home".into()));

    let sim: crawl_core::SimError = err.into();
    assert!(matches!(sim, crawl_core::SimError::DataIntegrity { .. }));

    let def = TreeDef {
        name: "k".into(),
        root: NodeDef::Decorator {
            decorator: crawl_bt::DecoratorDef::WithBlackboardKey {
                key: "treasure".into(),
            },
            branch: None,
            child: Box::new(leaf("wander", None)),
        },
    };
    assert_eq!(
        def.compile::<String, _>(&Names).unwrap_err(),
        TreeError::UnknownKey("treasure".into())
    );
}

#[test]
fn empty_composites_are_rejected() {
    let def = root(true, vec![]);
    assert_eq!(
        def.compile::<String, _>(&Names).unwrap_err(),
        TreeError::EmptyComposite("selector")
    );

    let mut b = TreeBuilder::<String>::new("empty");
    let seq = b.sequence(vec![]);
    assert_eq!(b.build(seq).unwrap_err(), TreeError::EmptyComposite("sequence"));
}

#[test]
fn builder_refuses_cycles() {
    let mut b = TreeBuilder::<String>::new("loop");
    let wait = b.leaf("wait".to_string());
    // Points at itself.
    let selfish = b.selector(vec![wait, crawl_bt::NodeId(1)]);
    assert_eq!(
        b.build(selfish).err(),
        Some(TreeError::ForwardChild { node: 1, child: 1 })
    );

    let mut b = TreeBuilder::<String>::new("ahead");
    let early = b.sequence(vec![crawl_bt::NodeId(1)]);
    b.leaf("wait".to_string());
    assert_eq!(
        b.build(early).err(),
        Some(TreeError::ForwardChild { node: 0, child: 1 })
    );
}
