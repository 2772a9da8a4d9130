//! Delta engine implementation.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use rayon::prelude::*;

use super::apply::apply_tree;
use super::edit::apply_edit;
use super::delta::{Anchor, CollectionSnapshot, Delta, DeltaNode, DeltaTree, Operation};
use super::order::stable_set;
use crate::config::AppConfig;
use crate::error::{DeltaError, ErrorContext, Result};
use crate::orderless::OrderlessTable;
use crate::schema::{NodeKind, SchemaId, SchemaModel, SchemaNode};
use crate::tree::xml::{self, Element};
use crate::tree::{Comparison, ConfigTree, DataNode, EntryIdentity};

/// Computes, applies and negates deltas between trees of one schema.
///
/// The engine holds no per-diff state; one instance can serve any number of
/// threads.
#[derive(Debug, Clone)]
pub struct DeltaEngine {
    schema: Arc<SchemaModel>,
    unordered: HashSet<SchemaId>,
    normalize_defaults: bool,
}

impl DeltaEngine {
    /// Create an engine with default settings and no orderless overrides.
    #[must_use]
    pub fn new(schema: Arc<SchemaModel>) -> Self {
        Self {
            schema,
            unordered: HashSet::new(),
            normalize_defaults: true,
        }
    }

    /// Build an engine from configuration, loading its orderless tables.
    pub fn from_config(schema: Arc<SchemaModel>, config: &AppConfig) -> Result<Self> {
        let table = config.orderless.load_table()?;
        Ok(Self::new(schema)
            .with_orderless(&table)
            .with_default_normalization(config.diff.normalize_defaults))
    }

    /// Treat user-ordered collections listed in `table` as unordered.
    #[must_use]
    pub fn with_orderless(mut self, table: &OrderlessTable) -> Self {
        for node in self.schema.nodes() {
            if node.is_user_ordered() && table.contains(node.data_path()) {
                tracing::debug!(path = node.data_path(), "ignoring order of collection");
                self.unordered.insert(node.id());
            }
        }
        self
    }

    /// Whether a leaf equal to its schema default counts as absent (default: true).
    #[must_use]
    pub const fn with_default_normalization(mut self, enabled: bool) -> Self {
        self.normalize_defaults = enabled;
        self
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<SchemaModel> {
        &self.schema
    }

    /// Whether the user-ordered collection `id` is overridden as orderless.
    #[must_use]
    pub fn is_orderless(&self, id: SchemaId) -> bool {
        self.unordered.contains(&id)
    }

    fn comparison(&self) -> Comparison<'_> {
        Comparison {
            schema: &self.schema,
            unordered: Some(&self.unordered),
            normalize_defaults: self.normalize_defaults,
        }
    }

    fn check_tree(&self, tree: &ConfigTree, role: &str) -> Result<()> {
        if tree.shares_schema(&self.schema) {
            Ok(())
        } else {
            Err(DeltaError::schema_mismatch(
                "/",
                format!("{role} tree was built against a different schema model"),
            ))
        }
    }

    /// Compute the transition from `before` to `after`.
    pub fn diff(&self, before: &ConfigTree, after: &ConfigTree) -> Result<Delta> {
        self.check_tree(before, "source")?;
        self.check_tree(after, "target")?;

        let walker = Walker {
            cmp: self.comparison(),
        };
        let (forward, inverse) = rayon::join(
            || walker.tree(before.roots(), after.roots()),
            || walker.tree(after.roots(), before.roots()),
        );
        let delta = Delta {
            schema: Arc::clone(&self.schema),
            forward,
            inverse,
        };

        let summary = delta.summary();
        tracing::info!(
            creates = summary.creates,
            deletes = summary.deletes,
            replaces = summary.replaces,
            reorders = summary.reorders,
            "computed delta"
        );
        Ok(delta)
    }

    /// Diff independent tree pairs in parallel.
    #[must_use]
    pub fn diff_many(&self, pairs: &[(ConfigTree, ConfigTree)]) -> Vec<Result<Delta>> {
        pairs
            .par_iter()
            .map(|(before, after)| self.diff(before, after))
            .collect()
    }

    /// Apply the forward direction of `delta` to `tree`.
    ///
    /// Fails with [`DeltaError::DeltaMismatch`] when `tree` lacks a node the
    /// delta expects, or already holds one it creates.
    pub fn apply(&self, tree: &ConfigTree, delta: &Delta) -> Result<ConfigTree> {
        self.apply_direction(tree, delta, delta.forward())
    }

    /// Apply the inverse direction of `delta` to `tree`.
    pub fn apply_inverse(&self, tree: &ConfigTree, delta: &Delta) -> Result<ConfigTree> {
        self.apply_direction(tree, delta, delta.inverse())
    }

    fn apply_direction(&self, tree: &ConfigTree, delta: &Delta, ops: &DeltaTree) -> Result<ConfigTree> {
        self.check_tree(tree, "patched")?;
        if !Arc::ptr_eq(delta.schema(), &self.schema) {
            return Err(DeltaError::schema_mismatch(
                "/",
                "delta was computed against a different schema model",
            ));
        }
        let roots = apply_tree(&self.schema, tree.roots(), ops)?;
        tracing::debug!(operations = delta.summary().changes(), "applied delta");
        Ok(ConfigTree::from_roots(Arc::clone(&self.schema), roots))
    }

    /// Apply a NETCONF edit to `tree`.
    ///
    /// The children of `config` are the top-level nodes of the edit, as with
    /// [`ConfigTree::from_nodes`]. Elements without `nc:operation` are merged.
    /// Fails with [`DeltaError::DeltaMismatch`] when a `delete` targets a
    /// missing node, a `create` an existing one, or `yang:insert` names a
    /// missing entry.
    pub fn apply_edit(&self, tree: &ConfigTree, config: &Element) -> Result<ConfigTree> {
        self.check_tree(tree, "edited")?;
        let roots = apply_edit(&self.schema, tree.roots(), config).context("applying edit-config")?;
        tracing::debug!(elements = config.children.len(), "applied edit-config");
        Ok(ConfigTree::from_roots(Arc::clone(&self.schema), roots))
    }

    /// Decode an edit-config document and apply it to `tree`.
    ///
    /// Accepts the envelopes of [`xml::config_payload`], so a full
    /// `<rpc><edit-config>` request works as well as a bare `<config>`.
    pub fn apply_edit_config(&self, tree: &ConfigTree, document: &str) -> Result<ConfigTree> {
        let payload = xml::config_payload(xml::parse_document(document)?)?;
        self.apply_edit(tree, &payload)
    }

    /// The delta an edit causes when applied to `tree`.
    pub fn edit_delta(&self, tree: &ConfigTree, config: &Element) -> Result<Delta> {
        let edited = self.apply_edit(tree, config)?;
        self.diff(tree, &edited)
    }

    /// The opposite transition of `delta`.
    #[must_use]
    pub fn negate(&self, delta: &Delta) -> Delta {
        delta.negate()
    }

    /// Structural equality as seen by this engine: orderless overrides make
    /// their collections unordered.
    #[must_use]
    pub fn equivalent(&self, a: &ConfigTree, b: &ConfigTree) -> bool {
        a.shares_schema(&self.schema)
            && b.shares_schema(&self.schema)
            && self.comparison().nodes_equal(a.roots(), b.roots())
    }
}

/// Sibling nodes of one schema node, from both sides.
struct Group<'t> {
    id: SchemaId,
    source: Vec<&'t DataNode>,
    target: Vec<&'t DataNode>,
}

struct Walker<'a> {
    cmp: Comparison<'a>,
}

impl Walker<'_> {
    fn tree(&self, source: &[DataNode], target: &[DataNode]) -> DeltaTree {
        let (roots, snapshots) = self.children(source, target);
        DeltaTree { roots, snapshots }
    }

    fn children(
        &self,
        source: &[DataNode],
        target: &[DataNode],
    ) -> (Vec<DeltaNode>, Vec<CollectionSnapshot>) {
        let schema = self.cmp.schema;
        let switched = switched_choices(schema, source, target);

        let mut groups: BTreeMap<u32, Group<'_>> = BTreeMap::new();
        for (node, from_source) in source
            .iter()
            .map(|n| (n, true))
            .chain(target.iter().map(|n| (n, false)))
        {
            let group = groups
                .entry(schema.node(node.schema_id()).position())
                .or_insert_with(|| Group {
                    id: node.schema_id(),
                    source: Vec::new(),
                    target: Vec::new(),
                });
            if from_source {
                group.source.push(node);
            } else {
                group.target.push(node);
            }
        }

        let mut out = Vec::new();
        let mut snapshots = Vec::new();
        for group in groups.values() {
            let snode = schema.node(group.id);
            let start = out.len();

            if snode.choices().iter().any(|(choice, _)| switched.contains(choice)) {
                replace_all(group, &mut out);
            } else {
                match snode.kind() {
                    NodeKind::Leaf => self.leaf(group, &mut out),
                    NodeKind::List | NodeKind::LeafList => self.collection(snode, group, &mut out),
                    _ => self.container(group, &mut out),
                }
            }

            let touched = &out[start..];
            if !touched.is_empty()
                && (snode.kind() == NodeKind::LeafList || touched.iter().any(|n| n.anchor.is_some()))
            {
                snapshots.push(CollectionSnapshot {
                    schema: group.id,
                    entries: group.target.iter().map(|n| (*n).clone()).collect(),
                });
            }
        }
        (out, snapshots)
    }

    fn leaf(&self, group: &Group<'_>, out: &mut Vec<DeltaNode>) {
        match (group.source.first(), group.target.first()) {
            (Some(x), Some(y)) => {
                if let (Some(from), Some(to)) = (x.value(), y.value())
                    && from != to
                {
                    out.push(DeltaNode::new(
                        y,
                        Operation::ReplaceLeaf {
                            from: from.clone(),
                            to: to.clone(),
                        },
                    ));
                }
            }
            (Some(x), None) if !self.cmp.is_default_leaf(x) => {
                out.push(DeltaNode::new(x, Operation::Delete((*x).clone())));
            }
            (None, Some(y)) if !self.cmp.is_default_leaf(y) => {
                out.push(DeltaNode::new(y, Operation::Create((*y).clone())));
            }
            _ => {}
        }
    }

    fn container(&self, group: &Group<'_>, out: &mut Vec<DeltaNode>) {
        match (group.source.first(), group.target.first()) {
            (Some(x), Some(y)) => {
                let (children, snapshots) = self.children(x.children(), y.children());
                if !children.is_empty() {
                    let mut node = DeltaNode::new(y, Operation::Merge);
                    node.children = children;
                    node.snapshots = snapshots;
                    out.push(node);
                }
            }
            (Some(x), None) => out.push(DeltaNode::new(x, Operation::Delete((*x).clone()))),
            (None, Some(y)) => out.push(DeltaNode::new(y, Operation::Create((*y).clone()))),
            (None, None) => {}
        }
    }

    /// Lists and leaf-lists: entries are matched by identity, deletes come
    /// first in source order, everything else follows in target order.
    fn collection(&self, snode: &SchemaNode, group: &Group<'_>, out: &mut Vec<DeltaNode>) {
        let ordered = self.cmp.is_ordered(group.id);
        let source: HashMap<&EntryIdentity, &DataNode> =
            group.source.iter().map(|n| (n.entry(), *n)).collect();
        let target: HashMap<&EntryIdentity, &DataNode> =
            group.target.iter().map(|n| (n.entry(), *n)).collect();

        for node in &group.source {
            if !target.contains_key(node.entry()) {
                out.push(DeltaNode::new(node, Operation::Delete((*node).clone())));
            }
        }

        let stable = ordered.then(|| {
            let from: Vec<&EntryIdentity> = group
                .source
                .iter()
                .map(|n| n.entry())
                .filter(|e| target.contains_key(e))
                .collect();
            let to: Vec<&EntryIdentity> = group
                .target
                .iter()
                .map(|n| n.entry())
                .filter(|e| source.contains_key(e))
                .collect();
            stable_set(&from, &to)
        });

        let mut moves = 0usize;
        let mut previous: Option<&EntryIdentity> = None;
        for node in &group.target {
            match source.get(node.entry()) {
                None => {
                    let mut delta = DeltaNode::new(node, Operation::Create((*node).clone()));
                    if ordered {
                        delta.anchor = Some(anchor_after(previous));
                    }
                    out.push(delta);
                }
                Some(old) => {
                    let (children, snapshots) = self.children(old.children(), node.children());
                    let moved = stable.as_ref().is_some_and(|s| !s.contains(node.entry()));
                    if moved || !children.is_empty() {
                        let op = if children.is_empty() {
                            Operation::Reorder
                        } else {
                            Operation::Merge
                        };
                        let mut delta = DeltaNode::new(node, op);
                        if moved {
                            delta.anchor = Some(anchor_after(previous));
                            moves += 1;
                        }
                        delta.children = children;
                        delta.snapshots = snapshots;
                        out.push(delta);
                    }
                }
            }
            previous = Some(node.entry());
        }

        if moves > 0 {
            tracing::debug!(collection = snode.data_path(), moves, "reordering entries");
        }
    }
}

fn anchor_after(previous: Option<&EntryIdentity>) -> Anchor {
    previous.map_or(Anchor::First, |p| Anchor::After(p.clone()))
}

/// Whole-subtree delete of the old case and create of the new one.
fn replace_all(group: &Group<'_>, out: &mut Vec<DeltaNode>) {
    for node in &group.source {
        out.push(DeltaNode::new(node, Operation::Delete((*node).clone())));
    }
    for node in &group.target {
        out.push(DeltaNode::new(node, Operation::Create((*node).clone())));
    }
}

/// Choices whose selected case differs between the two sibling sets.
fn switched_choices(schema: &SchemaModel, source: &[DataNode], target: &[DataNode]) -> HashSet<SchemaId> {
    let selected = |nodes: &[DataNode]| -> HashMap<SchemaId, SchemaId> {
        nodes
            .iter()
            .flat_map(|n| schema.node(n.schema_id()).choices().iter().copied())
            .collect()
    };
    let before = selected(source);
    let after = selected(target);

    before
        .iter()
        .filter(|(choice, case)| after.get(*choice).is_some_and(|c| c != *case))
        .map(|(choice, case)| {
            tracing::debug!(
                choice = schema.node(*choice).data_path(),
                from = schema.node(*case).name(),
                "case switch"
            );
            *choice
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orderless::OrderlessEntry;
    use crate::schema::test_support::example_schema;
    use crate::tree::LeafValue;

    fn tree(schema: &Arc<SchemaModel>, xml: &str) -> ConfigTree {
        ConfigTree::from_xml(Arc::clone(schema), xml).unwrap()
    }

    fn routes(schema: &Arc<SchemaModel>, prefixes: &[&str]) -> ConfigTree {
        let body: String = prefixes
            .iter()
            .map(|p| format!("<route><prefix>{p}</prefix><next-hop>192.0.2.1</next-hop></route>"))
            .collect();
        tree(schema, &format!(r#"<routing xmlns="urn:example:routing">{body}</routing>"#))
    }

    fn route_key(prefix: &str) -> EntryIdentity {
        EntryIdentity::Key(vec![LeafValue::String(prefix.to_string())])
    }

    #[test]
    fn test_identical_trees_give_empty_delta() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let t = routes(&schema, &["a", "b"]);
        let delta = engine.diff(&t, &t).unwrap();
        assert!(delta.is_empty());
        assert_eq!(engine.apply(&t, &delta).unwrap(), t);
    }

    #[test]
    fn test_swap_moves_one_entry() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A", "B", "C"]);
        let after = routes(&schema, &["B", "A", "C"]);
        let delta = engine.diff(&before, &after).unwrap();

        let summary = delta.summary();
        assert_eq!(summary.reorders, 1);
        assert_eq!(summary.creates + summary.deletes + summary.replaces, 0);

        let routing = &delta.forward().roots()[0];
        let moved = &routing.children()[0];
        assert_eq!(moved.entry(), &route_key("A"));
        assert_eq!(moved.operation(), &Operation::Reorder);
        assert_eq!(moved.anchor(), Some(&Anchor::After(route_key("B"))));
        assert!(routing.snapshot(moved.schema_id()).is_some());

        assert_eq!(engine.apply(&before, &delta).unwrap(), after);
        assert_eq!(engine.apply_inverse(&after, &delta).unwrap(), before);
    }

    #[test]
    fn test_system_ordered_list_never_moves() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name></interface><interface><name>b</name></interface></interfaces>"#,
        );
        let after = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>b</name></interface><interface><name>a</name></interface></interfaces>"#,
        );
        assert!(engine.diff(&before, &after).unwrap().is_empty());
    }

    #[test]
    fn test_orderless_override_suppresses_moves() {
        let schema = example_schema();
        let table = OrderlessTable::new(&[OrderlessEntry::Exact("/rt:routing/rt:route".into())]).unwrap();
        let engine = DeltaEngine::new(Arc::clone(&schema)).with_orderless(&table);
        let route = schema.find("/rt:routing/rt:route").unwrap().id();
        assert!(engine.is_orderless(route));

        let before = routes(&schema, &["A", "B", "C"]);
        let after = routes(&schema, &["C", "B", "A"]);
        let delta = engine.diff(&before, &after).unwrap();
        assert!(delta.is_empty());
        assert!(engine.equivalent(&before, &after));
        assert!(!before.equals(&after));
    }

    #[test]
    fn test_create_is_anchored_in_user_ordered_list() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A", "C"]);
        let after = routes(&schema, &["A", "B", "C"]);
        let delta = engine.diff(&before, &after).unwrap();
        let created = &delta.forward().roots()[0].children()[0];
        assert!(matches!(created.operation(), Operation::Create(_)));
        assert_eq!(created.anchor(), Some(&Anchor::After(route_key("A"))));
        assert!(!created.is_move());
        assert_eq!(engine.apply(&before, &delta).unwrap(), after);

        let inverse = &delta.inverse().roots()[0].children()[0];
        assert!(matches!(inverse.operation(), Operation::Delete(_)));
    }

    #[test]
    fn test_leaf_replace_and_default_normalization() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name><mtu>1500</mtu><description>x</description></interface></interfaces>"#,
        );
        let after = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name><description>y</description></interface></interfaces>"#,
        );
        let delta = engine.diff(&before, &after).unwrap();
        let summary = delta.summary();
        assert_eq!(summary.replaces, 1);
        assert_eq!(summary.changes(), 1);

        let strict = DeltaEngine::new(Arc::clone(&schema)).with_default_normalization(false);
        assert_eq!(strict.diff(&before, &after).unwrap().summary().deletes, 1);
    }

    #[test]
    fn test_case_switch_replaces_whole_case() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<region xmlns="urn:example:geo"><ontario><toronto>1</toronto></ontario></region>"#,
        );
        let after = tree(
            &schema,
            r#"<region xmlns="urn:example:geo"><alberta><calgary>2</calgary></alberta></region>"#,
        );
        let delta = engine.diff(&before, &after).unwrap();
        let ops: Vec<(&str, &str)> = delta.forward().roots()[0]
            .children()
            .iter()
            .map(|n| (n.qname().name.as_str(), n.operation().name()))
            .collect();
        assert_eq!(ops, vec![("ontario", "delete"), ("alberta", "create")]);
        assert_eq!(engine.apply(&before, &delta).unwrap(), after);
    }

    #[test]
    fn test_container_of_defaults_is_still_present() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let empty = tree(&schema, r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0"/>"#);
        let defaults = tree(
            &schema,
            r#"<region xmlns="urn:example:geo"><country>canada</country></region>"#,
        );
        assert!(!defaults.equals(&empty));
        let delta = engine.diff(&defaults, &empty).unwrap();
        assert_eq!(delta.summary().deletes, 1);
        assert_eq!(delta.forward().roots()[0].qname().name, "region");
        assert_eq!(engine.apply(&defaults, &delta).unwrap(), empty);

        // the leaf itself still normalizes away inside the container
        let bare = tree(&schema, r#"<region xmlns="urn:example:geo"/>"#);
        assert!(engine.diff(&defaults, &bare).unwrap().is_empty());
    }

    #[test]
    fn test_key_change_is_delete_and_create() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A"]);
        let after = routes(&schema, &["Z"]);
        let summary = engine.diff(&before, &after).unwrap().summary();
        assert_eq!((summary.creates, summary.deletes), (1, 1));
    }

    #[test]
    fn test_foreign_trees_are_rejected() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let own = routes(&schema, &["A"]);
        let foreign = routes(&example_schema(), &["A"]);
        assert!(matches!(
            engine.diff(&own, &foreign),
            Err(DeltaError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_diff_many_matches_diff() {
        let schema = example_schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let pairs = vec![
            (routes(&schema, &["A", "B"]), routes(&schema, &["B", "A"])),
            (routes(&schema, &["A"]), routes(&schema, &["A", "B"])),
        ];
        let results = engine.diff_many(&pairs);
        assert_eq!(results.len(), 2);
        for ((before, after), delta) in pairs.iter().zip(results) {
            assert_eq!(delta.unwrap(), engine.diff(before, after).unwrap());
        }
    }
}
