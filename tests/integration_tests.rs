//! Integration tests for yang-delta
//!
//! These tests verify end-to-end behaviour: decoding device replies into
//! config trees, computing and applying deltas, and encoding them for each
//! transport.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use yang_delta::encode::{Encoding, EncodedDelta, Method, TypedValue, encode};
use yang_delta::tree::xml::{NETCONF_NS, YANG_NS, parse_document};
use yang_delta::{
    AppConfig, ConfigTree, Delta, DeltaEngine, DeltaError, EncodingConfig, LeafValue, OrderlessEntry,
    SchemaDocument, SchemaModel, compile_schema, encode_edit_config, encode_requests,
    encode_set_request,
};

// ============================================================================
// Test Fixtures
// ============================================================================

const FIXTURES_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");

fn fixture_path(name: &str) -> PathBuf {
    Path::new(FIXTURES_DIR).join(name)
}

fn schema() -> Arc<SchemaModel> {
    let doc = SchemaDocument::from_file(&fixture_path("schema/example.yaml"))
        .expect("Failed to load schema document");
    Arc::new(compile_schema(&doc).expect("Failed to compile schema"))
}

fn load(schema: &Arc<SchemaModel>, name: &str) -> ConfigTree {
    let xml = std::fs::read_to_string(fixture_path(&format!("config/{name}")))
        .expect("Failed to read config fixture");
    ConfigTree::from_xml(Arc::clone(schema), &xml).expect("Failed to decode config fixture")
}

fn tree(schema: &Arc<SchemaModel>, xml: &str) -> ConfigTree {
    ConfigTree::from_xml(Arc::clone(schema), xml).expect("Failed to decode config")
}

fn routes(schema: &Arc<SchemaModel>, prefixes: &[&str]) -> ConfigTree {
    let body: String = prefixes
        .iter()
        .map(|p| format!("<route><prefix>{p}</prefix><next-hop>192.0.2.1</next-hop></route>"))
        .collect();
    tree(schema, &format!(r#"<routing xmlns="urn:example:routing">{body}</routing>"#))
}

/// Running and intended snapshots with their delta.
fn fixture_delta(engine: &DeltaEngine) -> (ConfigTree, ConfigTree, Delta) {
    let schema = engine.schema();
    let running = load(schema, "running.xml");
    let intended = load(schema, "intended.xml");
    let delta = engine.diff(&running, &intended).expect("Failed to diff");
    (running, intended, delta)
}

// ============================================================================
// Config Tree Tests
// ============================================================================

mod tree_tests {
    use super::*;

    #[test]
    fn test_decode_reply_and_edit_envelopes() {
        let schema = schema();
        let running = load(&schema, "running.xml");
        let intended = load(&schema, "intended.xml");

        assert_eq!(running.roots().len(), 3);
        assert_eq!(intended.roots().len(), 3);
        assert_eq!(running.query("count(/rt:routing/rt:route)").unwrap().count(), 3);
        assert_eq!(running.query("count(//rt:static-label)").unwrap().count(), 2);
    }

    #[test]
    fn test_identityref_prefixes_resolve_to_the_same_value() {
        let schema = schema();
        let a = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces" xmlns:x="urn:example:iana-types">
                 <interface><name>eth0</name><type>x:ethernetCsmacd</type></interface>
               </interfaces>"#,
        );
        let b = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces" xmlns:ianaift="urn:example:iana-types">
                 <interface><name>eth0</name><type>ianaift:ethernetCsmacd</type></interface>
               </interfaces>"#,
        );
        assert!(a.equals(&b));
    }

    #[test]
    fn test_query_and_filter() {
        let schema = schema();
        let running = load(&schema, "running.xml");

        let modes = running
            .query("/rt:routing/rt:prefix-set[name='peers']/rt:mode")
            .unwrap()
            .into_nodes();
        assert_eq!(modes.len(), 1);
        assert_eq!(modes[0].value(), Some(&LeafValue::String("ipv4".to_string())));

        let filtered = running.filter("/rt:routing/rt:prefix-set[name='peers']/rt:mode").unwrap();
        assert_eq!(filtered.query("count(//rt:prefix-set)").unwrap().count(), 1);
        assert_eq!(filtered.query("count(//rt:route)").unwrap().count(), 0);
        assert!(filtered.is_subset_of(&running));
        assert!(!running.is_subset_of(&filtered));
    }

    #[test]
    fn test_merge_is_right_biased() {
        let schema = schema();
        let running = load(&schema, "running.xml");
        let partial = tree(
            &schema,
            r#"<routing xmlns="urn:example:routing">
                 <prefix-set><name>peers</name><mode>ipv6</mode></prefix-set>
                 <prefix-set><name>transit</name></prefix-set>
               </routing>"#,
        );
        let merged = running.merge(&partial).unwrap();

        assert!(partial.is_subset_of(&merged));
        assert!(!running.is_subset_of(&merged));
        assert_eq!(merged.query("count(//rt:prefix-set)").unwrap().count(), 3);
        // The inputs are untouched.
        assert_eq!(running.query("count(//rt:prefix-set)").unwrap().count(), 2);
    }

    #[test]
    fn test_construction_errors() {
        let schema = schema();
        let cases = [
            (
                r#"<routing xmlns="urn:example:routing"><bogus/></routing>"#,
                "schema mismatch",
            ),
            (
                r#"<routing xmlns="urn:example:routing"><route><next-hop>h</next-hop></route></routing>"#,
                "key violation",
            ),
            (
                r#"<region xmlns="urn:example:geo"><ontario/><alberta/></region>"#,
                "choice conflict",
            ),
        ];
        for (xml, expected) in cases {
            let err = ConfigTree::from_xml(Arc::clone(&schema), xml).unwrap_err();
            let ok = match expected {
                "schema mismatch" => matches!(err, DeltaError::SchemaMismatch { .. }),
                "key violation" => matches!(err, DeltaError::KeyViolation { .. }),
                _ => matches!(err, DeltaError::ChoiceConflict { .. }),
            };
            assert!(ok, "expected {expected}, got {err}");
        }
    }

    #[test]
    fn test_edit_document_is_not_a_config() {
        let schema = schema();
        let err = ConfigTree::from_xml(
            Arc::clone(&schema),
            r#"<config xmlns="urn:ietf:params:xml:ns:netconf:base:1.0" xmlns:nc="urn:ietf:params:xml:ns:netconf:base:1.0">
                 <routing xmlns="urn:example:routing" nc:operation="delete"/>
               </config>"#,
        )
        .unwrap_err();
        assert!(matches!(err, DeltaError::SchemaMismatch { .. }));
    }
}

// ============================================================================
// Delta Engine Tests
// ============================================================================

mod delta_tests {
    use super::*;

    #[test]
    fn test_fixture_delta_summary() {
        let engine = DeltaEngine::new(schema());
        let (_, _, delta) = fixture_delta(&engine);
        let summary = delta.summary();

        // enabled-v2 and the alberta case
        assert_eq!(summary.creates, 2);
        // the ontario case
        assert_eq!(summary.deletes, 1);
        // mtu and metric hold their defaults on one side only
        assert_eq!(summary.replaces, 0);
        // dns-server, route and prefix-set each move one entry
        assert_eq!(summary.reorders, 3);
    }

    #[test]
    fn test_fixture_delta_lines() {
        let engine = DeltaEngine::new(schema());
        let (_, _, delta) = fixture_delta(&engine);
        let text = delta.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert!(lines.contains(&"+ /if:interfaces/if:interface[name='GigabitEthernet0/0']/if:enabled-v2"));
        assert!(lines.contains(&"> /rt:routing/rt:route[prefix='10.0.0.0/8'] after [prefix='172.16.0.0/12']"));
        assert!(lines.contains(&"> /rt:routing/rt:prefix-set[name='customers'] after [name='peers']"));
        assert!(lines.contains(&"- /geo:region/geo:ontario"));
        assert!(lines.contains(&"+ /geo:region/geo:alberta"));
        assert!(!lines.iter().any(|l| l.ends_with("/if:enabled")));
        assert!(!lines.iter().any(|l| l.contains("static-label")));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_fixture_round_trip() {
        let engine = DeltaEngine::new(schema());
        let (running, intended, delta) = fixture_delta(&engine);

        let forward = engine.apply(&running, &delta).unwrap();
        assert!(forward.equals(&intended));

        let back = engine.apply_inverse(&intended, &delta).unwrap();
        assert!(back.equals(&running));

        let negated = engine.negate(&delta);
        assert!(engine.apply(&intended, &negated).unwrap().equals(&running));
        assert_eq!(negated.negate(), delta);
        assert_eq!(engine.diff(&intended, &running).unwrap(), negated);
    }

    #[test]
    fn test_wrong_baseline_is_delta_mismatch() {
        let engine = DeltaEngine::new(schema());
        let (_, intended, delta) = fixture_delta(&engine);
        let err = engine.apply(&intended, &delta).unwrap_err();
        assert!(matches!(err, DeltaError::DeltaMismatch { .. }), "{err}");
    }

    #[test]
    fn test_swap_is_one_reorder() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A", "B", "C"]);
        let after = routes(&schema, &["B", "A", "C"]);
        let delta = engine.diff(&before, &after).unwrap();

        let summary = delta.summary();
        assert_eq!((summary.creates, summary.deletes, summary.reorders), (0, 0, 1));
        assert_eq!(
            delta.to_string().trim_end(),
            "> /rt:routing/rt:route[prefix='A'] after [prefix='B']"
        );
        assert!(engine.apply(&before, &delta).unwrap().equals(&after));
    }

    #[test]
    fn test_one_reorder_per_changed_predecessor() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = routes(&schema, &["A", "B", "C", "D", "E"]);
        let after = routes(&schema, &["E", "A", "B", "D", "C"]);
        let delta = engine.diff(&before, &after).unwrap();

        // A, B, D stay; E and C move.
        assert_eq!(delta.summary().reorders, 2);
        assert!(engine.apply(&before, &delta).unwrap().equals(&after));
    }

    #[test]
    fn test_identical_trees() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let running = load(&schema, "running.xml");
        let delta = engine.diff(&running, &running).unwrap();
        assert!(delta.is_empty());
        assert_eq!(delta.summary().changes(), 0);
        assert!(engine.apply(&running, &delta).unwrap().equals(&running));
    }

    #[test]
    fn test_system_ordered_list_ignores_order() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces">
                 <interface><name>a</name></interface><interface><name>b</name></interface>
               </interfaces>"#,
        );
        let after = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces">
                 <interface><name>b</name></interface><interface><name>a</name></interface>
               </interfaces>"#,
        );
        assert!(engine.diff(&before, &after).unwrap().is_empty());
        assert!(before.equals(&after));
    }

    #[test]
    fn test_orderless_override_suppresses_reorder() {
        let schema = schema();
        let config = AppConfig::builder()
            .orderless_entry(OrderlessEntry::Exact("/rt:routing/rt:prefix-set".to_string()))
            .build();
        let engine = DeltaEngine::from_config(Arc::clone(&schema), &config).unwrap();
        assert!(engine.is_orderless(schema.find("/rt:routing/rt:prefix-set").unwrap().id()));

        let (running, intended, delta) = fixture_delta(&engine);
        assert_eq!(delta.summary().reorders, 2);
        assert!(!delta.to_string().contains("prefix-set"));
        assert!(engine.equivalent(&engine.apply(&running, &delta).unwrap(), &intended));
        // Without the override the trees differ in prefix-set order.
        assert!(!engine.apply(&running, &delta).unwrap().equals(&intended));
    }

    #[test]
    fn test_default_normalization() {
        let schema = schema();
        let with_mtu = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name><mtu>1500</mtu></interface></interfaces>"#,
        );
        let without = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name></interface></interfaces>"#,
        );

        let engine = DeltaEngine::new(Arc::clone(&schema));
        assert!(engine.diff(&with_mtu, &without).unwrap().is_empty());

        let strict = DeltaEngine::new(Arc::clone(&schema)).with_default_normalization(false);
        let delta = strict.diff(&with_mtu, &without).unwrap();
        assert_eq!(delta.summary().deletes, 1);
        assert!(strict.apply(&with_mtu, &delta).unwrap().equals(&without));
    }

    #[test]
    fn test_new_leaf_next_to_deprecated_sibling() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name><enabled>true</enabled></interface></interfaces>"#,
        );
        let after = tree(
            &schema,
            r#"<interfaces xmlns="urn:example:interfaces"><interface><name>a</name><enabled>true</enabled><enabled-v2>true</enabled-v2></interface></interfaces>"#,
        );
        let delta = engine.diff(&before, &after).unwrap();
        assert_eq!(
            delta.to_string().trim_end(),
            "+ /if:interfaces/if:interface[name='a']/if:enabled-v2"
        );
    }

    #[test]
    fn test_case_switch() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let before = tree(
            &schema,
            r#"<region xmlns="urn:example:geo"><ontario><toronto>yyz</toronto></ontario></region>"#,
        );
        let after = tree(
            &schema,
            r#"<region xmlns="urn:example:geo"><alberta><calgary>yyc</calgary></alberta></region>"#,
        );
        let delta = engine.diff(&before, &after).unwrap();
        let summary = delta.summary();
        assert_eq!((summary.creates, summary.deletes, summary.replaces), (1, 1, 0));
        assert!(engine.apply(&before, &delta).unwrap().equals(&after));
    }

    #[test]
    fn test_diff_many() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema));
        let pairs = vec![
            (routes(&schema, &["A", "B"]), routes(&schema, &["B", "A"])),
            (load(&schema, "running.xml"), load(&schema, "intended.xml")),
            (routes(&schema, &["A"]), routes(&schema, &["A"])),
        ];
        let deltas = engine.diff_many(&pairs);
        assert_eq!(deltas.len(), 3);
        for ((before, after), delta) in pairs.iter().zip(deltas) {
            let delta = delta.unwrap();
            assert_eq!(delta, engine.diff(before, after).unwrap());
        }
    }
}

// ============================================================================
// Encoder Tests
// ============================================================================

mod encoder_tests {
    use super::*;

    #[test]
    fn test_edit_config_operations() {
        let engine = DeltaEngine::new(schema());
        let (_, _, delta) = fixture_delta(&engine);
        let xml = encode_edit_config(&delta, &EncodingConfig::default()).unwrap();
        let root = parse_document(&xml).unwrap();
        assert_eq!(root.qname.name, "config");

        let mut ops = Vec::new();
        let mut stack = vec![&root];
        while let Some(element) = stack.pop() {
            for (qname, value) in &element.attributes {
                if qname.namespace == NETCONF_NS && qname.name == "operation" {
                    ops.push((element.qname.name.clone(), value.clone()));
                }
                if qname.namespace == YANG_NS && qname.name == "insert" {
                    assert_eq!(value, "after");
                }
            }
            stack.extend(&element.children);
        }
        assert!(ops.contains(&("enabled-v2".to_string(), "create".to_string())));
        assert!(ops.contains(&("ontario".to_string(), "delete".to_string())));
        assert!(ops.contains(&("alberta".to_string(), "create".to_string())));
        assert!(ops.contains(&("route".to_string(), "merge".to_string())));
    }

    #[test]
    fn test_edit_config_reads_back() {
        let engine = DeltaEngine::new(schema());
        let (running, intended, delta) = fixture_delta(&engine);
        let config = EncodingConfig {
            pretty_xml: true,
            ..EncodingConfig::default()
        };

        let forward = encode_edit_config(&delta, &config).unwrap();
        let edited = engine.apply_edit_config(&running, &forward).unwrap();
        assert!(edited.equals(&intended), "{forward}");

        let rollback = encode_edit_config(&delta.negate(), &config).unwrap();
        assert!(engine.apply_edit_config(&intended, &rollback).unwrap().equals(&running));

        let payload = parse_document(&forward).unwrap();
        let from_edit = engine.edit_delta(&running, &payload).unwrap();
        assert_eq!(from_edit.summary(), delta.summary());
    }

    #[test]
    fn test_requests() {
        let engine = DeltaEngine::new(schema());
        let (_, _, delta) = fixture_delta(&engine);
        let requests = encode_requests(&delta, &EncodingConfig::default()).unwrap();

        let count = |m: Method| requests.iter().filter(|r| r.method == m).count();
        assert_eq!(requests.len(), 6);
        assert_eq!(count(Method::Post), 2);
        assert_eq!(count(Method::Put), 3);
        assert_eq!(count(Method::Delete), 1);

        let delete = requests.iter().find(|r| r.method == Method::Delete).unwrap();
        assert_eq!(delete.path, "/restconf/data/example-geo:region/ontario");
        let route = requests
            .iter()
            .find(|r| r.path.contains("route="))
            .unwrap();
        assert_eq!(
            route.target(),
            "/restconf/data/example-routing:routing/route=10.0.0.0%2F8?insert=after&point=/example-routing:routing/route=172.16.0.0%2F12"
        );
    }

    #[test]
    fn test_set_request() {
        let engine = DeltaEngine::new(schema());
        let (_, _, delta) = fixture_delta(&engine);
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();

        assert_eq!(request.delete.len(), 1);
        assert_eq!(request.replace.len(), 3);
        assert_eq!(request.update.len(), 2);
        assert_eq!(request.fallbacks.len(), 3);
        assert!(request.fallbacks.iter().all(|f| f.reason == "entries moved"));

        let enabled = request
            .update
            .iter()
            .find(|u| u.path.to_string().ends_with("/enabled-v2"))
            .unwrap();
        assert_eq!(enabled.val, TypedValue::Bool(true));
    }

    #[test]
    fn test_set_request_with_orderless_override() {
        let schema = schema();
        let engine = DeltaEngine::new(Arc::clone(&schema)).with_orderless(
            &yang_delta::OrderlessTable::new(&[OrderlessEntry::Pattern {
                pattern: "/rt:routing/rt:prefix-*".to_string(),
                reason: None,
            }])
            .unwrap(),
        );
        let (_, _, delta) = fixture_delta(&engine);
        let request = encode_set_request(&delta, &EncodingConfig::default()).unwrap();
        assert_eq!(request.fallbacks.len(), 2);
    }

    #[test]
    fn test_dispatch() {
        let engine = DeltaEngine::new(schema());
        let (_, _, delta) = fixture_delta(&engine);
        let config = AppConfig::default();
        for encoding in Encoding::all() {
            let encoded = encode(&delta, *encoding, &config.encoding).unwrap();
            assert_eq!(encoded.encoding(), *encoding);
        }
        let EncodedDelta::Requests(requests) = encode(&delta, Encoding::Requests, &config.encoding).unwrap() else {
            panic!("expected requests");
        };
        assert_eq!(requests, encode_requests(&delta, &config.encoding).unwrap());
    }

    #[test]
    fn test_tree_as_json() {
        let schema = schema();
        let value = yang_delta::encode_tree(&routes(&schema, &["A"])).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "example-routing:routing": {
                    "route": [{ "prefix": "A", "next-hop": "192.0.2.1" }]
                }
            })
        );
    }
}
