#![no_main]
use std::sync::{Arc, LazyLock};

use libfuzzer_sys::fuzz_target;
use yang_delta::{ConfigTree, DeltaEngine, SchemaDocument, SchemaModel, compile_schema};

const MAX_WRAPPED_INPUT_LEN: usize = 10_000;

static SCHEMA: LazyLock<Arc<SchemaModel>> = LazyLock::new(|| {
    let doc = SchemaDocument::from_yaml(include_str!("../../tests/fixtures/schema/example.yaml"))
        .expect("schema fixture");
    Arc::new(compile_schema(&doc).expect("schema compiles"))
});

/// Fuzz the XML decoder and, for accepted trees, the delta round trip.
///
/// Wraps input in a `<routing>` element to reach the list and leaf-list
/// builders more often than raw input would.
fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let schema = Arc::clone(&SCHEMA);

        let _ = ConfigTree::from_xml(Arc::clone(&schema), s);

        if s.len() < MAX_WRAPPED_INPUT_LEN {
            let wrapped = format!(r#"<routing xmlns="urn:example:routing">{s}</routing>"#);
            if let Ok(tree) = ConfigTree::from_xml(Arc::clone(&schema), &wrapped) {
                let engine = DeltaEngine::new(Arc::clone(&schema));
                let empty = ConfigTree::empty(schema);
                let delta = engine.diff(&empty, &tree).expect("diff of decoded tree");
                let applied = engine.apply(&empty, &delta).expect("apply to its own baseline");
                assert!(applied.equals(&tree));
            }
        }
    }
});
