#![no_main]
use std::sync::{Arc, LazyLock};

use libfuzzer_sys::fuzz_target;
use yang_delta::{ConfigTree, SchemaDocument, compile_schema};

static TREE: LazyLock<ConfigTree> = LazyLock::new(|| {
    let doc = SchemaDocument::from_yaml(include_str!("../../tests/fixtures/schema/example.yaml"))
        .expect("schema fixture");
    let schema = Arc::new(compile_schema(&doc).expect("schema compiles"));
    ConfigTree::from_xml(schema, include_str!("../../tests/fixtures/config/running.xml"))
        .expect("config fixture")
});

/// Fuzz the path query parser and evaluator against a fixed tree.
fuzz_target!(|data: &[u8]| {
    if let Ok(expression) = std::str::from_utf8(data) {
        if let Ok(result) = TREE.query(expression) {
            let _ = result.count();
        }
        let _ = TREE.filter(expression);
    }
});
