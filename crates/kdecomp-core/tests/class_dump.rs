//! Loading a realistic class-set dump and options file from disk.

use std::fs;

use kdecomp_core::metadata::{property, MetadataKind};
use kdecomp_core::record::{ConstantValue, Opcode};
use kdecomp_core::signature::parse_method_signature;
use kdecomp_core::types::SimpleNames;
use kdecomp_core::{AccessFlags, ClassSet, DecompilerOptions, RecordSource};

const DUMP: &str = r#"[
  {
    "name": "a/Cache",
    "access": 17,
    "super_class": "java/lang/Object",
    "signature": "<K:Ljava/lang/Object;V:Ljava/lang/Object;>Ljava/lang/Object;",
    "fields": [
      { "name": "size", "descriptor": "I", "access": 2 },
      {
        "name": "LIMIT",
        "descriptor": "J",
        "access": 25,
        "constant_value": { "type": "long", "value": 64 }
      }
    ],
    "methods": [
      {
        "name": "get",
        "descriptor": "(Ljava/lang/Object;)Ljava/lang/Object;",
        "access": 1,
        "signature": "(TK;)TV;",
        "code": [
          { "opcode": "getfield", "offset": 1, "class": "a/Cache" },
          { "opcode": "areturn", "offset": 4 }
        ]
      }
    ],
    "kotlin": {
      "kind": "class",
      "properties": [{ "name": "size", "flags": 512 }]
    }
  },
  { "name": "lib/Base", "access": 1, "own": false }
]"#;

#[test]
fn dump_loads_with_defaults_filled_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classes.json");
    fs::write(&path, DUMP).unwrap();

    let set = ClassSet::from_json_file(&path).unwrap();
    assert_eq!(set.len(), 2);
    let own: Vec<String> = set.own_classes().iter().map(|r| r.name.clone()).collect();
    assert_eq!(own, ["a/Cache"]);

    let cache = set.lookup("a/Cache").unwrap();
    assert_eq!(cache.access, AccessFlags::PUBLIC | AccessFlags::FINAL);
    assert!(cache.interfaces.is_empty());
    assert!(cache.inner_classes.is_none());
    assert_eq!(cache.package(), "a");

    let limit = &cache.fields[1];
    assert_eq!(limit.constant_value, Some(ConstantValue::Long(64)));
    let ty = limit.field_type().unwrap();
    assert_eq!(limit.constant_value.as_ref().unwrap().literal(Some(&ty)), "64L");

    let get = cache.method("get", "(Ljava/lang/Object;)Ljava/lang/Object;").unwrap();
    let code = set.instructions(&cache, get).unwrap().unwrap();
    assert_eq!(code[0].opcode, Opcode::GetField);
    // Opcodes the structural layer does not inspect collapse to `Other`.
    assert_eq!(code[1].opcode, Opcode::Other);

    let sig = parse_method_signature(get.signature.as_deref().unwrap()).unwrap();
    assert_eq!(sig.params[0].display_with(&SimpleNames), "K");
    assert_eq!(sig.ret.display_with(&SimpleNames), "V");

    let class_sig = set.class_signature(&cache).unwrap();
    let params: Vec<&str> = class_sig.param_names().collect();
    assert_eq!(params, ["K", "V"]);

    let km = cache.kotlin.as_ref().unwrap();
    assert_eq!(km.kind, MetadataKind::Class);
    assert!(km.property_for_field("size").unwrap().flags.test(property::IS_VAR));
}

#[test]
fn options_file_overrides_only_what_it_names() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("options.json");
    fs::write(&path, r#"{ "indent_string": "    ", "remove_synthetic": true }"#).unwrap();

    let options = DecompilerOptions::from_json_file(&path).unwrap();
    assert_eq!(options.indent_string, "    ");
    assert!(options.remove_synthetic);
    assert!(options.verify_anonymous_classes);
    assert!(options.hide_default_constructor);
    assert_eq!(options.line_separator, "\n");

    fs::write(&path, r#"{ "indent": 2 }"#).unwrap();
    let err = DecompilerOptions::from_json_file(&path).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
