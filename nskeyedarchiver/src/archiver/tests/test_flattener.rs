#[cfg(test)]
mod flattener_tests {
    use std::collections::BTreeMap;

    use chrono::{TimeZone, Utc};
    use plist::Value as PlistValue;
    use proptest::prelude::*;

    use crate::{
        archiver::{
            classes::ClassDescriptor,
            codec::{archive_binary, archive_many, archive_xml, unarchive},
            flattener::flatten,
            models::{Object, Value},
            tests::builders::decode,
        },
        error::{archiver::ArchiverError, decode::DecodeError, encode::EncodeError},
        util::{
            options::{ArchiverOptions, OutputFormat, DEFAULT_MAX_DEPTH},
            plist::as_uid,
        },
    };

    fn objects(tree: &PlistValue) -> &Vec<PlistValue> {
        tree.as_dictionary()
            .unwrap()
            .get("$objects")
            .unwrap()
            .as_array()
            .unwrap()
    }

    fn root_index(tree: &PlistValue, name: &str) -> u64 {
        let top = tree.as_dictionary().unwrap().get("$top").unwrap();
        as_uid(top.as_dictionary().unwrap().get(name).unwrap()).unwrap()
    }

    fn element_indexes(tree: &PlistValue, idx: u64) -> Vec<u64> {
        objects(tree)[idx as usize]
            .as_dictionary()
            .unwrap()
            .get("NS.objects")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|item| as_uid(item).unwrap())
            .collect()
    }

    /// A graph touching every variant
    fn sample_graph() -> Value {
        let shared = Value::array(vec![Value::Int(1), Value::from("shared")]);
        Value::dictionary(vec![
            (Value::from("null"), Value::Null),
            (Value::from("bool"), Value::Bool(false)),
            (Value::from("int"), Value::Int(-42)),
            (Value::from("double"), Value::Double(3.25)),
            (Value::from("bytes"), Value::Bytes(vec![0, 255, 7])),
            (
                Value::from("date"),
                Value::date_from(&Utc.with_ymd_and_hms(2019, 3, 4, 5, 6, 7).unwrap()),
            ),
            (
                Value::from("url"),
                Value::Url("https://example.com/a?b=c".to_string()),
            ),
            (Value::from("first"), shared.clone()),
            (Value::from("second"), shared),
            (
                Value::from("set"),
                Value::set(vec![Value::Int(3), Value::from("three")]),
            ),
            (Value::Int(7), Value::from("non-string key")),
            (
                Value::from("object"),
                Value::object(
                    Object::new(
                        "DTTapHeartbeatMessage",
                        vec!["DTTapHeartbeatMessage".to_string(), "DTTapMessage".to_string()],
                    )
                    .with_field("count", Value::Int(2))
                    .with_field("ratio", Value::Double(0.5))
                    .with_field("enabled", Value::Bool(true))
                    .with_field("name", Value::from("beat"))
                    .with_field("payload", Value::Null),
                ),
            ),
            (
                Value::from("bag"),
                Value::object(Object::new("", vec![]).with_field("k", Value::from("v"))),
            ),
        ])
    }

    #[test]
    fn can_flatten_envelope_shape() {
        let tree = flatten(&[Value::Bool(true)]).unwrap();
        let root = tree.as_dictionary().unwrap();
        assert_eq!(
            root.get("$archiver").and_then(PlistValue::as_string),
            Some("NSKeyedArchiver")
        );
        assert_eq!(
            root.get("$version").and_then(PlistValue::as_unsigned_integer),
            Some(100000)
        );
        assert_eq!(objects(&tree)[0], PlistValue::String("$null".to_string()));
        assert_eq!(root_index(&tree, "$0"), 1);
        assert_eq!(objects(&tree)[1], PlistValue::Boolean(true));
    }

    #[test]
    fn can_flatten_null_root() {
        let tree = flatten(&[Value::Null]).unwrap();
        assert_eq!(root_index(&tree, "$0"), 0);
        assert_eq!(objects(&tree).len(), 1);
    }

    #[test]
    fn names_roots_by_position() {
        let tree = flatten(&[Value::Int(1), Value::Int(2), Value::Int(3)]).unwrap();
        let top = tree.as_dictionary().unwrap().get("$top").unwrap();
        let names: Vec<&String> = top.as_dictionary().unwrap().keys().collect();
        assert_eq!(names, vec!["$0", "$1", "$2"]);
    }

    #[test]
    fn same_identity_is_written_once() {
        let shared = Value::array(vec![Value::Int(1)]);
        let tree = flatten(&[Value::array(vec![shared.clone(), shared])]).unwrap();
        let elements = element_indexes(&tree, root_index(&tree, "$0"));
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], elements[1]);
    }

    #[test]
    fn equal_values_are_not_merged() {
        let tree = flatten(&[Value::array(vec![
            Value::array(vec![Value::Int(1)]),
            Value::array(vec![Value::Int(1)]),
        ])])
        .unwrap();
        let elements = element_indexes(&tree, root_index(&tree, "$0"));
        assert_ne!(elements[0], elements[1]);
    }

    #[test]
    fn class_descriptors_are_shared() {
        let tree = flatten(&[Value::array(vec![
            Value::array(vec![]),
            Value::array(vec![]),
        ])])
        .unwrap();
        let descriptors = objects(&tree)
            .iter()
            .filter_map(ClassDescriptor::from_entry)
            .filter(|descriptor| descriptor.name == "NSArray")
            .count();
        assert_eq!(descriptors, 1);
    }

    #[test]
    fn can_flatten_object_fields() {
        let object = Value::object(
            Object::new("Custom", vec!["Custom".to_string(), "NSObject".to_string()])
                .with_field("count", Value::Int(4))
                .with_field("name", Value::from("four")),
        );
        let tree = flatten(&[object]).unwrap();
        let entry = objects(&tree)[root_index(&tree, "$0") as usize]
            .as_dictionary()
            .unwrap();
        assert_eq!(
            entry.get("count").and_then(PlistValue::as_signed_integer),
            Some(4)
        );
        let name = as_uid(entry.get("name").unwrap()).unwrap();
        assert_eq!(objects(&tree)[name as usize], PlistValue::String("four".to_string()));
        let class = as_uid(entry.get("$class").unwrap()).unwrap();
        assert_eq!(
            ClassDescriptor::from_entry(&objects(&tree)[class as usize]),
            Some(ClassDescriptor::new(
                "Custom".to_string(),
                vec!["Custom".to_string(), "NSObject".to_string()]
            ))
        );
    }

    #[test]
    fn keyed_bag_has_no_class() {
        let bag = Value::object(Object::new("", vec![]).with_field("k", Value::Int(1)));
        let tree = flatten(&[bag]).unwrap();
        let entry = objects(&tree)[root_index(&tree, "$0") as usize]
            .as_dictionary()
            .unwrap();
        assert!(entry.get("$class").is_none());
    }

    #[test]
    fn can_round_trip_without_bytes() {
        let value = sample_graph();
        let tree = flatten(&[value.clone()]).unwrap();
        assert_eq!(decode(&tree).unwrap(), vec![value]);
    }

    #[test]
    fn can_round_trip_binary() {
        let value = sample_graph();
        let bytes = archive_binary(&value).unwrap();
        assert!(bytes.starts_with(b"bplist00"));
        assert_eq!(unarchive(&bytes).unwrap(), vec![value]);
    }

    #[test]
    fn can_round_trip_xml() {
        let value = sample_graph();
        let xml = archive_xml(&value).unwrap();
        assert!(xml.contains("<key>$archiver</key>"));
        assert_eq!(unarchive(xml.as_bytes()).unwrap(), vec![value]);
    }

    #[test]
    fn round_trip_keeps_aliasing() {
        let bytes = archive_binary(&sample_graph()).unwrap();
        let roots = unarchive(&bytes).unwrap();
        let pairs = roots[0].as_dictionary().unwrap();
        let first = pairs.iter().find(|(key, _)| key.as_str() == Some("first")).unwrap();
        let second = pairs.iter().find(|(key, _)| key.as_str() == Some("second")).unwrap();
        assert!(first.1.same_identity(&second.1));
    }

    #[test]
    fn round_trip_keeps_cycles() {
        let outer = Value::array(vec![Value::from("head")]);
        let inner = Value::object(Object::new("Node", vec!["Node".to_string()]));
        if let (Value::Array(items), Value::Object(node)) = (&outer, &inner) {
            node.borrow_mut().fields.insert("owner".to_string(), outer.clone());
            items.borrow_mut().push(inner.clone());
            items.borrow_mut().push(outer.clone());
        }

        let bytes = archive_binary(&outer).unwrap();
        let roots = unarchive(&bytes).unwrap();
        assert_eq!(roots, vec![outer]);

        let items = roots[0].as_array().unwrap();
        assert!(items[2].same_identity(&roots[0]));
        let node = items[1].as_object().unwrap();
        assert!(node.fields["owner"].same_identity(&roots[0]));
    }

    #[test]
    fn shared_roots_stay_shared() {
        let shared = Value::set(vec![Value::Bool(true)]);
        for format in [OutputFormat::Binary, OutputFormat::Xml] {
            let options = ArchiverOptions::default().with_format(format);
            let bytes = archive_many(&[shared.clone(), shared.clone()], &options).unwrap();
            let roots = unarchive(&bytes).unwrap();
            assert_eq!(roots.len(), 2);
            assert!(roots[0].same_identity(&roots[1]));
        }
    }

    #[test]
    fn can_write_xml_with_archive_many() {
        let options = ArchiverOptions::default().with_format(OutputFormat::Xml);
        let bytes = archive_many(&[Value::Int(1)], &options).unwrap();
        assert!(bytes.starts_with(b"<?xml"));
    }

    #[test]
    fn cant_flatten_graph_deeper_than_default() {
        let mut value = Value::array(vec![]);
        for _ in 0..200 {
            value = Value::array(vec![value]);
        }
        assert_eq!(
            flatten(&[value]).unwrap_err(),
            EncodeError::GraphTooDeep(128)
        );
    }

    /// `depth` arrays, each holding the next, with `leaf` in the innermost one
    fn nested_values(depth: usize, leaf: Value) -> Value {
        let mut value = Value::array(vec![leaf]);
        for _ in 1..depth {
            value = Value::array(vec![value]);
        }
        value
    }

    #[test]
    fn can_round_trip_default_depth_with_scalar_leaf() {
        let value = nested_values(DEFAULT_MAX_DEPTH, Value::Int(1));
        let bytes = archive_binary(&value).unwrap();
        assert_eq!(unarchive(&bytes).unwrap(), vec![value]);
    }

    #[test]
    fn dates_and_urls_count_toward_depth() {
        let value = nested_values(DEFAULT_MAX_DEPTH - 1, Value::Date(0.5));
        let bytes = archive_binary(&value).unwrap();
        assert_eq!(unarchive(&bytes).unwrap(), vec![value]);

        for leaf in [
            Value::Date(0.5),
            Value::Url("https://example.com/".to_string()),
        ] {
            let value = nested_values(DEFAULT_MAX_DEPTH, leaf);
            assert!(matches!(
                archive_binary(&value),
                Err(ArchiverError::Encode(EncodeError::GraphTooDeep(128)))
            ));
        }
    }

    #[test]
    fn object_classes_survive_without_class_name() {
        let object = Value::object(
            Object::new("", vec!["Lost".to_string()]).with_field("k", Value::Int(1)),
        );
        let bytes = archive_binary(&object).unwrap();
        assert_eq!(unarchive(&bytes).unwrap(), vec![object]);
    }

    #[test]
    fn cant_read_object_using_known_class_name() {
        let object = Value::object(
            Object::new("NSArray", vec!["NSArray".to_string(), "NSObject".to_string()])
                .with_field("NS.objects", Value::array(vec![])),
        );
        let bytes = archive_binary(&object).unwrap();
        assert!(matches!(
            unarchive(&bytes),
            Err(ArchiverError::Decode(DecodeError::MalformedPayload(..)))
        ));
    }

    fn scalar() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::Int),
            (-1.0e9..1.0e9f64).prop_map(Value::Double),
            "[a-zA-Z0-9 ,.!]{0,12}".prop_map(Value::String),
            prop::collection::vec(any::<u8>(), 0..12).prop_map(Value::Bytes),
            (-1.0e9..1.0e9f64).prop_map(Value::Date),
            "[a-z]{1,8}".prop_map(|host| Value::Url(format!("https://{host}.example.com/"))),
        ]
    }

    fn graph() -> impl Strategy<Value = Value> {
        scalar().prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::array),
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::set),
                prop::collection::vec((inner.clone(), inner.clone()), 0..4)
                    .prop_map(Value::dictionary),
                (
                    "Custom[A-Z][a-z]{0,6}",
                    prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                )
                    .prop_map(|(class_name, fields): (String, BTreeMap<String, Value>)| {
                        let classes = vec![class_name.clone(), "NSObject".to_string()];
                        Value::object(Object {
                            class_name,
                            classes,
                            fields,
                        })
                    }),
            ]
        })
    }

    proptest! {
        #[test]
        fn any_graph_survives_round_trip(value in graph()) {
            let bytes = archive_binary(&value).unwrap();
            let decoded = unarchive(&bytes).unwrap();
            prop_assert_eq!(decoded, vec![value]);
        }
    }
}
