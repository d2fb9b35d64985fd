#[cfg(test)]
mod unarchive_tests {
    use std::env::current_dir;
    use std::fs::File;
    use std::io::Read;

    use json::JsonValue;

    use crate::{
        archiver::{
            codec::{archive_binary, archive_many, unarchive},
            models::Value,
        },
        error::{archiver::ArchiverError, validation::ValidationError},
        util::options::{ArchiverOptions, OutputFormat},
    };

    const PRIMITIVES: &str = "[1,1,1,1.5,\"YXNkZmFzZGZhZHNmYWRzZg==\",true,\"Hello, World!\",\"Hello, World!\",\"Hello, World!\",false,false,42]";

    fn read_fixture(name: &str) -> Vec<u8> {
        let fixture_path = current_dir()
            .unwrap()
            .as_path()
            .join("test_data/archiver")
            .join(name);
        let mut file = File::open(fixture_path).unwrap();
        let mut bytes = vec![];
        file.read_to_end(&mut bytes).unwrap();
        bytes
    }

    fn as_json(roots: &[Value]) -> String {
        json::stringify(JsonValue::Array(roots.iter().map(Value::to_json).collect()))
    }

    /// Decode both the XML and binary fixture and check they render the same JSON
    fn check_fixture(name: &str, expected: &str) -> Vec<Value> {
        let from_xml = unarchive(&read_fixture(&format!("{name}.xml"))).unwrap();
        assert_eq!(as_json(&from_xml), expected);

        let from_bin = unarchive(&read_fixture(&format!("{name}.bin"))).unwrap();
        assert_eq!(as_json(&from_bin), expected);

        assert_eq!(from_xml, from_bin);
        from_bin
    }

    fn validation_error(name: &str) -> ValidationError {
        match unarchive(&read_fixture(name)) {
            Err(ArchiverError::Validation(why)) => why,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn can_decode_one_value() {
        let roots = check_fixture("onevalue", "[true]");
        assert_eq!(roots, vec![Value::Bool(true)]);
    }

    #[test]
    fn can_decode_primitives() {
        let roots = check_fixture("primitives", PRIMITIVES);
        assert_eq!(roots.len(), 12);
        assert_eq!(roots[0], Value::Int(1));
        assert_eq!(roots[2], Value::Double(1.0));
        assert_eq!(roots[4], Value::Bytes(b"asdfasdfadsfadsf".to_vec()));
        assert_eq!(roots[11], Value::Int(42));
    }

    #[test]
    fn can_decode_arrays_and_sets() {
        let expected = format!(
            "[{PRIMITIVES},[true,\"Hello, World!\",42],[true],[42,true,\"Hello, World!\"]]"
        );
        let roots = check_fixture("arrays", &expected);
        assert!(matches!(roots[0], Value::Array(_)));
        assert!(matches!(roots[1], Value::Array(_)));
        assert!(matches!(roots[2], Value::Set(_)));
        assert!(matches!(roots[3], Value::Set(_)));
    }

    #[test]
    fn can_decode_nested_arrays() {
        let roots = check_fixture("nestedarrays", "[[[true],[42,true,\"Hello, World!\"]]]");
        let outer = roots[0].as_array().unwrap();
        assert!(matches!(outer[0], Value::Set(_)));
        assert_eq!(
            outer[1],
            Value::set(vec![Value::from("Hello, World!"), Value::Int(42), Value::Bool(true)])
        );
    }

    #[test]
    fn can_decode_dictionary() {
        let roots = check_fixture(
            "dict",
            "[{\"array\":[true,\"Hello, World!\",42],\"int\":1,\"string\":\"string\"}]",
        );
        let pairs = roots[0].as_dictionary().unwrap();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[1], (Value::from("int"), Value::Int(1)));
    }

    #[test]
    fn can_archive_decoded_fixtures_again() {
        for name in ["primitives", "arrays", "nestedarrays", "dict"] {
            let roots = unarchive(&read_fixture(&format!("{name}.bin"))).unwrap();
            for format in [OutputFormat::Binary, OutputFormat::Xml] {
                let options = ArchiverOptions::default().with_format(format);
                let bytes = archive_many(&roots, &options).unwrap();
                assert_eq!(unarchive(&bytes).unwrap(), roots, "{name} as {format}");
            }
        }
    }

    #[test]
    fn can_decode_single_archived_root() {
        let roots = unarchive(&read_fixture("dict.xml")).unwrap();
        let bytes = archive_binary(&roots[0]).unwrap();
        assert_eq!(unarchive(&bytes).unwrap(), roots);
    }

    #[test]
    fn cant_decode_missing_archiver() {
        assert_eq!(
            validation_error("missing_archiver.xml"),
            ValidationError::MissingKey("$archiver")
        );
    }

    #[test]
    fn cant_decode_wrong_archiver() {
        assert_eq!(
            validation_error("wrong_archiver.xml"),
            ValidationError::WrongArchiverName("NSArchiver".to_string())
        );
    }

    #[test]
    fn cant_decode_missing_top() {
        assert_eq!(
            validation_error("missing_top.xml"),
            ValidationError::MissingKey("$top")
        );
    }

    #[test]
    fn cant_decode_missing_objects() {
        assert_eq!(
            validation_error("missing_objects.xml"),
            ValidationError::MissingKey("$objects")
        );
    }

    #[test]
    fn cant_decode_missing_version() {
        assert_eq!(
            validation_error("missing_version.xml"),
            ValidationError::MissingKey("$version")
        );
    }

    #[test]
    fn cant_decode_wrong_version() {
        assert_eq!(
            validation_error("wrong_version.xml"),
            ValidationError::WrongVersion("200000".to_string())
        );
    }

    #[test]
    fn cant_decode_broken_plist() {
        let result = unarchive(&read_fixture("broken_plist.xml"));
        assert!(matches!(result, Err(ArchiverError::PlistSyntax(_))));
    }

    #[test]
    fn cant_decode_truncated_binary() {
        let mut bytes = read_fixture("dict.bin");
        bytes.truncate(bytes.len() / 2);
        assert!(unarchive(&bytes).is_err());
    }
}
