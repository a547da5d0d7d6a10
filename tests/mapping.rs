mod common;

use mega2cv::mapping::{DecimalSeparator, Mapping, NumericPolicy, Origin};

use common::{TestWorkspace, UNIT_MAPPING};

#[test]
fn json_mapping_loads_with_bom_prefix() {
    let workspace = TestWorkspace::new();
    let mut contents = String::from("\u{feff}");
    contents.push_str(UNIT_MAPPING);
    let path = workspace.write("mapping.json", &contents);

    let mapping = Mapping::load(&path).unwrap();
    assert_eq!(mapping.columns.len(), 6);
    assert_eq!(mapping.settings.decimal_sep_source, DecimalSeparator::Comma);
    assert_eq!(mapping.settings.numeric_policy, NumericPolicy::BestEffort);
}

#[test]
fn yaml_extension_selects_the_yaml_parser() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "mapping.yaml",
        r#"
columns:
  Unidade:
    origin: mega
    mega_column: UNIDADE
  Andar:
    origin: logical
    source_col: Unidade
    rule: slice_andar
settings:
  csv_delimiter: ";"
  numeric_policy: strict
"#,
    );

    let mapping = Mapping::load(&path).unwrap();
    assert_eq!(mapping.columns.names(), vec!["Unidade", "Andar"]);
    assert_eq!(mapping.settings.numeric_policy, NumericPolicy::Strict);
    assert!(matches!(
        mapping.columns.get("Unidade").unwrap().origin,
        Origin::Mega { .. }
    ));
}

#[test]
fn malformed_mapping_fails_before_any_processing() {
    let workspace = TestWorkspace::new();
    let path = workspace.write("mapping.json", "{ not json");
    let err = Mapping::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("Parsing mapping"));
}

#[test]
fn unknown_origin_mentions_the_offending_file() {
    let workspace = TestWorkspace::new();
    let path = workspace.write(
        "mapping.json",
        r#"{ "columns": { "Campo": { "origin": "telepathy" } } }"#,
    );
    let err = Mapping::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("mapping.json"));
}

#[test]
fn missing_mapping_file_is_reported_with_its_path() {
    let workspace = TestWorkspace::new();
    let path = workspace.path().join("absent.json");
    let err = Mapping::load(&path).unwrap_err();
    assert!(format!("{err:#}").contains("absent.json"));
}
