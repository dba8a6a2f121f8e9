//! Integration tests for config and alias loading from fixture files.

use std::fs;
use std::path::Path;

use media_relocate::{AliasTable, TitleCanonicalizer};

/// Read the sample config file content.
fn read_sample_config() -> String {
    let config_path = Path::new("tests/fixtures/sample_config.toml");
    fs::read_to_string(config_path).expect("Failed to read sample config file")
}

#[test]
fn sample_config_is_valid_toml() {
    let config_content = read_sample_config();
    let result: Result<toml::Value, _> = toml::from_str(&config_content);
    assert!(result.is_ok(), "Sample config should be valid TOML: {:?}", result.err());
}

#[test]
fn relocate_section_has_expected_structure() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");

    let relocate = value.get("relocate").expect("should have relocate section");

    for key in [
        "sources",
        "destination",
        "aliases",
        "protected_dirs",
        "movies_dir",
        "series_dir",
        "season_label",
        "oracle",
        "cleanup",
        "auto",
        "dryrun",
        "verbose",
        "debug",
    ] {
        assert!(relocate.get(key).is_some(), "relocate section should have {key}");
    }
}

#[test]
fn config_values_have_correct_types() {
    let config_content = read_sample_config();
    let value: toml::Value = toml::from_str(&config_content).expect("should parse");
    let relocate = value.get("relocate").expect("should have relocate section");

    assert!(relocate.get("sources").unwrap().is_array());
    assert!(relocate.get("protected_dirs").unwrap().is_array());
    assert!(relocate.get("destination").unwrap().is_str());
    assert!(relocate.get("season_label").unwrap().is_str());
    assert!(relocate.get("oracle").unwrap().is_bool());
    assert!(relocate.get("cleanup").unwrap().is_bool());
}

#[test]
fn json_alias_fixture_loads() {
    let table = AliasTable::load(Path::new("tests/fixtures/aliases.json")).expect("should load aliases");
    assert_eq!(table.lookup("Money Heist"), Some("La Casa de Papel"));
    assert_eq!(table.lookup("money.heist"), Some("La Casa de Papel"));
    assert_eq!(table.lookup("Pocket Monsters"), Some("Pokémon"));
    assert_eq!(table.lookup("Office US"), Some("The Office (US)"));
    assert_eq!(table.lookup("La Casa de Papel"), Some("La Casa de Papel"));
    assert_eq!(table.lookup("Breaking Bad"), None);
}

#[test]
fn toml_alias_fixture_loads() {
    let table = AliasTable::load(Path::new("tests/fixtures/aliases.toml")).expect("should load aliases");
    assert_eq!(table.lookup("Casa de Papel"), Some("La Casa de Papel"));
    assert_eq!(table.lookup("Pokemon"), Some("Pokémon"));
}

#[test]
fn missing_alias_file_gives_empty_table() {
    let table = AliasTable::load_or_default(Some(Path::new("tests/fixtures/missing.json")), false);
    assert!(table.is_empty());
    assert!(AliasTable::load_or_default(None, false).is_empty());
}

#[test]
fn invalid_alias_file_gives_empty_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aliases.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(AliasTable::load(&path).is_err());
    assert!(AliasTable::load_or_default(Some(&path), false).is_empty());
}

#[test]
fn alias_fixture_drives_canonicalization() {
    let table = AliasTable::load(Path::new("tests/fixtures/aliases.json")).expect("should load aliases");
    let mut canonicalizer = TitleCanonicalizer::new(std::sync::Arc::new(table));
    assert_eq!(canonicalizer.canonicalize("Money Heist"), "La Casa de Papel");
    assert_eq!(canonicalizer.canonicalize("La Casa de Papel"), "La Casa de Papel");
}
