use crate::cli::*;

fn assert_fails_with(temp_dir: &TempDir, args: &[&str], message: &str) {
    let output = eavstore(temp_dir, args);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains(message), "{stderr}");
}

#[test]
fn test_cli_errors() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_and_data_dir("")?;

    assert_fails_with(&temp_dir, &["schema", "1"], "Table 1 doesn't exist");
    assert_fails_with(&temp_dir, &["define", "{"], "Failed parsing JSON argument");
    assert_fails_with(
        &temp_dir,
        &["define", r#"{"name": "movies"}"#],
        "Invalid table definition",
    );

    let created = eavstore_json(
        &temp_dir,
        &[
            "define",
            r#"{"name": "movies", "fields": [
                {"name": "title", "attr_type": "str", "required": true},
                {"name": "year", "attr_type": "int"}
            ]}"#,
        ],
    );
    let table_id = created["id"].as_i64().unwrap().to_string();

    assert_fails_with(
        &temp_dir,
        &["insert", &table_id, r#"{"year": 1995}"#],
        "The attribute title is required",
    );
    assert_fails_with(
        &temp_dir,
        &["insert", &table_id, r#"{"title": "Heat", "year": "1995"}"#],
        "Attribute type for year does not match",
    );

    // Nothing was written by the failed inserts
    assert_eq!(
        eavstore_json(&temp_dir, &["data", &table_id]),
        serde_json::json!({"title": null, "year": null, "name": "movies"})
    );

    Ok(())
}

#[test]
fn test_cli_invalid_config() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_and_data_dir("")?;
    std::fs::write(
        temp_dir.path().join(TEST_CONFIG_FILE),
        "[catalog]\ntype = \"sqlite\"\ndsn = \"\"\n",
    )?;

    assert_fails_with(&temp_dir, &["list"], "The catalog DSN can't be empty");

    Ok(())
}
