use serde_json::json;

use crate::cli::*;

#[test]
fn test_cli_basic() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_and_data_dir("")?;

    // Every invocation is a separate process, so this also checks the
    // catalog is persisted between them
    let created = eavstore_json(
        &temp_dir,
        &[
            "define",
            r#"{"name": "movies", "fields": [
                {"name": "title", "attr_type": "str", "unique": true, "required": true},
                {"name": "genre", "attr_type": "str"},
                {"name": "release_date", "attr_type": "datetime"}
            ]}"#,
        ],
    );
    let table_id = created["id"].as_i64().unwrap();
    assert_eq!(
        created,
        json!({
            "id": table_id,
            "name": "movies",
            "fields": [
                {"name": "title", "attr_type": "str", "unique": true, "required": true},
                {"name": "genre", "attr_type": "str", "unique": false, "required": false},
                {"name": "release_date", "attr_type": "datetime", "unique": false, "required": false}
            ]
        })
    );

    let table_id_arg = table_id.to_string();
    let data = eavstore_json(
        &temp_dir,
        &[
            "insert",
            &table_id_arg,
            r#"{"title": "Die Hard", "release_date": "20/07/1988"}"#,
        ],
    );
    assert_eq!(
        data,
        json!({
            "title": "Die Hard",
            "genre": null,
            "release_date": "1988-07-20T00:00:00",
            "name": "movies"
        })
    );

    assert_eq!(
        eavstore_json(&temp_dir, &["schema", &table_id_arg]),
        json!({
            "name": "movies",
            "fields": created["fields"].clone()
        })
    );
    assert_eq!(eavstore_json(&temp_dir, &["data", &table_id_arg]), data);

    assert_eq!(
        eavstore_json(&temp_dir, &["filter", "title=Die Hard", "genre=Drama"]),
        json!([{"id": table_id, "table": data}])
    );
    assert_eq!(
        eavstore_json(&temp_dir, &["filter", "title=Heat"]),
        json!([])
    );
    assert_eq!(
        eavstore_json(&temp_dir, &["list"]),
        json!([{"id": table_id, "table": data}])
    );

    assert_eq!(
        eavstore_json(&temp_dir, &["delete", &table_id_arg]),
        json!({"deleted": table_id})
    );
    assert_eq!(eavstore_json(&temp_dir, &["list"]), json!([]));

    Ok(())
}

#[test]
fn test_cli_typed_filter_from_config() -> std::io::Result<()> {
    let temp_dir = setup_temp_config_and_data_dir("[filter]\nmode = \"typed\"")?;

    let created = eavstore_json(
        &temp_dir,
        &[
            "define",
            r#"{"name": "ratings", "fields": [{"name": "score", "attr_type": "float"}]}"#,
        ],
    );
    let table_id = created["id"].as_i64().unwrap();
    eavstore_json(&temp_dir, &["insert", &table_id.to_string(), r#"{"score": 8.5}"#]);

    let found = eavstore_json(&temp_dir, &["filter", "score=8.50"]);
    assert_eq!(found[0]["id"], json!(table_id));

    Ok(())
}
