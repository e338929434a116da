use anyhow::Result;
use httpmock::prelude::*;
use pipedeals_export::{EtlEngine, ExportError, ExportPipeline, LocalStorage, TomlConfig};
use serde_json::{json, Value};
use tempfile::TempDir;

fn page(page: u64, pages: u64, entries: Value) -> Value {
    json!({"pagination": {"page": page, "pages": pages}, "entries": entries})
}

/// Serves the three label collections plus single-page users and deals.
fn mock_labels_and_people(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/admin/company_custom_field_labels.json");
        then.status(200)
            .json_body(page(1, 1, json!([{"id": 42, "name": "Region", "field_type": "text"}])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/admin/deal_custom_field_labels.json");
        then.status(200)
            .json_body(page(1, 1, json!([{"id": 77, "name": "Lead Source"}])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/admin/person_custom_field_labels.json");
        then.status(200).json_body(page(1, 0, json!([])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/users.json");
        then.status(200).json_body(page(
            1,
            1,
            json!([{"id": 5, "first_name": "Ada", "email": "ada@example.com"}]),
        ));
    });
}

fn config_for(server: &MockServer, output: &str, export_section: &str) -> TomlConfig {
    let content = format!(
        r#"
[source]
base_url = "{}"
api_key = "integration-key"

{}

[load]
output_path = "{}"
"#,
        server.base_url(),
        export_section,
        output
    );
    TomlConfig::from_toml_str(&content).unwrap()
}

fn read_csv(path: &std::path::Path) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut reader = csv::ReaderBuilder::new().from_path(path)?;
    let header = reader.headers()?.iter().map(str::to_string).collect();
    let rows = reader
        .records()
        .map(|r| r.map(|record| record.iter().map(str::to_string).collect()))
        .collect::<std::result::Result<Vec<Vec<String>>, _>>()?;
    Ok((header, rows))
}

#[tokio::test]
async fn test_end_to_end_export_writes_three_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();
    mock_labels_and_people(&server);

    let companies_page_1 = server.mock(|when, then| {
        when.method(GET)
            .path("/companies.json")
            .query_param("page", "1")
            .query_param("api_key", "integration-key");
        then.status(200).json_body(page(
            1,
            2,
            json!([{
                "id": 1,
                "name": "Acme \"Rockets\"",
                "address": {"city": "Springfield", "zip": "9"},
                "custom_fields": {"custom_label_42": "East"}
            }]),
        ));
    });
    let companies_page_2 = server.mock(|when, then| {
        when.method(GET).path("/companies.json").query_param("page", "2");
        then.status(200).json_body(page(
            2,
            2,
            json!([{"id": 2, "name": "Beta", "phone": "555-0100"}]),
        ));
    });
    let deals = server.mock(|when, then| {
        when.method(GET).path("/deals.json");
        then.status(200).json_body(page(
            1,
            1,
            json!([{
                "id": 9,
                "deal_value": 1200.5,
                "is_won": true,
                "secret_notes": "drop me",
                "custom_fields": {"custom_label_77": "Referral"}
            }]),
        ));
    });

    let config = config_for(&server, &output, "[export]\nexclude = [\"secret_notes\"]");
    let storage = LocalStorage::new(output.clone());
    let engine = EtlEngine::new(ExportPipeline::new(storage, config));

    let paths = engine.run().await?;

    companies_page_1.assert();
    companies_page_2.assert();
    deals.assert();
    assert_eq!(paths.len(), 3);

    let (header, rows) = read_csv(&temp_dir.path().join("companies.csv"))?;
    assert_eq!(
        header,
        vec!["Id", "Name", "Address City", "Address Zip", "Region", "Phone"]
    );
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], vec!["1", "Acme \"Rockets\"", "Springfield", "9", "East", ""]);
    assert_eq!(rows[1], vec!["2", "Beta", "", "", "", "555-0100"]);

    let raw = std::fs::read_to_string(temp_dir.path().join("deals.csv"))?;
    assert_eq!(raw, "Id,Deal Value,Is Won,Lead Source\r\n9,1200.5,true,\"Referral\"\r\n");

    let (header, rows) = read_csv(&temp_dir.path().join("users.csv"))?;
    assert_eq!(header, vec!["Id", "First Name", "Email"]);
    assert_eq!(rows, vec![vec!["5", "Ada", "ada@example.com"]]);

    Ok(())
}

#[tokio::test]
async fn test_unknown_custom_field_aborts_export() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();
    mock_labels_and_people(&server);

    server.mock(|when, then| {
        when.method(GET).path("/companies.json");
        then.status(200).json_body(page(
            1,
            1,
            json!([{"id": 1, "custom_fields": {"custom_label_999": "orphan"}}]),
        ));
    });

    let config = config_for(&server, &output, "");
    let engine = EtlEngine::new(ExportPipeline::new(LocalStorage::new(output.clone()), config));

    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, ExportError::UnknownField { ref field_id, .. } if field_id == "999"));
    assert!(!temp_dir.path().join("companies.csv").exists());
    Ok(())
}

#[tokio::test]
async fn test_skip_policy_exports_without_unknown_field() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();
    mock_labels_and_people(&server);

    server.mock(|when, then| {
        when.method(GET).path("/companies.json");
        then.status(200).json_body(page(
            1,
            1,
            json!([{"id": 1, "custom_fields": {"custom_label_999": "orphan", "custom_label_42": "North"}}]),
        ));
    });
    server.mock(|when, then| {
        when.method(GET).path("/deals.json");
        then.status(200).json_body(page(1, 1, json!([])));
    });

    let config = config_for(
        &server,
        &output,
        "[export]\non_unknown_field = \"skip\"\nquotes = \"fold\"",
    );
    let engine = EtlEngine::new(ExportPipeline::new(LocalStorage::new(output.clone()), config));

    engine.run().await?;

    let companies = std::fs::read_to_string(temp_dir.path().join("companies.csv"))?;
    assert_eq!(companies, "Id,Region\r\n1,\"North\"\r\n");
    let deals = std::fs::read_to_string(temp_dir.path().join("deals.csv"))?;
    assert_eq!(deals, "\r\n");
    Ok(())
}

#[tokio::test]
async fn test_transport_failure_keeps_earlier_files() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let output = temp_dir.path().to_str().unwrap().replace('\\', "/");
    let server = MockServer::start();
    mock_labels_and_people(&server);

    server.mock(|when, then| {
        when.method(GET).path("/companies.json");
        then.status(200).json_body(page(1, 1, json!([{"id": 1}])));
    });
    server.mock(|when, then| {
        when.method(GET).path("/deals.json");
        then.status(502);
    });

    let config = config_for(&server, &output, "");
    let engine = EtlEngine::new(ExportPipeline::new(LocalStorage::new(output.clone()), config));

    let err = engine.run().await.unwrap_err();

    assert!(matches!(err, ExportError::ApiStatus { status: 502, .. }));
    assert!(temp_dir.path().join("companies.csv").exists());
    assert!(temp_dir.path().join("users.csv").exists());
    assert!(!temp_dir.path().join("deals.csv").exists());
    Ok(())
}
