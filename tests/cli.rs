use std::fs;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

#[test]
fn validate_reports_success_for_a_well_formed_metadata_document() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("orders.csv"), "id,status\n1,shipped\n2,pending\n").expect("write csv");
    let metadata_path = dir.path().join("orders-metadata.json");
    fs::write(
        &metadata_path,
        r#"{"tables": [{"url": "orders.csv", "tableSchema": {"columns": [
            {"name": "id", "datatype": "integer"},
            {"name": "status", "datatype": "string"}
        ]}}]}"#,
    )
    .expect("write metadata");

    Command::cargo_bin("csvw").expect("binary exists")
        .args(["validate", "--metadata", metadata_path.to_str().unwrap()])
        .assert()
        .success();
}

#[test]
fn validate_fails_when_the_table_group_has_no_tables() {
    let dir = tempdir().expect("temp dir");
    let metadata_path = dir.path().join("empty-metadata.json");
    fs::write(&metadata_path, r#"{"tables": []}"#).expect("write metadata");

    Command::cargo_bin("csvw").expect("binary exists")
        .args(["validate", "--metadata", metadata_path.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn atd_renders_the_table_group_as_json() {
    let dir = tempdir().expect("temp dir");
    let metadata_path = dir.path().join("orders-metadata.json");
    fs::write(
        &metadata_path,
        r#"{"tables": [{"url": "orders.csv", "tableSchema": {"columns": [{"name": "id", "datatype": "integer"}]}}]}"#,
    )
    .expect("write metadata");

    Command::cargo_bin("csvw").expect("binary exists")
        .args(["atd", "--metadata", metadata_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("\"@type\": \"TableGroup\""))
        .stdout(contains("orders.csv"));
}

#[test]
fn atd_with_rows_nests_interpreted_cells_per_table() {
    let dir = tempdir().expect("temp dir");
    fs::write(dir.path().join("orders.csv"), "id,status\n1,shipped\n2,pending\n").expect("write csv");
    let metadata_path = dir.path().join("orders-metadata.json");
    fs::write(
        &metadata_path,
        r#"{"tables": [{"url": "orders.csv", "tableSchema": {"columns": [
            {"name": "id", "datatype": "integer"},
            {"name": "status", "datatype": "string"}
        ]}}]}"#,
    )
    .expect("write metadata");

    Command::cargo_bin("csvw").expect("binary exists")
        .args(["atd", "--metadata", metadata_path.to_str().unwrap(), "--rows"])
        .assert()
        .success()
        .stdout(contains("\"stringValue\": \"shipped\""));
}

#[test]
fn probe_infers_columns_from_a_bare_csv_header() {
    let dir = tempdir().expect("temp dir");
    let csv_path = dir.path().join("plain.csv");
    fs::write(&csv_path, "name,age\nAlice,30\n").expect("write csv");

    Command::cargo_bin("csvw").expect("binary exists")
        .args(["probe", "--input", csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(contains("\"@type\": \"Table\""))
        .stdout(contains("name"));
}

#[test]
fn probe_honors_input_encoding() {
    let dir = tempdir().expect("temp dir");
    let csv_path = dir.path().join("encoded.csv");
    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode("id,name\n1,Caf\u{e9}\n");
    fs::write(&csv_path, encoded.as_ref()).expect("write encoded csv");

    Command::cargo_bin("csvw").expect("binary exists")
        .args([
            "probe",
            "--input",
            csv_path.to_str().unwrap(),
            "--input-encoding",
            "windows-1252",
        ])
        .assert()
        .success()
        .stdout(contains("\"id\""))
        .stdout(contains("\"name\""));
}
