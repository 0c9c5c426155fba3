//! JSON Lines file output.

use oladoc_scraper::dataset::{JsonLinesSink, RecordSink};
use oladoc_scraper::models::DoctorRecord;
use tempfile::tempdir;

fn record(id: &str, name: &str) -> DoctorRecord {
    DoctorRecord {
        id: id.to_string(),
        url: format!("https://oladoc.com/pakistan/lahore/dr/dermatologist/x/{id}"),
        name: name.to_string(),
        city: "lahore".to_string(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_file_sink_creates_parent_and_appends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out").join("doctors.jsonl");

    let sink = JsonLinesSink::open(&path).await.unwrap();
    sink.emit(&record("1", "Dr. One")).await.unwrap();
    sink.flush().await.unwrap();
    drop(sink);

    let sink = JsonLinesSink::open(&path).await.unwrap();
    sink.emit(&record("2", "Dr. Two")).await.unwrap();
    sink.flush().await.unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<serde_json::Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["id"], "1");
    assert_eq!(lines[1]["name"], "Dr. Two");
    assert_eq!(lines[1]["verifiedFlag"], false);
    assert!(lines[1].get("phone").is_none());
}
