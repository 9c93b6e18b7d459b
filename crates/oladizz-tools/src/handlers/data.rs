//! JSON and CSV conversion.

use oladizz_core::{OutboundFile, Reply};
use oladizz_framework::{ActionContext, BackgroundTask, HandlerError, HandlerResult, Step};
use serde_json::{Map, Value};

use super::{extension, file, send, stem, workspace, write};
use crate::error::{ToolError, ToolResult};

// =============================================================================
// CSV
// =============================================================================

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Writes an array of objects (or one object) as CSV.
///
/// Columns are the union of the object keys in first-seen order.
pub fn json_to_csv(value: &Value) -> ToolResult<String> {
    let rows: Vec<&Map<String, Value>> = match value {
        Value::Object(object) => vec![object],
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_object()
                    .ok_or_else(|| ToolError::decode("every array element must be an object"))
            })
            .collect::<ToolResult<_>>()?,
        _ => return Err(ToolError::decode("expected an object or an array of objects")),
    };

    let mut columns: Vec<&str> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(&key.as_str()) {
                columns.push(key);
            }
        }
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(columns.iter()).map_err(ToolError::decode)?;
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| cell(row.get(*c))))
            .map_err(ToolError::decode)?;
    }
    let bytes = writer.into_inner().map_err(ToolError::decode)?;
    String::from_utf8(bytes).map_err(ToolError::decode)
}

/// Reads CSV with a header row into an array of objects with string values.
///
/// Short rows are padded with empty strings; blank lines are skipped.
pub fn csv_to_json(text: &str) -> ToolResult<Value> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(ToolError::decode)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(ToolError::decode)?;
        let object: Map<String, Value> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let value = record.get(i).unwrap_or_default();
                (h.clone(), Value::String(value.to_string()))
            })
            .collect();
        rows.push(Value::Object(object));
    }
    Ok(Value::Array(rows))
}

// =============================================================================
// Handlers
// =============================================================================

/// Checks the document's extension, keeping the action on a mismatch.
fn expect_extension(ctx: &ActionContext, wanted: &str) -> HandlerResult<oladizz_core::FileRef> {
    let document = file(ctx)?;
    let name = document.file_name.as_deref().unwrap_or_default();
    if extension(name).as_deref() != Some(wanted) {
        return Err(HandlerError::validation(format!(
            "Please send a valid {} file ending with `.{wanted}`.",
            wanted.to_uppercase()
        )));
    }
    Ok(document)
}

pub async fn json_file_to_csv(ctx: ActionContext) -> HandlerResult {
    let document = expect_extension(&ctx, "json")?;

    let task = BackgroundTask::new(
        "json_to_csv",
        "Sorry, I couldn't convert that JSON to CSV. Make sure it's a valid JSON file.",
        async move {
            let bytes = ctx.outbound().download_file(&document.file_id).await?;
            let value: Value = serde_json::from_slice(&bytes).map_err(ToolError::from)?;
            let csv = json_to_csv(&value)?;
            let dir = workspace(&ctx, "csv").await?;
            let out = dir.join(format!("{}.csv", stem(document.name_or("data.json"))));
            write(&out, csv.as_bytes()).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text("JSON converted to CSV successfully!")))
        },
    );
    Ok(Step::clear().spawn(task))
}

pub async fn csv_file_to_json(ctx: ActionContext) -> HandlerResult {
    let document = expect_extension(&ctx, "csv")?;

    let task = BackgroundTask::new(
        "csv_to_json",
        "Sorry, I couldn't convert that CSV to JSON. Make sure it's a valid CSV file.",
        async move {
            let bytes = ctx.outbound().download_file(&document.file_id).await?;
            let text = String::from_utf8(bytes).map_err(ToolError::decode)?;
            let json = serde_json::to_string_pretty(&csv_to_json(&text)?).map_err(ToolError::from)?;
            let dir = workspace(&ctx, "json").await?;
            let out = dir.join(format!("{}.json", stem(document.name_or("data.csv"))));
            write(&out, json.as_bytes()).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text("CSV converted to JSON successfully!")))
        },
    );
    Ok(Step::clear().spawn(task))
}

/// Sends the text unchanged as a `.csv` document.
pub async fn text_to_csv(ctx: ActionContext) -> HandlerResult {
    let body = ctx.event().text_content().unwrap_or_default().to_string();

    let task = BackgroundTask::new(
        "text_to_csv",
        "Sorry, I couldn't convert that text to CSV.",
        async move {
            let dir = workspace(&ctx, "csv").await?;
            let out = dir.join("text.csv");
            write(&out, body.as_bytes()).await?;
            send(&ctx, OutboundFile::document(&out)).await?;
            Ok(Some(Reply::text("Text converted to CSV successfully!")))
        },
    );
    Ok(Step::clear().spawn(task))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::testing::Harness;
    use oladizz_core::{EventKind, FileRef};
    use oladizz_framework::testing::RecordingOutbound;
    use serde_json::json;

    #[test]
    fn test_json_to_csv_columns_and_quoting() {
        let csv = json_to_csv(&json!([
            { "name": "Ada", "note": "says \"hi\", twice" },
            { "name": "Bob", "age": 41, "tags": ["x"] },
        ]))
        .unwrap();
        assert_eq!(
            csv,
            "name,note,age,tags\nAda,\"says \"\"hi\"\", twice\",,\nBob,,41,\"[\"\"x\"\"]\"\n"
        );
        assert!(json_to_csv(&json!(3)).is_err());
        assert!(json_to_csv(&json!([1])).is_err());
    }

    #[test]
    fn test_csv_to_json_quotes_and_newlines() {
        let value = csv_to_json("a,b\r\n\"1,2\",\"line\nbreak\"\n\n3,\"\"\"q\"\"\"").unwrap();
        assert_eq!(
            value,
            json!([
                { "a": "1,2", "b": "line\nbreak" },
                { "a": "3", "b": "\"q\"" },
            ])
        );
    }

    #[test]
    fn test_csv_to_json_pads_short_rows() {
        assert_eq!(
            csv_to_json("id,name\n1,Ada\n2\n").unwrap(),
            json!([{ "id": "1", "name": "Ada" }, { "id": "2", "name": "" }])
        );
        assert_eq!(csv_to_json("").unwrap(), json!([]));
    }

    #[tokio::test]
    async fn test_wrong_extension_keeps_waiting() {
        let h = Harness::new().await;
        h.press(1, "json_to_csv").await;
        h.file(1, EventKind::Document, FileRef::new("d").with_name("data.txt"))
            .await;
        assert_eq!(h.last_text(), "Please send a valid JSON file ending with `.json`.");
        assert_eq!(h.action(1).await.as_deref(), Some("awaiting_json_for_csv"));
    }

    #[tokio::test]
    async fn test_csv_file_to_json() {
        let outbound = RecordingOutbound::new().with_download("d", b"id,name\n1,Ada\n".to_vec());
        let h = Harness::with_outbound(outbound).await;
        h.press(1, "csv_to_json").await;
        h.file(1, EventKind::Document, FileRef::new("d").with_name("people.CSV"))
            .await;
        assert_eq!(h.doc(1).await, None);
        let (name, _, contents) = h.uploads().remove(0);
        assert_eq!(name, "people.json");
        let value: Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(value, json!([{ "id": "1", "name": "Ada" }]));
        assert_eq!(h.last_text(), "CSV converted to JSON successfully!");
    }

    #[tokio::test]
    async fn test_invalid_json_file_reports_failure() {
        let outbound = RecordingOutbound::new().with_download("d", b"{ broken".to_vec());
        let h = Harness::with_outbound(outbound).await;
        h.press(1, "json_to_csv").await;
        h.file(1, EventKind::Document, FileRef::new("d").with_name("x.json"))
            .await;
        assert_eq!(h.doc(1).await, None);
        assert_eq!(
            h.last_text(),
            "Sorry, I couldn't convert that JSON to CSV. Make sure it's a valid JSON file."
        );
    }

    #[tokio::test]
    async fn test_text_to_csv() {
        let h = Harness::new().await;
        h.press(1, "text_to_csv").await;
        h.text(1, "a,b\n1,2").await;
        assert_eq!(
            h.uploads(),
            vec![("text.csv".to_string(), None, "a,b\n1,2".to_string())]
        );
    }
}
