//! JSON and JSON Lines export writers.

use crate::export::{
    ExportConfig, ExportDocument, ExportError, ExportFormat, ExportHeader, ExportResult, ExportWriter, Sink,
};
use authwatch_audit_types::{Alert, AuditEvent};
use flate2::read::GzDecoder;
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Read, Write};

/// Writes the export as one pretty-printed JSON document.
///
/// Records are buffered until `finish`, since the totals lead the document.
pub struct JsonPrettyExporter<W: Write + Send> {
    sink: Sink<W>,
    header: Option<ExportHeader>,
    events: Vec<AuditEvent>,
    alerts: Vec<Alert>,
}

impl<W: Write + Send> JsonPrettyExporter<W> {
    pub fn new(writer: W, config: &ExportConfig) -> Self {
        Self {
            sink: Sink::new(writer, config.compress),
            header: None,
            events: Vec::new(),
            alerts: Vec::new(),
        }
    }
}

impl<W: Write + Send> ExportWriter for JsonPrettyExporter<W> {
    fn write_header(&mut self, header: &ExportHeader) -> ExportResult<()> {
        self.header = Some(header.clone());
        Ok(())
    }

    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()> {
        self.events.push(event.clone());
        Ok(())
    }

    fn write_alert(&mut self, alert: &Alert) -> ExportResult<()> {
        self.alerts.push(alert.clone());
        Ok(())
    }

    fn finish(&mut self) -> ExportResult<()> {
        let header = self
            .header
            .take()
            .ok_or_else(|| ExportError::Format("export header was never written".into()))?;
        let document = ExportDocument::from_parts(
            header,
            std::mem::take(&mut self.events),
            std::mem::take(&mut self.alerts),
        );
        serde_json::to_writer_pretty(&mut self.sink, &document)?;
        self.sink.write_all(b"\n")?;
        self.sink.finish()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.sink.written()
    }
}

#[derive(Serialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum RecordRef<'a> {
    Header(&'a ExportHeader),
    Event(&'a AuditEvent),
    Alert(&'a Alert),
}

#[derive(Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
enum Record {
    Header(ExportHeader),
    Event(AuditEvent),
    Alert(Alert),
}

/// Writes a header line followed by one line per event and alert.
pub struct JsonLinesExporter<W: Write + Send> {
    sink: Sink<W>,
}

impl<W: Write + Send> JsonLinesExporter<W> {
    pub fn new(writer: W, config: &ExportConfig) -> Self {
        Self {
            sink: Sink::new(writer, config.compress),
        }
    }

    fn write_line(&mut self, record: RecordRef<'_>) -> ExportResult<()> {
        serde_json::to_writer(&mut self.sink, &record)?;
        self.sink.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write + Send> ExportWriter for JsonLinesExporter<W> {
    fn write_header(&mut self, header: &ExportHeader) -> ExportResult<()> {
        self.write_line(RecordRef::Header(header))
    }

    fn write_event(&mut self, event: &AuditEvent) -> ExportResult<()> {
        self.write_line(RecordRef::Event(event))
    }

    fn write_alert(&mut self, alert: &Alert) -> ExportResult<()> {
        self.write_line(RecordRef::Alert(alert))
    }

    fn finish(&mut self) -> ExportResult<()> {
        self.sink.finish()?;
        Ok(())
    }

    fn bytes_written(&self) -> u64 {
        self.sink.written()
    }
}

/// Read an export written with `config` back into a document.
///
/// Fails with [`ExportError::Format`] when the record counts disagree with
/// the header, so a truncated file is never mistaken for a complete dump.
pub fn read_document<R: Read>(reader: R, config: &ExportConfig) -> ExportResult<ExportDocument> {
    let document = if config.compress {
        parse(GzDecoder::new(reader), config.format)?
    } else {
        parse(reader, config.format)?
    };

    if document.events.len() as u64 != document.total_events
        || document.alerts.len() as u64 != document.total_alerts
    {
        return Err(ExportError::Format(format!(
            "export {} declares {} events and {} alerts but contains {} and {}",
            document.export_id,
            document.total_events,
            document.total_alerts,
            document.events.len(),
            document.alerts.len()
        )));
    }
    Ok(document)
}

fn parse<R: Read>(reader: R, format: ExportFormat) -> ExportResult<ExportDocument> {
    match format {
        ExportFormat::JsonPretty => Ok(serde_json::from_reader(reader)?),
        ExportFormat::JsonLines => read_lines(BufReader::new(reader)),
    }
}

fn read_lines<R: BufRead>(reader: R) -> ExportResult<ExportDocument> {
    let mut header = None;
    let mut events = Vec::new();
    let mut alerts = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(&line)? {
            Record::Header(h) if header.is_none() && index == 0 => header = Some(h),
            Record::Header(_) => {
                return Err(ExportError::Format(format!("unexpected header on line {}", index + 1)))
            }
            Record::Event(e) => events.push(e),
            Record::Alert(a) => alerts.push(a),
        }
    }

    let header = header.ok_or_else(|| ExportError::Format("missing header line".into()))?;
    Ok(ExportDocument::from_parts(header, events, alerts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use authwatch_audit_types::{AlertId, AlertType, AuditEventId, EventStatus, EventType, NewAlert, RiskLevel};
    use authwatch_common_core::TimeRange;
    use authwatch_test_utils::at;

    fn document() -> ExportDocument {
        let mut details = authwatch_audit_types::EventDetails::new();
        details.insert("nested".into(), serde_json::json!({"a": [1, 2, {"b": null}]}));
        let event = AuditEvent::builder("alice", EventType::Login, EventStatus::Failure)
            .source("198.51.100.4")
            .details(details)
            .into_event(AuditEventId::new(1), at(3, 0, 0), RiskLevel::Low);
        let alert = NewAlert::new(AlertType::UnusualTiming, "alice", "late", at(3, 0, 0)).into_alert(AlertId::new(9));
        ExportDocument::new(TimeRange::between(at(0, 0, 0), at(23, 59, 59)), vec![event], vec![alert])
    }

    fn write(config: &ExportConfig, doc: &ExportDocument) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut writer: Box<dyn ExportWriter + '_> = match config.format {
                ExportFormat::JsonPretty => Box::new(JsonPrettyExporter::new(&mut buf, config)),
                ExportFormat::JsonLines => Box::new(JsonLinesExporter::new(&mut buf, config)),
            };
            writer.write_document(doc).unwrap();
        }
        buf
    }

    #[test]
    fn test_pretty_document_layout() {
        let doc = document();
        let bytes = write(&ExportConfig::new(ExportFormat::JsonPretty), &doc);
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(value["total_events"], 1);
        assert_eq!(value["events"][0]["event_type"], "LOGIN");
        assert_eq!(value["events"][0]["risk_level"], "LOW");
        assert_eq!(value["alerts"][0]["alert_type"], "UNUSUAL_TIMING");
        assert_eq!(value["alerts"][0]["resolved"], false);
        assert_eq!(value["events"][0]["details"]["nested"]["a"][2]["b"], serde_json::Value::Null);
    }

    #[test]
    fn test_json_lines_layout() {
        let doc = document();
        let bytes = write(&ExportConfig::new(ExportFormat::JsonLines), &doc);
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["record"], "header");
        assert_eq!(lines[0]["total_alerts"], 1);
        assert_eq!(lines[1]["record"], "event");
        assert_eq!(lines[1]["principal"], "alice");
        assert_eq!(lines[2]["record"], "alert");
    }

    #[test]
    fn test_read_back_every_format() {
        let doc = document();
        for format in [ExportFormat::JsonPretty, ExportFormat::JsonLines] {
            for compress in [false, true] {
                let config = ExportConfig::new(format).compressed(compress);
                let bytes = write(&config, &doc);
                assert_eq!(read_document(bytes.as_slice(), &config).unwrap(), doc, "{format} gzip={compress}");
            }
        }
    }

    #[test]
    fn test_gzip_output_is_compressed() {
        let bytes = write(&ExportConfig::new(ExportFormat::JsonLines).compressed(true), &document());
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
    }

    #[test]
    fn test_truncated_lines_rejected() {
        let config = ExportConfig::new(ExportFormat::JsonLines);
        let bytes = write(&config, &document());
        let text = String::from_utf8(bytes).unwrap();
        let truncated: String = text.lines().take(2).map(|l| format!("{l}\n")).collect();

        assert!(matches!(
            read_document(truncated.as_bytes(), &config),
            Err(ExportError::Format(_))
        ));
        assert!(matches!(read_document(&b""[..], &config), Err(ExportError::Format(_))));
    }

    #[test]
    fn test_pretty_requires_header() {
        let mut buf = Vec::new();
        let mut writer = JsonPrettyExporter::new(&mut buf, &ExportConfig::default());
        assert!(matches!(writer.finish(), Err(ExportError::Format(_))));
    }
}
