use crate::database::SensorDb;
use crate::models::sensor::truncate;
use crate::models::SensorRecord;
use crate::renderer::json::{self, JsonBuffer};
use log::debug;
use std::fs;
use std::path::Path;

/// Length of `YYYY-MM-DD`, the part of an archive name listed in the history.
const DATE_LENGTH: usize = 10;

/// Common inputs of every view.
pub struct ViewContext<'a> {
    pub host: &'a str,
    pub timestamp: i64,
    /// Maximum size of the produced document, in bytes.
    pub limit: usize,
}

/// Latest value of every sensor, grouped by location.
pub fn latest(db: &SensorDb, ctx: &ViewContext) -> String {
    let open = format!(
        "{{\"host\":{},\"timestamp\":{},\"sensor\":{{",
        json::quote(ctx.host),
        ctx.timestamp
    );
    let mut doc = JsonBuffer::new(ctx.limit, &open, "}}");

    'locations: for (location, group) in db.locations().iter() {
        if !doc.open(&format!("{}:[", json::quote(location)), "]") {
            break;
        }
        for record in group.iter().filter_map(|id| db.sensor(*id)) {
            if !doc.push(&latest_entry(record)) {
                doc.close();
                break 'locations;
            }
        }
        doc.close();
    }

    doc.finish()
}

fn latest_entry(record: &SensorRecord) -> String {
    let mut entry = format!("{{\"name\":{}", json::quote(&record.name));
    if record.is_updated() {
        entry.push_str(&format!(",\"timestamp\":{}", record.timestamp));
    }
    entry.push_str(&format!(",\"value\":{}", json::value(&record.value)));
    if !record.unit.is_empty() {
        entry.push_str(&format!(",\"unit\":{}", json::quote(&record.unit)));
    }
    entry.push('}');
    entry
}

/// Recent updates, newest first.
pub fn recent(db: &SensorDb, ctx: &ViewContext) -> String {
    let open = format!(
        "{{\"sensor\":{{\"timestamp\":{},\"host\":{},\"recent\":[",
        ctx.timestamp,
        json::quote(ctx.host)
    );
    let mut doc = JsonBuffer::new(ctx.limit, &open, "]}}");

    for event in db.events().recent() {
        let Some(record) = db.sensor(event.sensor) else {
            continue;
        };
        let mut entry = format!(
            "{{\"location\":{},\"name\":{},\"time\":{},\"value\":{}",
            json::quote(&record.location),
            json::quote(&record.name),
            event.timestamp,
            json::value(&event.value)
        );
        if !record.unit.is_empty() {
            entry.push_str(&format!(",\"unit\":{}", json::quote(&record.unit)));
        }
        entry.push('}');

        if !doc.push(&entry) {
            break;
        }
    }

    doc.finish()
}

/// Days for which an archive file exists in `directory`: the date prefix of
/// every visible file name.
pub fn history(directory: &Path, ctx: &ViewContext) -> String {
    let open = format!(
        "{{\"sensor\":{{\"timestamp\":{},\"host\":{},\"history\":[",
        ctx.timestamp,
        json::quote(ctx.host)
    );
    let mut doc = JsonBuffer::new(ctx.limit, &open, "]}}");

    match fs::read_dir(directory) {
        Ok(entries) => {
            for entry in entries.flatten() {
                if !entry.file_type().is_ok_and(|file_type| file_type.is_file()) {
                    continue;
                }
                let name = entry.file_name();
                let Some(name) = name.to_str() else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                if !doc.push(&json::quote(truncate(name, DATE_LENGTH))) {
                    break;
                }
            }
        }
        Err(e) => debug!("No archive in {}: {}", directory.display(), e),
    }

    doc.finish()
}
