use std::fs::File;
use std::io::Error;
use std::path::Path;

/// Writes an events CSV with `rows` consecutive updates of one field, so a
/// replay run ends with the last value persisted.
pub fn generate_field_events(path: &Path, rows: usize) -> Result<(), Error> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new().from_writer(file);

    wtr.write_record(["op", "name", "value"])?;

    for i in 1..=rows {
        wtr.write_record(["field", "counterValue", &i.to_string()])?;
    }

    wtr.flush()?;
    Ok(())
}
