//! This module is responsible for exfilling decoded records to a flat file

use std::io::{self, Write};

use chrono::{Datelike, Timelike, Utc};

use crate::unpack::SampleRecord;

/// Timestamped default name for a capture file
pub fn default_filename() -> String {
    let now = Utc::now();
    format!(
        "iq-{}-{:02}-{:02}-{:02}:{:02}:{:02}.csv",
        now.year(),
        now.month(),
        now.day(),
        now.hour(),
        now.minute(),
        now.second()
    )
}

/// Write one line per record: four decimal fields in `Q1,I1,Q2,I2` order,
/// newline-terminated, no header row. Lines land in buffer order.
pub fn write_records<W, I>(sink: &mut W, records: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = SampleRecord>,
{
    for r in records {
        writeln!(
            sink,
            "{},{},{},{}",
            r.first.im, r.first.re, r.second.im, r.second.re
        )?;
    }
    Ok(())
}
