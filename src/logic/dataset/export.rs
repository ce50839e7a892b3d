use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::logic::dataset::record::CombinedRecord;

const CSV_HEADER: &str = "timestamp,temperature,is_anomaly_temp,current,is_anomaly_current,\
humidity,is_anomaly_humidity,vibration,is_anomaly_vibration,pressure,is_anomaly_pressure,\
viscosity,is_anomaly_viscosity,power,is_anomaly_power,maintenance_needed,maintenance_probability";

/// Export the combined dataset as CSV (flags written as 0/1)
/// Returns the number of rows written
pub fn to_csv(records: &[CombinedRecord], target: &Path) -> io::Result<usize> {
    let mut out = BufWriter::new(File::create(target)?);
    writeln!(out, "{}", CSV_HEADER)?;

    let flag = |b: bool| if b { 1 } else { 0 };
    for r in records {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            r.timestamp.to_rfc3339(),
            r.temperature,
            flag(r.is_anomaly_temp),
            r.current,
            flag(r.is_anomaly_current),
            r.humidity,
            flag(r.is_anomaly_humidity),
            r.vibration,
            flag(r.is_anomaly_vibration),
            r.pressure,
            flag(r.is_anomaly_pressure),
            r.viscosity,
            flag(r.is_anomaly_viscosity),
            r.power,
            flag(r.is_anomaly_power),
            flag(r.maintenance_needed),
            r.maintenance_probability,
        )?;
    }

    out.flush()?;
    log::info!("Exported {} rows to {}", records.len(), target.display());
    Ok(records.len())
}
