use super::RunReport;
use std::path::Path;

pub fn write_json(report: &RunReport, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let body = serde_json::to_string_pretty(report)?;
    std::fs::write(out, body)?;
    Ok(())
}

pub fn read_json(path: &Path) -> anyhow::Result<RunReport> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}
