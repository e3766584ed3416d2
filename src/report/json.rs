use super::types::RunResults;
use anyhow::Result;
use std::path::Path;

/// Generate JSON report
pub async fn generate(results: &RunResults, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(results)?;

    if let Some(path) = output {
        std::fs::write(path, json)?;
        println!("JSON report saved to: {}", path.display());
    } else {
        println!("{}", json);
    }

    Ok(())
}

/// Write `results.json` into the output directory
pub fn write_report(results: &RunResults, output_dir: &Path) -> Result<std::path::PathBuf> {
    let path = output_dir.join("results.json");
    std::fs::write(&path, serde_json::to_string_pretty(results)?)?;
    Ok(path)
}
