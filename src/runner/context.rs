use std::path::{Path, PathBuf};

/// Runtime information shared by every table in a run
pub struct RunContext {
    /// Base directory for tables (for resolving relative paths)
    pub base_dir: PathBuf,

    /// Output directory for reports
    pub output_dir: PathBuf,

    /// Logging facility attached to records
    pub facility_id: String,

    /// App map attached to records
    pub app_map_name: String,
}

impl RunContext {
    pub fn new(base_dir: &Path, output_dir: Option<&Path>, facility_id: &str, app_map_name: &str) -> Self {
        let output = output_dir.map(|p| p.to_path_buf()).unwrap_or_else(|| {
            let mut path = base_dir.to_path_buf();
            path.push("output");
            path
        });

        Self {
            base_dir: base_dir.to_path_buf(),
            output_dir: output,
            facility_id: facility_id.to_string(),
            app_map_name: app_map_name.to_string(),
        }
    }

    /// Make sure the output directory exists
    pub fn ensure_output_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.output_dir)
    }

    /// Resolve a relative path against the base directory
    pub fn resolve_path(&self, relative: &Path) -> PathBuf {
        if relative.is_absolute() {
            relative.to_path_buf()
        } else {
            self.base_dir.join(relative)
        }
    }

    /// Get the output path for a file
    pub fn output_path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let ctx = RunContext::new(Path::new("/tables"), None, "lumi", "");
        assert_eq!(ctx.output_dir, PathBuf::from("/tables/output"));
        assert_eq!(ctx.resolve_path(Path::new("scripts")), PathBuf::from("/tables/scripts"));
        assert_eq!(ctx.resolve_path(Path::new("/opt/scripts")), PathBuf::from("/opt/scripts"));
        assert_eq!(ctx.output_path("junit.xml"), PathBuf::from("/tables/output/junit.xml"));
    }
}
