//! Reads cohort definitions from JSON files.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use cohort_core::CohortDefinition;

const DEFINITION_FOLDER: &str = "query";

/// A definition file holds either one definition or a list of them.
pub fn parse_definitions(text: &str) -> anyhow::Result<Vec<CohortDefinition>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let definitions = if value.is_array() {
        serde_json::from_value(value)?
    } else {
        vec![serde_json::from_value(value)?]
    };
    Ok(definitions)
}

/// Load `file`, or every `<data_path>/query/*.json` in path order.
pub fn load_definitions(
    file: Option<&Path>,
    data_path: Option<&str>,
) -> anyhow::Result<Vec<CohortDefinition>> {
    let files = match (file, data_path) {
        (Some(file), _) => vec![file.to_path_buf()],
        (None, Some(root)) => definition_files(&Path::new(root).join(DEFINITION_FOLDER))?,
        (None, None) => bail!("No definition file given and no data path configured"),
    };

    let mut definitions = Vec::new();
    for path in &files {
        tracing::info!(file = %path.display(), "Loading definitions");
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        definitions.extend(
            parse_definitions(&text).with_context(|| format!("parsing {}", path.display()))?,
        );
    }
    Ok(definitions)
}

fn definition_files(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)
        .with_context(|| format!("listing {}", folder.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}
