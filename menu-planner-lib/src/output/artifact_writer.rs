use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::data_types::{ShoppingList, WeeklyPlan};
use crate::error::PlannerError;

pub const PLAN_FILE: &str = "plan.json";
pub const SHOPPING_FILE: &str = "shopping_list.json";

/// Serializes `plan.json` into `out_dir`, creating the directory if needed.
pub fn write_plan(out_dir: &Path, plan: &WeeklyPlan) -> Result<PathBuf, PlannerError> {
    let bytes = to_json_bytes(plan, "plan")?;
    write_atomic(out_dir, PLAN_FILE, &bytes)
}

/// Serializes `shopping_list.json` into `out_dir`.
pub fn write_shopping_list(out_dir: &Path, list: &ShoppingList) -> Result<PathBuf, PlannerError> {
    let bytes = to_json_bytes(list, "shopping list")?;
    write_atomic(out_dir, SHOPPING_FILE, &bytes)
}

fn to_json_bytes<T: serde::Serialize>(value: &T, what: &'static str) -> Result<Vec<u8>, PlannerError> {
    let mut bytes = serde_json::to_vec_pretty(value).map_err(|source| PlannerError::Json {
        what,
        source,
    })?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Write-then-rename so a crash never leaves a half-written artifact behind.
fn write_atomic(out_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, PlannerError> {
    fs::create_dir_all(out_dir).map_err(|err| PlannerError::io(out_dir, err))?;
    let final_path = out_dir.join(file_name);
    let tmp_path = out_dir.join(format!("{file_name}.tmp"));
    fs::write(&tmp_path, bytes).map_err(|err| PlannerError::io(&tmp_path, err))?;
    fs::rename(&tmp_path, &final_path).map_err(|err| PlannerError::io(&final_path, err))?;
    info!(path = %final_path.display(), "artifact written");
    Ok(final_path)
}
