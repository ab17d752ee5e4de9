use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;
use serde::Serialize;

use crate::error::{PipelineError, Result};
use crate::metrics::to_long_format;
use crate::pipeline::PipelineRun;

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let name = path.display().to_string();
    let mut writer = csv::Writer::from_path(path).map_err(|e| PipelineError::csv(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| PipelineError::Output {
            name: name.clone(),
            reason: e.to_string(),
        })?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| PipelineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).map_err(|e| PipelineError::Output {
        name: path.display().to_string(),
        reason: e.to_string(),
    })?;
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

// Moves staged files into `dir`. Every target is checked before the first
// rename, so a name held by a directory fails with nothing replaced. A rename
// failing midway (disk or permission trouble) can still leave a mix of old
// and new tables.
fn publish(stage: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut moves = Vec::new();
    for entry in fs::read_dir(stage).map_err(|e| PipelineError::io(stage, e))? {
        let entry = entry.map_err(|e| PipelineError::io(stage, e))?;
        moves.push((entry.path(), dir.join(entry.file_name())));
    }
    moves.sort();

    if let Some((_, blocked)) = moves.iter().find(|(_, target)| target.is_dir()) {
        return Err(PipelineError::Output {
            name: blocked.display().to_string(),
            reason: "a directory already exists at this path".to_string(),
        });
    }

    let mut written = Vec::with_capacity(moves.len());
    for (staged, target) in moves {
        fs::rename(&staged, &target).map_err(|e| PipelineError::io(&target, e))?;
        written.push(target);
    }
    Ok(written)
}

// Writes every output table of a run.
// Inputs: target directory, finished pipeline run
// Outputs: final paths of the written files
// Key steps:
// 1. Write all tables into a staging directory inside the target
// 2. Only once every file succeeded, move them into the target directory
// A failure in step 1, or a blocked target name, leaves the target
// directory untouched.
pub fn write_outputs(dir: &Path, run: &PipelineRun) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir).map_err(|e| PipelineError::io(dir, e))?;
    let staging = tempfile::Builder::new()
        .prefix(".staging-")
        .tempdir_in(dir)
        .map_err(|e| PipelineError::io(dir, e))?;
    let stage = staging.path();

    let user_rows = run.user_rows();
    write_csv(&stage.join("user_metrics.csv"), &user_rows)?;
    write_csv(
        &stage.join("user_metrics_long.csv"),
        &to_long_format(user_rows.iter().copied()),
    )?;
    write_csv(&stage.join("activity_scores.csv"), &run.scores.rows)?;
    write_csv(&stage.join("cyclic_summary.csv"), &run.cross.windows)?;
    write_csv(&stage.join("degree_bins.csv"), &run.cross.degree_cyclic.bins)?;
    write_csv(&stage.join("kshell_cyclic.csv"), &run.cross.kshell_cyclic)?;
    write_csv(&stage.join("kshell_degree.csv"), &run.cross.kshell_degree)?;
    write_csv(&stage.join("kshell_distribution.csv"), &run.cross.kshell_distribution)?;
    write_json(&stage.join("report.json"), &run.report())?;

    let written = publish(stage, dir)?;
    info!("Wrote {} output files to {}", written.len(), dir.display());
    Ok(written)
}
