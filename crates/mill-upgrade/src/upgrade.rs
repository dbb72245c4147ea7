//! Upgrade driver
//!
//! One stylesheet graph goes through load, import analysis, the codemod
//! pipeline and utility splitting. Independent projects run concurrently,
//! each graph on its own blocking task.

use crate::split::{split, SplitReport};
use mill_analysis_imports::{
    analyze, AnalysisReport, FsImportResolver, GraphSummary, Stylesheet, StylesheetGraph,
};
use mill_codemods::{migrate, CodemodRun};
use mill_config::UpgradeConfig;
use mill_foundation::{ErrorReport, UpgradeError, UpgradeResult};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use tokio::task::{self, JoinSet};
use tracing::Instrument;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetMigration {
    pub file: Option<PathBuf>,
    pub runs: Vec<CodemodRun>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedSheet {
    pub file: Option<PathBuf>,
    pub content: String,
}

/// Serializable summary of one upgraded graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpgradeReport {
    pub graph: GraphSummary,
    pub analysis: AnalysisReport,
    pub migrations: Vec<SheetMigration>,
    pub split: SplitReport,
}

/// The upgraded graph. Nothing is written to disk.
#[derive(Debug)]
pub struct UpgradeOutput {
    pub graph: StylesheetGraph,
    pub analysis: AnalysisReport,
    pub migrations: Vec<SheetMigration>,
    pub split: SplitReport,
}

impl UpgradeOutput {
    pub fn rendered(&self) -> Vec<RenderedSheet> {
        self.graph
            .iter()
            .map(|(_, sheet)| RenderedSheet {
                file: sheet.file.clone(),
                content: sheet.content(),
            })
            .collect()
    }

    pub fn report(&self) -> UpgradeReport {
        UpgradeReport {
            graph: self.graph.summary(),
            analysis: self.analysis.clone(),
            migrations: self.migrations.clone(),
            split: self.split.clone(),
        }
    }
}

/// Read and parse every file into one graph, in the given order
pub async fn load_graph(files: &[PathBuf]) -> UpgradeResult<StylesheetGraph> {
    let mut graph = StylesheetGraph::new();
    for file in files {
        graph.push(Stylesheet::load(file).await?);
    }
    Ok(graph)
}

/// Analyze, migrate and split an already loaded graph
pub fn upgrade_graph(
    mut graph: StylesheetGraph,
    config: &UpgradeConfig,
) -> UpgradeResult<UpgradeOutput> {
    let resolver = FsImportResolver::new(config.base_dir());
    let analysis = analyze(&mut graph, &resolver)?;

    let mut migrations = Vec::with_capacity(graph.len());
    for (_, sheet) in graph.iter_mut() {
        let runs = migrate(sheet).map_err(|err| {
            tracing::error!(sheet = %sheet.display_name(), error = %err, "Migration failed");
            UpgradeError::from(err)
        })?;
        migrations.push(SheetMigration {
            file: sheet.file.clone(),
            runs,
        });
    }

    let split_report = split(&mut graph, &config.split)?;
    tracing::info!(
        sheets = graph.len(),
        derived = split_report.derived.len(),
        "Upgraded stylesheet graph"
    );

    Ok(UpgradeOutput {
        graph,
        analysis,
        migrations,
        split: split_report,
    })
}

/// Load `files` and upgrade them as one graph
pub async fn upgrade(files: &[PathBuf], config: &UpgradeConfig) -> UpgradeResult<UpgradeOutput> {
    let graph = load_graph(files).await?;
    let config = config.clone();
    tokio::task::spawn_blocking(move || upgrade_graph(graph, &config))
        .await
        .map_err(|err| UpgradeError::internal(format!("Upgrade task failed: {}", err)))?
}

/// An independent stylesheet graph
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    /// Where `.mill/upgrade.toml` is looked up
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProjectStatus {
    Upgraded {
        report: UpgradeReport,
        sheets: Vec<RenderedSheet>,
    },
    Failed {
        error: ErrorReport,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutcome {
    pub name: String,
    #[serde(flatten)]
    pub status: ProjectStatus,
}

/// Upgrade every project concurrently. A failing project does not affect the others.
/// Outcomes come back in input order.
pub async fn upgrade_batch(projects: Vec<Project>) -> Vec<ProjectOutcome> {
    run_batch(projects, |project| async move { upgrade_project(&project).await }).await
}

async fn run_batch<F, Fut>(projects: Vec<Project>, run: F) -> Vec<ProjectOutcome>
where
    F: Fn(Project) -> Fut,
    Fut: Future<Output = UpgradeResult<UpgradeOutput>> + Send + 'static,
{
    let mut join_set = JoinSet::new();
    let mut names = Vec::with_capacity(projects.len());
    let mut tasks: HashMap<task::Id, usize> = HashMap::new();
    for (index, project) in projects.into_iter().enumerate() {
        let span = mill_config::logging::graph_span(&project.name, project.files.len());
        names.push(project.name.clone());
        let handle = join_set.spawn(run(project).instrument(span));
        tasks.insert(handle.id(), index);
    }

    let mut statuses: Vec<Option<ProjectStatus>> = names.iter().map(|_| None).collect();
    while let Some(joined) = join_set.join_next_with_id().await {
        let (id, status) = match joined {
            Ok((id, Ok(output))) => (
                id,
                ProjectStatus::Upgraded {
                    report: output.report(),
                    sheets: output.rendered(),
                },
            ),
            Ok((id, Err(err))) => {
                tracing::warn!(error = %err, "Project upgrade failed");
                (id, failed(&err))
            }
            Err(err) => {
                tracing::error!(error = %err, "Project task panicked");
                let internal = UpgradeError::internal(format!("Project task failed: {}", err));
                (err.id(), failed(&internal))
            }
        };
        if let Some(slot) = tasks.get(&id).and_then(|index| statuses.get_mut(*index)) {
            *slot = Some(status);
        }
    }

    names
        .into_iter()
        .zip(statuses)
        .map(|(name, status)| ProjectOutcome {
            status: status.unwrap_or_else(|| {
                failed(&UpgradeError::internal("Project task did not report back"))
            }),
            name,
        })
        .collect()
}

fn failed(err: &UpgradeError) -> ProjectStatus {
    ProjectStatus::Failed {
        error: ErrorReport::from(err),
    }
}

async fn upgrade_project(project: &Project) -> UpgradeResult<UpgradeOutput> {
    let config = UpgradeConfig::load(&project.root)
        .map_err(|err| UpgradeError::config(err.to_string()))?;
    upgrade(&project.files, &config).await
}
