//! Post-write stages of the save pipeline.
//!
//! Stages run in a fixed order inside the save transaction, after the entity
//! row is written. Any failure aborts the remaining stages and rolls the
//! transaction back.

use rusqlite::Connection;
use tracing::{debug, info_span};

use crate::aggregate;
use crate::db::{access_repo, project_repo};
use crate::error::{HubError, StorageError};
use crate::storage::{ensure_directory, touch_manifest};
use crate::sync;

use super::context::SaveContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EnsureDirs,
    TouchManifest,
    RefreshCounts,
    PropagateClones,
    TouchProject,
    GrantOwnerAccess,
}

/// Execution order.
pub const STAGES: [Stage; 6] = [
    Stage::EnsureDirs,
    Stage::TouchManifest,
    Stage::RefreshCounts,
    Stage::PropagateClones,
    Stage::TouchProject,
    Stage::GrantOwnerAccess,
];

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::EnsureDirs => "ensure_dirs",
            Stage::TouchManifest => "touch_manifest",
            Stage::RefreshCounts => "refresh_counts",
            Stage::PropagateClones => "propagate_clones",
            Stage::TouchProject => "touch_project",
            Stage::GrantOwnerAccess => "grant_owner_access",
        }
    }

    pub fn applies(self, ctx: &SaveContext) -> bool {
        match self {
            Stage::EnsureDirs => !ctx.directories.is_empty(),
            Stage::TouchManifest => ctx.manifest.is_some(),
            Stage::RefreshCounts => ctx.refresh_counts,
            Stage::PropagateClones => ctx.clone_root.is_some(),
            Stage::TouchProject => ctx.touch_project,
            Stage::GrantOwnerAccess => ctx.owner.is_some(),
        }
    }
}

/// Runs every applicable stage in order. Returns the stages that ran.
pub fn run(conn: &Connection, ctx: &mut SaveContext) -> Result<Vec<Stage>, HubError> {
    let _span = info_span!("post_write",
        entity = %ctx.kind,
        uid = %ctx.uid,
        created = ctx.created,
    )
    .entered();

    let mut ran = Vec::new();
    for stage in STAGES {
        if !stage.applies(ctx) {
            continue;
        }
        let _step = info_span!("stage", name = stage.name()).entered();
        match stage {
            Stage::EnsureDirs => step_ensure_dirs(ctx)?,
            Stage::TouchManifest => step_touch_manifest(ctx)?,
            Stage::RefreshCounts => step_refresh_counts(conn, ctx)?,
            Stage::PropagateClones => step_propagate_clones(conn, ctx)?,
            Stage::TouchProject => step_touch_project(conn, ctx)?,
            Stage::GrantOwnerAccess => step_grant_owner_access(conn, ctx)?,
        }
        ran.push(stage);
    }
    Ok(ran)
}

fn step_ensure_dirs(ctx: &SaveContext) -> Result<(), StorageError> {
    for dir in &ctx.directories {
        ensure_directory(dir)?;
        debug!("Directory ready: {}", dir.display());
    }
    Ok(())
}

fn step_touch_manifest(ctx: &SaveContext) -> Result<(), StorageError> {
    match &ctx.manifest {
        Some(manifest) => touch_manifest(manifest),
        None => Ok(()),
    }
}

fn step_refresh_counts(conn: &Connection, ctx: &mut SaveContext) -> Result<(), HubError> {
    let mut project = project_repo::find_by_id(conn, ctx.project_id)?
        .ok_or_else(|| HubError::not_found("project", ctx.project_id))?;
    let counts = aggregate::persist(conn, &mut project)?;
    ctx.counts = Some(counts);
    Ok(())
}

fn step_propagate_clones(conn: &Connection, ctx: &mut SaveContext) -> Result<(), HubError> {
    if let Some(root) = &ctx.clone_root {
        ctx.propagation = Some(sync::propagate(conn, root)?);
    }
    Ok(())
}

fn step_touch_project(conn: &Connection, ctx: &SaveContext) -> Result<(), HubError> {
    project_repo::touch(conn, ctx.project_id, ctx.date, Some(ctx.editor.id))?;
    Ok(())
}

fn step_grant_owner_access(conn: &Connection, ctx: &mut SaveContext) -> Result<(), HubError> {
    if let Some(owner) = ctx.owner {
        ctx.owner_granted = access_repo::grant_write(conn, owner, ctx.project_id)?;
    }
    Ok(())
}
