use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::info_span;

use crate::config::Settings;
use crate::db::{
    analysis_repo, data_repo, job_repo, project_repo, snippet_repo, Database,
    DatabaseError,
};
use crate::error::{HubError, Result};
use crate::materialize::{self, RecipeContext};
use crate::model::{
    truncate_chars, Analysis, Data, Editor, Job, JobSecurity, JobState, Project, Snippet,
    SnippetType, MAX_LOG_LEN, MAX_NAME_LEN, MAX_TEXT_LEN,
};
use crate::params::{self, ParamMap};
use crate::render::{HtmlRenderer, MarkdownRenderer};
use crate::storage::{self, Layout, Toc};
use crate::uid::{self, ENTITY_UID_LEN, SHARE_TOKEN_LEN, SNIPPET_UID_LEN};

use super::context::{EntityKind, SaveContext};
use super::stages;

/// Called with every newly created project after its save commits.
pub type CreatedCallback =
    Box<dyn Fn(&Connection, &Project) -> std::result::Result<(), DatabaseError> + Send + Sync>;

/// Entry point for every write: normalizes entities, persists them and runs
/// the post-write stages in one transaction.
pub struct Hub {
    settings: Settings,
    layout: Layout,
    db: Database,
    renderer: Box<dyn HtmlRenderer>,
    created_callbacks: Vec<CreatedCallback>,
}

fn not_found_or<T>(value: Option<T>, entity: &'static str, key: impl ToString) -> Result<T> {
    value.ok_or_else(|| HubError::not_found(entity, key))
}

fn load_project(conn: &Connection, id: i64) -> Result<Project> {
    not_found_or(project_repo::find_by_id(conn, id)?, "project", id)
}

fn load_data(conn: &Connection, id: i64) -> Result<Data> {
    not_found_or(data_repo::find_by_id(conn, id)?, "data", id)
}

fn load_analysis(conn: &Connection, id: i64) -> Result<Analysis> {
    not_found_or(analysis_repo::find_by_id(conn, id)?, "recipe", id)
}

fn load_job(conn: &Connection, id: i64) -> Result<Job> {
    not_found_or(job_repo::find_by_id(conn, id)?, "job", id)
}

/// Restores the unsaved marker when a create rolled back.
fn reset_on_error<T>(result: Result<T>, created: bool, id: &mut i64) -> Result<T> {
    if result.is_err() && created {
        *id = 0;
    }
    result
}

impl Hub {
    /// Opens the database at `settings.database_path()`.
    pub fn open(settings: Settings) -> Result<Self> {
        let db = Database::open(&settings.database_path())?;
        Ok(Self::with_database(settings, db))
    }

    /// Hub over an in-memory database. Files still go to the configured roots.
    pub fn in_memory(settings: Settings) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(settings, db))
    }

    pub fn with_database(settings: Settings, db: Database) -> Self {
        let layout = Layout::from_settings(&settings);
        Self {
            settings,
            layout,
            db,
            renderer: Box::new(MarkdownRenderer),
            created_callbacks: Vec::new(),
        }
    }

    /// Replaces the description renderer.
    pub fn with_renderer(mut self, renderer: Box<dyn HtmlRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Registers a callback fired once per newly created project.
    pub fn on_project_created<F>(&mut self, callback: F)
    where
        F: Fn(&Connection, &Project) -> std::result::Result<(), DatabaseError>
            + Send
            + Sync
            + 'static,
    {
        self.created_callbacks.push(Box::new(callback));
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn render(&self, text: &str, editor: Editor) -> String {
        self.renderer.render(text, editor.trusted)
    }

    // ── Lookups ─────────────────────────────────────────────────────────

    pub fn project(&self, id: i64) -> Result<Project> {
        let found = self.db.with_conn(|conn| project_repo::find_by_id(conn, id))?;
        not_found_or(found, "project", id)
    }

    pub fn project_by_uid(&self, uid: &str) -> Result<Project> {
        let found = self.db.with_conn(|conn| project_repo::find_by_uid(conn, uid))?;
        not_found_or(found, "project", uid)
    }

    pub fn data(&self, id: i64) -> Result<Data> {
        let found = self.db.with_conn(|conn| data_repo::find_by_id(conn, id))?;
        not_found_or(found, "data", id)
    }

    pub fn analysis(&self, id: i64) -> Result<Analysis> {
        let found = self.db.with_conn(|conn| analysis_repo::find_by_id(conn, id))?;
        not_found_or(found, "recipe", id)
    }

    pub fn job(&self, id: i64) -> Result<Job> {
        let found = self.db.with_conn(|conn| job_repo::find_by_id(conn, id))?;
        not_found_or(found, "job", id)
    }

    // ── Projects ────────────────────────────────────────────────────────

    fn normalize_project(&self, project: &mut Project, editor: Editor, now: DateTime<Utc>) {
        uid::assign_once(&mut project.uid, ENTITY_UID_LEN);
        if project.label.as_deref().map_or(true, |l| l.trim().is_empty()) {
            project.label = Some(project.uid.clone());
        }
        if project.name.trim().is_empty() {
            project.name = "New Project".to_string();
        }
        truncate_chars(&mut project.name, MAX_NAME_LEN);
        truncate_chars(&mut project.text, MAX_TEXT_LEN);
        project.html = self.render(&project.text, editor);
        if project.sharable_token.is_none() {
            project.sharable_token = Some(uid::generate(SHARE_TOKEN_LEN));
        }
        project.date.get_or_insert(now);
        project.lastedit_user = Some(editor.id);
        project.lastedit_date = Some(now);
    }

    /// Creates or updates a project and lays out its directory. The current
    /// owner holds write access once this returns.
    pub fn save_project(&self, project: &mut Project, editor: Editor) -> Result<()> {
        let now = Utc::now();
        self.normalize_project(project, editor, now);
        let created = !project.is_saved();
        let _span = info_span!("save_project", uid = %project.uid, created).entered();

        let dir = self.layout.project_dir(&project.uid);
        let result = self.db.with_transaction(|tx| -> Result<SaveContext> {
            if created {
                project.id = project_repo::insert(tx, project)?;
            } else {
                project_repo::update(tx, project)?;
            }
            let mut ctx =
                SaveContext::new(EntityKind::Project, &project.uid, project.id, created, editor, now)
                    .with_directory(dir)
                    .with_count_refresh()
                    .with_owner_grant(project.owner);
            stages::run(tx, &mut ctx)?;
            Ok(ctx)
        });
        let ctx = reset_on_error(result, created, &mut project.id)?;

        if let Some(counts) = ctx.counts {
            project.data_count = counts.data;
            project.recipes_count = counts.recipes;
            project.jobs_count = counts.jobs;
        }
        if created {
            self.fire_created(project)?;
            log::info!("Created project {} ({})", project.uid, project.name);
        }
        Ok(())
    }

    fn fire_created(&self, project: &Project) -> Result<()> {
        self.db.with_conn(|conn| {
            for callback in &self.created_callbacks {
                callback(conn, project)?;
            }
            Ok(())
        })?;
        Ok(())
    }

    /// Project-level `settings` payload plus the uids of its live recipes.
    pub fn project_settings(&self, project_id: i64) -> Result<ParamMap> {
        let (project, recipes) = self.db.with_conn(|conn| {
            let project = project_repo::find_by_id(conn, project_id)?;
            let recipes = project_repo::recipe_uids(conn, project_id)?;
            Ok((project, recipes))
        })?;
        let project = not_found_or(project, "project", project_id)?;
        Ok(project.settings_payload(&self.settings.base_url, recipes))
    }

    // ── Data ────────────────────────────────────────────────────────────

    fn normalize_data(&self, data: &mut Data, project: &Project, editor: Editor, now: DateTime<Utc>) {
        uid::assign_once(&mut data.uid, ENTITY_UID_LEN);
        if data.name.trim().is_empty() {
            data.name = "My Data".to_string();
        }
        truncate_chars(&mut data.name, MAX_NAME_LEN);
        truncate_chars(&mut data.text, MAX_TEXT_LEN);
        data.html = self.render(&data.text, editor);
        data.owner.get_or_insert(project.owner);
        data.data_type.retain(|c| c != ' ');
        if data.data_type.is_empty() {
            data.data_type = "DATA".to_string();
        }
        data.file = Some(self.layout.toc_path(&data.uid));
        data.date.get_or_insert(now);
        data.lastedit_user = Some(editor.id);
        data.lastedit_date = Some(now);
    }

    /// Creates or updates a data record. Its directory and an (empty)
    /// manifest exist once this returns.
    pub fn save_data(&self, data: &mut Data, editor: Editor) -> Result<()> {
        let now = Utc::now();
        let created = !data.is_saved();

        let result = self.db.with_transaction(|tx| -> Result<()> {
            let project = load_project(tx, data.project_id)?;
            self.normalize_data(data, &project, editor, now);
            let _span = info_span!("save_data", uid = %data.uid, created).entered();

            if created {
                data.id = data_repo::insert(tx, data)?;
            } else {
                data_repo::update(tx, data)?;
                let stored = load_data(tx, data.id)?;
                data.file = stored.file;
                data.size = stored.size;
                data.file_count = stored.file_count;
            }

            let mut ctx =
                SaveContext::new(EntityKind::Data, &data.uid, project.id, created, editor, now)
                    .with_directory(self.layout.data_dir(&project.uid, &data.uid))
                    .with_manifest(self.layout.toc_path(&data.uid))
                    .with_count_refresh();
            stages::run(tx, &mut ctx)?;
            Ok(())
        });
        reset_on_error(result, created, &mut data.id)
    }

    /// Rewrites the manifest of a data record from its directory and stores
    /// the new size and file count.
    pub fn rebuild_toc(&self, data_id: i64) -> Result<Toc> {
        self.db.with_transaction(|tx| -> Result<Toc> {
            let data = load_data(tx, data_id)?;
            let project = load_project(tx, data.project_id)?;
            let _span = info_span!("rebuild_toc", uid = %data.uid).entered();

            let data_dir = self.layout.data_dir(&project.uid, &data.uid);
            let toc = storage::build_toc(&data_dir, &self.layout.toc_path(&data.uid))?;

            data_repo::update_toc(tx, data.id, &toc)?;
            Ok(toc)
        })
    }

    /// Fills a data parameter slot from a stored data record.
    pub fn bind_data(&self, slot: &mut ParamMap, data_id: i64) -> Result<()> {
        let (data, project) = self.db.with_conn(|conn| {
            let data = data_repo::find_by_id(conn, data_id)?;
            let project = match &data {
                Some(data) => project_repo::find_by_id(conn, data.project_id)?,
                None => None,
            };
            Ok((data, project))
        })?;
        let data = not_found_or(data, "data", data_id)?;
        let project = not_found_or(project, "project", data.project_id)?;

        let files = data.files()?;
        materialize::bind_data(slot, &data, &project.uid, files, &self.layout);
        Ok(())
    }

    // ── Recipes ─────────────────────────────────────────────────────────

    fn normalize_analysis(&self, recipe: &mut Analysis, editor: Editor, now: DateTime<Utc>) {
        uid::assign_once(&mut recipe.uid, ENTITY_UID_LEN);
        if recipe.text.is_empty() {
            recipe.text = "Recipe description".to_string();
        }
        truncate_chars(&mut recipe.text, MAX_TEXT_LEN);
        truncate_chars(&mut recipe.name, MAX_NAME_LEN);
        if recipe.name.trim().is_empty() {
            recipe.name = "New Recipe".to_string();
        }
        recipe.html = self.render(&recipe.text, editor);
        recipe.template = recipe.template.replace("\r\n", "\n");
        recipe.date.get_or_insert(now);
        recipe.lastedit_user = Some(editor.id);
        recipe.lastedit_date = Some(now);
    }

    /// Writes a normalized recipe and runs its post-write stages. A root
    /// recipe pushes its fields to every clone.
    fn write_analysis(
        &self,
        tx: &Connection,
        recipe: &mut Analysis,
        created: bool,
        editor: Editor,
        now: DateTime<Utc>,
    ) -> Result<SaveContext> {
        load_project(tx, recipe.project_id)?;
        if created {
            recipe.id = analysis_repo::insert(tx, recipe)?;
        } else {
            analysis_repo::update(tx, recipe)?;
        }

        let mut ctx =
            SaveContext::new(EntityKind::Analysis, &recipe.uid, recipe.project_id, created, editor, now)
                .with_count_refresh()
                .with_project_touch();
        if recipe.is_root() && !created {
            ctx = ctx.with_clone_root(recipe.clone());
        }
        stages::run(tx, &mut ctx)?;
        Ok(ctx)
    }

    /// Creates or updates a recipe. Saving a root updates all of its clones
    /// in the same transaction.
    pub fn save_analysis(&self, recipe: &mut Analysis, editor: Editor) -> Result<()> {
        let now = Utc::now();
        self.normalize_analysis(recipe, editor, now);
        let created = !recipe.is_saved();
        let _span = info_span!("save_analysis", uid = %recipe.uid, created).entered();

        let result = self
            .db
            .with_transaction(|tx| self.write_analysis(tx, recipe, created, editor, now));
        reset_on_error(result, created, &mut recipe.id).map(|_| ())
    }

    /// Creates a clone of `root_id` in the target project.
    ///
    /// Cloning a clone links the new recipe to the original root, so every
    /// clone mirrors a root directly.
    pub fn clone_recipe(
        &self,
        root_id: i64,
        project_id: i64,
        editor: Editor,
    ) -> Result<Analysis> {
        let now = Utc::now();
        self.db.with_transaction(|tx| -> Result<Analysis> {
            let mut root = load_analysis(tx, root_id)?;
            if let Some(true_root) = root.root_id {
                root = load_analysis(tx, true_root)?;
            }
            let _span = info_span!("clone_recipe", root = %root.uid).entered();

            let mut clone = Analysis::new(project_id, editor.id, &root.name);
            clone.root_id = Some(root.id);
            clone.json_text = root.json_text.clone();
            clone.template = root.template.clone();
            clone.security = root.security;
            clone.text = root.text.clone();
            clone.html = root.html.clone();
            clone.image = root.image.clone();
            uid::assign_once(&mut clone.uid, ENTITY_UID_LEN);
            clone.date = Some(now);
            clone.lastedit_user = Some(editor.id);
            clone.lastedit_date = Some(now);

            self.write_analysis(tx, &mut clone, true, editor, now)?;
            log::info!("Cloned recipe {} as {}", root.uid, clone.uid);
            Ok(clone)
        })
    }

    /// Materialized parameter payload of a recipe.
    pub fn materialize(&self, analysis_id: i64) -> Result<ParamMap> {
        self.db
            .with_transaction(|tx| self.materialize_with(tx, analysis_id))
            .map(|(_, payload)| payload)
    }

    /// Loads a recipe with its project and root and builds its payload from
    /// what `conn` sees.
    fn materialize_with(&self, conn: &Connection, analysis_id: i64) -> Result<(Analysis, ParamMap)> {
        let recipe = load_analysis(conn, analysis_id)?;
        let project = load_project(conn, recipe.project_id)?;
        let root = match recipe.root_id {
            Some(root_id) => analysis_repo::find_by_id(conn, root_id)?,
            None => None,
        };

        let ctx = RecipeContext {
            recipe: &recipe,
            project_uid: &project.uid,
            root_uid: root.as_ref().map(|r| r.uid.as_str()),
            base_url: &self.settings.base_url,
        };
        let payload = materialize::materialize(&ctx);
        Ok((recipe, payload))
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    fn normalize_job(&self, job: &mut Job, recipe: &Analysis, editor: Editor, now: DateTime<Utc>) {
        uid::assign_once(&mut job.uid, ENTITY_UID_LEN);
        job.project_id = recipe.project_id;
        if job.name.trim().is_empty() {
            job.name = format!("Results for: {}", recipe.name);
        }
        truncate_chars(&mut job.name, MAX_NAME_LEN);
        if job.text.is_empty() {
            job.text = recipe.text.clone();
        }
        truncate_chars(&mut job.text, MAX_TEXT_LEN);
        job.html = self.render(&job.text, editor);
        job.template = recipe.template.clone();
        truncate_chars(&mut job.stdout_log, MAX_LOG_LEN);
        truncate_chars(&mut job.stderr_log, MAX_LOG_LEN);
        job.path = Some(self.layout.job_dir(&job.uid));
        job.date.get_or_insert(now);
        job.lastedit_user = Some(editor.id);
        job.lastedit_date = Some(now);
    }

    /// Writes a job against its recipe and runs its post-write stages. An
    /// existing job stays bound to the recipe it was created from.
    fn write_job(
        &self,
        tx: &Connection,
        job: &mut Job,
        created: bool,
        editor: Editor,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if !created {
            let stored = load_job(tx, job.id)?;
            if stored.analysis_id != job.analysis_id {
                return Err(HubError::RecipeChanged {
                    uid: stored.uid,
                    stored: stored.analysis_id,
                    requested: job.analysis_id,
                });
            }
        }
        let recipe = load_analysis(tx, job.analysis_id)?;
        self.normalize_job(job, &recipe, editor, now);
        let _span = info_span!("save_job", uid = %job.uid, created).entered();

        if created {
            job.id = job_repo::insert(tx, job)?;
        } else {
            job_repo::update(tx, job)?;
        }

        let mut ctx = SaveContext::new(EntityKind::Job, &job.uid, job.project_id, created, editor, now)
            .with_directory(self.layout.job_dir(&job.uid))
            .with_count_refresh();
        stages::run(tx, &mut ctx)?;
        Ok(())
    }

    /// Creates or updates a job. The job always mirrors its recipe's
    /// template and gets a working directory.
    pub fn save_job(&self, job: &mut Job, editor: Editor) -> Result<()> {
        let now = Utc::now();
        let created = !job.is_saved();
        let result = self
            .db
            .with_transaction(|tx| self.write_job(tx, job, created, editor, now));
        reset_on_error(result, created, &mut job.id)
    }

    /// Queues a new job for a recipe with its materialized parameters. The job
    /// is authorized exactly when the recipe is runnable. The recipe is read
    /// in the same transaction that inserts the job.
    pub fn create_job(&self, analysis_id: i64, editor: Editor) -> Result<Job> {
        let now = Utc::now();
        let job = self.db.with_transaction(|tx| -> Result<Job> {
            let (recipe, payload) = self.materialize_with(tx, analysis_id)?;

            let mut job = Job::new(&recipe, editor.id);
            job.json_text = params::serialize(&payload);
            job.security = if recipe.runnable() {
                JobSecurity::Authorized
            } else {
                JobSecurity::UnderReview
            };
            self.write_job(tx, &mut job, true, editor, now)?;
            log::info!("Queued job {} for recipe {}", job.uid, recipe.uid);
            Ok(job)
        })?;
        Ok(job)
    }

    /// Moves a job to `next`, rejecting moves outside the lifecycle graph.
    ///
    /// Entering Running stamps `start_date` (unless resuming from Paused),
    /// finishing stamps `end_date`, and re-queueing clears both.
    pub fn transition_job(&self, job_id: i64, next: JobState, editor: Editor) -> Result<Job> {
        let now = Utc::now();
        self.db.with_transaction(|tx| -> Result<Job> {
            let mut job = load_job(tx, job_id)?;
            let from = job.state;
            if !from.can_transition_to(next) {
                return Err(HubError::InvalidTransition {
                    uid: job.uid,
                    from,
                    to: next,
                });
            }

            match next {
                JobState::Running if from != JobState::Paused => {
                    job.start_date = Some(now);
                    job.end_date = None;
                }
                JobState::Completed | JobState::Error => job.end_date = Some(now),
                JobState::Queued => {
                    job.start_date = None;
                    job.end_date = None;
                }
                _ => {}
            }
            job.state = next;
            job.lastedit_user = Some(editor.id);
            job.lastedit_date = Some(now);
            job_repo::update(tx, &job)?;

            log::info!("Job {} moved from {} to {}", job.uid, from, next);
            Ok(job)
        })
    }

    // ── Soft deletes ────────────────────────────────────────────────────

    pub fn soft_delete_data(&self, data_id: i64, editor: Editor) -> Result<Data> {
        let mut data = self.data(data_id)?;
        data.deleted = true;
        self.save_data(&mut data, editor)?;
        Ok(data)
    }

    pub fn soft_delete_analysis(&self, analysis_id: i64, editor: Editor) -> Result<Analysis> {
        let mut recipe = self.analysis(analysis_id)?;
        recipe.deleted = true;
        self.save_analysis(&mut recipe, editor)?;
        Ok(recipe)
    }

    pub fn soft_delete_job(&self, job_id: i64, editor: Editor) -> Result<Job> {
        let mut job = self.job(job_id)?;
        job.deleted = true;
        self.save_job(&mut job, editor)?;
        Ok(job)
    }

    // ── Snippets ────────────────────────────────────────────────────────

    pub fn save_snippet_type(&self, snippet_type: &mut SnippetType) -> Result<()> {
        uid::assign_once(&mut snippet_type.uid, SNIPPET_UID_LEN);
        let created = snippet_type.id == 0;
        let result = self.db.with_transaction(|tx| -> Result<()> {
            if created {
                snippet_type.id = snippet_repo::insert_type(tx, snippet_type)?;
            } else {
                snippet_repo::update_type(tx, snippet_type)?;
            }
            Ok(())
        });
        reset_on_error(result, created, &mut snippet_type.id)
    }

    /// Saves a snippet. A snippet without an owner inherits its type's owner.
    pub fn save_snippet(&self, snippet: &mut Snippet) -> Result<()> {
        uid::assign_once(&mut snippet.uid, SNIPPET_UID_LEN);
        let created = snippet.id == 0;
        let result = self.db.with_transaction(|tx| -> Result<()> {
            let snippet_type = not_found_or(
                snippet_repo::find_type(tx, snippet.type_id)?,
                "snippet type",
                snippet.type_id,
            )?;
            snippet.owner.get_or_insert(snippet_type.owner);

            if created {
                snippet.id = snippet_repo::insert_snippet(tx, snippet)?;
            } else {
                snippet_repo::update_snippet(tx, snippet)?;
            }
            Ok(())
        });
        reset_on_error(result, created, &mut snippet.id)
    }
}
