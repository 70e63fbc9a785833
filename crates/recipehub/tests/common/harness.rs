//! Test harness for isolated test execution.
//!
//! Every harness owns a temporary directory holding the media and toc roots
//! and a hub over an in-memory database, so tests never share state.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use recipehub::{Analysis, Data, Editor, Hub, Job, Project, RecipeSecurity, Settings};

pub const BASE_URL: &str = "http://hub.test";

/// Test harness providing an isolated hub for integration tests.
pub struct TestHarness {
    /// Temporary directory containing the media and toc roots.
    temp_dir: TempDir,
    pub media_root: PathBuf,
    pub toc_root: PathBuf,
    pub hub: Hub,
    /// Default editor used by the helper methods.
    pub editor: Editor,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let media_root = temp_dir.path().join("media");
        let toc_root = temp_dir.path().join("toc");

        let settings = Settings::new(&media_root, &toc_root, BASE_URL);
        let hub = Hub::in_memory(settings).expect("Failed to open hub");

        Self {
            temp_dir,
            media_root,
            toc_root,
            hub,
            editor: Editor::new(1),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Creates and saves a project owned by the default editor.
    pub fn project(&self, name: &str) -> Project {
        let mut project = Project::new(self.editor.id, name);
        self.hub
            .save_project(&mut project, self.editor)
            .expect("Failed to save project");
        project
    }

    pub fn data(&self, project: &Project, name: &str) -> Data {
        let mut data = Data::new(project.id, name);
        self.hub
            .save_data(&mut data, self.editor)
            .expect("Failed to save data");
        data
    }

    /// Creates and saves a recipe with the given template.
    pub fn recipe(&self, project: &Project, name: &str, template: &str) -> Analysis {
        let mut recipe = Analysis::new(project.id, self.editor.id, name);
        recipe.template = template.to_string();
        self.hub
            .save_analysis(&mut recipe, self.editor)
            .expect("Failed to save recipe");
        recipe
    }

    pub fn authorized_recipe(&self, project: &Project, name: &str, template: &str) -> Analysis {
        let mut recipe = self.recipe(project, name, template);
        recipe.security = RecipeSecurity::Authorized;
        self.hub
            .save_analysis(&mut recipe, self.editor)
            .expect("Failed to authorize recipe");
        recipe
    }

    pub fn job(&self, recipe: &Analysis) -> Job {
        self.hub
            .create_job(recipe.id, self.editor)
            .expect("Failed to create job")
    }

    /// Writes a file below the directory of a data record.
    pub fn write_data_file(&self, project: &Project, data: &Data, rel: &str, content: &str) -> PathBuf {
        let path = self.hub.layout().data_dir(&project.uid, &data.uid).join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create data subdirectory");
        }
        std::fs::write(&path, content).expect("Failed to write data file");
        path
    }

    /// Reloads a project from the database.
    pub fn reload_project(&self, project: &Project) -> Project {
        self.hub.project(project.id).expect("Project vanished")
    }
}
