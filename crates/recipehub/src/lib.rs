pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod materialize;
pub mod model;
pub mod params;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod sync;
pub mod uid;

pub use aggregate::{ProjectChildren, ProjectCounts};
pub use config::{load_settings, load_settings_from_str, Settings};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, HubError, Result, StorageError};
pub use materialize::{bind_data, materialize, RecipeContext, RecipeSettings};
pub use model::{
    Access, AccessLevel, Analysis, Data, DataMethod, DataState, Editor, Job, JobSecurity,
    JobState, Privacy, Project, RecipeSecurity, Snippet, SnippetType, UserId,
};
pub use params::{ParamError, ParamMap, ParamValue};
pub use pipeline::Hub;
pub use render::{HtmlRenderer, MarkdownRenderer};
pub use storage::{Layout, Toc};
pub use sync::{CloneFields, CloneStore, Propagation};
