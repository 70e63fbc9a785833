//! Turns a stored recipe into the parameter set a job runs with.
//!
//! The stored payload keeps whatever the recipe author wrote. On top of it the
//! `settings` table is overwritten with values derived from the recipe's
//! current identity, so a payload copied between recipes never carries a stale
//! uid or file name.

use std::path::Path;

use crate::model::{Analysis, Data};
use crate::params::{self, ParamMap, ParamValue};
use crate::storage::Layout;

/// Placeholder value of a data slot whose manifest lists no files.
pub const MISSING_VALUE: &str = "MISSING";

/// Everything `materialize` needs besides the recipe row itself.
#[derive(Debug, Clone, Copy)]
pub struct RecipeContext<'a> {
    pub recipe: &'a Analysis,
    pub project_uid: &'a str,
    /// Uid of the root recipe when `recipe` is a clone.
    pub root_uid: Option<&'a str>,
    pub base_url: &'a str,
}

/// Joins the whitespace separated words of a name with `_`.
pub fn slug(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join("_")
}

/// Base of the script and image file names of a recipe.
fn file_base(ctx: &RecipeContext<'_>) -> String {
    format!("{}_{}_{}", slug(&ctx.recipe.name), ctx.project_uid, ctx.recipe.id)
}

/// Returns the recipe payload with a freshly derived `settings` table.
///
/// Derived keys always win over stored ones. Every other key of the stored
/// payload, including unknown keys inside `settings`, is kept as is.
pub fn materialize(ctx: &RecipeContext<'_>) -> ParamMap {
    let recipe = ctx.recipe;
    let mut payload = params::parse(&recipe.json_text);
    let base = file_base(ctx);

    let settings = params::table_entry(&mut payload, "settings");
    params::insert(settings, "name", recipe.name.as_str());
    params::insert(settings, "template", format!("{}.sh", base));
    params::insert(settings, "image", format!("{}.png", base));
    params::insert(settings, "id", recipe.id);
    params::insert(settings, "recipe_uid", recipe.uid.as_str());
    params::insert(settings, "uid", recipe.uid.as_str());
    params::insert(settings, "help", recipe.text.as_str());
    params::insert(settings, "url", ctx.base_url);

    match (recipe.root_id, ctx.root_uid) {
        (Some(root_id), Some(root_uid)) => {
            params::insert(settings, "root_id", root_id);
            params::insert(settings, "root_uid", root_uid);
        }
        _ => {
            params::insert(settings, "root_id", "");
            params::insert(settings, "root_uid", "");
        }
    }

    payload
}

/// Typed view of a materialized `settings` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSettings {
    pub name: String,
    pub template: String,
    pub image: String,
    pub id: i64,
    pub recipe_uid: String,
    pub uid: String,
    pub help: String,
    pub url: String,
    pub root_id: Option<i64>,
    pub root_uid: Option<String>,
}

impl RecipeSettings {
    /// Reads the `settings` table of a materialized payload. Returns `None`
    /// when a required key is absent or has the wrong type.
    pub fn from_payload(payload: &ParamMap) -> Option<Self> {
        let settings = params::get_table(payload, "settings")?;
        let text = |key: &str| params::get_str(settings, key).map(str::to_string);

        Some(Self {
            name: text("name")?,
            template: text("template")?,
            image: text("image")?,
            id: settings.get("id").and_then(ParamValue::as_integer)?,
            recipe_uid: text("recipe_uid")?,
            uid: text("uid")?,
            help: text("help")?,
            url: text("url")?,
            root_id: settings.get("root_id").and_then(ParamValue::as_integer),
            root_uid: text("root_uid").filter(|uid| !uid.is_empty()),
        })
    }
}

/// Fills a data parameter slot from a Data record and its manifest listing.
///
/// `value` is the first listed file, or [`MISSING_VALUE`] when the manifest is
/// empty.
pub fn bind_data(
    slot: &mut ParamMap,
    data: &Data,
    project_uid: &str,
    files: Vec<String>,
    layout: &Layout,
) {
    let toc = data
        .file
        .clone()
        .unwrap_or_else(|| layout.toc_path(&data.uid));
    let toc = path_text(&toc);

    let value = files
        .first()
        .cloned()
        .unwrap_or_else(|| MISSING_VALUE.to_string());

    params::insert(slot, "value", value);
    params::insert(slot, "files", files);
    params::insert(slot, "toc", toc.as_str());
    params::insert(slot, "file_list", toc);
    params::insert(slot, "id", data.id);
    params::insert(slot, "name", data.name.as_str());
    params::insert(slot, "uid", data.uid.as_str());
    params::insert(
        slot,
        "data_dir",
        path_text(&layout.data_dir(project_uid, &data.uid)),
    );
    params::insert(slot, "project_dir", path_text(&layout.project_dir(project_uid)));
    params::insert(slot, "data_url", data.url_path(project_uid, ""));
}

fn path_text(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
