//! Pushes edits of a root recipe to every recipe cloned from it.
//!
//! A clone is a read mirror of its root for the fields listed in
//! [`CloneFields`]. Propagation is a single bulk update of all clone rows plus
//! a lastedit touch of every project that contains a clone. The hub runs it in
//! the same transaction as the root's own save.

use chrono::{DateTime, Utc};

use crate::model::{Analysis, RecipeSecurity, UserId};

/// Fields of a root recipe mirrored onto its clones.
#[derive(Debug, Clone, PartialEq)]
pub struct CloneFields<'a> {
    pub json_text: &'a str,
    pub template: &'a str,
    pub name: &'a str,
    pub security: RecipeSecurity,
    pub lastedit_date: DateTime<Utc>,
    pub lastedit_user: Option<UserId>,
    pub text: &'a str,
    pub html: &'a str,
    pub image: Option<&'a str>,
}

impl<'a> CloneFields<'a> {
    pub fn from_root(root: &'a Analysis) -> Self {
        Self {
            json_text: &root.json_text,
            template: &root.template,
            name: &root.name,
            security: root.security,
            lastedit_date: root.lastedit_date.unwrap_or_else(Utc::now),
            lastedit_user: root.lastedit_user,
            text: &root.text,
            html: &root.html,
            image: root.image.as_deref(),
        }
    }

    /// Copies the mirrored fields onto an in-memory clone.
    pub fn apply_to(&self, clone: &mut Analysis) {
        clone.json_text = self.json_text.to_string();
        clone.template = self.template.to_string();
        clone.name = self.name.to_string();
        clone.security = self.security;
        clone.lastedit_date = Some(self.lastedit_date);
        clone.lastedit_user = self.lastedit_user;
        clone.text = self.text.to_string();
        clone.html = self.html.to_string();
        clone.image = self.image.map(str::to_string);
    }
}

/// Storage operations needed to propagate a root recipe.
pub trait CloneStore {
    type Error;

    /// Overwrites the mirrored fields of every recipe whose root is `root_id`.
    /// Returns the number of clones updated.
    fn update_clones(&self, root_id: i64, fields: &CloneFields<'_>) -> Result<usize, Self::Error>;

    /// Sets lastedit on every project holding a clone of `root_id`.
    /// Returns the number of projects touched.
    fn touch_clone_projects(
        &self,
        root_id: i64,
        date: DateTime<Utc>,
        user: Option<UserId>,
    ) -> Result<usize, Self::Error>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Propagation {
    pub clones: usize,
    pub projects: usize,
}

/// Pushes the current state of `root` to all of its clones.
pub fn propagate<S: CloneStore>(store: &S, root: &Analysis) -> Result<Propagation, S::Error> {
    let fields = CloneFields::from_root(root);
    let clones = store.update_clones(root.id, &fields)?;
    let projects = if clones > 0 {
        store.touch_clone_projects(root.id, fields.lastedit_date, fields.lastedit_user)?
    } else {
        0
    };

    if clones > 0 {
        log::info!(
            "Propagated recipe {} to {} clones in {} projects",
            root.uid,
            clones,
            projects
        );
    }
    Ok(Propagation { clones, projects })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::convert::Infallible;

    #[derive(Default)]
    struct FakeStore {
        recipes: RefCell<Vec<Analysis>>,
        project_edits: RefCell<HashMap<i64, DateTime<Utc>>>,
    }

    impl CloneStore for FakeStore {
        type Error = Infallible;

        fn update_clones(&self, root_id: i64, fields: &CloneFields<'_>) -> Result<usize, Infallible> {
            let mut recipes = self.recipes.borrow_mut();
            let mut updated = 0;
            for recipe in recipes.iter_mut().filter(|r| r.root_id == Some(root_id)) {
                fields.apply_to(recipe);
                updated += 1;
            }
            Ok(updated)
        }

        fn touch_clone_projects(
            &self,
            root_id: i64,
            date: DateTime<Utc>,
            _user: Option<UserId>,
        ) -> Result<usize, Infallible> {
            let recipes = self.recipes.borrow();
            let mut edits = self.project_edits.borrow_mut();
            for recipe in recipes.iter().filter(|r| r.root_id == Some(root_id)) {
                edits.insert(recipe.project_id, date);
            }
            Ok(edits.len())
        }
    }

    fn recipe(id: i64, project_id: i64, root_id: Option<i64>) -> Analysis {
        let mut recipe = Analysis::new(project_id, 1, "Recipe");
        recipe.id = id;
        recipe.uid = format!("r{}", id);
        recipe.root_id = root_id;
        recipe
    }

    #[test]
    fn test_propagate_mirrors_fields() {
        let mut root = recipe(1, 10, None);
        root.template = "echo bye".to_string();
        root.security = RecipeSecurity::Authorized;
        root.html = "<p>new</p>".to_string();
        root.image = Some("images/image-1.png".to_string());
        root.lastedit_date = Some(Utc::now());

        let store = FakeStore::default();
        store.recipes.borrow_mut().extend([
            recipe(2, 11, Some(1)),
            recipe(3, 12, Some(1)),
            recipe(4, 12, None),
        ]);

        let outcome = propagate(&store, &root).unwrap();

        assert_eq!(outcome, Propagation { clones: 2, projects: 2 });
        let recipes = store.recipes.borrow();
        for clone in recipes.iter().filter(|r| r.root_id == Some(1)) {
            assert_eq!(clone.template, root.template);
            assert_eq!(clone.security, root.security);
            assert_eq!(clone.html, root.html);
            assert_eq!(clone.image, root.image);
            assert_eq!(clone.lastedit_date, root.lastedit_date);
        }
        let unrelated = recipes.iter().find(|r| r.id == 4).unwrap();
        assert_eq!(unrelated.template, "");
    }

    #[test]
    fn test_propagate_without_clones_touches_nothing() {
        let store = FakeStore::default();
        let outcome = propagate(&store, &recipe(1, 10, None)).unwrap();
        assert_eq!(outcome, Propagation::default());
        assert!(store.project_edits.borrow().is_empty());
    }

    #[test]
    fn test_apply_to_keeps_identity() {
        let root = recipe(1, 10, None);
        let mut clone = recipe(2, 11, Some(1));
        CloneFields::from_root(&root).apply_to(&mut clone);
        assert_eq!(clone.id, 2);
        assert_eq!(clone.uid, "r2");
        assert_eq!(clone.project_id, 11);
        assert_eq!(clone.root_id, Some(1));
    }
}
