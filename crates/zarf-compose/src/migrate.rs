//! Deprecated field migrations
//!
//! Each migration rewrites an obsolete field into its current form and
//! leaves the obsolete field in place for older consumers of the built
//! package. Packages built by a release that already ran a migration have
//! the obsolete data cleared instead.

use zarf_core::{Action, ActionDefaults, ActionSet, BuildData, Component, Variable, VariableType};

use crate::chain::ImportChain;

/// `scripts` becomes `actions`
pub const SCRIPTS_TO_ACTIONS: &str = "scripts-to-actions";

/// Singular `setVariable` becomes the `setVariables` list
pub const PLURALIZE_SET_VARIABLE: &str = "pluralize-set-variable";

/// Migrations this release applies, in order
pub const MIGRATIONS: [&str; 2] = [SCRIPTS_TO_ACTIONS, PLURALIZE_SET_VARIABLE];

/// Stamp the migrations this release performs into a build record
pub fn record_migrations(build: &mut BuildData) {
    build.migrations = MIGRATIONS.iter().map(|m| m.to_string()).collect();
}

/// Migrate a single component, returning human readable warnings
pub fn migrate_component(build: &BuildData, mut component: Component) -> (Component, Vec<String>) {
    let mut warnings = Vec::new();

    if build.has_migration(SCRIPTS_TO_ACTIONS) {
        component.scripts = Default::default();
    } else if let Some(warning) = migrate_scripts_to_actions(&mut component) {
        warnings.push(warning);
    }

    if build.has_migration(PLURALIZE_SET_VARIABLE) {
        clear_set_variable(&mut component);
    } else if let Some(warning) = migrate_set_variable(&mut component) {
        warnings.push(warning);
    }

    if !component.group.is_empty() {
        warnings.push(format!(
            "Component {} is using group which has been deprecated and will be removed in v1.0.0.  Please migrate to another solution.",
            component.name
        ));
    }

    (component, warnings)
}

impl ImportChain {
    /// Migrate every node of the chain
    pub fn migrate(&mut self, build: &BuildData) -> Vec<String> {
        let mut warnings = Vec::new();
        for node in self.nodes_mut() {
            let (migrated, node_warnings) = migrate_component(build, std::mem::take(&mut node.component));
            node.component = migrated;
            warnings.extend(node_warnings);
        }

        if !warnings.is_empty() {
            tracing::debug!(count = warnings.len(), "migrations applied");
            warnings.push(format!(
                "Migrations were performed on the import chain of: {:?}",
                self.head().component.name
            ));
        }
        warnings
    }
}

fn migrate_scripts_to_actions(component: &mut Component) -> Option<String> {
    let scripts = &component.scripts;
    if !scripts.has_commands() {
        return None;
    }

    let defaults = ActionDefaults {
        mute: !scripts.show_output,
        max_total_seconds: scripts.timeout_seconds,
        // retry used to mean forever
        max_retries: if scripts.retry { i64::MAX } else { 0 },
        ..Default::default()
    };

    let prepare = scripts.prepare.clone();
    let before = scripts.before.clone();
    let after = scripts.after.clone();
    let actions = &mut component.actions;

    if !prepare.is_empty() {
        append_commands(&mut actions.on_create, &defaults, &prepare, |set| &mut set.before);
    }
    if !before.is_empty() {
        append_commands(&mut actions.on_deploy, &defaults, &before, |set| &mut set.before);
    }
    if !after.is_empty() {
        append_commands(&mut actions.on_deploy, &defaults, &after, |set| &mut set.after);
    }

    Some(format!(
        "Component '{}' is using scripts which will be removed in Zarf v1.0.0. Please migrate to actions.",
        component.name
    ))
}

/// Set stage defaults and append commands not already present
fn append_commands(
    set: &mut ActionSet,
    defaults: &ActionDefaults,
    commands: &[String],
    list: impl Fn(&mut ActionSet) -> &mut Vec<Action>,
) {
    set.defaults = defaults.clone();
    let actions = list(set);
    for cmd in commands {
        if !actions.iter().any(|a| &a.cmd == cmd) {
            actions.push(Action::command(cmd.clone()));
        }
    }
}

fn migrate_set_variable(component: &mut Component) -> Option<String> {
    let mut migrated = false;
    for set in component.actions.sets_mut() {
        for action in set.lists_mut().into_iter().flatten() {
            if !action.set_variable.is_empty() && action.set_variables.is_empty() {
                action.set_variables = vec![Variable {
                    name: action.set_variable.clone(),
                    sensitive: false,
                    auto_indent: true,
                    var_type: Some(VariableType::Raw),
                    ..Default::default()
                }];
                migrated = true;
            }
        }
    }

    migrated.then(|| {
        format!(
            "Component '{}' is using setVariable in actions which will be removed in Zarf v1.0.0. Please migrate to the list form of setVariables.",
            component.name
        )
    })
}

fn clear_set_variable(component: &mut Component) {
    for set in component.actions.sets_mut() {
        for action in set.lists_mut().into_iter().flatten() {
            action.set_variable.clear();
        }
    }
}
