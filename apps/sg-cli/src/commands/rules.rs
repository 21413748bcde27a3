// rules.rs: Rules subcommands: reduce, check.
//
// Rule-set files are the authority's JSON shape:
// `{"subsets": [...], "exceptions": [...]}`.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Subcommand;
use sg_authority::AccessControl;
use sg_endpoint::HttpMethod;
use sg_rules::{AccessExplanation, AccessRuleSet};

#[derive(Subcommand)]
pub enum RulesCommands {
    /// Print the rule set with redundant rules removed.
    Reduce {
        /// Rule-set file (JSON).
        file: PathBuf,
    },
    /// Decide a subset path (or a full request URL) against a rule set.
    Check {
        /// Rule-set file (JSON).
        file: PathBuf,
        /// Subset path such as /notes/7, or an absolute request URL.
        subset: String,
        /// HTTP method, used when SUBSET is a URL.
        #[arg(long, default_value = "GET")]
        method: HttpMethod,
    },
}

pub fn execute(cmd: &RulesCommands) -> anyhow::Result<()> {
    match cmd {
        RulesCommands::Reduce { file } => {
            let reduced = load(file)?.reduced();
            println!("{}", serde_json::to_string_pretty(&reduced)?);
        }
        RulesCommands::Check {
            file,
            subset,
            method,
        } => {
            let explanation = explain(&load(file)?, *method, subset)?;
            println!("{}", serde_json::to_string_pretty(&explanation)?);
            if !explanation.allowed {
                anyhow::bail!("access to {} is denied", explanation.subset);
            }
        }
    }
    Ok(())
}

fn load(path: &Path) -> anyhow::Result<AccessRuleSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read rule set {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} is not a valid rule set", path.display()))
}

fn explain(
    rules: &AccessRuleSet,
    method: HttpMethod,
    subset: &str,
) -> anyhow::Result<AccessExplanation> {
    if subset.starts_with("http://") || subset.starts_with("https://") {
        return Ok(AccessControl::explain_local(rules, method, subset)?);
    }
    Ok(rules.explain(subset))
}
