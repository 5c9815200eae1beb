//! Doctor command - verify credentials, catalog and vector store.

use crate::catalog::KnowledgeBaseCatalog;
use crate::cli::Output;
use crate::config::Settings;
use crate::openai::resolve_api_key;
use crate::vector_store::QdrantStore;
use console::style;

/// Check result for a single item.
#[derive(Debug)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub hint: Option<String>,
}

#[derive(Debug, PartialEq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Error,
}

impl CheckResult {
    fn ok(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Ok,
            message: message.to_string(),
            hint: None,
        }
    }

    fn warning(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warning,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn error(name: &str, message: &str, hint: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Error,
            message: message.to_string(),
            hint: Some(hint.to_string()),
        }
    }

    fn print(&self) {
        let icon = match self.status {
            CheckStatus::Ok => style("✓").green(),
            CheckStatus::Warning => style("!").yellow(),
            CheckStatus::Error => style("✗").red(),
        };

        println!("  {} {} - {}", icon, style(&self.name).bold(), self.message);

        if let Some(hint) = &self.hint {
            println!("    {} {}", style("→").dim(), style(hint).dim());
        }
    }
}

/// Run all diagnostic checks.
pub async fn run_doctor(settings: &Settings) -> anyhow::Result<()> {
    Output::header("Transmeet Doctor");
    println!();
    println!("Checking credentials and services...\n");

    let mut checks = Vec::new();

    println!("{}", style("Credentials").bold());
    let credential_checks: Vec<CheckResult> = settings
        .required_key_vars()
        .iter()
        .map(|var| check_credential(var))
        .collect();
    if credential_checks.is_empty() {
        println!("  {}", style("no API keys configured (local endpoints)").dim());
    }
    for check in &credential_checks {
        check.print();
    }
    checks.extend(credential_checks);

    println!();

    println!("{}", style("Knowledge Bases").bold());
    let (catalog_check, catalog) = check_catalog(settings);
    catalog_check.print();
    checks.push(catalog_check);

    println!();

    println!("{}", style("Vector Store").bold());
    let store_checks = check_vector_store(settings, &catalog).await;
    for check in &store_checks {
        check.print();
    }
    checks.extend(store_checks);

    println!();

    println!("{}", style("Configuration").bold());
    let config_check = check_config_file();
    config_check.print();
    checks.push(config_check);

    println!();

    let errors = checks.iter().filter(|c| c.status == CheckStatus::Error).count();
    let warnings = checks.iter().filter(|c| c.status == CheckStatus::Warning).count();

    if errors > 0 {
        Output::error(&format!(
            "{} error(s) found. Please fix them before using Transmeet.",
            errors
        ));
        anyhow::bail!("{} doctor check(s) failed", errors);
    } else if warnings > 0 {
        Output::warning(&format!("All checks passed with {} warning(s).", warnings));
    } else {
        Output::success("All checks passed! Transmeet is ready to use.");
    }

    Ok(())
}

/// Check a credential variable, showing only a masked value.
fn check_credential(var: &str) -> CheckResult {
    match resolve_api_key(Some(var)) {
        Ok(Some(key)) => CheckResult::ok(var, &format!("configured ({})", mask_key(&key))),
        Ok(None) => CheckResult::ok(var, "not required"),
        Err(e) => CheckResult::error(var, "missing", &e.to_string()),
    }
}

fn check_catalog(settings: &Settings) -> (CheckResult, KnowledgeBaseCatalog) {
    let path = settings.catalog_path();
    match KnowledgeBaseCatalog::try_load(&path) {
        Ok(catalog) if catalog.is_empty() => (
            CheckResult::warning(
                "Catalog",
                &format!("{} has no repositories", path.display()),
                "Questions will be answered from meetings and general knowledge only",
            ),
            catalog,
        ),
        Ok(catalog) => (
            CheckResult::ok(
                "Catalog",
                &format!("{} repositories in {}", catalog.len(), path.display()),
            ),
            catalog,
        ),
        Err(e) => (
            CheckResult::warning(
                "Catalog",
                &e.to_string(),
                "Set [catalog] path in the config file",
            ),
            KnowledgeBaseCatalog::empty(),
        ),
    }
}

/// Check Qdrant reachability and that every routable collection exists.
async fn check_vector_store(settings: &Settings, catalog: &KnowledgeBaseCatalog) -> Vec<CheckResult> {
    let url = &settings.vector_store.url;
    let store = match QdrantStore::from_settings(&settings.vector_store) {
        Ok(store) => store,
        Err(e) => return vec![CheckResult::error("Qdrant", &e.to_string(), "Check [vector_store] settings")],
    };

    let existing = match store.list_collections().await {
        Ok(existing) => existing,
        Err(e) => {
            return vec![CheckResult::error(
                "Qdrant",
                &format!("unreachable at {} ({})", url, e),
                "Start Qdrant or set [vector_store] url",
            )]
        }
    };

    let mut results = vec![CheckResult::ok(
        "Qdrant",
        &format!("{} ({} collections)", url, existing.len()),
    )];
    let expected = catalog
        .collection_names()
        .chain(std::iter::once(settings.vector_store.meetings_collection.as_str()));
    for collection in expected {
        if existing.iter().any(|c| c == collection) {
            results.push(CheckResult::ok(collection, "present"));
        } else {
            results.push(CheckResult::warning(
                collection,
                "missing",
                "Searches against this collection will be skipped with a warning",
            ));
        }
    }
    results
}

fn check_config_file() -> CheckResult {
    let config_path = Settings::default_config_path();
    if config_path.exists() {
        CheckResult::ok("Config file", &format!("{}", config_path.display()))
    } else {
        CheckResult::warning(
            "Config file",
            "using defaults",
            &format!("Create {} to override settings", config_path.display()),
        )
    }
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
