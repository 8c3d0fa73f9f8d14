//! Link management commands

use serde_json::json;

use crate::cli::args::{LinkCreateArgs, LinkDecodeArgs, LinkDeleteArgs, LinkListArgs, OutputFormat};
use crate::config::loader::{BundleSource, ConfigSource, LinkTarget, StoreSource, parse_link};
use crate::config::{Configuration, load_configuration};
use crate::error::{ConfigError, FormWardenError};
use crate::instructor::{self, CreateLinkRequest, LINK_ID_PREFIX, link_url_for_id};
use crate::store::{ConfigStore, FileStore};

/// Creates a link and prints its share URL.
///
/// # Errors
///
/// Returns a configuration error if the request is out of policy, or a
/// store error if it cannot be saved.
pub fn create(args: &LinkCreateArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    let request = CreateLinkRequest {
        form_url: args.form_url.clone(),
        allowed_violations: args.allowed_violations,
        session_duration_minutes: args.duration,
        require_email: args.require_email,
    };
    let link = instructor::create_link(&store, request, &args.base_url, args.strict)?;

    match args.format {
        OutputFormat::Human => {
            for warning in &link.warnings {
                eprintln!("{warning}");
            }
            println!("Created link {}", link.id);
            print_config(&link.config);
            println!();
            println!("Share URL:");
            println!("{}", link.url);
        }
        OutputFormat::Json => {
            let out = json!({
                "id": link.id,
                "url": link.url,
                "config": link.config,
                "warnings": link.warnings.iter().map(ToString::to_string).collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

/// Lists stored links.
///
/// # Errors
///
/// Returns a store error if the file cannot be read.
pub fn list(args: &LinkListArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    let links = store.list_configs()?;

    match args.format {
        OutputFormat::Human => {
            if links.is_empty() {
                println!("No links created yet.");
                return Ok(());
            }
            println!(
                "{:<28} {:<20} {:>7} {:>9} {:>5}",
                "ID", "CREATED", "ALLOWED", "LIMIT", "EMAIL"
            );
            for (id, config) in &links {
                println!(
                    "{:<28} {:<20} {:>7} {:>9} {:>5}",
                    id,
                    config.created_at.format("%Y-%m-%d %H:%M:%S"),
                    config.allowed_violations,
                    duration_label(config),
                    if config.require_email { "yes" } else { "no" },
                );
            }
        }
        OutputFormat::Json => {
            let out = links
                .iter()
                .map(|(id, config)| {
                    Ok(json!({
                        "id": id,
                        "url": link_url_for_id(&args.base_url, id)?,
                        "config": config,
                    }))
                })
                .collect::<Result<Vec<_>, ConfigError>>()?;
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

/// Deletes a stored link.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no link has that id.
pub fn delete(args: &LinkDeleteArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    if !instructor::delete_link(&store, &args.id)? {
        return Err(ConfigError::NotFound {
            id: args.id.clone(),
        }
        .into());
    }
    println!("Deleted link {}", args.id);
    Ok(())
}

/// Prints the configuration behind a share URL, bundle or link id.
///
/// # Errors
///
/// Returns a configuration error if the reference cannot be resolved or
/// the configuration is invalid.
pub fn decode(args: &LinkDecodeArgs) -> Result<(), FormWardenError> {
    let store = FileStore::open(&args.store.path);
    let config = resolve(&store, &args.link)?;

    match args.format {
        OutputFormat::Human => print_config(&config),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

/// Classifies a free-form link reference.
///
/// Anything with a query string is a share URL, anything with the link
/// id prefix is an id, and everything else is taken as a bundle.
pub(crate) fn classify(reference: &str) -> Result<LinkTarget, ConfigError> {
    let reference = reference.trim();
    if reference.contains('?') {
        return parse_link(reference).ok_or_else(|| ConfigError::InvalidValue {
            field: "url".to_string(),
            value: reference.to_string(),
            expected: "a share URL with a 'config' or 'id' parameter".to_string(),
        });
    }
    if reference.starts_with(LINK_ID_PREFIX) {
        return Ok(LinkTarget::Id(reference.to_string()));
    }
    Ok(LinkTarget::Bundle(reference.to_string()))
}

/// Loads and validates the configuration a link target points to.
pub(crate) fn load_target(
    store: &dyn ConfigStore,
    target: LinkTarget,
) -> Result<Configuration, ConfigError> {
    let source: Box<dyn ConfigSource + '_> = match target {
        LinkTarget::Bundle(bundle) => Box::new(BundleSource::new(bundle)),
        LinkTarget::Id(id) => Box::new(StoreSource::new(store, id)),
    };
    load_configuration(source.as_ref())
}

fn resolve(store: &dyn ConfigStore, reference: &str) -> Result<Configuration, ConfigError> {
    load_target(store, classify(reference)?)
}

fn duration_label(config: &Configuration) -> String {
    config
        .session_duration_minutes
        .map_or_else(|| "none".to_string(), |m| format!("{m} min"))
}

fn print_config(config: &Configuration) {
    if let Some(id) = &config.id {
        println!("  id:                 {id}");
    }
    println!("  form:               {}", config.form_url);
    println!("  allowed violations: {}", config.allowed_violations);
    println!("  time limit:         {}", duration_label(config));
    println!(
        "  require email:      {}",
        if config.require_email { "yes" } else { "no" }
    );
    println!("  created:            {}", config.created_at.to_rfc3339());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::encode_bundle;
    use crate::store::MemoryStore;

    #[test]
    fn test_classify_references() {
        assert_eq!(
            classify("https://h/wrapper.html?id=wrapper_a_b").unwrap(),
            LinkTarget::Id("wrapper_a_b".to_string())
        );
        assert_eq!(
            classify("wrapper_a_b").unwrap(),
            LinkTarget::Id("wrapper_a_b".to_string())
        );
        assert_eq!(
            classify("eyJhIjoxfQ").unwrap(),
            LinkTarget::Bundle("eyJhIjoxfQ".to_string())
        );
        assert!(classify("https://h/wrapper.html?other=1").is_err());
    }

    #[test]
    fn test_load_target_from_store_and_bundle() {
        let store = MemoryStore::new();
        let config = Configuration::new("https://docs.google.com/forms/d/a", 4, Some(20), false);
        store.save_config("wrapper_x_1", &config).unwrap();

        let by_id = load_target(&store, LinkTarget::Id("wrapper_x_1".to_string())).unwrap();
        assert_eq!(by_id, config);

        let bundle = encode_bundle(&config).unwrap();
        let by_bundle = load_target(&store, LinkTarget::Bundle(bundle)).unwrap();
        assert_eq!(by_bundle, config);
    }

    #[test]
    fn test_load_target_missing_id() {
        let store = MemoryStore::new();
        assert!(matches!(
            load_target(&store, LinkTarget::Id("wrapper_none".to_string())),
            Err(ConfigError::NotFound { .. })
        ));
    }
}
