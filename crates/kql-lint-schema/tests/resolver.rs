//! Lazy resolution of the schema a query references

mod common;

use common::*;
use kql_lint_parser::QueryDocument;
use kql_lint_schema::{LoadOptions, SymbolLoader, SymbolResolver};
use kql_lint_symbols::{ClusterSymbol, DatabaseSymbol, GlobalState};
use pretty_assertions::assert_eq;
use std::sync::Arc;

const OTHER: &str = "other.kusto.windows.net";

fn memory_loader() -> Arc<MemoryLoader> {
    Arc::new(
        MemoryLoader::new(Some(HELP))
            .with_cluster(HELP, vec![samples_database(), database("Logs", "Traces")])
            .with_cluster(OTHER, vec![database("Remote", "Events")]),
    )
}

async fn resolve(resolver: &SymbolResolver, globals: &GlobalState, query: &str) -> GlobalState {
    resolver
        .resolve(globals, &QueryDocument::parse(query), &LoadOptions::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_cluster_reference_adds_placeholders() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());

    let globals = resolve(&resolver, &GlobalState::new(), "cluster('other').database_names()").await;

    let cluster = globals.cluster(OTHER).unwrap();
    assert!(!cluster.is_open());
    let remote = cluster.database("remote").unwrap();
    assert!(remote.is_placeholder());
    assert_eq!(loader.calls(), vec![LoaderCall::DatabaseNames(OTHER.to_string())]);
}

#[tokio::test]
async fn test_database_reference_loads_once() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let query = "cluster('other').database('Remote').Events | count";

    let globals = resolve(&resolver, &GlobalState::new(), query).await;
    let remote = globals.cluster(OTHER).unwrap().database("Remote").unwrap();
    assert!(!remote.is_placeholder());
    assert!(remote.table("Events").is_some());
    assert_eq!(loader.load_count(), 1);

    // already loaded: neither enumeration nor load repeats
    let again = resolve(&resolver, &globals, query).await;
    assert_eq!(again, globals);
    assert_eq!(loader.load_count(), 1);
    assert_eq!(loader.names_count(), 1);
}

#[tokio::test]
async fn test_unqualified_database_uses_default_cluster() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let globals = GlobalState::new()
        .with_database(HELP, samples_database())
        .with_default(HELP, "Samples");

    let globals = resolve(&resolver, &globals, "database('Logs').Traces | take 1").await;

    let help = globals.cluster(HELP).unwrap();
    assert!(help.database("Logs").unwrap().table("Traces").is_some());
    assert!(help.database("Samples").is_some());
    assert_eq!(
        loader.calls(),
        vec![LoaderCall::LoadDatabase(HELP.to_string(), "Logs".to_string())]
    );
}

#[tokio::test]
async fn test_database_on_unknown_cluster_is_skipped() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());

    // no default cluster in the snapshot and no cluster reference
    let globals = resolve(&resolver, &GlobalState::new(), "database('Logs').Traces").await;
    assert_eq!(globals, GlobalState::new());
    assert!(loader.calls().is_empty());
}

#[tokio::test]
async fn test_missing_database_stays_missing() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());

    let globals = resolve(&resolver, &GlobalState::new(), "cluster('other').database('Nope').T").await;
    let cluster = globals.cluster(OTHER).unwrap();
    assert!(cluster.database("Nope").is_none());
    assert_eq!(cluster.databases().count(), 1);
}

#[tokio::test]
async fn test_unknown_cluster_is_ignored_for_the_session() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let query = "cluster('gone').database('X').T";

    let globals = resolve(&resolver, &GlobalState::new(), query).await;
    assert!(globals.cluster("gone.kusto.windows.net").is_none());
    assert_eq!(resolver.ignored_clusters(), vec!["gone.kusto.windows.net"]);

    resolve(&resolver, &globals, query).await;
    assert_eq!(loader.names_count(), 1);
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_open_cluster_is_enumerated_keeping_loaded_databases() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let loaded = database("Remote", "Loaded");
    let globals = GlobalState::new().with_cluster(ClusterSymbol::open(OTHER, vec![loaded.clone()]));

    let globals = resolve(&resolver, &globals, "cluster('other').database_names()").await;

    let cluster = globals.cluster(OTHER).unwrap();
    assert!(!cluster.is_open());
    assert_eq!(cluster.database("Remote"), Some(&loaded));
    assert_eq!(loader.load_count(), 0);
}

#[tokio::test]
async fn test_enumerated_cluster_is_not_enumerated_again() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let globals = GlobalState::new().with_cluster(ClusterSymbol::new(OTHER, vec![DatabaseSymbol::open("Remote")]));

    let globals = resolve(&resolver, &globals, "cluster('other').database_names()").await;
    assert!(globals.cluster(OTHER).unwrap().database("Remote").unwrap().is_placeholder());
    assert!(loader.calls().is_empty());
}

#[tokio::test]
async fn test_each_block_resolves() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let query = "cluster('other').database('Remote').Events\n\ncluster('help').database('Logs').Traces";

    let globals = resolve(&resolver, &GlobalState::new(), query).await;
    assert!(globals.cluster(OTHER).unwrap().database("Remote").unwrap().table("Events").is_some());
    assert!(globals.cluster(HELP).unwrap().database("Logs").unwrap().table("Traces").is_some());
    assert_eq!(loader.load_count(), 2);
}

#[tokio::test]
async fn test_later_cluster_reference_serves_earlier_block() {
    let loader = memory_loader();
    let resolver = SymbolResolver::new(loader.clone());
    let globals = GlobalState::new().with_default(HELP, "Samples");
    let query = "database('Logs').Traces | take 1\n\ncluster('help').database_names()";

    let globals = resolve(&resolver, &globals, query).await;
    assert!(globals.cluster(HELP).unwrap().database("Logs").unwrap().table("Traces").is_some());
    assert_eq!(
        loader.calls(),
        vec![
            LoaderCall::DatabaseNames(HELP.to_string()),
            LoaderCall::LoadDatabase(HELP.to_string(), "Logs".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_failing_loader_in_strict_mode() {
    let mock = Arc::new(MockAdminClient::new());
    let loader: Arc<dyn SymbolLoader> = Arc::new(help_loader(&mock));
    let resolver = SymbolResolver::new(loader);
    let document = QueryDocument::parse("cluster('help').database('Samples').StormEvents");

    let globals = resolver
        .resolve(&GlobalState::new(), &document, &LoadOptions::new())
        .await
        .unwrap();
    assert_eq!(globals, GlobalState::new());

    let strict = SymbolResolver::new(Arc::new(help_loader(&mock)));
    assert!(strict
        .resolve(&GlobalState::new(), &document, &LoadOptions::strict())
        .await
        .is_err());
}
