//! Completion propagation through nested scopes
//!
use ambit_scope::{Completion, CoreScope, RepositoryCacheMode, ScopeOptions, ScopeProvider};
use ambit_test_utils::{init_tracing, provider};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;

/// Open a chain of nested scopes, completing where `completes[i]`, and
/// dispose innermost first. Returns the root's outcome.
fn run_chain(provider: &ScopeProvider, completes: &[bool]) -> bool {
    let scopes: Vec<CoreScope> = completes
        .iter()
        .map(|_| provider.create_scope(ScopeOptions::new()).unwrap())
        .collect();

    let mut outcome = false;
    for (scope, &complete) in scopes.iter().zip(completes).rev() {
        if complete {
            scope.complete().unwrap();
        }
        outcome = scope.dispose().unwrap();
    }
    outcome
}

#[test]
fn fully_completed_chain_completes_root() {
    init_tracing();
    assert!(run_chain(&provider(), &[true; 6]));
}

#[test]
fn one_uncompleted_leaf_fails_root() {
    init_tracing();
    assert!(!run_chain(&provider(), &[true, true, true, false]));
}

#[test]
fn failed_sibling_fails_parent_even_after_successful_sibling() {
    let provider = provider();
    let root = provider.create_scope(ScopeOptions::new()).unwrap();

    let first = provider.create_scope(ScopeOptions::new()).unwrap();
    first.complete().unwrap();
    assert!(first.dispose().unwrap());

    let second = provider.create_scope(ScopeOptions::new()).unwrap();
    assert!(!second.dispose().unwrap());

    assert_eq!(root.completion(), Completion::Failed);
    assert!(!root.complete().unwrap());
    assert!(!root.dispose().unwrap());
}

#[test]
fn failure_reported_after_parent_completed_still_wins() {
    let provider = provider();
    let root = provider.create_scope(ScopeOptions::new()).unwrap();
    let child = provider.create_scope(ScopeOptions::new()).unwrap();

    assert!(root.complete().unwrap());
    child.dispose().unwrap();

    assert_eq!(root.completed(), Some(false));
    assert!(!root.dispose().unwrap());
}

#[test]
fn shared_objects_are_identical_across_the_tree() {
    let provider = provider();
    let root = provider.create_scope(ScopeOptions::new()).unwrap();
    let child = provider.create_scope(ScopeOptions::new()).unwrap();
    let grandchild = provider.create_scope(ScopeOptions::new()).unwrap();

    // first access from the leaf still creates the objects on the root
    let caches = grandchild.isolated_caches().unwrap();
    let publisher = grandchild.notifications().unwrap();

    for scope in [&root, &child] {
        assert!(Arc::ptr_eq(&caches, &scope.isolated_caches().unwrap()));
        assert!(Arc::ptr_eq(&publisher, &scope.notifications().unwrap()));
    }
}

#[test]
fn separate_trees_do_not_share() {
    let provider = provider();
    let first = provider.create_scope(ScopeOptions::new()).unwrap();
    let caches = first.isolated_caches().unwrap();
    first.dispose().unwrap();

    let second = provider.create_scope(ScopeOptions::new()).unwrap();
    assert!(!Arc::ptr_eq(&caches, &second.isolated_caches().unwrap()));
}

#[test]
fn cache_mode_resolves_to_nearest_override() {
    let provider = ScopeProvider::in_memory(
        ambit_scope::ScopeSettings::default().with_default_cache_mode(RepositoryCacheMode::Scoped),
    );

    let root = provider.create_scope(ScopeOptions::new()).unwrap();
    assert_eq!(root.cache_mode(), RepositoryCacheMode::Scoped);

    let middle = provider
        .create_scope(ScopeOptions::new().with_cache_mode(RepositoryCacheMode::Disabled))
        .unwrap();
    let leaf = provider.create_scope(ScopeOptions::new()).unwrap();

    assert_eq!(middle.cache_mode(), RepositoryCacheMode::Disabled);
    assert_eq!(leaf.cache_mode(), RepositoryCacheMode::Disabled);
}

proptest! {
    #[test]
    fn root_completes_iff_every_scope_completes(
        completes in prop::collection::vec(any::<bool>(), 1..12),
    ) {
        let expected = completes.iter().all(|&complete| complete);
        prop_assert_eq!(run_chain(&provider(), &completes), expected);
    }

    #[test]
    fn completing_twice_equals_completing_once(twice in any::<bool>()) {
        let provider = provider();
        let scope = provider.create_scope(ScopeOptions::new()).unwrap();
        let first = scope.complete().unwrap();
        if twice {
            prop_assert_eq!(scope.complete().unwrap(), first);
        }
        prop_assert!(scope.dispose().unwrap());
    }
}
