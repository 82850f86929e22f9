//! Scope roots, independent registrations and registration errors.

#![allow(clippy::unwrap_used)]

use anyhow::Error;
use dom::adapter::compile_selector;
use dom::{Document, DocumentConfig, NodeKey};
use perpetual::{Watch as _, WatchOptions, register, text_of};
use serde_json::json;

/// Two sibling sections, each holding one `.item`.
fn page() -> (Document, NodeKey, NodeKey) {
    let _ = env_logger::builder().is_test(true).try_init();
    let doc = Document::parse_html_with_config(
        r#"<section id="left"><div class="item">L1</div></section>
           <section id="right"><div class="item">R1</div></section>"#,
        &DocumentConfig::default(),
    )
    .unwrap();
    let root = doc.document_node();
    let left = doc.query_selector(root, &compile_selector("#left").unwrap()).unwrap();
    let right = doc.query_selector(root, &compile_selector("#right").unwrap()).unwrap();
    (doc, left, right)
}

fn add_item(doc: &mut Document, parent: NodeKey, text: &str) -> Result<NodeKey, Error> {
    let element = doc.create_element("div");
    doc.set_attribute(element, "class", "item")?;
    let label = doc.create_text(text);
    doc.append_child(element, label)?;
    doc.append_child(parent, element)?;
    Ok(element)
}

#[test]
fn document_watches_default_to_the_body() -> Result<(), Error> {
    let (mut doc, _, _) = page();
    let watch = doc.watch(".item")?;
    assert_eq!(Some(watch.scope_root()), doc.body());
    assert_eq!(watch.selector(), ".item");
    assert_eq!(watch.options(), WatchOptions::default());
    Ok(())
}

#[test]
fn registrations_with_different_roots_are_independent() -> Result<(), Error> {
    let (mut doc, left, right) = page();
    let left_watch = doc.scoped(left).watch(".item")?.map(text_of);
    let right_watch = doc.scoped(right).watch(".item")?.map(text_of);
    doc.checkpoint()?;

    add_item(&mut doc, right, "R2")?;
    add_item(&mut doc, left, "L2")?;
    doc.checkpoint()?;

    assert_eq!(left_watch.results_json()?, json!(["L1", "L2"]));
    assert_eq!(right_watch.results_json()?, json!(["R1", "R2"]));
    assert_eq!(left_watch.scope_root(), left);
    assert_eq!(right_watch.scope_root(), right);
    Ok(())
}

#[test]
fn registrations_keep_separate_seen_sets() -> Result<(), Error> {
    let (mut doc, _, _) = page();
    let first = doc.watch(".item")?;
    doc.checkpoint()?;
    let second = doc.watch(".item")?.map(text_of);
    doc.checkpoint()?;

    assert_eq!(first.seen_len(), 2);
    assert_eq!(second.results_json()?, json!(["L1", "R1"]));
    Ok(())
}

#[test]
fn insertions_outside_the_scope_are_ignored() -> Result<(), Error> {
    let (mut doc, left, right) = page();
    let watch = doc
        .scoped(left)
        .watch_with(".item", WatchOptions::new().match_existing(false))?;
    let outside = add_item(&mut doc, right, "R2")?;
    doc.checkpoint()?;
    assert!(!watch.has_seen(outside));

    // Moving it into the scope counts as an insertion there.
    doc.append_child(left, outside)?;
    doc.checkpoint()?;
    assert!(watch.has_seen(outside));
    Ok(())
}

#[test]
fn the_scope_root_itself_is_not_an_existing_match() -> Result<(), Error> {
    let (mut doc, left, _) = page();
    let watch = doc.scoped(left).watch("section, .item")?.map(text_of);
    doc.checkpoint()?;
    assert_eq!(watch.results_json()?, json!(["L1"]));
    Ok(())
}

#[test]
fn bound_scope_wins_over_the_options_root() -> Result<(), Error> {
    let (mut doc, left, right) = page();
    let watch = doc
        .scoped(left)
        .watch_with(".item", WatchOptions::new().scope_root(right))?;
    assert_eq!(watch.scope_root(), left);

    let explicit = register(&mut doc, ".item", WatchOptions::new().scope_root(right))?;
    assert_eq!(explicit.scope_root(), right);
    Ok(())
}

#[test]
fn malformed_selectors_fail_at_registration() {
    let (mut doc, _, _) = page();
    assert!(doc.watch("div >").is_err());
    assert!(doc.watch("a:hover").is_err());
    assert!(doc.watch("").is_err());
}

#[test]
fn unknown_scope_roots_fail_at_registration() -> Result<(), Error> {
    let (mut doc, left, _) = page();
    doc.destroy(left)?;
    let err = register(&mut doc, ".item", WatchOptions::new().scope_root(left)).unwrap_err();
    assert!(err.to_string().contains("scope root"));
    Ok(())
}

#[test]
fn option_builders_override_defaults() {
    let options = WatchOptions::new()
        .match_existing(false)
        .match_reappearance(true);
    assert!(!options.match_existing);
    assert!(options.match_reappearance);
    assert_eq!(options.scope_root, None);
    assert!(WatchOptions::default().match_existing);
}
