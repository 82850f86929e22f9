#![allow(clippy::unwrap_used)]

use css_selectors::{ElementAdapter, matches_selector_list, parse_selector_list};

/// Flat test tree: each element knows its parent and previous element sibling.
struct Element {
    tag: &'static str,
    id: Option<&'static str>,
    classes: &'static [&'static str],
    attrs: &'static [(&'static str, &'static str)],
    parent: Option<usize>,
    previous: Option<usize>,
}

struct Tree(Vec<Element>);

impl ElementAdapter for Tree {
    type Handle = usize;

    fn parent(&self, element: usize) -> Option<usize> {
        self.0[element].parent
    }

    fn previous_sibling_element(&self, element: usize) -> Option<usize> {
        self.0[element].previous
    }

    fn tag_name(&self, element: usize) -> &str {
        self.0[element].tag
    }

    fn element_id(&self, element: usize) -> Option<&str> {
        self.0[element].id
    }

    fn has_class(&self, element: usize, class: &str) -> bool {
        self.0[element].classes.iter().any(|candidate| *candidate == class)
    }

    fn attr(&self, element: usize, name: &str) -> Option<&str> {
        self.0[element]
            .attrs
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

/// <section id=main>
///   <ul class=list>
///     <li class=item data-state=done>
///     <li class=item>
///       <span class=label>
///   </ul>
/// </section>
fn tree() -> Tree {
    Tree(vec![
        Element { tag: "section", id: Some("main"), classes: &[], attrs: &[], parent: None, previous: None },
        Element { tag: "ul", id: None, classes: &["list"], attrs: &[], parent: Some(0), previous: None },
        Element { tag: "li", id: None, classes: &["item"], attrs: &[("data-state", "done")], parent: Some(1), previous: None },
        Element { tag: "li", id: None, classes: &["item"], attrs: &[], parent: Some(1), previous: Some(2) },
        Element { tag: "span", id: None, classes: &["label"], attrs: &[], parent: Some(3), previous: None },
    ])
}

fn matching(tree: &Tree, selector: &str) -> Vec<usize> {
    let list = parse_selector_list(selector).unwrap();
    (0..tree.0.len())
        .filter(|&element| matches_selector_list(tree, element, &list))
        .collect()
}

#[test]
fn simple_selectors() {
    let tree = tree();
    assert_eq!(matching(&tree, ".item"), vec![2, 3]);
    assert_eq!(matching(&tree, "li.item[data-state]"), vec![2]);
    assert_eq!(matching(&tree, "[data-state=done]"), vec![2]);
    assert_eq!(matching(&tree, "#main"), vec![0]);
    assert_eq!(matching(&tree, "*").len(), 5);
    assert!(matching(&tree, ".ITEM").is_empty(), "class names are case-sensitive");
    assert_eq!(matching(&tree, "LI"), vec![2, 3], "type selectors are case-insensitive");
}

#[test]
fn combinators() {
    let tree = tree();
    assert_eq!(matching(&tree, "#main .label"), vec![4]);
    assert_eq!(matching(&tree, "ul > li"), vec![2, 3]);
    assert!(matching(&tree, "section > li").is_empty());
    assert_eq!(matching(&tree, "li + li"), vec![3]);
    assert_eq!(matching(&tree, "[data-state] ~ .item"), vec![3]);
}

#[test]
fn descendant_backtracks_past_failed_child_step() {
    let tree = tree();
    // The nearest `li` ancestor of the span is not `[data-state]`, and the
    // child step must still be evaluated against each descendant candidate.
    assert_eq!(matching(&tree, "ul > li span"), vec![4]);
    assert!(matching(&tree, "ul > li[data-state] span").is_empty());
    assert_eq!(matching(&tree, "section ul > .item > .label"), vec![4]);
}

#[test]
fn selector_groups() {
    let tree = tree();
    assert_eq!(matching(&tree, "ul, .label"), vec![1, 4]);
}
