use std::rc::Rc;

use url::Url;

use svgbridge::reference::{self, Reference};
use svgbridge::svgbridge_dom::Document;
use svgbridge::svgbridge_gvt::{Color, Node, NodeExt, NodeKind, Paint};
use svgbridge::{build_document, BridgeContext, Options, ResourceKind, SecurityPolicy};

const SHAPES: &str = "<svg xmlns='http://www.w3.org/2000/svg'>
    <circle id='dot' r='5'/>
</svg>";

const MAIN: &str = "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
    <use id='u' xlink:href='shapes.svg#dot'/>
</svg>";

fn main_document(url: &str) -> Document {
    let mut doc = Document::parse_str(MAIN).unwrap();
    doc.set_url(Some(url.to_string()));
    doc
}

fn context_with_shapes(security: SecurityPolicy) -> BridgeContext {
    let mut ctx = BridgeContext::new(Options {
        security,
        ..Options::default()
    });
    let url = Url::parse("file:///tmp/svgbridge/shapes.svg").unwrap();
    ctx.loader_mut().insert(&url, Document::parse_str(SHAPES).unwrap());
    ctx
}

#[test]
fn local_resolution_is_idempotent() {
    let doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg'><rect id='a'/><g id='base'/></svg>",
    )
    .unwrap();
    let mut ctx = BridgeContext::new(Options::default());
    let base = doc.element_by_id("base").unwrap();

    let mut targets = Vec::new();
    for _ in 0..2 {
        match reference::resolve(&mut ctx, base, "href", "#a", ResourceKind::Document).unwrap() {
            Reference::Local(node) => targets.push(node.id()),
            r => panic!("unexpected {:?}", r),
        }
    }

    assert_eq!(targets[0], targets[1]);
    assert_eq!(targets[0], doc.element_by_id("a").unwrap().id());
}

#[test]
fn external_resolution_is_idempotent() {
    let doc = main_document("file:///tmp/svgbridge/main.svg");
    let mut ctx = context_with_shapes(SecurityPolicy::SameOrigin);
    let base = doc.root_element().unwrap();

    let mut documents = Vec::new();
    for _ in 0..2 {
        let r = reference::resolve(&mut ctx, base, "href", "shapes.svg#dot", ResourceKind::Document);
        match r.unwrap() {
            Reference::External { document, element } => {
                let element = element.unwrap();
                assert_eq!(document.get(element).element_id(), "dot");
                documents.push(document);
            }
            r => panic!("unexpected {:?}", r),
        }
    }

    assert!(Rc::ptr_eq(&documents[0], &documents[1]));
    assert_eq!(ctx.loader_mut().len(), 1);
}

#[test]
fn explicit_self_reference_is_local() {
    let mut doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg'><rect id='a'/></svg>",
    )
    .unwrap();
    doc.set_url(Some("file:///tmp/svgbridge/self.svg".to_string()));
    let mut ctx = BridgeContext::new(Options::default());
    let base = doc.root_element().unwrap();

    let r = reference::resolve(&mut ctx, base, "href", "self.svg#a", ResourceKind::Document);
    assert!(matches!(r, Ok(Reference::Local(_))));
    assert!(ctx.loader_mut().is_empty());
}

#[test]
fn use_instantiates_an_external_element() {
    let mut doc = main_document("file:///tmp/svgbridge/main.svg");
    let mut ctx = context_with_shapes(SecurityPolicy::SameOrigin);
    let tree = build_document(&mut ctx, &mut doc).unwrap();

    assert!(ctx.errors().is_empty());
    let copy = tree.node_by_id("u").unwrap().first_child().unwrap();
    assert_eq!(&*copy.id(), "dot");
    let width = copy.bounding_box().map(|r| r.width()).unwrap();
    assert!((width - 10.0).abs() < 0.001);
}

#[test]
fn disabled_external_resources_are_denied() {
    let mut doc = main_document("file:///tmp/svgbridge/main.svg");
    let mut ctx = context_with_shapes(SecurityPolicy::NoExternal);
    let tree = build_document(&mut ctx, &mut doc).unwrap();

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "uri.unsecure");
    assert_eq!(ctx.errors()[0].uri(), Some("shapes.svg#dot"));
    assert!(ctx.errors()[0].is_recoverable());

    // A placeholder is rendered instead.
    assert!(tree.node_by_id("u").is_some());
}

#[test]
fn other_origins_are_denied() {
    let mut doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <use id='u' xlink:href='https://other.example/shapes.svg#dot'/>
        </svg>",
    )
    .unwrap();
    doc.set_url(Some("https://example.com/main.svg".to_string()));
    let mut ctx = BridgeContext::new(Options::default());
    build_document(&mut ctx, &mut doc).unwrap();

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "uri.unsecure");
    assert!(ctx.loader_mut().is_empty());
}

#[test]
fn mutually_recursive_uses_are_circular() {
    let mut doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <g id='a'><use xlink:href='#b'/></g>
            <g id='b'><use xlink:href='#a'/></g>
        </svg>",
    )
    .unwrap();
    let mut ctx = BridgeContext::new(Options::default());
    let tree = build_document(&mut ctx, &mut doc).unwrap();

    assert!(!ctx.errors().is_empty());
    assert!(ctx
        .errors()
        .iter()
        .all(|e| e.code() == "xlink.href.circularDependencies"));
    assert!(tree.node_by_id("a").is_some());
    assert!(tree.node_by_id("b").is_some());
}

#[test]
fn gradient_href_cycle_is_reported() {
    let mut doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <linearGradient id='lg1' xlink:href='#lg2'/>
            <linearGradient id='lg2' xlink:href='#lg1'/>
            <rect id='r' width='10' height='10' fill='url(#lg1)'/>
        </svg>",
    )
    .unwrap();
    let mut ctx = BridgeContext::new(Options::default());
    let tree = build_document(&mut ctx, &mut doc).unwrap();

    assert!(ctx
        .errors()
        .iter()
        .any(|e| e.code() == "xlink.href.circularDependencies"));
    assert!(tree.node_by_id("r").is_some());
}

#[test]
fn dangling_local_link() {
    let doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' clip-path='url(#missing)' fill='red'/>
        </svg>",
    )
    .unwrap();
    let r = doc.element_by_id("r").unwrap();

    let err = reference::resolve_local_link(r, "clip-path").unwrap_err();
    assert_eq!(err.code(), "uri.badTarget");
    assert_eq!(err.attribute(), Some("clip-path"));

    // Not a link.
    assert!(reference::resolve_local_link(r, "fill").unwrap().is_none());
}

const PAINTS: &str = "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
    <linearGradient id='lg' xlink:href='#base'/>
    <linearGradient id='base'>
        <stop offset='0' stop-color='blue'/>
        <stop offset='1' stop-color='blue'/>
    </linearGradient>
    <filter id='f'><feFlood flood-color='green'/></filter>
</svg>";

fn paints_url() -> Url {
    Url::parse("file:///tmp/svgbridge/paints.svg").unwrap()
}

fn build_with_paints(text: &str) -> (svgbridge::svgbridge_gvt::Tree, BridgeContext) {
    let mut doc = Document::parse_str(text).unwrap();
    doc.set_url(Some("file:///tmp/svgbridge/main.svg".to_string()));
    let mut ctx = BridgeContext::new(Options {
        security: SecurityPolicy::SameOrigin,
        ..Options::default()
    });
    ctx.loader_mut()
        .insert(&paints_url(), Document::parse_str(PAINTS).unwrap());
    let tree = build_document(&mut ctx, &mut doc).unwrap();
    (tree, ctx)
}

fn fill_of(node: &Node) -> Paint {
    match *node.borrow() {
        NodeKind::Shape(ref shape) => shape.fill.clone().unwrap().paint,
        _ => panic!("a shape is expected"),
    }
}

#[test]
fn external_gradient_follows_its_own_document_links() {
    let (tree, ctx) = build_with_paints(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' width='10' height='10' fill='url(paints.svg#lg)'/>
        </svg>",
    );

    assert!(ctx.errors().is_empty());
    match fill_of(&tree.node_by_id("r").unwrap()) {
        Paint::LinearGradient(ref lg) => {
            assert_eq!(lg.id, "lg");
            assert_eq!(lg.stops.len(), 2);
            assert_eq!(lg.stops[0].color, Color::new_rgb(0, 0, 255));
        }
        ref paint => panic!("unexpected paint {:?}", paint),
    }
}

#[test]
fn local_gradient_inherits_from_another_document() {
    let (tree, ctx) = build_with_paints(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <linearGradient id='local' xlink:href='paints.svg#lg' x2='0.5'/>
            <rect id='r' width='10' height='10' fill='url(#local)'/>
        </svg>",
    );

    assert!(ctx.errors().is_empty());
    match fill_of(&tree.node_by_id("r").unwrap()) {
        Paint::LinearGradient(ref lg) => {
            assert_eq!(lg.id, "local");
            assert_eq!(lg.x2, 0.5);
            assert_eq!(lg.stops.len(), 2);
            assert_eq!(lg.stops[1].color, Color::new_rgb(0, 0, 255));
        }
        ref paint => panic!("unexpected paint {:?}", paint),
    }
}

#[test]
fn fragments_are_cached_per_document() {
    let (tree, ctx) = build_with_paints(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <linearGradient id='lg'>
                <stop offset='0' stop-color='red'/>
                <stop offset='1' stop-color='red'/>
            </linearGradient>
            <rect id='a' width='10' height='10' fill='url(paints.svg#lg)'/>
            <rect id='b' width='10' height='10' fill='url(paints.svg#lg)'/>
            <rect id='c' width='10' height='10' fill='url(#lg)'/>
        </svg>",
    );
    assert!(ctx.errors().is_empty());

    let paints: Vec<Paint> = ["a", "b", "c"]
        .iter()
        .map(|id| fill_of(&tree.node_by_id(id).unwrap()))
        .collect();
    match (&paints[0], &paints[1], &paints[2]) {
        (Paint::LinearGradient(a), Paint::LinearGradient(b), Paint::LinearGradient(c)) => {
            assert!(Rc::ptr_eq(a, b));
            assert_eq!(a.stops[0].color, Color::new_rgb(0, 0, 255));
            assert_eq!(c.stops[0].color, Color::new_rgb(255, 0, 0));
        }
        paints => panic!("unexpected paints {:?}", paints),
    }

    let external = Document::parse_str(PAINTS).unwrap();
    let lg = external.element_by_id("lg").unwrap().id();
    assert!(ctx.has_cached_external_fragment(&paints_url(), lg));
}

#[test]
fn external_filter_is_attached() {
    let (tree, ctx) = build_with_paints(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' width='10' height='10' filter='url(paints.svg#f)'/>
        </svg>",
    );

    assert!(ctx.errors().is_empty());
    let node = tree.node_by_id("r").unwrap();
    let kind = node.borrow();
    assert_eq!(kind.effects().filters.len(), 1);
    assert_eq!(kind.effects().filters[0].id, "f");
}

#[test]
fn missing_external_paint_uses_the_fallback() {
    let (tree, ctx) = build_with_paints(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' width='10' height='10' fill='url(paints.svg#nope) red'/>
        </svg>",
    );

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "uri.badTarget");
    assert_eq!(ctx.errors()[0].uri(), Some("paints.svg#nope"));
    match fill_of(&tree.node_by_id("r").unwrap()) {
        Paint::Color(c) => assert_eq!(c, Color::new_rgb(255, 0, 0)),
        ref paint => panic!("unexpected paint {:?}", paint),
    }
}
