use svgbridge::svgbridge_dom::Document;
use svgbridge::svgbridge_gvt::filter::{Input, Kind};
use svgbridge::svgbridge_gvt::{NodeExt, Tree, Units};
use svgbridge::update::{Facet, UpdateDispatcher};
use svgbridge::{build_document, BridgeContext, Options};

fn build(text: &str) -> (Tree, BridgeContext) {
    let mut doc = Document::parse_str(text).unwrap();
    let mut ctx = BridgeContext::new(Options::default());
    let tree = build_document(&mut ctx, &mut doc).unwrap();
    (tree, ctx)
}

#[test]
fn circular_filter_disables_the_element() {
    let (tree, ctx) = build(
        "<svg xmlns='http://www.w3.org/2000/svg' xmlns:xlink='http://www.w3.org/1999/xlink'>
            <filter id='f1' xlink:href='#f2'/>
            <filter id='f2' xlink:href='#f1'/>
            <rect id='r' width='10' height='10' filter='url(#f1)'/>
            <rect id='ok' width='10' height='10'/>
        </svg>",
    );

    assert!(ctx
        .errors()
        .iter()
        .any(|e| e.code() == "xlink.href.circularDependencies"));
    assert!(tree.node_by_id("r").is_none());
    assert!(tree.node_by_id("ok").is_some());
}

#[test]
fn missing_filter_disables_the_element() {
    let (tree, ctx) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' width='10' height='10' filter='url(#missing)'/>
        </svg>",
    );

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "uri.badTarget");
    assert_eq!(ctx.errors()[0].attribute(), Some("filter"));
    assert!(tree.node_by_id("r").is_none());
}

#[test]
fn filter_is_attached_to_the_node() {
    let (tree, ctx) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <filter id='f'>
                <feGaussianBlur stdDeviation='2' result='blur'/>
                <feOffset in='blur' dx='3' dy='4'/>
            </filter>
            <g id='g' filter='url(#f)'>
                <rect width='10' height='10'/>
            </g>
        </svg>",
    );
    assert!(ctx.errors().is_empty());

    let node = tree.node_by_id("g").unwrap();
    let kind = node.borrow();
    let filters = &kind.effects().filters;
    assert_eq!(filters.len(), 1);

    let filter = &filters[0];
    assert_eq!(filter.id, "f");
    assert_eq!(filter.units, Units::ObjectBoundingBox);
    assert_eq!(filter.primitives.len(), 2);
    assert_eq!(filter.primitives[0].result, "blur");

    match filter.primitives[1].kind {
        Kind::Offset(ref fe) => {
            assert_eq!(fe.input, Input::Reference("blur".to_string()));
            assert_eq!((fe.dx, fe.dy), (3.0, 4.0));
        }
        ref kind => panic!("unexpected primitive {:?}", kind),
    }
}

#[test]
fn filters_are_shared_between_users() {
    let (tree, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <filter id='f'><feFlood flood-color='green'/></filter>
            <rect id='r1' width='10' height='10' filter='url(#f)'/>
            <rect id='r2' width='10' height='10' filter='url(#f)'/>
        </svg>",
    );

    let filter = |id: &str| {
        let node = tree.node_by_id(id).unwrap();
        let filter = node.borrow().effects().filters[0].clone();
        filter
    };
    assert!(std::rc::Rc::ptr_eq(&filter("r1"), &filter("r2")));
}

#[test]
fn unsupported_primitives_are_skipped() {
    let (tree, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <filter id='f'>
                <feDiffuseLighting/>
                <feOffset dx='1'/>
            </filter>
            <rect id='r' width='10' height='10' filter='url(#f)'/>
        </svg>",
    );

    let node = tree.node_by_id("r").unwrap();
    let kind = node.borrow();
    let primitives = &kind.effects().filters[0].primitives;
    assert_eq!(primitives.len(), 1);
    assert!(matches!(primitives[0].kind, Kind::Offset(_)));
}

#[test]
fn primitive_change_updates_its_users() {
    let doc = Document::parse_str(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <filter id='f'><feOffset id='fe' dx='1'/></filter>
            <rect id='r' width='10' height='10' filter='url(#f)'/>
        </svg>",
    )
    .unwrap();
    let mut d = UpdateDispatcher::new(BridgeContext::new(Options::default()), doc).unwrap();
    let fe = d.document().element_by_id("fe").unwrap().id();
    let r = d.document().element_by_id("r").unwrap().id();

    d.document_mut().set_attribute(fe, "dx", "5");
    let report = d.process();
    assert_eq!(report.updated, vec![(r, Facet::Effects)]);

    let node = d.tree().node_by_id("r").unwrap();
    let kind = node.borrow();
    match kind.effects().filters[0].primitives[0].kind {
        Kind::Offset(ref fe) => assert_eq!(fe.dx, 5.0),
        ref kind => panic!("unexpected primitive {:?}", kind),
    }
}
