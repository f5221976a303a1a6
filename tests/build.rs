use once_cell::sync::Lazy;

use svgbridge::svgbridge_dom::Document;
use svgbridge::svgbridge_gvt::{NodeExt, NodeKind, Paint, Rect, Tree, Units};
use svgbridge::{build_document, BridgeContext, Dynamic, Options};

static DYNAMIC: Lazy<Options> = Lazy::new(|| Options {
    dynamic: Dynamic::Dynamic,
    ..Options::default()
});

fn build(text: &str, opt: &Options) -> (Tree, BridgeContext, Document) {
    let mut doc = Document::parse_str(text).unwrap();
    let mut ctx = BridgeContext::new(opt.clone());
    let tree = build_document(&mut ctx, &mut doc).unwrap();
    (tree, ctx, doc)
}

fn assert_rect_eq(a: Rect, b: Rect) {
    let eps = 0.001;
    assert!(
        (a.x() - b.x()).abs() < eps
            && (a.y() - b.y()).abs() < eps
            && (a.width() - b.width()).abs() < eps
            && (a.height() - b.height()).abs() < eps,
        "{:?} != {:?}",
        a,
        b
    );
}

#[test]
fn zero_width_rect_has_no_shape() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' x='10' y='10' width='0' height='50'/>
        </svg>",
        &Options::default(),
    );

    let node = tree.node_by_id("r").unwrap();
    assert!(matches!(*node.borrow(), NodeKind::Shape(_)));
    assert!(node.shape().is_none());
    assert!(node.bounding_box().is_none());
    assert!(ctx.errors().is_empty());
}

#[test]
fn zero_sizes_disable_rendering() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <circle id='c' r='0'/>
            <ellipse id='e' rx='5' ry='0'/>
            <rect id='r' width='10' height='0'/>
        </svg>",
        &Options::default(),
    );

    for id in ["c", "e", "r"] {
        assert!(tree.node_by_id(id).unwrap().shape().is_none(), "{}", id);
    }
    assert!(ctx.errors().is_empty());
}

#[test]
fn circle_bounding_box() {
    let (tree, _, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <circle id='c' cx='5' cy='5' r='10'/>
        </svg>",
        &Options::default(),
    );

    let bbox = tree.node_by_id("c").unwrap().bounding_box().unwrap();
    assert_rect_eq(bbox, Rect::from_xywh(-5.0, -5.0, 20.0, 20.0).unwrap());
}

#[test]
fn default_linear_gradient_vector() {
    let (tree, _, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <linearGradient id='lg'>
                <stop offset='0' stop-color='red'/>
                <stop offset='1' stop-color='blue'/>
            </linearGradient>
            <rect id='r' width='10' height='10' fill='url(#lg)'/>
        </svg>",
        &Options::default(),
    );

    let node = tree.node_by_id("r").unwrap();
    let kind = node.borrow();
    let fill = match *kind {
        NodeKind::Shape(ref shape) => shape.fill.clone().unwrap(),
        _ => panic!("a shape is expected"),
    };

    match fill.paint {
        Paint::LinearGradient(ref lg) => {
            assert_eq!(lg.units, Units::ObjectBoundingBox);
            assert_eq!((lg.x1, lg.y1, lg.x2, lg.y2), (0.0, 0.0, 1.0, 0.0));
            assert_eq!(lg.stops.len(), 2);
            assert_eq!(lg.stops[0].offset.get(), 0.0);
            assert_eq!(lg.stops[1].offset.get(), 1.0);
        }
        ref paint => panic!("unexpected paint {:?}", paint),
    }
}

#[test]
fn missing_geometry_attributes() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <circle id='c'/>
            <ellipse id='e' rx='5'/>
            <rect id='r' height='5'/>
        </svg>",
        &Options::default(),
    );

    let attributes: Vec<&str> = ctx.errors().iter().filter_map(|e| e.attribute()).collect();
    assert_eq!(attributes, ["r", "ry", "width"]);
    assert!(ctx.errors().iter().all(|e| e.code() == "attribute.missing"));

    for id in ["c", "e", "r"] {
        assert!(tree.node_by_id(id).is_none(), "{}", id);
    }
}

#[test]
fn failed_element_does_not_affect_siblings() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <g id='g'>
                <rect id='r1' width='10' height='10'/>
                <rect id='bad' width='-1' height='10'/>
                <rect id='r2' width='10' height='10'/>
            </g>
        </svg>",
        &Options::default(),
    );

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "attribute.illegal");

    let g = tree.node_by_id("g").unwrap();
    let ids: Vec<String> = g.children().map(|n| n.id().to_string()).collect();
    assert_eq!(ids, ["r1", "r2"]);
}

#[test]
fn bindings_are_symmetric() {
    let (tree, ctx, doc) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <g id='g'><rect id='r' width='10' height='10'/></g>
        </svg>",
        &DYNAMIC,
    );

    for id in ["g", "r"] {
        let element = doc.element_by_id(id).unwrap().id();
        let node = ctx.node_for_element(element).unwrap();
        assert!(node == tree.node_by_id(id).unwrap());
        assert_eq!(ctx.element_for_node(&node), Some(element));
    }
}

#[test]
fn static_documents_keep_no_bindings() {
    let (_, ctx, doc) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'><rect id='r' width='10' height='10'/></svg>",
        &Options::default(),
    );

    let element = doc.element_by_id("r").unwrap().id();
    assert!(ctx.node_for_element(element).is_none());
    assert_eq!(ctx.bindings_count(), 0);
}

#[test]
fn broken_paint_server_uses_fallback_color() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' width='10' height='10' fill='url(#missing) green'/>
        </svg>",
        &Options::default(),
    );

    let node = tree.node_by_id("r").unwrap();
    match *node.borrow() {
        NodeKind::Shape(ref shape) => match shape.fill.as_ref().map(|f| &f.paint) {
            Some(Paint::Color(c)) => assert_eq!((c.red, c.green, c.blue), (0, 128, 0)),
            paint => panic!("unexpected paint {:?}", paint),
        },
        _ => panic!("a shape is expected"),
    }

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "uri.badTarget");
    assert_eq!(ctx.errors()[0].attribute(), Some("fill"));
}

#[test]
fn root_view_box_and_size() {
    let (tree, _, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg' width='200' height='100' viewBox='0 0 20 10'>
            <rect id='r' width='20' height='10'/>
        </svg>",
        &Options::default(),
    );

    assert_eq!(tree.size.width(), 200.0);
    assert_eq!(tree.size.height(), 100.0);
    assert_eq!(tree.view_box.rect.width(), 20.0);
    assert!(tree.node_by_id("r").is_some());
}

#[test]
fn system_language_conditions() {
    let opt = Options {
        languages: vec!["ru".to_string()],
        ..Options::default()
    };
    let (tree, _, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <switch>
                <rect id='en' systemLanguage='en' width='10' height='10'/>
                <rect id='ru' systemLanguage='ru-RU' width='10' height='10'/>
                <rect id='any' width='10' height='10'/>
            </switch>
        </svg>",
        &opt,
    );

    assert!(tree.node_by_id("en").is_none());
    assert!(tree.node_by_id("ru").is_some());
    assert!(tree.node_by_id("any").is_none());
}

#[test]
fn malformed_values_disable_the_element() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <circle id='c' cx='abc' r='5'/>
            <rect id='r' width='10' height='10' transform='rotate(oops'/>
            <g id='g' transform='translate(1,'><rect width='10' height='10'/></g>
            <rect id='ok' width='10' height='10'/>
        </svg>",
        &Options::default(),
    );

    let attributes: Vec<&str> = ctx.errors().iter().filter_map(|e| e.attribute()).collect();
    assert_eq!(attributes, ["cx", "transform", "transform"]);
    assert!(ctx.errors().iter().all(|e| e.code() == "attribute.malformed"));
    assert!(ctx.errors().iter().all(|e| !e.is_recoverable()));

    for id in ["c", "r", "g"] {
        assert!(tree.node_by_id(id).is_none(), "{}", id);
    }
    assert!(tree.node_by_id("ok").is_some());
}

#[test]
fn malformed_gradient_is_reported() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <linearGradient id='lg' x1='zz'>
                <stop offset='0' stop-color='red'/>
                <stop offset='1' stop-color='blue'/>
            </linearGradient>
            <rect id='r' width='10' height='10' fill='url(#lg)'/>
        </svg>",
        &Options::default(),
    );

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "attribute.malformed");
    assert_eq!(ctx.errors()[0].attribute(), Some("x1"));

    // Without a fallback color the shape is not filled.
    let node = tree.node_by_id("r").unwrap();
    match *node.borrow() {
        NodeKind::Shape(ref shape) => assert!(shape.fill.is_none()),
        _ => panic!("a shape is expected"),
    };
}

#[test]
fn broken_clip_path_and_mask_are_replaced_by_placeholders() {
    let (tree, ctx, _) = build(
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='c' width='10' height='10' clip-path='url(#missing)'/>
            <rect id='m' width='10' height='10' mask='url(#gone)'/>
            <rect id='ok' width='10' height='10'/>
        </svg>",
        &Options::default(),
    );

    let attributes: Vec<&str> = ctx.errors().iter().filter_map(|e| e.attribute()).collect();
    assert_eq!(attributes, ["clip-path", "mask"]);
    assert!(ctx.errors().iter().all(|e| e.code() == "uri.badTarget"));

    for id in ["c", "m"] {
        let node = tree.node_by_id(id).unwrap();
        assert!(matches!(*node.borrow(), NodeKind::Group(_)), "{}", id);
    }
    assert!(matches!(*tree.node_by_id("ok").unwrap().borrow(), NodeKind::Shape(_)));
}
