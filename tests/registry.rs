use std::cell::Cell;
use std::rc::Rc;

use svgbridge::bridge::{Bridge, BuildStatus, GraphicsBridge};
use svgbridge::svgbridge_dom::{Document, SvgNode, SVG_NS};
use svgbridge::svgbridge_gvt::{Node, NodeExt, Transform, Tree};
use svgbridge::{
    build_document, register_default_bridge, BridgeContext, BridgeError, BridgeExtension,
    BridgeRegistry, Options,
};

const EXT_NS: &str = "http://example.com/ext";

struct StarBridge;

impl Bridge for StarBridge {
    fn namespace_uri(&self) -> &str {
        EXT_NS
    }

    fn local_name(&self) -> &str {
        "star"
    }

    fn as_graphics(&self) -> Option<&dyn GraphicsBridge> {
        Some(self)
    }
}

impl GraphicsBridge for StarBridge {
    fn build(
        &self,
        _: &mut BridgeContext,
        element: SvgNode,
        node: &Node,
    ) -> Result<BuildStatus, BridgeError> {
        let size = match element.raw_attribute("size") {
            Some(v) => v,
            None => return Err(BridgeError::missing_attribute(element, "size")),
        };

        let size: f32 = size
            .parse()
            .map_err(|_| BridgeError::malformed_attribute(element, "size", size))?;
        node.borrow_mut().set_transform(Transform::from_scale(size, size));
        Ok(BuildStatus::Built)
    }
}

/// A bridge without any capabilities.
struct Inert(&'static str);

impl Bridge for Inert {
    fn local_name(&self) -> &str {
        self.0
    }
}

fn build(ctx: &mut BridgeContext, text: &str) -> Tree {
    let mut doc = Document::parse_str(text).unwrap();
    build_document(ctx, &mut doc).unwrap()
}

const STARS: &str = "<svg xmlns='http://www.w3.org/2000/svg' xmlns:e='http://example.com/ext'>
    <e:star id='s' size='2'/>
    <e:star id='broken' size='big'/>
</svg>";

#[test]
fn custom_namespace_bridge() {
    let mut ctx = BridgeContext::new(Options::default());
    ctx.registry_mut().register(Rc::new(StarBridge));
    let tree = build(&mut ctx, STARS);

    let star = tree.node_by_id("s").unwrap();
    assert_eq!(star.transform(), Transform::from_scale(2.0, 2.0));

    assert_eq!(ctx.errors().len(), 1);
    assert_eq!(ctx.errors()[0].code(), "attribute.malformed");
    assert_eq!(ctx.errors()[0].attribute(), Some("size"));
}

#[test]
fn elements_without_a_bridge_are_ignored() {
    let mut ctx = BridgeContext::new(Options::default());
    let tree = build(&mut ctx, STARS);

    assert!(tree.node_by_id("s").is_none());
    assert!(ctx.errors().is_empty());
}

#[test]
fn non_graphics_override_suppresses_elements() {
    let mut ctx = BridgeContext::new(Options::default());
    ctx.registry_mut().register(Rc::new(Inert("rect")));
    let tree = build(
        &mut ctx,
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect id='r' width='10' height='10'/>
            <circle id='c' r='5'/>
        </svg>",
    );

    assert!(tree.node_by_id("r").is_none());
    assert!(tree.node_by_id("c").is_some());
    assert!(ctx.errors().is_empty());
}

struct StarExtension;

impl BridgeExtension for StarExtension {
    fn priority(&self) -> i32 {
        0
    }

    fn feature_names(&self) -> Vec<String> {
        vec![EXT_NS.to_string()]
    }

    fn register_tags(&self, registry: &mut BridgeRegistry) {
        registry.register(Rc::new(StarBridge));
    }
}

#[test]
fn required_extensions_follow_installed_extensions() {
    let text = "<svg xmlns='http://www.w3.org/2000/svg'>
        <rect id='r' requiredExtensions='http://example.com/ext' width='10' height='10'/>
    </svg>";

    let mut ctx = BridgeContext::new(Options::default());
    assert!(!ctx.has_extension(EXT_NS));
    assert!(build(&mut ctx, text).node_by_id("r").is_none());

    let mut ctx = BridgeContext::new(Options::default());
    ctx.registry_mut()
        .install_extensions(vec![Box::new(StarExtension)]);
    assert!(ctx.has_extension(EXT_NS));
    assert!(ctx.registry().contains(EXT_NS, "star"));
    assert!(build(&mut ctx, text).node_by_id("r").is_some());
}

struct Counting(Rc<Cell<usize>>);

impl Bridge for Counting {
    fn local_name(&self) -> &str {
        "rect"
    }

    fn instance(&self) -> Option<Rc<dyn Bridge>> {
        self.0.set(self.0.get() + 1);
        Some(Rc::new(Inert("rect")))
    }
}

#[test]
fn stateful_bridges_are_instantiated_per_element() {
    let created = Rc::new(Cell::new(0));
    let mut ctx = BridgeContext::new(Options::default());
    ctx.registry_mut().register(Rc::new(Counting(created.clone())));
    build(
        &mut ctx,
        "<svg xmlns='http://www.w3.org/2000/svg'>
            <rect width='10' height='10'/>
            <rect width='10' height='10'/>
        </svg>",
    );

    assert_eq!(created.get(), 2);
}

struct Dot;

impl Bridge for Dot {
    fn namespace_uri(&self) -> &str {
        "http://example.com/defaults"
    }

    fn local_name(&self) -> &str {
        "dot"
    }
}

fn dot() -> Rc<dyn Bridge> {
    Rc::new(Dot)
}

#[test]
fn process_wide_bridges_reach_new_registries() {
    let before = BridgeRegistry::with_defaults();
    assert!(!before.contains("http://example.com/defaults", "dot"));

    register_default_bridge(dot);

    let after = BridgeRegistry::with_defaults();
    assert!(after.contains("http://example.com/defaults", "dot"));
    assert!(after.contains(SVG_NS, "rect"));

    // Existing registries are not affected.
    assert!(!before.contains("http://example.com/defaults", "dot"));
}
