//! Comprehensive tests for fos-brand
//!
//! A miniature Home Assistant frontend: `<home-assistant>` with an open
//! shadow root, into which components are rendered the way the real
//! frontend does it, shadow trees and all.

use std::sync::{Arc, Mutex};

use fos_brand::{BrandConfig, BrandError, BrandResolver, EntityState, ReplacementImages, StateRegistry, logging};
use fos_dom::{Dom, NodeId, ShadowRootInit};
use fos_watch::EventLoop;
use serde_json::json;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::{EnvFilter, Layer};

const SUN_LOGO: &str = "/x/sun-logo.svg";
const SUN_BRAND: &str = "https://brands.home-assistant.io/_/sun/icon.png";

struct Page {
    runtime: EventLoop,
    dom: Dom,
    /// Shadow root of `<home-assistant>`
    app_root: NodeId,
}

fn page() -> Page {
    let runtime = EventLoop::new(Dom::new());
    let dom = runtime.dom().clone();
    let body = dom.create_element("body");
    let host = dom.create_element("home-assistant");
    dom.append_child(dom.document(), body).unwrap();
    dom.append_child(body, host).unwrap();
    let app_root = dom.attach_shadow(host, ShadowRootInit::open()).unwrap();
    Page { runtime, dom, app_root }
}

fn config() -> BrandConfig {
    BrandConfig::default().with_images(ReplacementImages::new().with("sun", SUN_LOGO))
}

fn install(page: &Page, states: StateRegistry) -> BrandResolver {
    page.runtime
        .block_on(BrandResolver::install(&page.runtime, states, &config()))
        .unwrap()
}

/// Create `tag` with an open shadow root, returning both
fn with_shadow(dom: &Dom, tag: &str) -> (NodeId, NodeId) {
    let element = dom.create_element(tag);
    let root = dom.attach_shadow(element, ShadowRootInit::open()).unwrap();
    (element, root)
}

fn append(dom: &Dom, parent: NodeId, tag: &str) -> NodeId {
    let element = dom.create_element(tag);
    dom.append_child(parent, element).unwrap();
    element
}

fn src(dom: &Dom, img: NodeId) -> Option<String> {
    dom.tree().get_attribute(img, "src").map(str::to_string)
}

// ============================================================================
// BOOTSTRAP
// ============================================================================

#[test]
fn test_install_without_host_fails() {
    let runtime = EventLoop::new(Dom::new());
    let result = runtime.block_on(BrandResolver::install(&runtime, StateRegistry::new(), &config()));
    assert_eq!(result.unwrap_err(), BrandError::NotFound("home-assistant".into()));
}

#[test]
fn test_install_times_out_without_shadow_root() {
    let runtime = EventLoop::new(Dom::new());
    let dom = runtime.dom().clone();
    let host = dom.create_element("home-assistant");
    dom.append_child(dom.document(), host).unwrap();

    let mut config = config();
    config.shadow_timeout_ms = Some(20);
    let result = runtime.block_on(BrandResolver::install(&runtime, StateRegistry::new(), &config));
    assert!(matches!(result, Err(BrandError::Watch(_))), "got {result:?}");
}

#[test]
fn test_attach_dispatches_existing_first_child() {
    let page = page();
    let dom = &page.dom;
    let (integration, root) = with_shadow(dom, "ha-config-integration-page");
    dom.set_property(integration, "domain", json!("sun")).unwrap();
    dom.append_child(page.app_root, integration).unwrap();

    let resolver = install(&page, StateRegistry::new());
    assert_eq!(resolver.root(), page.app_root);

    // Rendered after the page was announced
    let subpage = append(dom, root, "hass-subpage");
    let container = append(dom, subpage, "div");
    dom.set_attribute(container, "class", "container").unwrap();
    let logo = append(dom, container, "div");
    dom.set_attribute(logo, "class", "logo-container").unwrap();
    let img = dom.create_element("img");
    dom.set_attribute(img, "src", SUN_BRAND).unwrap();
    dom.append_child(logo, img).unwrap();
    page.runtime.run_until_stalled();

    assert_eq!(src(dom, img).as_deref(), Some(SUN_LOGO));
}

// ============================================================================
// IMAGES
// ============================================================================

#[test]
fn test_new_img_replaced_by_src() {
    let page = page();
    let dom = &page.dom;
    let _resolver = install(&page, StateRegistry::new());

    let sun = dom.create_element("img");
    dom.set_attribute(sun, "src", SUN_BRAND).unwrap();
    let other = dom.create_element("img");
    dom.set_attribute(other, "src", "https://brands.home-assistant.io/_/hue/icon.png").unwrap();
    dom.append_child(page.app_root, sun).unwrap();
    dom.append_child(page.app_root, other).unwrap();
    page.runtime.run_until_stalled();

    assert_eq!(src(dom, sun).as_deref(), Some(SUN_LOGO));
    assert_eq!(
        src(dom, other).as_deref(),
        Some("https://brands.home-assistant.io/_/hue/icon.png"),
        "Unknown domains are left alone"
    );
}

#[test]
fn test_integration_list_item_waits_for_render() {
    let page = page();
    let dom = &page.dom;
    let resolver = install(&page, StateRegistry::new());

    let item = dom.create_element("ha-integration-list-item");
    dom.set_property(item, "integration", json!({ "domain": "sun" })).unwrap();
    dom.append_child(page.app_root, item).unwrap();
    page.runtime.run_until_stalled();

    // Lit renders the shadow tree a tick later
    let root = dom.attach_shadow(item, ShadowRootInit::open()).unwrap();
    let icons = append(dom, root, "span");
    dom.set_attribute(icons, "class", "material-icons").unwrap();
    let img = append(dom, icons, "img");
    page.runtime.paint();

    assert_eq!(src(dom, img).as_deref(), Some(SUN_LOGO));
    assert!(resolver.watcher().is_subscribed(img));

    // A re-render that resets the src is undone
    dom.set_attribute(img, "src", SUN_BRAND).unwrap();
    page.runtime.run_until_stalled();
    assert_eq!(src(dom, img).as_deref(), Some(SUN_LOGO));
}

// ============================================================================
// STATE BADGES
// ============================================================================

#[test]
fn test_more_info_dialog_badge() {
    let page = page();
    let dom = &page.dom;
    let states = StateRegistry::new();
    states.set(EntityState::new("sensor.sun_next_dawn"));
    let resolver = install(&page, states);

    // ha-more-info-dialog > ha-more-info-info > state-card-content >
    // state-card-update > state-info > state-badge, each behind a shadow root
    let (dialog, mut root) = with_shadow(dom, "ha-more-info-dialog");
    dom.set_property(dialog, "_entityId", json!("sensor.sun_next_dawn")).unwrap();
    for tag in ["ha-more-info-info", "state-card-content", "state-card-update", "state-info"] {
        let (element, inner) = with_shadow(dom, tag);
        dom.append_child(root, element).unwrap();
        root = inner;
    }
    let badge = append(dom, root, "state-badge");
    dom.set_property(badge, "stateObj", json!({ "entity_id": "sensor.sun_next_dawn" }))
        .unwrap();

    dom.append_child(page.app_root, dialog).unwrap();
    page.runtime.run_until_stalled();

    let background = |dom: &Dom| dom.tree().style_property(badge, "background-image");
    assert_eq!(background(dom).as_deref(), Some("url(/x/sun-logo.svg)"));
    assert!(resolver.watcher().is_subscribed(badge));

    // The badge rewrites its own style on state changes
    dom.set_attribute(badge, "style", "background-image: url(/api/sun.png); color: red")
        .unwrap();
    page.runtime.run_until_stalled();
    assert_eq!(background(dom).as_deref(), Some("url(/x/sun-logo.svg)"));
    assert_eq!(dom.tree().style_property(badge, "color").as_deref(), Some("red"));
    assert!(!dom.has_pending_mutations(), "Restoring the style settles");
}

#[test]
fn test_list_item_without_brand_untouched() {
    let page = page();
    let dom = &page.dom;
    let _resolver = install(&page, StateRegistry::new());

    let item = dom.create_element("ha-list-item");
    dom.set_property(item, "entity_id", json!("light.kitchen")).unwrap();
    let badge = append(dom, item, "state-badge");
    dom.append_child(page.app_root, item).unwrap();
    page.runtime.run_until_stalled();

    assert_eq!(dom.tree().get_attribute(badge, "style"), None);
}

// ============================================================================
// SETTINGS DASHBOARD
// ============================================================================

#[test]
fn test_repairs_chain() {
    let page = page();
    let dom = &page.dom;
    let resolver = install(&page, StateRegistry::new());

    // ha-config-dashboard :shadow ha-top-app-bar-fixed > ha-config-repairs
    //   :shadow ha-md-list > ha-md-list-item > img
    let (dashboard, dashboard_root) = with_shadow(dom, "ha-config-dashboard");
    let app_bar = append(dom, dashboard_root, "ha-top-app-bar-fixed");
    let (repairs, repairs_root) = with_shadow(dom, "ha-config-repairs");
    dom.append_child(app_bar, repairs).unwrap();
    let list = append(dom, repairs_root, "ha-md-list");
    let item = dom.create_element("ha-md-list-item");
    dom.set_property(item, "issue", json!({ "issue_domain": "sun" })).unwrap();
    let img = append(dom, item, "img");
    dom.set_attribute(img, "src", "/api/brands/sun/icon.png").unwrap();
    dom.append_child(list, item).unwrap();

    dom.append_child(page.app_root, dashboard).unwrap();
    page.runtime.run_until_stalled();

    assert_eq!(src(dom, img).as_deref(), Some(SUN_LOGO));
    let watcher = resolver.watcher();
    for node in [dashboard_root, repairs, list, img] {
        assert!(watcher.is_subscribed(node), "{node} should be watched");
    }

    // Removing the dashboard tears the whole branch down
    dom.remove(dashboard).unwrap();
    page.runtime.run_until_stalled();
    assert_eq!(watcher.subscribed_roots(), [page.app_root]);
    assert_eq!(dom.observer_count(), 1);
}

#[test]
fn test_dropping_resolver_releases_everything() {
    let page = page();
    let dom = &page.dom;
    let resolver = install(&page, StateRegistry::new());

    // Leaves a shadow wait pending
    let page_el = dom.create_element("ha-config-devices-dashboard");
    dom.append_child(page.app_root, page_el).unwrap();
    page.runtime.run_until_stalled();
    assert_eq!(dom.shadow_hook_count(), 1);

    drop(resolver);
    page.runtime.run_until_stalled();
    assert_eq!(dom.observer_count(), 0);
    assert_eq!(dom.shadow_hook_count(), 0);
}

// ============================================================================
// LOGGING
// ============================================================================

/// Collects the `event` field of every event that passes the filter
#[derive(Clone, Default)]
struct EventNames(Arc<Mutex<Vec<String>>>);

struct EventField<'a>(&'a mut Option<String>);

impl Visit for EventField<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "event" {
            *self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, _: &Field, _: &dyn std::fmt::Debug) {}
}

impl<S: tracing::Subscriber> Layer<S> for EventNames {
    fn on_event(&self, event: &tracing::Event<'_>, _: Context<'_, S>) {
        let mut name = None;
        event.record(&mut EventField(&mut name));
        if let Some(name) = name {
            self.0.lock().unwrap().push(name);
        }
    }
}

#[test]
fn test_debug_logging_shows_calls_and_skips() {
    let names = EventNames::default();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(logging::default_directives(true)))
        .with(names.clone());

    tracing::subscriber::with_default(subscriber, || {
        let page = page();
        let dom = &page.dom;
        let config = config().with_debug(true);
        let _resolver = page
            .runtime
            .block_on(BrandResolver::install(&page.runtime, StateRegistry::new(), &config))
            .unwrap();

        let img = dom.create_element("img");
        dom.set_attribute(img, "src", SUN_BRAND).unwrap();
        dom.append_child(page.app_root, img).unwrap();
        let span = append(dom, page.app_root, "span");
        page.runtime.run_until_stalled();

        dom.remove(span).unwrap();
        page.runtime.run_until_stalled();
    });

    let names = names.0.lock().unwrap();
    for expected in ["subscribe", "new_node_call", "new_node_skip", "rm_node_skip"] {
        assert!(names.iter().any(|name| name == expected), "{expected} missing from {names:?}");
    }
}

#[test]
fn test_quiet_logging_hides_watcher_events() {
    let names = EventNames::default();
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::new(logging::default_directives(false)))
        .with(names.clone());

    tracing::subscriber::with_default(subscriber, || {
        let page = page();
        let config = config().with_debug(true);
        let _resolver = page
            .runtime
            .block_on(BrandResolver::install(&page.runtime, StateRegistry::new(), &config))
            .unwrap();
        append(&page.dom, page.app_root, "span");
        page.runtime.run_until_stalled();
    });

    assert!(names.0.lock().unwrap().is_empty());
}
