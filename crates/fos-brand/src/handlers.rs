//! Brand replacement handlers
//!
//! One handler per frontend component that shows an integration logo.
//! Handlers locate the image (often several shadow roots down), write the
//! replacement and, where the component may re-render, subscribe the image
//! or its list so later changes are caught too.
//!
//! Every write is skipped when the value is already current, so an image
//! subscribed with attribute watching never re-triggers itself.

use std::rc::Rc;

use fos_css::{ElementQuery, parse_selector};
use fos_dom::NodeId;
use fos_watch::{HandlerTable, WatchResult, Watcher};

use crate::BrandContext;

pub type BrandWatcher = Watcher<BrandContext>;

/// The full handler set
pub fn handler_table() -> HandlerTable<BrandContext> {
    HandlerTable::new()
        .on_attribute("state-badge", "style", state_badge_style)
        .on_attribute("img", "src", img_src)
        .on_added("SHADOW", "home-assistant-main", home_assistant_main)
        .on_added("SHADOW", "dialog-add-integration", dialog_add_integration)
        .on_added("SHADOW", "ha-more-info-dialog", more_info_dialog)
        .on_added("SHADOW", "ha-integration-list-item", integration_list_item)
        .on_added("*", "ha-config-integrations-dashboard", integrations_dashboard)
        .on_added("*", "ha-config-integration-page", integration_page)
        .on_added("*", "ha-config-dashboard", config_dashboard)
        .on_added("*", "ha-top-app-bar-fixed", top_app_bar)
        .on_added("*", "ha-config-updates", config_updates)
        .on_added("*", "ha-list-item", list_item)
        .on_added("*", "ha-config-repairs", config_repairs)
        .on_added("*", "ha-md-list-item", md_list_item)
        .on_added("*", "ha-config-device-page", device_page)
        .on_added("*", "ha-config-devices-dashboard", devices_dashboard)
        .on_added("*", "img", img)
}

// ============================================================================
// Helpers
// ============================================================================

fn prop(w: &BrandWatcher, element: NodeId, path: &str) -> Option<String> {
    w.dom().tree().prop_str(element, path).map(str::to_string)
}

fn attr(w: &BrandWatcher, element: NodeId, name: &str) -> Option<String> {
    w.dom().tree().get_attribute(element, name).map(str::to_string)
}

/// Point `img` at `url`; `false` when it already was
fn set_src(w: &BrandWatcher, img: NodeId, url: &str) -> WatchResult<bool> {
    if attr(w, img, "src").as_deref() == Some(url) {
        return Ok(false);
    }
    w.dom().set_attribute(img, "src", url)?;
    Ok(true)
}

fn set_background(w: &BrandWatcher, element: NodeId, url: &str) -> WatchResult<bool> {
    let changed = w
        .dom()
        .set_style_property(element, "background-image", &format!("url({url})"))?;
    Ok(changed)
}

/// Replacement for an image found by its current `src`
fn replace_by_src(w: &BrandWatcher, img: NodeId) -> WatchResult<bool> {
    let Some(src) = attr(w, img, "src") else {
        return Ok(false);
    };
    let Some(url) = w.context().img_src_for_src(&src).map(str::to_string) else {
        return Ok(false);
    };
    set_src(w, img, &url)
}

fn element_children(w: &BrandWatcher, parent: NodeId) -> Vec<NodeId> {
    w.dom().tree().element_children(parent).collect()
}

// ============================================================================
// Attribute handlers
// ============================================================================

/// Badges re-render their style; put the replacement back
fn state_badge_style(w: &Rc<BrandWatcher>, badge: NodeId, name: &str) -> WatchResult<()> {
    if name != "style" {
        return Ok(());
    }
    let Some(entity_id) = prop(w, badge, "stateObj.entity_id") else {
        return Ok(());
    };
    if let Some(url) = w.context().img_src_for_entity(&entity_id) {
        set_background(w, badge, url)?;
    }
    Ok(())
}

fn img_src(w: &Rc<BrandWatcher>, img: NodeId, name: &str) -> WatchResult<()> {
    if name == "src" {
        replace_by_src(w, img)?;
    }
    Ok(())
}

// ============================================================================
// Application shell
// ============================================================================

fn home_assistant_main(w: &Rc<BrandWatcher>, main: NodeId) -> WatchResult<()> {
    w.wait_selector(main, ":shadow partial-panel-resolver", |w, resolver| {
        w.subscribe(resolver, false)
    });
    Ok(())
}

fn dialog_add_integration(w: &Rc<BrandWatcher>, dialog: NodeId) -> WatchResult<()> {
    w.wait_selector(dialog, ":shadow", |w, root| w.subscribe(root, false));
    Ok(())
}

fn more_info_dialog(w: &Rc<BrandWatcher>, dialog: NodeId) -> WatchResult<()> {
    let Some(entity_id) = prop(w, dialog, "_entityId") else {
        return Ok(());
    };
    let Some(url) = w.context().img_src_for_entity(&entity_id).map(str::to_string) else {
        return Ok(());
    };

    w.wait_selector(
        dialog,
        ":shadow ha-more-info-info :shadow state-card-content :shadow state-card-update \
         :shadow state-info :shadow state-badge",
        move |w, badge| {
            set_background(w, badge, &url)?;
            w.subscribe(badge, true)
        },
    );
    Ok(())
}

fn integration_list_item(w: &Rc<BrandWatcher>, item: NodeId) -> WatchResult<()> {
    let Some(domain) = prop(w, item, "integration.domain") else {
        return Ok(());
    };
    let Some(url) = w.context().get_img_src(Some(&domain)).map(str::to_string) else {
        return Ok(());
    };

    w.wait_selector(item, ":shadow .material-icons img", move |w, img| {
        set_src(w, img, &url)?;
        w.subscribe(img, true)
    });
    Ok(())
}

// ============================================================================
// Integrations
// ============================================================================

fn integrations_dashboard(w: &Rc<BrandWatcher>, dashboard: NodeId) -> WatchResult<()> {
    w.wait_selector(dashboard, ":shadow hass-tabs-subpage .container", |w, container| {
        for card in element_children(w, container) {
            let domain = attr(w, card, "data-domain");
            let Some(url) = w.context().get_img_src(domain.as_deref()).map(str::to_string) else {
                continue;
            };
            w.wait_selector(card, ":shadow ha-integration-header :shadow img", move |w, img| {
                set_src(w, img, &url).map(|_| ())
            });
        }
        Ok(())
    });
    Ok(())
}

fn integration_page(w: &Rc<BrandWatcher>, page: NodeId) -> WatchResult<()> {
    let Some(domain) = prop(w, page, "domain") else {
        return Ok(());
    };
    let Some(url) = w.context().get_img_src(Some(&domain)).map(str::to_string) else {
        return Ok(());
    };

    w.wait_selector(page, ":shadow hass-subpage .container .logo-container img", move |w, img| {
        set_src(w, img, &url).map(|_| ())
    });
    Ok(())
}

// ============================================================================
// Settings dashboard
// ============================================================================

/// The app bar lives in the dashboard's shadow root; announce it and watch
/// the root for re-renders
fn config_dashboard(w: &Rc<BrandWatcher>, dashboard: NodeId) -> WatchResult<()> {
    w.wait_selector(dashboard, ":shadow ha-top-app-bar-fixed", |w, app_bar| {
        let Some(root) = w.dom().tree().parent(app_bar) else {
            return Ok(());
        };
        w.emit_create(root, app_bar)?;
        w.subscribe(root, false)
    });
    Ok(())
}

fn top_app_bar(w: &Rc<BrandWatcher>, app_bar: NodeId) -> WatchResult<()> {
    for selector in ["ha-config-repairs", "ha-config-updates"] {
        w.wait_selector(app_bar, selector, move |w, section| {
            w.emit_create(app_bar, section)?;
            w.subscribe(section, false)
        });
    }
    Ok(())
}

/// Pending updates: items whose entity maps to a replacement are announced,
/// and the list is watched only if it had any
fn config_updates(w: &Rc<BrandWatcher>, updates: NodeId) -> WatchResult<()> {
    w.wait_selector(updates, ":shadow", |w, root| {
        let list = {
            let tree = w.dom().tree();
            tree.element_children(root).find(|&child| {
                tree.tag_name(child)
                    .is_some_and(|tag| tag.contains("list"))
            })
        };
        let Some(list) = list else {
            return Ok(());
        };

        let mut has_brands = false;
        for item in element_children(w, list) {
            let Some(entity_id) = prop(w, item, "entity_id") else {
                continue;
            };
            if w.context().img_src_for_entity(&entity_id).is_some() {
                has_brands = true;
                w.emit_create(list, item)?;
            }
        }

        if has_brands {
            w.subscribe(list, false)?;
        }
        Ok(())
    });
    Ok(())
}

fn list_item(w: &Rc<BrandWatcher>, item: NodeId) -> WatchResult<()> {
    let Some(entity_id) = prop(w, item, "entity_id") else {
        return Ok(());
    };
    let Some(url) = w.context().img_src_for_entity(&entity_id).map(str::to_string) else {
        return Ok(());
    };

    let selector = parse_selector("state-badge")?;
    let badge = w.dom().tree().query_selector(item, &selector);
    let Some(badge) = badge else {
        return Ok(());
    };
    set_background(w, badge, &url)?;
    w.subscribe(badge, true)
}

fn config_repairs(w: &Rc<BrandWatcher>, repairs: NodeId) -> WatchResult<()> {
    w.wait_selector(repairs, ":shadow ha-md-list", |w, list| {
        for item in element_children(w, list) {
            let domain = prop(w, item, "issue.issue_domain");
            if w.context().get_img_src(domain.as_deref()).is_some() {
                w.emit_create(list, item)?;
            }
        }
        w.subscribe(list, false)
    });
    Ok(())
}

fn md_list_item(w: &Rc<BrandWatcher>, item: NodeId) -> WatchResult<()> {
    let domain = prop(w, item, "issue.issue_domain");
    let Some(url) = w.context().get_img_src(domain.as_deref()).map(str::to_string) else {
        return Ok(());
    };

    let img = {
        let tree = w.dom().tree();
        tree.element_children(item).find(|&child| tree.tag_name(child) == Some("img"))
    };
    if let Some(img) = img {
        set_src(w, img, &url)?;
        w.subscribe(img, true)?;
    }
    Ok(())
}

// ============================================================================
// Devices
// ============================================================================

fn device_page(w: &Rc<BrandWatcher>, page: NodeId) -> WatchResult<()> {
    for selector in [
        ":shadow .container ha-device-info-card ha-list-item img",
        ":shadow .container .header-right img",
    ] {
        w.wait_selector(page, selector, |w, img| {
            if replace_by_src(w, img)? {
                w.subscribe(img, true)?;
            }
            Ok(())
        });
    }
    Ok(())
}

fn devices_dashboard(w: &Rc<BrandWatcher>, dashboard: NodeId) -> WatchResult<()> {
    w.wait_selector(
        dashboard,
        ":shadow hass-tabs-subpage-data-table :shadow ha-data-table :shadow lit-virtualizer",
        |w, virtualizer| w.subscribe(virtualizer, false),
    );
    Ok(())
}

fn img(w: &Rc<BrandWatcher>, img: NodeId) -> WatchResult<()> {
    replace_by_src(w, img).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_keys() {
        assert_eq!(
            handler_table().keys(),
            [
                "ATTR:IMG[SRC]",
                "ATTR:STATE-BADGE[STYLE]",
                "NEW:*:HA-CONFIG-DASHBOARD",
                "NEW:*:HA-CONFIG-DEVICE-PAGE",
                "NEW:*:HA-CONFIG-DEVICES-DASHBOARD",
                "NEW:*:HA-CONFIG-INTEGRATION-PAGE",
                "NEW:*:HA-CONFIG-INTEGRATIONS-DASHBOARD",
                "NEW:*:HA-CONFIG-REPAIRS",
                "NEW:*:HA-CONFIG-UPDATES",
                "NEW:*:HA-LIST-ITEM",
                "NEW:*:HA-MD-LIST-ITEM",
                "NEW:*:HA-TOP-APP-BAR-FIXED",
                "NEW:*:IMG",
                "NEW:SHADOW:DIALOG-ADD-INTEGRATION",
                "NEW:SHADOW:HA-INTEGRATION-LIST-ITEM",
                "NEW:SHADOW:HA-MORE-INFO-DIALOG",
                "NEW:SHADOW:HOME-ASSISTANT-MAIN",
            ]
        );
    }
}
