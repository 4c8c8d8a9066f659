//! Domain lookups
//!
//! All lookups walk the configured domains in order and return the first
//! that matches. Matching is by substring, so with overlapping domains
//! (`sun`, `sunrise`) the earlier one wins.

use crate::{ReplacementImages, StateRegistry};

#[derive(Debug, Clone)]
pub struct BrandContext {
    images: ReplacementImages,
    states: StateRegistry,
}

impl BrandContext {
    pub fn new(images: ReplacementImages, states: StateRegistry) -> Self {
        Self { images, states }
    }

    pub fn images(&self) -> &ReplacementImages {
        &self.images
    }

    pub fn states(&self) -> &StateRegistry {
        &self.states
    }

    /// Replacement image for `domain`
    pub fn get_img_src(&self, domain: Option<&str>) -> Option<&str> {
        self.images.get(domain?)
    }

    /// Domain for an entity id.
    ///
    /// Per domain, the entity's `entity_picture` is checked first, then the
    /// object id (`sensor.<object_id>`).
    pub fn get_domain_by_entity_id(&self, entity_id: &str) -> Option<&str> {
        let picture = self.states.entity_picture(entity_id);
        let object_id = entity_id.split('.').nth(1);

        self.images.domains().find(|domain| {
            picture.as_deref().is_some_and(|p| p.contains(domain))
                || object_id.is_some_and(|name| name.contains(domain))
        })
    }

    /// Domain whose `/<domain>/` path segment appears in `src`
    pub fn get_domain_by_src(&self, src: &str) -> Option<&str> {
        self.images
            .domains()
            .find(|domain| src.contains(&format!("/{domain}/")))
    }

    /// [`get_domain_by_entity_id`](Self::get_domain_by_entity_id) then
    /// [`get_img_src`](Self::get_img_src)
    pub fn img_src_for_entity(&self, entity_id: &str) -> Option<&str> {
        self.get_img_src(self.get_domain_by_entity_id(entity_id))
    }

    /// [`get_domain_by_src`](Self::get_domain_by_src) then
    /// [`get_img_src`](Self::get_img_src)
    pub fn img_src_for_src(&self, src: &str) -> Option<&str> {
        self.get_img_src(self.get_domain_by_src(src))
    }
}
