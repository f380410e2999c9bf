//! Lookup of vanilla base worlds by dimension id.
//!
//! The host populates this from its instance manager at startup; the router
//! consults it for default routing and vanilla link destinations.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::Instance;

pub const OVERWORLD: &str = "minecraft:overworld";
pub const NETHER: &str = "minecraft:the_nether";
pub const END: &str = "minecraft:the_end";

/// Process-wide vanilla dimension → instance map.
#[derive(Default)]
pub struct BaseWorldRegistry {
    worlds: RwLock<HashMap<String, Arc<dyn Instance>>>,
}

impl BaseWorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, dimension_id: &str, instance: Arc<dyn Instance>) {
        self.worlds
            .write()
            .unwrap()
            .insert(dimension_id.to_string(), instance);
    }

    pub fn get(&self, dimension_id: &str) -> Option<Arc<dyn Instance>> {
        self.worlds.read().unwrap().get(dimension_id).cloned()
    }

    pub fn contains(&self, dimension_id: &str) -> bool {
        self.worlds.read().unwrap().contains_key(dimension_id)
    }
}
