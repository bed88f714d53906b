//! Plain serde form of a model, used as the CLI interchange format.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::Result;
use crate::minor::MinorAttributes;
use crate::model::Model;
use crate::value::{Key, Scalar};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelDump {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<CollectionDump>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub lists: BTreeMap<String, Vec<Scalar>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards_to_read: Vec<String>,
    #[serde(default)]
    pub minor: MinorAttributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDump {
    pub name: String,
    pub entries: Vec<EntryDump>,
}

/// One stored entity. Multimap keys repeat once per entity; flat lists and
/// scalars carry no key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryDump {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<Key>,
    #[serde(flatten)]
    pub entity: Entity,
}

impl Model {
    pub fn to_dump(&self) -> ModelDump {
        let collections = self
            .collections()
            .map(|(spec, collection)| CollectionDump {
                name: spec.name.to_string(),
                entries: collection
                    .entities()
                    .map(|(key, entity)| EntryDump {
                        key: if spec.shape.is_keyed() { key } else { None },
                        entity: entity.clone(),
                    })
                    .collect(),
            })
            .collect();

        ModelDump {
            collections,
            lists: self
                .primitive_lists()
                .map(|(name, values)| (name.to_string(), values.to_vec()))
                .collect(),
            cards_to_read: self.cards_to_read().iter().cloned().collect(),
            minor: self.minor().clone(),
        }
    }

    /// Rebuild a model, inserting entries in dump order.
    pub fn from_dump(dump: ModelDump) -> Result<Self> {
        let mut model = Model::new();
        for collection in dump.collections {
            for entry in collection.entries {
                model.insert(&collection.name, entry.key, entry.entity)?;
            }
        }
        for (name, values) in dump.lists {
            model.set_primitive_list(&name, values)?;
        }
        for tag in dump.cards_to_read {
            model.enable_card(tag);
        }
        *model.minor_mut() = dump.minor;
        Ok(model)
    }
}
