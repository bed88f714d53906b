//! Per-type insertion order.
//!
//! Type groups are written in storage order, which is not the order a
//! card type was inserted in once a multimap interleaves outer keys. Each
//! keyed or list type group therefore carries an `order` dataset giving
//! every row's position in the model's type index, and loading puts the
//! index back in that order after all sections are in.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use cardstore_model::{Key, Model, TypeIndex};

use crate::error::{CodecError, Location, Result};

pub(crate) const ORDER: &str = "order";

/// Hands out each exported row's position in the type index.
#[derive(Debug)]
pub struct IndexRanks<'m> {
    index: &'m TypeIndex,
    pools: BTreeMap<String, BTreeMap<&'m Key, VecDeque<usize>>>,
}

impl<'m> IndexRanks<'m> {
    pub fn new(index: &'m TypeIndex) -> Self {
        Self {
            index,
            pools: BTreeMap::new(),
        }
    }

    /// The next unclaimed index position for `key` under `tag`.
    pub(crate) fn take(&mut self, tag: &str, key: &Key) -> Option<usize> {
        let index = self.index;
        let pool = self.pools.entry(tag.to_string()).or_insert_with(|| {
            let mut pool: BTreeMap<&Key, VecDeque<usize>> = BTreeMap::new();
            for (rank, key) in index.get(tag).iter().enumerate() {
                pool.entry(key).or_default().push_back(rank);
            }
            pool
        });
        pool.get_mut(key)?.pop_front()
    }
}

/// Ranks read back during load, applied once every section is in.
#[derive(Debug, Default)]
pub struct IndexOrder {
    ranked: BTreeMap<String, Vec<(usize, Key)>>,
    unranked: BTreeSet<String>,
}

impl IndexOrder {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&mut self, tag: &str, rank: Option<usize>, key: Key) {
        match rank {
            Some(rank) => self.ranked.entry(tag.to_string()).or_default().push((rank, key)),
            None => {
                self.unranked.insert(tag.to_string());
            }
        }
    }

    /// Reorder the type index of `model`. A tag with any row lacking a rank
    /// keeps storage order.
    pub fn apply(self, model: &mut Model) -> Result<()> {
        for (tag, mut rows) in self.ranked {
            if self.unranked.contains(&tag) {
                tracing::debug!(tag = %tag, "type stored without order, keeping storage order");
                continue;
            }
            let loc = Location::document().with_type(&tag);
            rows.sort_by_key(|(rank, _)| *rank);
            if let Some((i, (rank, _))) = rows.iter().enumerate().find(|(i, (rank, _))| rank != i) {
                return Err(CodecError::malformed(
                    &loc,
                    format!("order is not a permutation: position {i} holds rank {rank}"),
                ));
            }
            let keys = rows.into_iter().map(|(_, key)| key).collect();
            model
                .restore_index_order(&tag, keys)
                .map_err(|e| CodecError::model(&loc, e))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardstore_model::{Entity, Value};

    fn spc(model: &mut Model, id: i64) {
        model
            .insert("spcs", Some(Key::Id(id)), Entity::new("SPC1").with("conid", id))
            .unwrap();
    }

    #[test]
    fn ranks_follow_the_index_per_key() {
        let mut model = Model::new();
        for id in [1, 2, 1] {
            spc(&mut model, id);
        }
        let mut ranks = IndexRanks::new(model.type_index());
        assert_eq!(ranks.take("SPC1", &Key::Id(1)), Some(0));
        assert_eq!(ranks.take("SPC1", &Key::Id(1)), Some(2));
        assert_eq!(ranks.take("SPC1", &Key::Id(1)), None);
        assert_eq!(ranks.take("SPC1", &Key::Id(2)), Some(1));
        assert_eq!(ranks.take("SPC", &Key::Id(2)), None);
    }

    #[test]
    fn duplicate_ranks_are_malformed() {
        let mut model = Model::new();
        spc(&mut model, 1);
        spc(&mut model, 2);
        let mut order = IndexOrder::new();
        order.record("SPC1", Some(0), Key::Id(1));
        order.record("SPC1", Some(0), Key::Id(2));
        let err = order.apply(&mut model).unwrap_err();
        assert!(matches!(err, CodecError::MalformedAttribute { .. }));
    }

    #[test]
    fn unranked_tags_keep_storage_order() {
        let mut model = Model::new();
        for id in [1, 2, 1] {
            spc(&mut model, id);
        }
        model
            .insert("spcs", Some(Key::Id(3)), Entity::new("SPC1").with("nodes", Value::ints([4])))
            .unwrap();
        let mut order = IndexOrder::new();
        order.record("SPC1", Some(0), Key::Id(2));
        order.record("SPC1", None, Key::Id(1));
        order.apply(&mut model).unwrap();
        let ids: Vec<Key> = model.type_index().get("SPC1").to_vec();
        assert_eq!(ids, vec![Key::Id(1), Key::Id(2), Key::Id(1), Key::Id(3)]);
    }
}
