//! Materialized rows of a model class.

use crate::config::OrmContext;
use crate::connection::Connection;
use crate::eager;
use crate::error::OrmResult;
use crate::model::ModelClass;
use crate::relation::Relation;
use crate::row::{FromValue, Row};
use crate::value::Value;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A loaded relation.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Related {
    One(Option<Box<Entity>>),
    Many(Vec<Entity>),
}

impl Related {
    pub fn as_one(&self) -> Option<&Entity> {
        match self {
            Related::One(one) => one.as_deref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> &[Entity] {
        match self {
            Related::Many(many) => many,
            Related::One(_) => &[],
        }
    }
}

/// A row of a model class with its eagerly loaded relations.
///
/// Serializes as a flat map of attributes followed by loaded relations.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    class: Arc<ModelClass>,
    attributes: Row,
    relations: BTreeMap<String, Related>,
}

impl Entity {
    pub fn new(class: Arc<ModelClass>, attributes: Row) -> Self {
        Self {
            class,
            attributes,
            relations: BTreeMap::new(),
        }
    }

    pub fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    pub fn attributes(&self) -> &Row {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut Row {
        &mut self.attributes
    }

    pub fn into_attributes(self) -> Row {
        self.attributes
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.attributes.get(column)
    }

    pub fn try_get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        self.attributes.try_get(column)
    }

    pub fn set(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.attributes.set(column, value);
    }

    /// The primary key value.
    pub fn key(&self) -> Option<&Value> {
        self.attributes.get(self.class.primary_key())
    }

    /// A loaded relation, if it was loaded.
    pub fn related(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn related_one(&self, name: &str) -> Option<&Entity> {
        self.relations.get(name).and_then(Related::as_one)
    }

    pub fn related_many(&self, name: &str) -> &[Entity] {
        self.relations.get(name).map(Related::as_many).unwrap_or(&[])
    }

    pub fn set_related(&mut self, name: impl Into<String>, related: Related) {
        self.relations.insert(name.into(), related);
    }

    pub fn is_loaded(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    /// Build the named relation of this entity.
    ///
    /// The related class (and the through class) are resolved immediately;
    /// an unknown relation name is an argument error.
    pub fn relation(&self, name: &str, ctx: &OrmContext) -> OrmResult<Relation> {
        Relation::for_entity(self, name, ctx)
    }

    /// Load the named relation and store it on this entity.
    pub async fn load(&mut self, conn: &impl Connection, ctx: &OrmContext, name: &str) -> OrmResult<()> {
        eager::load_relation(conn, ctx, std::slice::from_mut(self), name, None).await
    }
}

impl Serialize for Entity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.attributes.len() + self.relations.len()))?;
        for (column, value) in self.attributes.iter() {
            map.serialize_entry(column, value)?;
        }
        for (name, related) in &self.relations {
            map.serialize_entry(name, related)?;
        }
        map.end()
    }
}
