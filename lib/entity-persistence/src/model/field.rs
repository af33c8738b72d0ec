use std::any::TypeId;

use crate::{Column, FetchType};

/// A persistable field of an entity.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityField {
    /// Stored in a column of the entity's own table.
    Column(Column),
    /// One-to-many association stored in another table.
    Join(EntityJoinField),
}

impl EntityField {
    pub fn field_name(&self) -> &str {
        match self {
            EntityField::Column(column) => &column.field_name,
            EntityField::Join(join) => &join.field_name,
        }
    }
}

/// One-to-many association from an owner to a collection of elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityJoinField {
    pub field_name: String,
    pub element_type_id: TypeId,
    pub element_type_name: &'static str,
    /// Column on the element table holding the owner's primary key.
    pub join_column_name: String,
    pub fetch: FetchType,
}

impl EntityJoinField {
    pub fn is_eager(&self) -> bool {
        self.fetch == FetchType::Eager
    }
}
