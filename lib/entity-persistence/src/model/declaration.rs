//! Declarative description of a mapped Rust type.
//!
//! An [`EntityDeclaration`] is what `#[derive(Entity)]` emits for a struct: the
//! raw field list with Rust type names and mapping attributes. It is turned
//! into validated metadata exactly once by
//! [`PersistentClass::derive`](crate::PersistentClass::derive).

use std::any::{Any, TypeId};

use crate::{PersistenceError, Value};

/// Object-safe, name-keyed access to an entity's fields.
///
/// Generated by `#[derive(Entity)]`.
pub trait Persistable: Any {
    /// Read the value of a column field by its Rust field name.
    fn field_value(&self, field_name: &str) -> Option<Value>;

    /// Assign a column field by its Rust field name.
    fn set_field_value(&mut self, field_name: &str, value: Value) -> Result<(), PersistenceError>;

    /// Push `child` onto the one-to-many collection field `field_name`.
    fn attach(
        &mut self,
        field_name: &str,
        child: Box<dyn Persistable>,
    ) -> Result<(), PersistenceError>;

    /// Empty the one-to-many collection field `field_name`.
    fn clear_collection(&mut self, field_name: &str) -> Result<(), PersistenceError>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Fully qualified name of the concrete type.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A mapped type with a static declaration.
pub trait Entity: Persistable + Sized {
    fn declaration() -> EntityDeclaration;
}

/// Fetch mode of a one-to-many association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchType {
    /// Loaded with a LEFT JOIN in the owner's query.
    Eager,
    /// Loaded by a separate query on request.
    Lazy,
}

/// Factory producing a blank instance.
pub type EntityFactory = fn() -> Box<dyn Persistable>;

/// Raw description of a mapped type.
#[derive(Clone)]
pub struct EntityDeclaration {
    pub type_id: TypeId,
    pub type_name: &'static str,
    /// Bare struct identifier, used for the default table name.
    pub ident: &'static str,
    pub table: Option<&'static str>,
    pub fields: Vec<FieldDeclaration>,
    pub factory: Option<EntityFactory>,
}

impl EntityDeclaration {
    pub fn of<T: Any>(ident: &'static str) -> Self {
        Self {
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
            ident,
            table: None,
            fields: Vec::new(),
            factory: None,
        }
    }

    pub fn table(mut self, table: &'static str) -> Self {
        self.table = Some(table);
        self
    }

    pub fn factory(mut self, factory: EntityFactory) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn field(mut self, field: impl Into<FieldDeclaration>) -> Self {
        self.fields.push(field.into());
        self
    }
}

impl std::fmt::Debug for EntityDeclaration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDeclaration")
            .field("type_name", &self.type_name)
            .field("table", &self.table)
            .field("fields", &self.fields)
            .field("has_factory", &self.factory.is_some())
            .finish()
    }
}

/// One declared field of an entity.
#[derive(Debug, Clone)]
pub enum FieldDeclaration {
    Column(ColumnDeclaration),
    OneToMany(AssociationDeclaration),
}

impl From<ColumnDeclaration> for FieldDeclaration {
    fn from(column: ColumnDeclaration) -> Self {
        FieldDeclaration::Column(column)
    }
}

impl From<AssociationDeclaration> for FieldDeclaration {
    fn from(association: AssociationDeclaration) -> Self {
        FieldDeclaration::OneToMany(association)
    }
}

/// A field stored in a column of the entity's own table.
#[derive(Debug, Clone)]
pub struct ColumnDeclaration {
    pub field_name: &'static str,
    /// Rust type as written in the struct, e.g. `Option<i64>`.
    pub rust_type: &'static str,
    /// Explicit column name override.
    pub column_name: Option<&'static str>,
    pub id: bool,
    /// Key values are produced by the database.
    pub generated: bool,
}

impl ColumnDeclaration {
    pub fn new(field_name: &'static str, rust_type: &'static str) -> Self {
        Self {
            field_name,
            rust_type,
            column_name: None,
            id: false,
            generated: false,
        }
    }

    pub fn column_name(mut self, column_name: &'static str) -> Self {
        self.column_name = Some(column_name);
        self
    }

    pub fn id(mut self) -> Self {
        self.id = true;
        self
    }

    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }
}

/// A `Vec<Child>` field mapped as a one-to-many association.
#[derive(Debug, Clone)]
pub struct AssociationDeclaration {
    pub field_name: &'static str,
    /// Column on the child table referencing the owner's primary key.
    pub join_column: &'static str,
    pub fetch: FetchType,
    pub element: fn() -> EntityDeclaration,
}

impl AssociationDeclaration {
    pub fn new(
        field_name: &'static str,
        join_column: &'static str,
        fetch: FetchType,
        element: fn() -> EntityDeclaration,
    ) -> Self {
        Self {
            field_name,
            join_column,
            fetch,
            element,
        }
    }
}
