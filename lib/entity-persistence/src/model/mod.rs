//! Entity metadata: declarations, columns, fields and the metadata registry.

mod column;
mod declaration;
mod field;
mod persistent_class;
mod registry;

pub use column::Column;
pub use declaration::{
    AssociationDeclaration, ColumnDeclaration, Entity, EntityDeclaration, EntityFactory,
    FetchType, FieldDeclaration, Persistable,
};
pub use field::{EntityField, EntityJoinField};
pub use persistent_class::{CollectionPersistentClass, PersistentClass};
pub use registry::PersistentClassRegistry;
