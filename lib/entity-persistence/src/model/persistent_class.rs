//! Validated, immutable entity metadata.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use heck::ToSnakeCase;
use indexmap::IndexMap;
use tracing::debug;

use crate::{
    Column, Entity, EntityDeclaration, EntityFactory, EntityField, EntityJoinField,
    FieldDeclaration, Persistable, PersistenceError, PrimaryKey, SqlType, Value,
};

/// How a mapped type is stored: table, ordered columns, primary key,
/// associations and a factory for blank instances.
#[derive(Clone)]
pub struct PersistentClass {
    type_id: TypeId,
    type_name: &'static str,
    table_name: String,
    fields: Vec<EntityField>,
    columns: Vec<Column>,
    primary_key: usize,
    columns_by_field: HashMap<String, usize>,
    factory: Option<EntityFactory>,
}

impl PersistentClass {
    /// Derive metadata from a declaration.
    ///
    /// Fails when the declaration has no primary key, more than one, a
    /// field type without an SQL mapping, a primary key that is neither
    /// integer nor text, or more than one eager association.
    pub fn derive(declaration: &EntityDeclaration) -> Result<Self, PersistenceError> {
        let entity = declaration.type_name;
        let table_name = declaration
            .table
            .map(str::to_string)
            .unwrap_or_else(|| declaration.ident.to_snake_case());

        let mut fields = Vec::with_capacity(declaration.fields.len());
        let mut columns = Vec::new();
        let mut id_fields = Vec::new();

        for field in &declaration.fields {
            match field {
                FieldDeclaration::Column(decl) => {
                    let (sql_type, nullable) = SqlType::for_rust_type(decl.rust_type).ok_or_else(
                        || PersistenceError::UnmappedFieldType {
                            entity: entity.to_string(),
                            field: decl.field_name.to_string(),
                            rust_type: decl.rust_type.to_string(),
                        },
                    )?;
                    let name = decl
                        .column_name
                        .map(str::to_string)
                        .unwrap_or_else(|| decl.field_name.to_snake_case());

                    let mut column = Column::new(name, decl.field_name, sql_type);
                    if decl.id {
                        if !matches!(
                            sql_type,
                            SqlType::SmallInt | SqlType::Integer | SqlType::BigInt | SqlType::Varchar
                        ) {
                            return Err(PersistenceError::UnsupportedPrimaryKeyType {
                                entity: entity.to_string(),
                                field: decl.field_name.to_string(),
                                sql_type,
                            });
                        }
                        id_fields.push(decl.field_name.to_string());
                        column = column.primary_key(decl.generated);
                    } else {
                        column = column.nullable(nullable);
                    }

                    columns.push(column.clone());
                    fields.push(EntityField::Column(column));
                }
                FieldDeclaration::OneToMany(decl) => {
                    let element = (decl.element)();
                    fields.push(EntityField::Join(EntityJoinField {
                        field_name: decl.field_name.to_string(),
                        element_type_id: element.type_id,
                        element_type_name: element.type_name,
                        join_column_name: decl.join_column.to_string(),
                        fetch: decl.fetch,
                    }));
                }
            }
        }

        match id_fields.len() {
            0 => {
                return Err(PersistenceError::MissingPrimaryKey {
                    entity: entity.to_string(),
                });
            }
            1 => {}
            _ => {
                return Err(PersistenceError::DuplicatePrimaryKey {
                    entity: entity.to_string(),
                    fields: id_fields,
                });
            }
        }

        let eager: Vec<String> = fields
            .iter()
            .filter_map(|field| match field {
                EntityField::Join(join) if join.is_eager() => Some(join.field_name.clone()),
                _ => None,
            })
            .collect();
        if eager.len() > 1 {
            return Err(PersistenceError::MultipleEagerAssociations {
                entity: entity.to_string(),
                fields: eager,
            });
        }

        let primary_key = columns
            .iter()
            .position(|column| column.primary_key)
            .ok_or_else(|| PersistenceError::MissingPrimaryKey {
                entity: entity.to_string(),
            })?;
        let columns_by_field = columns
            .iter()
            .enumerate()
            .map(|(idx, column)| (column.field_name.clone(), idx))
            .collect();

        debug!(
            entity,
            table = %table_name,
            columns = columns.len(),
            "derived persistent class"
        );

        Ok(Self {
            type_id: declaration.type_id,
            type_name: declaration.type_name,
            table_name,
            fields,
            columns,
            primary_key,
            columns_by_field,
            factory: declaration.factory,
        })
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Column fields in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn primary_key(&self) -> &Column {
        &self.columns[self.primary_key]
    }

    /// All persistable fields, columns and associations, in declaration order.
    pub fn fields(&self) -> &[EntityField] {
        &self.fields
    }

    pub fn column_for_field(&self, field_name: &str) -> Option<&Column> {
        self.columns_by_field
            .get(field_name)
            .map(|idx| &self.columns[*idx])
    }

    pub fn column(&self, column_name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == column_name)
    }

    pub fn join_fields(&self) -> impl Iterator<Item = &EntityJoinField> {
        self.fields.iter().filter_map(|field| match field {
            EntityField::Join(join) => Some(join),
            EntityField::Column(_) => None,
        })
    }

    pub fn join_field(&self, field_name: &str) -> Option<&EntityJoinField> {
        self.join_fields().find(|join| join.field_name == field_name)
    }

    /// The single association fetched with a LEFT JOIN, if any.
    pub fn eager_join_field(&self) -> Option<&EntityJoinField> {
        self.join_fields().find(|join| join.is_eager())
    }

    pub fn is_instance(&self, entity: &dyn Persistable) -> bool {
        entity.as_any().type_id() == self.type_id
    }

    fn check_instance(&self, entity: &dyn Persistable) -> Result<(), PersistenceError> {
        if self.is_instance(entity) {
            Ok(())
        } else {
            Err(PersistenceError::ClassMismatch {
                expected: self.type_name.to_string(),
                actual: entity.type_name().to_string(),
            })
        }
    }

    /// Produce a blank instance through the declared factory.
    pub fn create_instance(&self) -> Result<Box<dyn Persistable>, PersistenceError> {
        let factory = self.factory.ok_or_else(|| PersistenceError::Instantiation {
            entity: self.type_name.to_string(),
        })?;
        Ok(factory())
    }

    /// Produce a blank, typed instance.
    pub fn create<T: Entity>(&self) -> Result<T, PersistenceError> {
        self.downcast(self.create_instance()?)
    }

    /// Unbox an instance of this class into its concrete type.
    pub fn downcast<T: Entity>(&self, entity: Box<dyn Persistable>) -> Result<T, PersistenceError> {
        let actual = entity.type_name();
        entity
            .into_any()
            .downcast::<T>()
            .map(|entity| *entity)
            .map_err(|_| PersistenceError::ClassMismatch {
                expected: std::any::type_name::<T>().to_string(),
                actual: actual.to_string(),
            })
    }

    /// Read every column value of `entity`, keyed by column name.
    ///
    /// `entity` must be exactly the bound type; no other type is accepted.
    pub fn extract_values(
        &self,
        entity: &dyn Persistable,
    ) -> Result<IndexMap<String, Value>, PersistenceError> {
        self.check_instance(entity)?;
        self.columns
            .iter()
            .map(|column| {
                let value = entity.field_value(&column.field_name).ok_or_else(|| {
                    PersistenceError::UnknownField {
                        entity: self.type_name.to_string(),
                        field: column.field_name.clone(),
                    }
                })?;
                Ok((column.name.clone(), value.with_sql_type(column.sql_type)))
            })
            .collect()
    }

    /// Primary key of `entity`, or `None` when it has not been assigned.
    pub fn primary_key_value(
        &self,
        entity: &dyn Persistable,
    ) -> Result<Option<PrimaryKey>, PersistenceError> {
        self.check_instance(entity)?;
        let column = self.primary_key();
        let value =
            entity
                .field_value(&column.field_name)
                .ok_or_else(|| PersistenceError::UnknownField {
                    entity: self.type_name.to_string(),
                    field: column.field_name.clone(),
                })?;
        PrimaryKey::from_value(&value)
    }
}

impl std::fmt::Debug for PersistentClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentClass")
            .field("type_name", &self.type_name)
            .field("table_name", &self.table_name)
            .field("fields", &self.fields)
            .finish()
    }
}

/// Metadata for the element side of a one-to-many association.
#[derive(Debug, Clone)]
pub struct CollectionPersistentClass {
    element: Arc<PersistentClass>,
    join_field: EntityJoinField,
}

impl CollectionPersistentClass {
    pub fn new(element: Arc<PersistentClass>, join_field: EntityJoinField) -> Self {
        Self {
            element,
            join_field,
        }
    }

    pub fn element(&self) -> &Arc<PersistentClass> {
        &self.element
    }

    pub fn join_field(&self) -> &EntityJoinField {
        &self.join_field
    }

    pub fn join_column_name(&self) -> &str {
        &self.join_field.join_column_name
    }
}
