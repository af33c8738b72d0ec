use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Data, DeriveInput, Fields, GenericArgument, LitStr, PathArguments, Type, parse_macro_input,
    spanned::Spanned,
};

/// Parse #[entity(table = "...")] and return the table override
fn parse_entity_attr(input: &DeriveInput) -> syn::Result<Option<LitStr>> {
    let mut table = None;
    for attr in &input.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    table = Some(meta.value()?.parse::<LitStr>()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `table = \"...\"`"))
                }
            })?;
        }
    }
    Ok(table)
}

#[derive(Default)]
struct ColumnAttrs {
    id: bool,
    generated: bool,
    name: Option<LitStr>,
    skip: bool,
}

/// Collect #[id], #[id(generated)], #[column(name = "...")] and #[column(skip)]
fn parse_column_attrs(field: &syn::Field) -> syn::Result<ColumnAttrs> {
    let mut attrs = ColumnAttrs::default();
    for attr in &field.attrs {
        if attr.path().is_ident("id") {
            attrs.id = true;
            if matches!(attr.meta, syn::Meta::List(_)) {
                attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("generated") {
                        attrs.generated = true;
                        Ok(())
                    } else {
                        Err(meta.error("expected `generated`"))
                    }
                })?;
            }
        } else if attr.path().is_ident("column") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    attrs.skip = true;
                    Ok(())
                } else if meta.path.is_ident("name") {
                    attrs.name = Some(meta.value()?.parse::<LitStr>()?);
                    Ok(())
                } else {
                    Err(meta.error("expected `name = \"...\"` or `skip`"))
                }
            })?;
        }
    }
    Ok(attrs)
}

struct OneToMany {
    join_column: LitStr,
    eager: bool,
}

/// Parse #[one_to_many(join_column = "...", fetch = "eager" | "lazy")]
fn parse_one_to_many_attr(field: &syn::Field) -> syn::Result<Option<OneToMany>> {
    let Some(attr) = field
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("one_to_many"))
    else {
        return Ok(None);
    };

    let mut join_column = None;
    let mut eager = false;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("join_column") {
            join_column = Some(meta.value()?.parse::<LitStr>()?);
            Ok(())
        } else if meta.path.is_ident("fetch") {
            let fetch = meta.value()?.parse::<LitStr>()?;
            eager = match fetch.value().as_str() {
                "eager" => true,
                "lazy" => false,
                _ => return Err(syn::Error::new(fetch.span(), "expected \"eager\" or \"lazy\"")),
            };
            Ok(())
        } else {
            Err(meta.error("expected `join_column = \"...\"` or `fetch = \"...\"`"))
        }
    })?;

    let join_column = join_column
        .ok_or_else(|| syn::Error::new(attr.span(), "one_to_many requires `join_column`"))?;
    Ok(Some(OneToMany { join_column, eager }))
}

/// Element type of a `Vec<T>` field
fn vec_element(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Vec" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(element) => Some(element),
        _ => None,
    }
}

/// Derive macro for the `Entity` and `Persistable` traits
///
/// Maps a struct with named fields to a table. Every field that is not
/// skipped becomes a column, except `Vec<Child>` fields marked
/// `#[one_to_many]`, which become associations with `Child`'s table.
/// The struct must implement `Default`, which provides blank instances
/// for row mapping.
///
/// ## Attributes
///
/// - `#[entity(table = "...")]` - table name, defaults to the snake-cased struct name
/// - `#[id]` / `#[id(generated)]` - primary key, optionally assigned by the database
/// - `#[column(name = "...")]` - column name, defaults to the snake-cased field name
/// - `#[column(skip)]` - not persisted
/// - `#[one_to_many(join_column = "...", fetch = "eager")]` - child collection
///
/// ## Example
///
/// ```text
/// #[derive(Entity, Default)]
/// #[entity(table = "orders")]
/// struct Order {
///     #[id]
///     id: i64,
///     #[one_to_many(join_column = "order_id", fetch = "eager")]
///     items: Vec<OrderItem>,
/// }
/// ```
#[proc_macro_derive(Entity, attributes(entity, id, column, one_to_many))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand_entity(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new(
                    name.span(),
                    "Entity only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new(
                name.span(),
                "Entity only supports structs",
            ));
        }
    };
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new(
            input.generics.span(),
            "Entity does not support generic structs",
        ));
    }

    let ident_str = name.to_string();
    let table = parse_entity_attr(input)?.map(|table| quote! { .table(#table) });

    let mut declarations = Vec::new();
    let mut getters = Vec::new();
    let mut setters = Vec::new();
    let mut attachers = Vec::new();
    let mut clearers = Vec::new();

    for field in fields {
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        let field_str = field_ident.to_string();
        let field_ty = &field.ty;

        if let Some(association) = parse_one_to_many_attr(field)? {
            let element = vec_element(field_ty).ok_or_else(|| {
                syn::Error::new(field_ty.span(), "one_to_many fields must be `Vec<T>`")
            })?;
            let join_column = &association.join_column;
            let fetch = if association.eager {
                quote! { ::entity_persistence::FetchType::Eager }
            } else {
                quote! { ::entity_persistence::FetchType::Lazy }
            };
            declarations.push(quote! {
                .field(::entity_persistence::AssociationDeclaration::new(
                    #field_str,
                    #join_column,
                    #fetch,
                    <#element as ::entity_persistence::Entity>::declaration,
                ))
            });
            attachers.push(quote! {
                #field_str => {
                    let actual = ::entity_persistence::Persistable::type_name(&*child);
                    let child = child.into_any().downcast::<#element>().map_err(|_| {
                        ::entity_persistence::PersistenceError::ClassMismatch {
                            expected: ::std::any::type_name::<#element>().to_string(),
                            actual: actual.to_string(),
                        }
                    })?;
                    self.#field_ident.push(*child);
                    Ok(())
                }
            });
            clearers.push(quote! {
                #field_str => {
                    self.#field_ident.clear();
                    Ok(())
                }
            });
            continue;
        }

        let attrs = parse_column_attrs(field)?;
        if attrs.skip {
            continue;
        }

        let rust_type = quote!(#field_ty).to_string();
        let column_name = attrs.name.map(|name| quote! { .column_name(#name) });
        let id = attrs.id.then(|| quote! { .id() });
        let generated = attrs.generated.then(|| quote! { .generated() });
        declarations.push(quote! {
            .field(::entity_persistence::ColumnDeclaration::new(#field_str, #rust_type)
                #column_name #id #generated)
        });
        getters.push(quote! {
            #field_str => Some(::entity_persistence::ColumnValue::to_value(&self.#field_ident)),
        });
        setters.push(quote! {
            #field_str => {
                self.#field_ident =
                    <#field_ty as ::entity_persistence::ColumnValue>::from_value(value)?;
                Ok(())
            }
        });
    }

    let unknown_field = quote! {
        Err(::entity_persistence::PersistenceError::UnknownField {
            entity: ::std::any::type_name::<Self>().to_string(),
            field: field_name.to_string(),
        })
    };

    Ok(quote! {
        impl ::entity_persistence::Persistable for #name {
            fn field_value(&self, field_name: &str) -> Option<::entity_persistence::Value> {
                match field_name {
                    #(#getters)*
                    _ => None,
                }
            }

            #[allow(unused_variables)]
            fn set_field_value(
                &mut self,
                field_name: &str,
                value: ::entity_persistence::Value,
            ) -> Result<(), ::entity_persistence::PersistenceError> {
                match field_name {
                    #(#setters)*
                    _ => #unknown_field,
                }
            }

            #[allow(unused_variables)]
            fn attach(
                &mut self,
                field_name: &str,
                child: ::std::boxed::Box<dyn ::entity_persistence::Persistable>,
            ) -> Result<(), ::entity_persistence::PersistenceError> {
                match field_name {
                    #(#attachers)*
                    _ => #unknown_field,
                }
            }

            fn clear_collection(
                &mut self,
                field_name: &str,
            ) -> Result<(), ::entity_persistence::PersistenceError> {
                match field_name {
                    #(#clearers)*
                    _ => #unknown_field,
                }
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }

            fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
                self
            }
        }

        impl ::entity_persistence::Entity for #name {
            fn declaration() -> ::entity_persistence::EntityDeclaration {
                ::entity_persistence::EntityDeclaration::of::<Self>(#ident_str)
                    #table
                    .factory(|| -> ::std::boxed::Box<dyn ::entity_persistence::Persistable> {
                        ::std::boxed::Box::new(<Self as ::std::default::Default>::default())
                    })
                    #(#declarations)*
            }
        }
    })
}
