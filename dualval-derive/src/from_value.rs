use proc_macro2::TokenStream;
use quote::quote;
use syn::{spanned::Spanned, DataEnum, DataStruct, Fields, Generics, Ident, LitStr, Type};

use crate::attrs::{ensure_no_attrs, parse_field_attrs, parse_variant_attrs};
use crate::types::type_mentions_self;
use crate::util::bounded_where_clause;

#[derive(Default)]
struct Bounds<'a> {
    extract: Vec<&'a Type>,
    default: Vec<&'a Type>,
}

/// `field: expr` initializers reading every named field out of the object `src`.
fn named_inits<'a>(
    name: &Ident,
    fields: &'a syn::FieldsNamed,
    bounds: &mut Bounds<'a>,
    src: &TokenStream,
) -> syn::Result<Vec<TokenStream>> {
    let mut inits = Vec::new();

    for field in &fields.named {
        let attr = parse_field_attrs(&field.attrs)?;
        let f_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        let recursive = type_mentions_self(&field.ty, name);

        if attr.skip {
            if !recursive {
                bounds.default.push(&field.ty);
            }
            inits.push(quote! { #f_ident: ::core::default::Default::default() });
            continue;
        }

        let key = attr
            .rename
            .unwrap_or_else(|| LitStr::new(&f_ident.to_string(), f_ident.span()));

        if !recursive {
            bounds.extract.push(&field.ty);
            if attr.default {
                bounds.default.push(&field.ty);
            }
        }

        if attr.default {
            inits.push(quote! { #f_ident: ::dualval::__derive::field_or_default(#src, #key)? });
        } else {
            inits.push(quote! { #f_ident: ::dualval::__derive::field(#src, #key)? });
        }
    }

    Ok(inits)
}

fn unnamed_inits<'a>(
    name: &Ident,
    fields: &'a syn::FieldsUnnamed,
    bounds: &mut Bounds<'a>,
    src: &TokenStream,
    ctx: &str,
) -> syn::Result<Vec<TokenStream>> {
    let mut inits = Vec::new();
    for (idx, field) in fields.unnamed.iter().enumerate() {
        ensure_no_attrs(&field.attrs, ctx)?;
        if !type_mentions_self(&field.ty, name) {
            bounds.extract.push(&field.ty);
        }
        inits.push(quote! { ::dualval::__derive::element(#src, #idx)? });
    }
    Ok(inits)
}

fn emit_impl(
    name: &Ident,
    generics: &Generics,
    bounds: &Bounds<'_>,
    body: &TokenStream,
) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let mut all = Vec::with_capacity(bounds.extract.len() + bounds.default.len());
    all.extend(
        bounds
            .extract
            .iter()
            .map(|ty| (*ty, quote!(::dualval::FromValue))),
    );
    all.extend(
        bounds
            .default
            .iter()
            .map(|ty| (*ty, quote!(::core::default::Default))),
    );
    let where_clause = bounded_where_clause(where_clause, &all);

    quote! {
        impl #impl_generics ::dualval::FromValue for #name #ty_generics #where_clause {
            fn from_value<__V: ::dualval::ValueAccess + ?Sized>(
                value: &__V,
            ) -> ::core::result::Result<Self, ::dualval::ValueError> {
                #body
            }
        }
    }
}

pub(crate) fn from_value_struct(
    name: &Ident,
    generics: &Generics,
    data: &DataStruct,
) -> syn::Result<TokenStream> {
    let mut bounds = Bounds::default();
    let src = quote!(value);

    let body = match &data.fields {
        Fields::Named(fields) => {
            let inits = named_inits(name, fields, &mut bounds, &src)?;
            quote! {
                ::dualval::__derive::expect_object(value)?;
                ::core::result::Result::Ok(Self { #(#inits),* })
            }
        }

        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let field = &fields.unnamed[0];
            ensure_no_attrs(&field.attrs, "newtype struct fields")?;
            if !type_mentions_self(&field.ty, name) {
                bounds.extract.push(&field.ty);
            }
            quote! {
                ::core::result::Result::Ok(Self(::dualval::FromValue::from_value(value)?))
            }
        }

        Fields::Unnamed(fields) => {
            let len = fields.unnamed.len();
            let inits = unnamed_inits(name, fields, &mut bounds, &src, "tuple struct fields")?;
            quote! {
                ::dualval::__derive::expect_array(value, #len)?;
                ::core::result::Result::Ok(Self( #(#inits),* ))
            }
        }

        Fields::Unit => quote! {
            <() as ::dualval::FromValue>::from_value(value)?;
            ::core::result::Result::Ok(Self)
        },
    };

    Ok(emit_impl(name, generics, &bounds, &body))
}

pub(crate) fn from_value_enum(
    name: &Ident,
    generics: &Generics,
    data: &DataEnum,
) -> syn::Result<TokenStream> {
    let mut arms = Vec::new();
    let mut bounds = Bounds::default();
    let src = quote!(&payload);

    for variant in &data.variants {
        let v_attr = parse_variant_attrs(&variant.attrs)?;
        let vname = v_attr
            .rename
            .unwrap_or_else(|| LitStr::new(&variant.ident.to_string(), variant.ident.span()));
        let ident = &variant.ident;

        match &variant.fields {
            Fields::Unit => arms.push(quote! {
                #vname => {
                    <() as ::dualval::FromValue>::from_value(&payload)?;
                    ::core::result::Result::Ok(Self::#ident)
                }
            }),

            Fields::Unnamed(fields) => {
                let len = fields.unnamed.len();
                let inits =
                    unnamed_inits(name, fields, &mut bounds, &src, "tuple enum variant fields")?;
                arms.push(quote! {
                    #vname => {
                        ::dualval::__derive::expect_array(&payload, #len)?;
                        ::core::result::Result::Ok(Self::#ident( #(#inits),* ))
                    }
                });
            }

            Fields::Named(fields) => {
                let inits = named_inits(name, fields, &mut bounds, &src)?;
                arms.push(quote! {
                    #vname => {
                        ::dualval::__derive::expect_object(&payload)?;
                        ::core::result::Result::Ok(Self::#ident { #(#inits),* })
                    }
                });
            }
        }
    }

    let body = quote! {
        let (tag, payload) = ::dualval::__derive::variant(value)?;
        match tag {
            #(#arms,)*
            _ => ::core::result::Result::Err(::dualval::__derive::unknown_variant()),
        }
    };

    Ok(emit_impl(name, generics, &bounds, &body))
}
