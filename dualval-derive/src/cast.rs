use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{spanned::Spanned, DataEnum, DataStruct, Fields, Generics, Ident, LitStr, Type};

use crate::attrs::{ensure_no_attrs, parse_field_attrs, parse_variant_attrs};
use crate::types::type_mentions_self;
use crate::util::bounded_where_clause;

/// Statements inserting each named, non-skipped field into the object bound to `__obj`.
fn named_puts<'a, F>(
    name: &Ident,
    fields: &'a syn::FieldsNamed,
    bounds: &mut Vec<&'a Type>,
    value: F,
) -> syn::Result<(Vec<Ident>, Vec<TokenStream>)>
where
    F: Fn(&Ident) -> TokenStream,
{
    let mut pats = Vec::new();
    let mut puts = Vec::new();

    for field in &fields.named {
        let attr = parse_field_attrs(&field.attrs)?;
        let f_ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new(field.span(), "expected a named field"))?;
        pats.push(f_ident.clone());

        if attr.skip {
            continue;
        }

        let key = attr
            .rename
            .unwrap_or_else(|| LitStr::new(&f_ident.to_string(), f_ident.span()));

        if !type_mentions_self(&field.ty, name) {
            bounds.push(&field.ty);
        }

        let value_ts = value(f_ident);
        puts.push(quote! {
            ::dualval::__derive::put(&mut __obj, #key, #value_ts)?;
        });
    }

    Ok((pats, puts))
}

fn unnamed_pushes<'a>(
    name: &Ident,
    fields: &'a syn::FieldsUnnamed,
    bounds: &mut Vec<&'a Type>,
    ctx: &str,
) -> syn::Result<(Vec<Ident>, Vec<TokenStream>)> {
    let mut pats = Vec::new();
    let mut pushes = Vec::new();

    for (idx, field) in fields.unnamed.iter().enumerate() {
        ensure_no_attrs(&field.attrs, ctx)?;
        let var = format_ident!("v{idx}");
        pats.push(var.clone());

        if !type_mentions_self(&field.ty, name) {
            bounds.push(&field.ty);
        }
        pushes.push(quote! { ::dualval::__derive::push(&mut __arr, #var)?; });
    }

    Ok((pats, pushes))
}

fn emit_impl(
    name: &Ident,
    generics: &Generics,
    bounds: &[&Type],
    body: &TokenStream,
) -> TokenStream {
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let bounds: Vec<_> = bounds
        .iter()
        .map(|ty| (*ty, quote!(::dualval::CastValue)))
        .collect();
    let where_clause = bounded_where_clause(where_clause, &bounds);

    quote! {
        impl #impl_generics ::dualval::CastValue for #name #ty_generics #where_clause {
            fn cast<__R: ::dualval::OwningRefCount>(
                &self,
            ) -> ::core::result::Result<::dualval::Heap<__R>, ::dualval::ValueError> {
                #body
            }
        }
    }
}

pub(crate) fn cast_struct(
    name: &Ident,
    generics: &Generics,
    data: &DataStruct,
) -> syn::Result<TokenStream> {
    let mut bounds = Vec::new();

    let body = match &data.fields {
        Fields::Named(fields) => {
            let (_, puts) = named_puts(name, fields, &mut bounds, |ident| quote!(&self.#ident))?;
            quote! {
                #[allow(unused_mut)]
                let mut __obj = ::dualval::__derive::object::<__R>();
                #(#puts)*
                ::core::result::Result::Ok(__obj)
            }
        }

        // A single-field tuple struct is transparent.
        Fields::Unnamed(fields) if fields.unnamed.len() == 1 => {
            let field = &fields.unnamed[0];
            ensure_no_attrs(&field.attrs, "newtype struct fields")?;
            if !type_mentions_self(&field.ty, name) {
                bounds.push(&field.ty);
            }
            quote! { ::dualval::CastValue::cast::<__R>(&self.0) }
        }

        Fields::Unnamed(fields) => {
            let (pats, pushes) = unnamed_pushes(name, fields, &mut bounds, "tuple struct fields")?;
            quote! {
                let Self( #(#pats),* ) = self;
                #[allow(unused_mut)]
                let mut __arr = ::dualval::__derive::array::<__R>();
                #(#pushes)*
                ::core::result::Result::Ok(__arr)
            }
        }

        Fields::Unit => quote! {
            ::core::result::Result::Ok(::dualval::Heap::<__R>::make_null())
        },
    };

    Ok(emit_impl(name, generics, &bounds, &body))
}

pub(crate) fn cast_enum(
    name: &Ident,
    generics: &Generics,
    data: &DataEnum,
) -> syn::Result<TokenStream> {
    let mut arms = Vec::new();
    let mut bounds = Vec::new();

    for variant in &data.variants {
        let v_attr = parse_variant_attrs(&variant.attrs)?;
        let vname = v_attr
            .rename
            .unwrap_or_else(|| LitStr::new(&variant.ident.to_string(), variant.ident.span()));
        let ident = &variant.ident;

        match &variant.fields {
            Fields::Unit => {
                arms.push(quote! {
                    Self::#ident => (#vname, ::dualval::Heap::<__R>::make_null())
                });
            }

            Fields::Unnamed(fields) => {
                let (pats, pushes) =
                    unnamed_pushes(name, fields, &mut bounds, "tuple enum variant fields")?;
                arms.push(quote! {
                    Self::#ident( #(#pats),* ) => {
                        #[allow(unused_mut)]
                        let mut __arr = ::dualval::__derive::array::<__R>();
                        #(#pushes)*
                        (#vname, __arr)
                    }
                });
            }

            Fields::Named(fields) => {
                let (pats, puts) = named_puts(name, fields, &mut bounds, |ident| quote!(#ident))?;
                arms.push(quote! {
                    #[allow(unused_variables)]
                    Self::#ident { #(#pats),* } => {
                        #[allow(unused_mut)]
                        let mut __obj = ::dualval::__derive::object::<__R>();
                        #(#puts)*
                        (#vname, __obj)
                    }
                });
            }
        }
    }

    let body = if data.variants.is_empty() {
        quote! { match *self {} }
    } else {
        quote! {
            let (tag, payload): (&str, ::dualval::Heap<__R>) = match self { #(#arms),* };
            let mut __obj = ::dualval::__derive::object::<__R>();
            ::dualval::__derive::put(&mut __obj, tag, &payload)?;
            ::core::result::Result::Ok(__obj)
        }
    };

    Ok(emit_impl(name, generics, &bounds, &body))
}
