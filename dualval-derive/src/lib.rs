//! Derive macros for `dualval`.
//!
//! `#[derive(CastValue)]` turns a Rust value into a `Heap`; `#[derive(FromValue)]` reads one back
//! from any tree, buffer or packet.
//!
//! Named structs map to objects, tuple structs to arrays (a single-field tuple struct is
//! transparent) and unit structs to null. Enums are externally tagged: a one-entry object whose
//! key is the variant name and whose value is the payload (null, array or object).
//!
//! Attributes:
//! - `#[dualval(rename = "name")]` on fields and variants
//! - `#[dualval(skip)]` on named fields (filled with `Default::default()` when reading)
//! - `#[dualval(default)]` on named fields (missing keys fall back to `Default::default()`)

extern crate proc_macro;

mod attrs;
mod cast;
mod from_value;
mod types;
mod util;

use proc_macro::TokenStream;
use syn::{parse_macro_input, Data, DeriveInput};

#[proc_macro_derive(CastValue, attributes(dualval))]
pub fn derive_cast_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let out = match &input.data {
        Data::Struct(data) => cast::cast_struct(&input.ident, &input.generics, data),
        Data::Enum(data) => cast::cast_enum(&input.ident, &input.generics, data),
        Data::Union(u) => Err(syn::Error::new(
            u.union_token.span,
            "CastValue not supported for unions",
        )),
    };
    TokenStream::from(out.unwrap_or_else(syn::Error::into_compile_error))
}

#[proc_macro_derive(FromValue, attributes(dualval))]
pub fn derive_from_value(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let out = match &input.data {
        Data::Struct(data) => from_value::from_value_struct(&input.ident, &input.generics, data),
        Data::Enum(data) => from_value::from_value_enum(&input.ident, &input.generics, data),
        Data::Union(u) => Err(syn::Error::new(
            u.union_token.span,
            "FromValue not supported for unions",
        )),
    };
    TokenStream::from(out.unwrap_or_else(syn::Error::into_compile_error))
}
