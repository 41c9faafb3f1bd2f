//! Proc macros for rhizome-tilemesh-op.
//!
//! Provides `#[derive(Op)]` to auto-generate `DynOp` implementations.
//!
//! # Example
//!
//! ```ignore
//! use rhizome_tilemesh_op::Op;
//!
//! #[derive(Clone, Serialize, Deserialize, Op)]
//! #[op(input = MeshObject, output = MeshObject, fallible)]
//! pub struct UvFlipTiles {
//!     pub axis: FlipAxis,
//! }
//!
//! impl UvFlipTiles {
//!     pub fn apply(&self, object: &MeshObject) -> Result<MeshObject, EditError> {
//!         // implementation
//!     }
//! }
//! ```
//!
//! The macro generates:
//! - `DynOp::type_name()` from struct name (or `#[op(name = "...")]`)
//! - `DynOp::input_type()` / `output_type()` from `#[op(input, output)]`
//! - `DynOp::apply_dyn()` that calls `self.apply()` with type conversion
//! - `DynOp::params()` using serde

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{ToTokens, quote};
use syn::{DeriveInput, LitStr, Token, Type, TypeTuple, parse_macro_input};

/// Derives `DynOp` for an operator struct.
///
/// # Attributes
///
/// - `#[op(input = Type)]` - Input type (required).
/// - `#[op(output = Type)]` - Output type (required).
/// - `#[op(name = "...")]` - Custom type name (optional, defaults to tilemesh::StructName)
/// - `#[op(fallible)]` - `apply` returns `Result<Output, E>`; errors become `OpError::Failed`.
///
/// # Requirements
///
/// The struct must:
/// - Implement `serde::Serialize`
/// - Have an `apply(&self, input: &InputType)` method
#[proc_macro_derive(Op, attributes(op))]
pub fn derive_op(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let mut input_type: Option<Type> = None;
    let mut output_type: Option<Type> = None;
    let mut custom_name: Option<String> = None;
    let mut fallible = false;

    for attr in &input.attrs {
        if !attr.path().is_ident("op") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("input") {
                meta.input.parse::<Token![=]>()?;
                input_type = Some(meta.input.parse::<Type>()?);
                Ok(())
            } else if meta.path.is_ident("output") {
                meta.input.parse::<Token![=]>()?;
                output_type = Some(meta.input.parse::<Type>()?);
                Ok(())
            } else if meta.path.is_ident("name") {
                meta.input.parse::<Token![=]>()?;
                let lit: LitStr = meta.input.parse()?;
                custom_name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("fallible") {
                fallible = true;
                Ok(())
            } else {
                Err(meta.error("unknown op attribute"))
            }
        })?;
    }

    let input_type = input_type.ok_or_else(|| {
        syn::Error::new_spanned(struct_name, "#[op(input = Type)] is required")
    })?;
    let output_type = output_type.ok_or_else(|| {
        syn::Error::new_spanned(struct_name, "#[op(output = Type)] is required")
    })?;

    let type_name_str = custom_name.unwrap_or_else(|| format!("tilemesh::{}", struct_name));

    let input_type_name = input_type.to_token_stream().to_string();
    let output_type_name = output_type.to_token_stream().to_string();

    let is_unit_input = match &input_type {
        Type::Tuple(TypeTuple { elems, .. }) => elems.is_empty(),
        _ => false,
    };

    let call = if is_unit_input {
        quote! {
            let _: () = input.downcast()?;
            let result = self.apply();
        }
    } else {
        quote! {
            let value: #input_type = input.downcast()?;
            let result = self.apply(&value);
        }
    };

    let unwrap_result = if fallible {
        quote! {
            let result = result.map_err(|e| ::rhizome_tilemesh_op::OpError::failed(#type_name_str, e))?;
        }
    } else {
        quote! {}
    };

    Ok(quote! {
        impl #impl_generics ::rhizome_tilemesh_op::DynOp for #struct_name #ty_generics #where_clause {
            fn type_name(&self) -> &'static str {
                #type_name_str
            }

            fn input_type(&self) -> ::rhizome_tilemesh_op::OpType {
                ::rhizome_tilemesh_op::OpType::of::<#input_type>(#input_type_name)
            }

            fn output_type(&self) -> ::rhizome_tilemesh_op::OpType {
                ::rhizome_tilemesh_op::OpType::of::<#output_type>(#output_type_name)
            }

            fn apply_dyn(&self, input: ::rhizome_tilemesh_op::OpValue) -> ::std::result::Result<::rhizome_tilemesh_op::OpValue, ::rhizome_tilemesh_op::OpError> {
                #call
                #unwrap_result
                ::std::result::Result::Ok(::rhizome_tilemesh_op::OpValue::new(
                    ::rhizome_tilemesh_op::OpType::of::<#output_type>(#output_type_name),
                    result
                ))
            }

            fn params(&self) -> ::rhizome_tilemesh_op::serde_json::Value {
                ::rhizome_tilemesh_op::serde_json::to_value(self).unwrap_or_default()
            }
        }
    })
}
