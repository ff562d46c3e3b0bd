//! modkit 过程宏
//!
//! 为命令/查询/DTO 生成显式身份实现：
//! - `#[derive(Command)]`：实现 `modkit_application::command::Command`，
//!   可用 `#[command(name = "...")]` 指定稳定名称，缺省为类型名；
//! - `#[derive(Query)]`：实现 `modkit_application::query::Query`，
//!   `#[query(dto = Type)]` 必填，`name` 可选；
//! - `#[derive(Dto)]`：实现 `modkit_application::dto::Dto` 标记。
//!
//! 展开一律使用 `::modkit_application` 绝对路径，避免调用方重命名引起歧义。
//!
use proc_macro::TokenStream;
use quote::quote;
use syn::{DeriveInput, LitStr, Type, parse_macro_input, spanned::Spanned};

/// `#[derive(Command)]`
///
/// ```ignore
/// #[derive(Command, Clone, Debug)]
/// #[command(name = "user.create")]
/// struct CreateUser { name: String }
///
/// assert_eq!(CreateUser::NAME, "user.create");
/// ```
#[proc_macro_derive(Command, attributes(command))]
pub fn derive_command(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = match explicit_name(&input, "command") {
        Ok(name) => name.unwrap_or_else(|| input.ident.to_string()),
        Err(e) => return e.to_compile_error().into(),
    };

    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::modkit_application::command::Command for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
        }
    }
    .into()
}

/// `#[derive(Query)]`
///
/// ```ignore
/// #[derive(Query, Debug)]
/// #[query(dto = UserDto, name = "user.get")]
/// struct GetUser { id: u32 }
/// ```
#[proc_macro_derive(Query, attributes(query))]
pub fn derive_query(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let mut name_lit: Option<LitStr> = None;
    let mut dto_ty: Option<Type> = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("query") {
            continue;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name_lit = Some(meta.value()?.parse()?);
                Ok(())
            } else if meta.path.is_ident("dto") {
                dto_ty = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported attribute, expected `name` or `dto`"))
            }
        });
        if let Err(e) = parsed {
            return e.to_compile_error().into();
        }
    }

    let Some(dto_ty) = dto_ty else {
        return syn::Error::new(input.span(), "#[query(dto = ...)] is required")
            .to_compile_error()
            .into();
    };

    let name = name_lit
        .map(|l| l.value())
        .unwrap_or_else(|| input.ident.to_string());
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::modkit_application::query::Query for #ident #ty_generics #where_clause {
            const NAME: &'static str = #name;
            type Dto = #dto_ty;
        }
    }
    .into()
}

/// `#[derive(Dto)]`：标记实现（要求类型自身满足 `Serialize + Send + Sync`）
#[proc_macro_derive(Dto)]
pub fn derive_dto(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    quote! {
        impl #impl_generics ::modkit_application::dto::Dto for #ident #ty_generics #where_clause {}
    }
    .into()
}

/// 读取 `#[<attr>(name = "...")]`，未指定返回 None
fn explicit_name(input: &DeriveInput, attr_name: &str) -> syn::Result<Option<String>> {
    let mut name_lit: Option<LitStr> = None;

    for attr in &input.attrs {
        if !attr.path().is_ident(attr_name) {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                name_lit = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported attribute, expected `name`"))
            }
        })?;
    }

    Ok(name_lit.map(|l| l.value()))
}
