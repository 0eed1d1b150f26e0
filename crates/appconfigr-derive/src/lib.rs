use darling::{Error, FromDeriveInput, FromField, FromMeta};
use heck::{
    ToKebabCase, ToLowerCamelCase, ToShoutyKebabCase, ToShoutySnakeCase, ToSnakeCase,
    ToUpperCamelCase,
};
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::{ToTokens, quote};
use syn::{Attribute, Data, DeriveInput, Expr, Fields, Lit, Type, parse_macro_input};

/// Container-level `#[appconfig(...)]` options.
#[derive(Debug, FromDeriveInput)]
#[darling(attributes(appconfig), supports(struct_named))]
struct AppConfigContainer {
    /// Explicit file name, overriding the one derived from the type name.
    #[darling(default)]
    file: Option<String>,
}

/// Parsed representation of a field with #[appconfig(...)] attributes.
#[derive(Debug, FromField)]
#[darling(attributes(appconfig))]
struct AppConfigField {
    ident: Option<syn::Ident>,
    ty: syn::Type,

    #[darling(default)]
    default: Option<syn::Lit>,

    #[darling(default)]
    env: Option<String>,

    #[darling(default)]
    required: bool,

    #[darling(default)]
    nested: bool,

    #[darling(default, multiple, rename = "validate")]
    validators: Vec<ValidatorAttr>,
}

/// Validator attributes: range, regex, url, non_empty.
#[derive(Debug, FromMeta)]
#[darling(rename_all = "snake_case")]
enum ValidatorAttr {
    Range(RangeArgs),
    Regex(String),
    Url,
    NonEmpty,
}

#[derive(Debug, FromMeta)]
struct RangeArgs {
    #[darling(default)]
    min: Option<f64>,
    #[darling(default)]
    max: Option<f64>,
}

#[proc_macro_derive(AppConfig, attributes(appconfig))]
pub fn derive_app_config(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}

fn expand(input: &DeriveInput) -> Result<proc_macro2::TokenStream, Error> {
    let container = AppConfigContainer::from_derive_input(input)?;
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(
            Error::custom("AppConfig cannot be derived for generic structs").with_span(&input.generics)
        );
    }

    let fields = match &input.data {
        Data::Struct(ds) => match &ds.fields {
            Fields::Named(n) => &n.named,
            _ => return Err(Error::custom("AppConfig expects a struct with named fields")),
        },
        _ => return Err(Error::custom("AppConfig expects a struct")),
    };

    let file_name = container
        .file
        .unwrap_or_else(|| format!("{}.conf", name.to_string().to_kebab_case()));
    let rename_all = serde_string_attr(&input.attrs, "rename_all");

    let mut errors = Vec::new();
    let mut defaults_kv = Vec::new();
    let mut field_spec_stmts = Vec::new();
    let mut required_stmts = Vec::new();
    let mut validate_body = Vec::new();

    for f in fields {
        let cf = match AppConfigField::from_field(f) {
            Ok(cf) => cf,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        let Some(ident) = cf.ident.clone() else {
            continue;
        };
        let rust_name = ident.to_string().trim_start_matches("r#").to_string();
        let key = serde_string_attr(&f.attrs, "rename").unwrap_or_else(|| match &rename_all {
            Some(rule) => apply_rename_rule(rule, &rust_name),
            None => rust_name.clone(),
        });
        let path_lit = syn::LitStr::new(&key, Span::call_site());
        let field_name_lit = syn::LitStr::new(&rust_name, Span::call_site());
        let required_flag = cf.required;
        let nested_flag = cf.nested;
        let env_tokens = option_str_tokens(cf.env.as_deref());
        let (is_option, inner_ty) = option_inner(&cf.ty);
        let nested_ty = if nested_flag && is_option {
            inner_ty
        } else {
            &cf.ty
        };

        let field_kind = if nested_flag {
            quote! { appconfigr::Kind::Object }
        } else {
            kind_for_type(&cf.ty)
        };

        let default_literal = cf.default.as_ref().map(default_literal);
        let default_tokens = option_str_tokens(default_literal.as_deref());

        if let Some(lit) = cf.default.clone() {
            defaults_kv.push(quote! {
                map.insert(#key.to_string(), appconfigr::__private::serde_json::json!(#lit));
            });
        } else if nested_flag && !is_option {
            defaults_kv.push(quote! {
                map.insert(#key.to_string(), <#nested_ty as appconfigr::ConfigMeta>::defaults_json());
            });
        }

        field_spec_stmts.push(quote! {
            items.push(appconfigr::FieldSpec {
                name: #field_name_lit,
                env: #env_tokens,
                path: #path_lit,
                kind: #field_kind,
                default: #default_tokens,
                required: #required_flag,
            });
        });

        if required_flag {
            required_stmts.push(quote! {
                required.push(#path_lit);
            });
        }

        // Checks below see the field value as `__v`, unwrapped when optional.
        let guard = |body: proc_macro2::TokenStream| {
            if is_option {
                quote! {
                    if let Some(__v) = &self.#ident {
                        #body
                    }
                }
            } else {
                quote! {
                    {
                        let __v = &self.#ident;
                        #body
                    }
                }
            }
        };

        for v in &cf.validators {
            match v {
                ValidatorAttr::Range(args) => {
                    if !(is_int(inner_ty) || is_float(inner_ty)) {
                        errors.push(
                            Error::custom("range validation requires a numeric field")
                                .with_span(&f.ty),
                        );
                        continue;
                    }
                    validate_body.push(guard(range_checks(&key, args.min, args.max)));
                }
                ValidatorAttr::Regex(pattern) => {
                    if !is_string_type(&cf.ty) {
                        errors.push(
                            Error::custom("regex validation requires a String field")
                                .with_span(&f.ty),
                        );
                        continue;
                    }
                    validate_body.push(guard(quote! {
                        match appconfigr::__private::regex::Regex::new(#pattern) {
                            Ok(re) => {
                                if !re.is_match(__v) {
                                    errs.push(appconfigr::error::Issue {
                                        field: #key.to_string(),
                                        kind: appconfigr::error::IssueKind::Regex,
                                        message: format!("regex not matched: {}", #pattern),
                                    });
                                }
                            }
                            Err(e) => {
                                errs.push(appconfigr::error::Issue {
                                    field: #key.to_string(),
                                    kind: appconfigr::error::IssueKind::Regex,
                                    message: format!("invalid pattern {}: {e}", #pattern),
                                });
                            }
                        }
                    }));
                }
                ValidatorAttr::Url => {
                    if !is_string_type(&cf.ty) {
                        errors.push(
                            Error::custom("url validation requires a String field")
                                .with_span(&f.ty),
                        );
                        continue;
                    }
                    validate_body.push(guard(quote! {
                        if appconfigr::__private::url::Url::parse(__v).is_err() {
                            errs.push(appconfigr::error::Issue {
                                field: #key.to_string(),
                                kind: appconfigr::error::IssueKind::Url,
                                message: "invalid URL".to_string(),
                            });
                        }
                    }));
                }
                ValidatorAttr::NonEmpty => {
                    validate_body.push(guard(quote! {
                        if __v.is_empty() {
                            errs.push(appconfigr::error::Issue {
                                field: #key.to_string(),
                                kind: appconfigr::error::IssueKind::NonEmpty,
                                message: "must not be empty".to_string(),
                            });
                        }
                    }));
                }
            }
        }

        if nested_flag {
            let prefix = path_lit.clone();
            field_spec_stmts.push(quote! {
                for nested in <#nested_ty as appconfigr::ConfigMeta>::field_specs() {
                    items.push(nested.with_prefix(#prefix));
                }
            });
            if !is_option {
                required_stmts.push(quote! {
                    for nested in <#nested_ty as appconfigr::ConfigMeta>::required_fields() {
                        required.push(appconfigr::util::leak_string(format!("{}.{nested}", #prefix)));
                    }
                });
            }
            validate_body.push(guard(quote! {
                if let Err(nested_errs) = <#nested_ty as appconfigr::Validate>::validate(__v) {
                    errs.extend(nested_errs.with_prefix(#prefix));
                }
            }));
        }
    }

    if !errors.is_empty() {
        return Err(Error::multiple(errors));
    }

    Ok(quote! {
        impl appconfigr::ConfigMeta for #name {
            fn file_name() -> String {
                #file_name.to_string()
            }
            fn defaults_json() -> appconfigr::__private::serde_json::Value {
                let mut map = appconfigr::__private::serde_json::Map::new();
                #(#defaults_kv)*
                appconfigr::__private::serde_json::Value::Object(map)
            }
            fn field_specs() -> &'static [appconfigr::FieldSpec] {
                static FIELD_SPECS: std::sync::OnceLock<Vec<appconfigr::FieldSpec>> = std::sync::OnceLock::new();
                FIELD_SPECS.get_or_init(|| {
                    let mut items = Vec::new();
                    #(#field_spec_stmts)*
                    items
                }).as_slice()
            }
            fn required_fields() -> &'static [&'static str] {
                static REQUIRED: std::sync::OnceLock<Vec<&'static str>> = std::sync::OnceLock::new();
                REQUIRED.get_or_init(|| {
                    let mut required = Vec::new();
                    #(#required_stmts)*
                    required
                }).as_slice()
            }
        }

        impl appconfigr::Validate for #name {
            fn validate(&self) -> Result<(), appconfigr::ValidationErrors> {
                let mut errs = appconfigr::ValidationErrors::new();
                #(#validate_body)*
                if errs.is_empty() { Ok(()) } else { Err(errs) }
            }
        }

        impl #name {
            /// Load this configuration from its file through `configr`:
            /// defaults, file(s), env overrides, then validations.
            pub fn load_from(configr: &appconfigr::AppConfigr) -> Result<Self, appconfigr::ConfigError> {
                configr.config::<Self>()
            }
        }
    })
}

// ---------- helpers ----------

/// Value of `#[serde(key = "...")]` or of the `deserialize` half of
/// `#[serde(key(deserialize = "...", serialize = "..."))]`, skipping every
/// other serde option.
fn serde_string_attr(attrs: &[Attribute], key: &str) -> Option<String> {
    let mut found = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        // Malformed serde attributes are serde's to report.
        let _ = attr.parse_nested_meta(|meta| {
            if meta.input.peek(syn::Token![=]) {
                let value = meta.value()?;
                if meta.path.is_ident(key) {
                    let lit: syn::LitStr = value.parse()?;
                    found = Some(lit.value());
                } else {
                    let _: Expr = value.parse()?;
                }
            } else if meta.input.peek(syn::token::Paren) {
                if meta.path.is_ident(key) {
                    meta.parse_nested_meta(|side| {
                        let lit: syn::LitStr = side.value()?.parse()?;
                        if side.path.is_ident("deserialize") {
                            found = Some(lit.value());
                        }
                        Ok(())
                    })?;
                } else {
                    let _content;
                    syn::parenthesized!(_content in meta.input);
                }
            }
            Ok(())
        });
    }
    found
}

/// Mirror of serde's `rename_all` rules for a snake_case field name.
fn apply_rename_rule(rule: &str, field: &str) -> String {
    match rule {
        "lowercase" => field.to_ascii_lowercase(),
        "UPPERCASE" => field.to_ascii_uppercase(),
        "PascalCase" => field.to_upper_camel_case(),
        "camelCase" => field.to_lower_camel_case(),
        "snake_case" => field.to_snake_case(),
        "SCREAMING_SNAKE_CASE" => field.to_shouty_snake_case(),
        "kebab-case" => field.to_kebab_case(),
        "SCREAMING-KEBAB-CASE" => field.to_shouty_kebab_case(),
        _ => field.to_string(),
    }
}

fn kind_for_type(ty: &Type) -> proc_macro2::TokenStream {
    let (_, t) = option_inner(ty);
    if is_bool(t) {
        quote! { appconfigr::Kind::Bool }
    } else if is_int(t) {
        quote! { appconfigr::Kind::Int }
    } else if is_float(t) {
        quote! { appconfigr::Kind::Float }
    } else {
        quote! { appconfigr::Kind::String }
    }
}

fn option_inner(ty: &Type) -> (bool, &Type) {
    if let Type::Path(tp) = ty {
        if tp.path.segments.len() == 1 && tp.path.segments[0].ident == "Option" {
            if let syn::PathArguments::AngleBracketed(ab) = &tp.path.segments[0].arguments {
                if let Some(syn::GenericArgument::Type(inner)) = ab.args.first() {
                    return (true, inner);
                }
            }
        }
    }
    (false, ty)
}

fn is_string_type(ty: &Type) -> bool {
    let (_, inner) = option_inner(ty);
    is_ident(inner, &["String"])
}

fn is_bool(ty: &Type) -> bool {
    is_ident(ty, &["bool"])
}

fn is_float(ty: &Type) -> bool {
    is_ident(ty, &["f32", "f64"])
}

fn is_int(ty: &Type) -> bool {
    is_ident(
        ty,
        &[
            "i8", "i16", "i32", "i64", "i128", "isize", "u8", "u16", "u32", "u64", "u128", "usize",
        ],
    )
}

fn is_ident(ty: &Type, names: &[&str]) -> bool {
    if let Type::Path(tp) = ty {
        if let Some(seg) = tp.path.segments.last() {
            return names.iter().any(|n| seg.ident == *n);
        }
    }
    false
}

fn range_checks(field: &str, min: Option<f64>, max: Option<f64>) -> proc_macro2::TokenStream {
    let min_clause = min.map(|m| {
        quote! {
            if __f < #m {
                errs.push(appconfigr::error::Issue {
                    field: #field.to_string(),
                    kind: appconfigr::error::IssueKind::Range,
                    message: format!("must be >= {}", #m),
                });
            }
        }
    });
    let max_clause = max.map(|m| {
        quote! {
            if __f > #m {
                errs.push(appconfigr::error::Issue {
                    field: #field.to_string(),
                    kind: appconfigr::error::IssueKind::Range,
                    message: format!("must be <= {}", #m),
                });
            }
        }
    });
    quote! {
        let __f: f64 = (*__v) as f64;
        #min_clause
        #max_clause
    }
}

fn option_str_tokens(value: Option<&str>) -> proc_macro2::TokenStream {
    match value {
        Some(text) => {
            let lit = syn::LitStr::new(text, Span::call_site());
            quote! { Some(#lit) }
        }
        None => quote! { None },
    }
}

fn default_literal(lit: &Lit) -> String {
    match lit {
        Lit::Str(s) => s.value(),
        Lit::Bool(b) => b.value().to_string(),
        Lit::Int(i) => i.base10_digits().to_string(),
        Lit::Float(f) => f.base10_digits().to_string(),
        _ => lit.to_token_stream().to_string(),
    }
}
