use proc_macro2::{Span, TokenStream};
use quote::{quote, quote_spanned};
use syn::parse::Parser;

use crate::parse::*;

// syn::AttributeArgs does not implement syn::Parse
type AttributeArgs = syn::punctuated::Punctuated<syn::Meta, syn::Token![,]>;

/// Used when the attribute arguments are invalid, so that the expansion still
/// looks like the final item to IDEs.
const DEFAULT_ERROR_CONFIG: FinalConfig = FinalConfig {
    ready_order: None,
    name: None,
};

/// Given
///
/// ```rust,no_run
/// #[coloop::main(ready_order = "fifo")]
/// async fn main() {
///     println!("Hello world");
/// }
/// ```
///
/// `args` holds `ready_order = "fifo"` and `item` the async function. The
/// function becomes synchronous and runs its body as the root task of a fresh
/// `Loop`.
pub(crate) fn main(args: TokenStream, item: TokenStream) -> TokenStream {
    let input: ItemFn = match syn::parse2(item.clone()) {
        Ok(it) => it,
        Err(e) => return token_stream_with_error(item, e),
    };

    let config = if input.sig.ident == "main" && !input.sig.inputs.is_empty() {
        let msg = "the main function cannot accept arguments";
        Err(syn::Error::new_spanned(&input.sig.ident, msg))
    } else {
        AttributeArgs::parse_terminated
            .parse2(args)
            .and_then(|args| build_config(&input, args, false))
    };

    match config {
        Ok(config) => parse_knobs(input, false, config),
        Err(e) => token_stream_with_error(parse_knobs(input, false, DEFAULT_ERROR_CONFIG), e),
    }
}

pub(crate) fn test(args: TokenStream, item: TokenStream) -> TokenStream {
    let input: ItemFn = match syn::parse2(item.clone()) {
        Ok(it) => it,
        Err(e) => return token_stream_with_error(item, e),
    };

    let config = if let Some(attr) = input.attrs().find(|attr| is_test_attribute(attr)) {
        let msg = "second test attribute is supplied, consider removing or changing the order of your test attributes";
        Err(syn::Error::new_spanned(attr, msg))
    } else {
        AttributeArgs::parse_terminated
            .parse2(args)
            .and_then(|args| build_config(&input, args, true))
    };

    match config {
        Ok(config) => parse_knobs(input, true, config),
        Err(e) => token_stream_with_error(parse_knobs(input, true, DEFAULT_ERROR_CONFIG), e),
    }
}

#[derive(Clone, Copy, PartialEq)]
enum ReadyOrder {
    Fifo,
    Lifo,
}

impl ReadyOrder {
    fn from_str(s: &str) -> Result<ReadyOrder, String> {
        match s {
            "fifo" => Ok(ReadyOrder::Fifo),
            "lifo" => Ok(ReadyOrder::Lifo),
            _ => Err(format!(
                "No such ready order `{s}`. The ready orders are `lifo` and `fifo`."
            )),
        }
    }
}

struct FinalConfig {
    ready_order: Option<ReadyOrder>,
    name: Option<String>,
}

struct ConfigBuilder {
    ready_order: Option<ReadyOrder>,
    name: Option<String>,
    is_test: bool,
}

impl ConfigBuilder {
    fn new(is_test: bool) -> Self {
        ConfigBuilder {
            ready_order: None,
            name: None,
            is_test,
        }
    }

    fn macro_name(&self) -> &'static str {
        if self.is_test {
            "coloop::test"
        } else {
            "coloop::main"
        }
    }

    fn set_ready_order(&mut self, order: syn::Lit, span: Span) -> Result<(), syn::Error> {
        if self.ready_order.is_some() {
            return Err(syn::Error::new(span, "`ready_order` set multiple times."));
        }

        let order = parse_string(order, span, "ready_order")?;
        let order = ReadyOrder::from_str(&order).map_err(|err| syn::Error::new(span, err))?;
        self.ready_order = Some(order);

        Ok(())
    }

    fn set_name(&mut self, name: syn::Lit, span: Span) -> Result<(), syn::Error> {
        if self.name.is_some() {
            return Err(syn::Error::new(span, "`name` set multiple times."));
        }

        let name = parse_string(name, span, "name")?;
        if name.is_empty() {
            return Err(syn::Error::new(span, "`name` may not be empty."));
        }
        self.name = Some(name);

        Ok(())
    }

    fn build(self) -> FinalConfig {
        FinalConfig {
            ready_order: self.ready_order,
            name: self.name,
        }
    }
}

fn build_config(
    input: &ItemFn,
    args: AttributeArgs,
    is_test: bool,
) -> Result<FinalConfig, syn::Error> {
    if input.sig.asyncness.is_none() {
        let msg = "the `async` keyword is missing from the function declaration";
        return Err(syn::Error::new_spanned(input.sig.fn_token, msg));
    }

    let mut config = ConfigBuilder::new(is_test);
    let macro_name = config.macro_name();

    for arg in args {
        match arg {
            syn::Meta::NameValue(namevalue) => {
                let ident = namevalue
                    .path
                    .get_ident()
                    .ok_or_else(|| {
                        syn::Error::new_spanned(&namevalue, "Must have specified ident")
                    })?
                    .to_string()
                    .to_lowercase();
                let lit = match &namevalue.value {
                    syn::Expr::Lit(syn::ExprLit { lit, .. }) => lit,
                    expr => return Err(syn::Error::new_spanned(expr, "Must be a literal")),
                };
                let span = syn::spanned::Spanned::span(lit);
                match ident.as_str() {
                    "ready_order" => config.set_ready_order(lit.clone(), span)?,
                    "name" => config.set_name(lit.clone(), span)?,
                    name => {
                        let msg = format!(
                            "Unknown attribute {name} is specified; expected one of: `ready_order`, `name`",
                        );
                        return Err(syn::Error::new_spanned(namevalue, msg));
                    }
                }
            }
            syn::Meta::Path(path) => {
                let name = path
                    .get_ident()
                    .ok_or_else(|| syn::Error::new_spanned(&path, "Must have specified ident"))?
                    .to_string()
                    .to_lowercase();
                let msg = match name.as_str() {
                    "fifo" | "lifo" => format!(
                        "Set the ready order with #[{macro_name}(ready_order = \"{name}\")]."
                    ),
                    "ready_order" | "name" => {
                        format!("The `{name}` attribute requires an argument.")
                    }
                    name => format!(
                        "Unknown attribute {name} is specified; expected one of: `ready_order`, `name`."
                    ),
                };
                return Err(syn::Error::new_spanned(path, msg));
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "Unknown attribute inside the macro",
                ));
            }
        }
    }

    Ok(config.build())
}

fn parse_knobs(mut input: ItemFn, is_test: bool, config: FinalConfig) -> TokenStream {
    input.sig.asyncness = None;

    // Type mismatches are reported on the last statement, so the generated
    // call carries its span.
    let (last_stmt_start_span, last_stmt_end_span) = {
        let mut last_stmt = input.stmts.last().cloned().unwrap_or_default().into_iter();
        let start = last_stmt.next().map_or_else(Span::call_site, |t| t.span());
        let end = last_stmt.last().map_or(start, |t| t.span());
        (start, end)
    };

    let mut lp = quote_spanned! {last_stmt_start_span=>
        coloop::runtime::Builder::new()
    };

    match config.ready_order {
        Some(ReadyOrder::Fifo) => {
            lp = quote_spanned! {last_stmt_start_span=>
                #lp.ready_order(coloop::runtime::AddMode::Fifo)
            };
        }
        Some(ReadyOrder::Lifo) => {
            lp = quote_spanned! {last_stmt_start_span=>
                #lp.ready_order(coloop::runtime::AddMode::Lifo)
            };
        }
        None => {}
    }

    if let Some(name) = config.name {
        lp = quote_spanned! {last_stmt_start_span=> #lp.name(#name) };
    }

    let generated_attrs = if is_test {
        quote! {
            #[::core::prelude::v1::test]
        }
    } else {
        quote! {}
    };

    let body_ident = quote! { body };
    let last_block = quote_spanned! {last_stmt_end_span=>
        #[allow(clippy::needless_return)]
        {
            return #lp.build().block_on(#body_ident);
        }
    };

    let body = input.body();

    // The root task must own everything it touches, hence `async move`. Tests
    // box the body so every test shares one `block_on` instantiation per
    // output type.
    let body = if is_test {
        let output_type = match &input.sig.output {
            syn::ReturnType::Default => quote! { () },
            syn::ReturnType::Type(_, ret_type) => quote! { #ret_type },
        };
        quote! {
            let body: ::core::pin::Pin<
                ::std::boxed::Box<dyn ::core::future::Future<Output = #output_type>>,
            > = ::std::boxed::Box::pin(async move #body);
        }
    } else {
        quote! {
            let body = async move #body;
        }
    };

    input.into_tokens(generated_attrs, body, last_block)
}
