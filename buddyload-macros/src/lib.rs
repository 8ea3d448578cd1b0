use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Ident, ItemFn};

/// Proc macro to denote a Transaction
///
/// The function must be `async` and return a `Result<T, E>`. `Ok` counts as a completed request,
/// `Err` as a failed one. Metrics and the per-transaction tally are named after the function.
///
/// # Example
/// ```ignore
/// use buddyload::prelude::*;
///
/// #[transaction]
/// async fn chat(client: &reqwest::Client) -> Result<reqwest::StatusCode, reqwest::Error> {
///     ...
/// }
/// ```
#[proc_macro_attribute]
pub fn transaction(attr: TokenStream, item: TokenStream) -> TokenStream {
    transaction_internal(attr, item).into()
}

fn transaction_internal(_attr: TokenStream, item: TokenStream) -> TokenStream2 {
    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;
    let name = &sig.ident;

    quote! {
        #(#attrs)* #vis #sig {
            ::buddyload::transaction::transaction_hook(
                ::buddyload::generate_labels!(#name),
                async move {
                    #(#stmts)*
                },
            ).await
        }
    }
}

/// Proc macro to denote a Scenario
///
/// NOTE: Currently this macro only works on functions which take no arguments and with no return value.
/// (void functions). Scenarios which need state can use `Scenario::new` with a closure instead.
///
/// See the `Scenario` struct for more information on the methods this macro provides on functions.
///
/// # Example
/// ```ignore
/// use buddyload::prelude::*;
///
/// #[scenario]
/// async fn my_scenario() {
/// }
/// ```
#[proc_macro_attribute]
pub fn scenario(attr: TokenStream, item: TokenStream) -> TokenStream {
    scenario_internal(attr, item).into()
}

fn scenario_internal(_attr: TokenStream, item: TokenStream) -> TokenStream2 {
    let input = match syn::parse::<ItemFn>(item) {
        Ok(input) => input,
        Err(err) => return err.to_compile_error(),
    };

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = input;
    let stmts = &block.stmts;

    let new_name = Ident::new(&format!("__buddyload_{}", sig.ident), Span::call_site());
    let mut new_sig = sig.clone();
    new_sig.ident = new_name.clone();

    let mut scen_sig = sig.clone();
    let scen_name = sig.ident.clone();
    scen_sig.asyncness = None;
    scen_sig.output = syn::parse_quote! {
        -> impl ::buddyload::scenario::ConfigurableScenario<::buddyload::core::RunStatistics>
    };

    quote! {
        #(#attrs)* #vis #scen_sig {
            ::buddyload::scenario::Scenario::new(stringify!(#scen_name), #new_name)
        }

        #(#attrs)* #vis #new_sig {
            #(#stmts)*
        }
    }
}
